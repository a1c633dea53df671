/*!
 * Tests for ISO language code utilities
 */

use babelgate::language_utils::{get_language_name, language_codes_match, normalize_language_code, validate_language_code};

#[test]
fn test_normalizeLanguageCode_withPart1Code_shouldLowercase() {
    assert_eq!(normalize_language_code("EN").unwrap(), "en");
    assert_eq!(normalize_language_code(" fr ").unwrap(), "fr");
}

#[test]
fn test_normalizeLanguageCode_withPart2Codes_shouldReturnPart1() {
    assert_eq!(normalize_language_code("fra").unwrap(), "fr");
    assert_eq!(normalize_language_code("fre").unwrap(), "fr");
    assert_eq!(normalize_language_code("ell").unwrap(), "el");
    assert_eq!(normalize_language_code("gre").unwrap(), "el");
}

#[test]
fn test_normalizeLanguageCode_withoutPart1_shouldKeepPart3() {
    // Hawaiian has no ISO 639-1 code
    assert_eq!(normalize_language_code("haw").unwrap(), "haw");
}

#[test]
fn test_validateLanguageCode_withInvalidCodes_shouldFail() {
    assert!(validate_language_code("").is_err());
    assert!(validate_language_code("english").is_err());
    assert!(validate_language_code("qq").is_err());
    assert!(validate_language_code("de").is_ok());
}

#[test]
fn test_languageCodesMatch_shouldCompareAcrossStandards() {
    assert!(language_codes_match("de", "ger"));
    assert!(language_codes_match("nld", "dut"));
    assert!(!language_codes_match("de", "nl"));
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(get_language_name("ger").unwrap(), "German");
}
