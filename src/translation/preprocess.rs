/*!
 * Input pre-processing.
 *
 * Texts without at least two consecutive letters (numbers, punctuation,
 * single characters, URLs made of symbols) are not worth a backend call.
 * Such units are answered with their original text, and detection reports
 * them as undetermined.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::translation::unit::TranslationUnit;

static ELIGIBLE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Alphabetic}{2,}").unwrap());

/// Whether a text should reach a backend
pub fn is_eligible(text: &str) -> bool {
    ELIGIBLE_REGEX.is_match(text)
}

/// Answer ineligible units with their own text. Returns how many were marked.
pub fn mark_ineligible(units: &mut [TranslationUnit]) -> usize {
    let mut marked = 0;
    for unit in units.iter_mut().filter(|unit| !unit.is_translated() && !is_eligible(&unit.text)) {
        let original = unit.text.clone();
        unit.set_translation(Some(original));
        marked += 1;
    }
    if marked > 0 {
        debug!("{} of {} texts are not eligible for translation", marked, units.len());
    }
    marked
}

/// Indices of the texts eligible for language detection
pub fn eligible_indices(texts: &[String]) -> Vec<usize> {
    texts
        .iter()
        .enumerate()
        .filter(|(_, text)| is_eligible(text))
        .map(|(index, _)| index)
        .collect()
}
