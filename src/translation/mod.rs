/*!
 * Translation pipeline of the gateway.
 *
 * - `unit`: per-string translation state
 * - `cache`: content-addressed keys and the caching decorator
 * - `preprocess`: eligibility of texts for backend calls
 * - `router`: candidate resolution, fallback and detection routing
 * - `gateway`: request validation and response shaping
 */

pub use self::cache::{CacheStats, CachedBackend, generate_key};
pub use self::gateway::{DetectRequest, DetectResponse, TranslateRequest, TranslateResponse, TranslationGateway};
pub use self::router::{Candidate, RouteRequest, ServiceRouter};
pub use self::unit::{LanguagePair, TranslationUnit};

pub mod cache;
pub mod gateway;
pub mod preprocess;
pub mod router;
pub mod unit;
