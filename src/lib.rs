/*!
 * # babelgate - translation gateway
 *
 * A Rust library routing translation and language detection requests to
 * heterogeneous backends behind one uniform batch interface.
 *
 * ## Features
 *
 * - Routing by explicit service id, language-pair mapping or default service
 * - Fallback service for the texts the first service left untranslated
 * - Content-addressed translation cache, including partial-hit batches
 * - Synchronous bridge over the webhook-only eTranslation service, correlating
 *   submissions and callbacks through a pub/sub store
 * - Backends:
 *   - Google Cloud Translation v3
 *   - Pangeanic (scored translation and detection)
 *   - eTranslation (asynchronous)
 *   - Local heuristic and hybrid language detectors
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `app_controller`: Store, registry and gateway wiring
 * - `translation`: Request pipeline:
 *   - `translation::gateway`: Request validation and responses
 *   - `translation::router`: Candidate resolution and fallback
 *   - `translation::cache`: Cache keys and the caching decorator
 *   - `translation::unit`: Per-string translation state
 * - `registry`: Configured services by id
 * - `bridge`: eTranslation submission, correlation and webhook ingress
 * - `store`: Correlation store (in-memory and Redis)
 * - `providers`: Backend traits and HTTP adapters
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod bridge;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod registry;
pub mod store;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use errors::{AppError, ProviderError, StoreError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_language_code};
pub use registry::ServiceRegistry;
pub use store::{CorrelationStore, InMemoryStore};
pub use translation::{DetectRequest, DetectResponse, TranslateRequest, TranslateResponse, TranslationGateway};
