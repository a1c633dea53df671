/*!
 * Error types for the babelgate gateway.
 *
 * This module contains custom error types for the different layers of the
 * gateway, using the thiserror crate for ergonomic error definitions:
 * - `ProviderError`: failures talking to a remote backend over HTTP
 * - `StoreError`: failures of the correlation store (cache + pub/sub)
 * - `TranslationError`: the terminal error of a translate/detect request
 * - `AppError`: top-level error for the binary
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by the correlation store
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The store cannot be reached
    #[error("Correlation store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed a command
    #[error("Correlation store command failed: {0}")]
    Command(String),

    /// The subscription was closed before a message arrived
    #[error("Subscription to channel '{0}' was closed")]
    SubscriptionClosed(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_connection_dropped() || error.is_connection_refusal() || error.is_io_error() {
            Self::Unavailable(error.to_string())
        } else {
            Self::Command(error.to_string())
        }
    }
}

/// Errors that can occur while routing, translating or detecting
#[derive(Error, Debug)]
pub enum TranslationError {
    /// A request field is missing or invalid
    #[error("Invalid value for parameter '{param}': {message}")]
    ParameterValidation { param: String, message: String },

    /// The requested service id is not registered
    #[error("Invalid value for parameter '{param}': unknown service {service_id} (available services: {available})")]
    UnknownService {
        param: String,
        service_id: String,
        available: String,
    },

    /// The selected service does not support the language pair
    #[error("Invalid value for parameter '{param}': language pair not supported: {pair}")]
    UnsupportedLanguagePair { param: String, pair: String },

    /// The selected detection service does not support the language hint
    #[error("Invalid value for parameter '{param}': language {lang} not supported by service {service_id}")]
    UnsupportedLanguage {
        param: String,
        lang: String,
        service_id: String,
    },

    /// The asynchronous backend did not accept the submission
    #[error("The translation request could not be successfully registered: {0}")]
    RemoteRegistrationFailed(String),

    /// No callback arrived within the wait budget
    #[error("No response received from the remote service within {waited_ms} ms")]
    GatewayTimeout { waited_ms: u64 },

    /// The remote backend reported an error through its error callback
    #[error("Remote processing error: {0}")]
    RemoteProcessingError(String),

    /// The demultiplexed response does not match the batch
    #[error("The remote response and the input texts have different size: expected {expected}, received {received}")]
    ResponseSizeMismatch { expected: usize, received: usize },

    /// The backend requires a source language but none was given
    #[error("The source language cannot be empty for the {0} service")]
    MissingSourceLanguage(String),

    /// A single-source backend received units of several language pairs
    #[error("All texts of a batch sent to {0} must share one language pair")]
    MixedLanguageBatch(String),

    /// The remote response could not be decoded
    #[error("Malformed remote response: {0}")]
    MalformedResponse(String),

    /// Language detection failed
    #[error("Language detection failed: {0}")]
    LanguageDetection(String),

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the correlation store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TranslationError {
    /// Build a parameter validation error
    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParameterValidation {
            param: param.into(),
            message: message.into(),
        }
    }

    /// True when the caller sent a request that can never succeed as is
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ParameterValidation { .. }
                | Self::UnknownService { .. }
                | Self::UnsupportedLanguagePair { .. }
                | Self::UnsupportedLanguage { .. }
                | Self::MissingSourceLanguage(_)
        )
    }

    /// HTTP status an endpoint layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ParameterValidation { .. }
            | Self::UnknownService { .. }
            | Self::UnsupportedLanguagePair { .. }
            | Self::UnsupportedLanguage { .. }
            | Self::MissingSourceLanguage(_) => 400,
            Self::GatewayTimeout { .. } => 504,
            Self::RemoteProcessingError(_) => 422,
            Self::Provider(_) | Self::MalformedResponse(_) | Self::LanguageDetection(_) => 502,
            Self::RemoteRegistrationFailed(_)
            | Self::ResponseSizeMismatch { .. }
            | Self::MixedLanguageBatch(_)
            | Self::Store(_) => 500,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration loading or validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the correlation store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
