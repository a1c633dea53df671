/*!
 * Webhook ingress: turns eTranslation callbacks into store publications.
 *
 * The callback carries the external reference the request was submitted with,
 * which is also the name of the channel the waiting bridge is subscribed to.
 */

use log::{debug, warn};
use std::sync::Arc;

use super::ERROR_CALLBACK_MARKER;
use crate::errors::StoreError;
use crate::store::CorrelationStore;

/// Publishes callback payloads to the waiting bridge
#[derive(Debug, Clone)]
pub struct CallbackIngress {
    store: Arc<dyn CorrelationStore>,
}

impl CallbackIngress {
    pub fn new(store: Arc<dyn CorrelationStore>) -> Self {
        Self { store }
    }

    /// Handle a success callback
    ///
    /// The translated text parameter is used when present (inline requests),
    /// otherwise the raw body (document requests). Returns the number of
    /// subscribers reached; nothing is published without a reference or payload.
    pub async fn on_translation_callback(
        &self,
        external_reference: Option<&str>,
        translated_text: Option<&str>,
        body: Option<&str>,
    ) -> Result<usize, StoreError> {
        let Some(reference) = non_blank(external_reference) else {
            warn!("eTranslation callback without external reference ignored");
            return Ok(0);
        };
        debug!("eTranslation callback received for external reference {}", reference);

        let Some(payload) = translated_text.or(body).filter(|payload| !payload.is_empty()) else {
            warn!("eTranslation callback for {} carries no translation", reference);
            return Ok(0);
        };

        self.publish(reference, payload).await
    }

    /// Handle an error callback by publishing a marked error message
    pub async fn on_error_callback(
        &self,
        external_reference: Option<&str>,
        error_code: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<usize, StoreError> {
        let Some(reference) = non_blank(external_reference) else {
            warn!("eTranslation error callback without external reference ignored");
            return Ok(0);
        };
        debug!(
            "eTranslation error callback received for {}: error-code={:?}, error-message={:?}",
            reference, error_code, error_message
        );

        let message = format_error_message(error_code.unwrap_or_default(), error_message.unwrap_or_default());
        self.publish(reference, &message).await
    }

    async fn publish(&self, reference: &str, payload: &str) -> Result<usize, StoreError> {
        let receivers = self.store.publish(reference, payload).await?;
        if receivers == 0 {
            // The bridge already gave up or the callback is a re-delivery
            debug!("No request waiting on {}, callback dropped", reference);
        }
        Ok(receivers)
    }
}

/// Error message published for an error callback
pub fn format_error_message(error_code: &str, error_message: &str) -> String {
    format!(
        "{}: error-code={}, error-message={}",
        ERROR_CALLBACK_MARKER, error_code, error_message
    )
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
