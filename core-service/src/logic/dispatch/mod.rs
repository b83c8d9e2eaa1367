//! Dispatch Module - collector delivery and voice notification
//!
//! # Architecture
//! - `payload.rs`: `AlertPayload` wire format, `DispatchOutcome`
//! - `transport.rs`: `AlertTransport` / `HttpTransport`
//! - `notifier.rs`: `Notifier` / `VoiceCallNotifier`
//!
//! `Dispatcher::send` never retries. `Dispatcher::notify` never fails
//! loudly: a notifier error is logged and reported as `false`.

pub mod notifier;
pub mod payload;
pub mod transport;

use std::sync::Arc;

pub use notifier::{alert_message, Notifier, VoiceCallConfig, VoiceCallNotifier};
pub use payload::{AlertPayload, DispatchOutcome};
pub use transport::{AlertTransport, HttpTransport};

#[derive(Clone)]
pub struct Dispatcher {
    transport: Option<Arc<dyn AlertTransport>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn AlertTransport>) -> Self {
        Self {
            transport: Some(transport),
            notifier: None,
        }
    }

    /// Notification only (collector tier: it is the end of the line)
    pub fn notify_only(notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            transport: None,
            notifier,
        }
    }

    pub fn with_notifier(mut self, notifier: Option<Arc<dyn Notifier>>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    pub async fn send(&self, payload: &AlertPayload) -> DispatchOutcome {
        match &self.transport {
            Some(transport) => transport.send(payload).await,
            None => DispatchOutcome::failed("no collector transport configured"),
        }
    }

    /// Place the voice notification; `true` when it went out
    pub async fn notify(&self) -> bool {
        let notifier = match &self.notifier {
            Some(n) => n,
            None => {
                log::warn!("[NotifierError] no notifier configured, skipping voice alert");
                return false;
            }
        };

        match notifier.notify().await {
            Ok(()) => true,
            Err(e) => {
                log::error!("[NotifierError] {}: {}", notifier.name(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::errors::NotifierError;
    use async_trait::async_trait;

    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn notify(&self) -> Result<(), NotifierError> {
            Err(NotifierError::Transport("no route to host".to_string()))
        }
    }

    #[tokio::test]
    async fn test_notify_failure_is_false() {
        let dispatcher = Dispatcher::notify_only(Some(Arc::new(Broken) as Arc<dyn Notifier>));
        assert!(!dispatcher.notify().await);
    }

    #[tokio::test]
    async fn test_notify_without_notifier() {
        assert!(!Dispatcher::notify_only(None).notify().await);
    }
}
