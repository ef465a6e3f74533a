//! Best-effort delivery of transaction notifications
//!
//! Events are handed to the [`EventDispatcher`] after a transition commits. Delivery
//! runs on a spawned task; failures are logged and never reach the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::files::FileStore;
use crate::listing::TransactionEvent;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification endpoint answered {0}")]
    Rejected(reqwest::StatusCode),
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &TransactionEvent) -> Result<(), NotifyError>;
}

/// Writes notifications to the log only
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &TransactionEvent) -> Result<(), NotifyError> {
        tracing::info!(
            listing_id = %event.listing_id,
            kind = ?event.kind,
            recipient = ?event.recipient,
            subject = %event.subject,
            attachments = event.attachments.len(),
            "notification"
        );
        Ok(())
    }
}

/// Posts each event as JSON to a relay (mail gateway, chat hook)
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &TransactionEvent) -> Result<(), NotifyError> {
        let response = self.http.post(&self.url).json(event).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status()));
        }
        Ok(())
    }
}

/// Resolves attachments and delivers events off the request path
#[derive(Clone)]
pub struct EventDispatcher {
    notifier: Arc<dyn Notifier>,
    files: Arc<dyn FileStore>,
}

impl EventDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, files: Arc<dyn FileStore>) -> Self {
        Self { notifier, files }
    }

    /// Spawn delivery of `events`, in order. Returns immediately.
    pub fn dispatch(&self, events: Vec<TransactionEvent>) {
        if events.is_empty() {
            return;
        }

        let events: Vec<TransactionEvent> = events
            .into_iter()
            .map(|mut event| {
                event.attachments = event
                    .attachments
                    .iter()
                    .map(|reference| self.files.resolve(reference))
                    .collect();
                event
            })
            .collect();

        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            for event in &events {
                if let Err(e) = notifier.notify(event).await {
                    tracing::warn!(
                        listing_id = %event.listing_id,
                        kind = ?event.kind,
                        error = %e,
                        "failed to deliver notification"
                    );
                }
            }
        });
    }
}
