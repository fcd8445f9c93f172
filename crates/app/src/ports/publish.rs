//! Publish port: fire-and-forget delivery of messages onto the bus.

use std::sync::Arc;

use tokio::sync::mpsc;

/// One message destined for the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
    /// Whether the bus should keep this as the topic's last value.
    pub retain: bool,
}

impl Publication {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<String>, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain,
        }
    }
}

/// Accepts publications for the bus.
///
/// Publishing never blocks and never reports failure to the caller; failed
/// deliveries are not retried.
pub trait PublishSink {
    fn publish(&self, publication: Publication);
}

impl<T: PublishSink + ?Sized> PublishSink for Arc<T> {
    fn publish(&self, publication: Publication) {
        (**self).publish(publication);
    }
}

/// Hands publications to a task that owns the actual bus client.
///
/// A closed receiver silently drops the publication.
impl PublishSink for mpsc::UnboundedSender<Publication> {
    fn publish(&self, publication: Publication) {
        let _ = self.send(publication);
    }
}
