//! Account lifecycle events and their best-effort delivery

pub mod types;
pub mod notifier;

pub use types::LifecycleEvent;
pub use notifier::{
    EventPublisher, LifecycleNotifier, LogPublisher, NotifyError, RecordingPublisher, WebhookPublisher,
};
