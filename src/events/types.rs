use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Envelope published after a successful account mutation.
///
/// Serialises as `{"type": "<AccountCreated|AccountUpdated|AccountDeleted>", "data": {...}}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum LifecycleEvent {
    AccountCreated { email: String, name: String },
    AccountUpdated { id: AccountId, email: String, name: String },
    AccountDeleted { id: AccountId },
}

impl LifecycleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccountCreated { .. } => "AccountCreated",
            Self::AccountUpdated { .. } => "AccountUpdated",
            Self::AccountDeleted { .. } => "AccountDeleted",
        }
    }
}
