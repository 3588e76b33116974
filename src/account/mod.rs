//! Account records and the primary store adapter
//!
//! Accounts live in the structured primary store. This module owns:
//! - The account record and its request/summary views
//! - The `AccountStore` capability trait with sled-backed and in-memory implementations
//! - The one-way password transform used at registration and login

pub mod types;
pub mod store;
pub mod sled_store;
pub mod auth;

pub use types::{Account, AccountId, AccountSummary, AccountUpdate, NewAccount};
pub use store::{AccountStore, InMemoryAccountStore};
pub use sled_store::SledAccountStore;
pub use auth::{hash_password, verify_password, AuthError};
