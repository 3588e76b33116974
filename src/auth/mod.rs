//! Bearer-token authentication
//!
//! `token` issues and verifies signed, expiring identity claims; `gate` is the
//! request-boundary middleware that turns a bearer credential into an account id.

pub mod token;
pub mod gate;

pub use token::{Claims, TokenError, TokenPair, TokenService};
pub use gate::{require_bearer, AuthenticatedAccount};
