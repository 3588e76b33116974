pub mod account;
pub mod api;
pub mod attachment;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod service;
