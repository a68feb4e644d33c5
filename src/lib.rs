//! Authenticated client core for the Buddy pet-adoption storefront.
//!
//! The interesting part is [`auth`]: a single-flight session refresh that
//! parks every request failing with 401 while one refresh call is in flight,
//! then replays or rejects them all together. Around it sit a validated
//! persisted session ([`storage`]), the in-memory [`auth::SessionStore`], and
//! a fail-safe logout.
//!
//! Start with [`BuddyClient::builder`] or [`BuddyClient::from_config`].

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod transport;

pub use client::{ApiClient, BuddyClient, BuddyClientBuilder};
pub use error::{Error, ErrorKind, Result, StorageError};
