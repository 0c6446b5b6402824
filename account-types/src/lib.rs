//! # account-types
//!
//! Shared types for the Blockfall account sync layer.
//!
//! This crate provides the foundational types used across all account crates:
//! - [`StoreError`], [`RemoteError`], [`SyncError`] - Error taxonomy
//! - [`AccountRequest`], [`AccountResponse`] - Remote endpoint protocol
//! - [`TopFriend`], [`NO_SEED`] - Plain value types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod messages;
mod types;

pub use error::{RemoteError, StoreError, SyncError, SyncResult};
pub use messages::{AccountRequest, AccountResponse};
pub use types::{TopFriend, NO_SEED};
