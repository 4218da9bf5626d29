//! Core types shared by every stage of the updater.
//!
//! Currently this is the error vocabulary: [`UpdaterError`] for typed
//! failures and [`ErrorContext`] for presenting them on the command line.

pub mod error;

pub use error::{ErrorContext, Result, UpdaterError, user_friendly_error};
