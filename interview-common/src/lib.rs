//! # Mock Interview Common Library
//!
//! Shared code for the mock-interview services including:
//! - Error and result types
//! - Configuration file model and root folder resolution
//! - Analysis event types and the broadcast EventBus
//! - Server-Sent Events helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
