//! Utility modules for interview-server

pub mod db_retry;

pub use db_retry::retry_on_lock;
