//! ftpdrop core: scheduled FTP pull into a staging directory, then relocation.

pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod filter;
pub mod logging;
pub mod pipeline;
pub mod relocate;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod staging;

pub use error::Error;
