//! Bridges legacy callback- and poll-based media asset APIs into uniform,
//! cancellable tokio streams.
//!
//! Every operation yields an ordered sequence of [`types::MediaResult`]
//! events: `Processing` while the provider works, then `Success` or
//! `Failure`. Dropping a stream before it completes synchronously cancels
//! the underlying native request and stops any progress timer.

pub mod config;
pub mod errors;
pub mod exporter;
pub mod fetcher;
#[cfg(test)]
mod fetcher_test;
pub mod mock_provider;
pub mod pipeline;
pub mod poller;
#[cfg(test)]
mod poller_test;
pub mod provider;
pub mod stream;
pub mod types;

pub use errors::*;
pub use types::*;
