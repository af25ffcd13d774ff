//! YouTube Data API access

pub mod client;
pub mod query;
pub mod types;

pub use client::*;
pub use query::*;
pub use types::*;
