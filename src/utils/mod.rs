//! Utility functions for ypl

pub mod url;

pub use url::*;
