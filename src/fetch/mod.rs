//! Paged fetching with per-page retry

pub mod pages;
pub mod retry;

pub use pages::*;
pub use retry::*;
