//! Authentication against the YouTube Data API

pub mod authenticator;
pub mod consent;
pub mod credential;
pub mod store;

pub use authenticator::*;
pub use consent::*;
pub use credential::*;
pub use store::*;
