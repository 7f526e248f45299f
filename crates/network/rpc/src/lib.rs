//! Apus RPC.
//!
//! Signs and submits contract transactions to an Ethereum JSON-RPC node and runs read-only calls
//! against it with explicit timeouts.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::similar_names)]
#![warn(missing_docs)]

mod error;
mod provider;
mod retry;
mod submit;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::*;
pub use provider::*;
pub use retry::*;
pub use submit::*;
