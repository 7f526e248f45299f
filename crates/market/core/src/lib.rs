//! Apus Market Core.
//!
//! Settings, roles, contract artifacts and the typed client for the Apus proof market contracts.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::similar_names)]
#![warn(missing_docs)]

mod abi;
mod artifacts;
mod client;
mod client_config;
mod config;
mod render;
mod role;

pub use artifacts::*;
pub use client::*;
pub use client_config::*;
pub use config::*;
pub use render::*;
pub use role::*;
