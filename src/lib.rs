//! Hand a running debug session over to a Vim editor and back.

pub mod config;
pub mod debugger;
pub mod error;
pub mod process;
pub mod proxy;
pub mod testing;

pub use error::{Error, Result};
