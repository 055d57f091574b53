//! Creak - interactive plugin console for network tooling

pub mod config;
pub mod error;
pub mod plugins;
pub mod probe;
pub mod session;
pub mod shell;
pub mod utils;

pub use config::Config;
pub use error::{CreakError, Result};
