//! Small platform helpers.

pub mod panic_hook;
pub mod privilege;
