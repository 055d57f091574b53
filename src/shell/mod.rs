//! Interactive console.
//!
//! - **command**: line parsing into [`Command`]
//! - **dispatcher**: session state and the load / set / run protocol
//! - **interrupt**: Ctrl-C delivery to the active run
//! - **passthrough**: shell execution for unrecognized lines
//! - **printer**: diagnostic and report formatting

pub mod command;
pub mod dispatcher;
pub mod interrupt;
pub mod passthrough;
pub mod printer;

pub use command::{parse_command, Command};
pub use dispatcher::{Dispatcher, Flow};
pub use interrupt::{spawn_ctrl_c_listener, InterruptHandle};
pub use passthrough::{ShellExecutor, SystemShell};
