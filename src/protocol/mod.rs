//! Console command handling
//!
//! This module turns console lines such as `SET key "some value"` into
//! commands, runs them against a [`Client`](crate::client::Client) and
//! renders the replies.

pub mod command;
pub mod console;
pub mod parser;
pub mod reply;

pub use command::{execute_line, Command};
pub use console::{handle_line, run_console, run_once, LineAction};
pub use parser::Parser;
pub use reply::Reply;
