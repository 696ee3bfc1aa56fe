//! Model clients.
//!
//! The core only ever talks to models through the [`ModelClient`] trait;
//! [`CommandClient`] is the bundled implementation that shells out to a
//! command-line tool.

mod base;
mod command;

pub use base::{extract_json_object, parse_json_output, ModelClient};
pub use command::CommandClient;
