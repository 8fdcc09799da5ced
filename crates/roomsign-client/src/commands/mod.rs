//! Command implementations.

pub mod config;
pub mod events;
pub mod schedule;
pub mod status;

use serde::Serialize;

use crate::error::ClientResult;

/// Prints `value` as pretty JSON on stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> ClientResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
