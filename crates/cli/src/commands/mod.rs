//! Command implementations.
//!
//! Each command returns its output as a string; [`emit`] is the only place
//! that writes to stdout.

pub mod cart;
pub mod catalog;
pub mod product;

/// Write command output to stdout.
#[allow(clippy::print_stdout)]
pub fn emit(output: &str) {
    println!("{}", output.trim_end());
}
