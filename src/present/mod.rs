//! Output for humans: status lines and result rendering.

pub mod console;
pub mod formatter;

pub use console::ConsoleReporter;
pub use formatter::{OutputFormat, OutputFormatter};
