//! Presentation layer for grants-council
//!
//! This crate contains CLI definitions, output formatters,
//! progress reporters, and the pipeline event stream printer.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, ConfirmTeamArgs, DecideArgs, OutcomeArgs, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use output::stream::{event_line, print_events};
pub use progress::reporter::{ProgressReporter, SimpleProgress};
