mod commands;
mod context;

pub use commands::{dispatch, Cli};
pub use context::CliContext;
