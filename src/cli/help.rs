//! Command-name contract for logging.

use crate::cli::parse::Commands;

/// Command name string for structured log fields (e.g. "build", "status").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { .. } => "generate",
        Commands::Build { .. } => "build",
        Commands::Status { .. } => "status",
        Commands::Cancel { .. } => "cancel",
        Commands::Rerun { .. } => "rerun",
        Commands::Download { .. } => "download",
    }
}
