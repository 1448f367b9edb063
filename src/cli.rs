//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::{map_error, map_error_json};
pub use parse::{Cli, Commands, RepositoryArgs};
pub use presentation::{
    format_build_result, format_download_summary, format_generate_summary,
    format_run_status_json, format_run_status_text, format_section_heading, ConsoleObserver,
};
pub use route::{write_tree, RunContext};
