//! User Feedback - run a command, review its logs and send feedback
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use feedback_app::config::preferences_path;
use feedback_core::prelude::*;
use user_feedback::headless::HeadlessEvent;
use user_feedback::{format_result, run_console, write_result, ConsoleOptions};

const DEFAULT_PROMPT: &str = "I implemented the changes you requested.";

/// User Feedback - run a command, review its logs and send feedback
#[derive(Parser, Debug)]
#[command(name = "user-feedback")]
#[command(about = "Run a command, review its logs and send feedback", long_about = None)]
struct Args {
    /// Project directory the command runs in
    #[arg(long, value_name = "PATH")]
    project_directory: Option<PathBuf>,

    /// Message shown to the user
    #[arg(long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Write the result as JSON to this file
    #[arg(long, value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Command to run immediately (overrides the configured run command)
    #[arg(long)]
    command: Option<String>,

    /// Emit NDJSON events on stdout instead of plain text
    #[arg(long)]
    json_events: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    let args = Args::parse();

    color_eyre::install()?;
    feedback_core::logging::init()?;

    let json_events = args.json_events;

    let outcome = match resolve_project_dir(args.project_directory) {
        Ok(project_dir) => {
            let options = ConsoleOptions {
                project_dir,
                prompt: args.prompt,
                command: args.command,
                json_events,
                preferences_path: preferences_path(),
            };
            run_console(options).await
        }
        Err(e) => Err(e),
    };

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            error!("Application error: {:?}", e);
            if json_events {
                HeadlessEvent::error(e.to_string(), e.is_fatal()).emit();
            }
            return Err(e.into());
        }
    };

    match args.output_file {
        Some(path) => write_result(&path, &result)?,
        None if json_events => HeadlessEvent::result(&result).emit(),
        None => println!("{}", format_result(&result)),
    }

    Ok(())
}

/// Canonicalize the project directory (defaults to the current directory)
fn resolve_project_dir(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match dunce::canonicalize(&path) {
        Ok(dir) if dir.is_dir() => Ok(dir),
        _ => Err(Error::invalid_project_directory(path)),
    }
}
