//! Parsing of console input lines
//!
//! A line starting with `:` is a command; `::` escapes a literal leading
//! colon. Everything else is feedback text.

use feedback_core::LogLevelFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Start the given command, or the configured one
    Run(Option<String>),
    Stop,
    Clear,
    /// Set the level filter, or cycle to the next one
    Filter(Option<LogLevelFilter>),
    Find(String),
    Next,
    Prev,
    Numbers,
    Export,
    /// Save the given command (or the current one) as a template
    Template(Option<String>),
    /// List templates and recent feedback
    Templates,
    /// Manage saved feedback snippets
    FeedbackTemplate(TemplateAction),
    /// Replace the typed feedback with a recent history entry (1-based)
    History(usize),
    Submit,
    Quit,
    /// A line of feedback text
    Feedback(String),
}

/// What `:ftemplate` does with the feedback templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateAction {
    /// Save the feedback typed so far
    Save,
    /// Append template N (1-based) to the feedback
    Insert(usize),
    /// Forget template N (1-based)
    Delete(usize),
}

const FTEMPLATE_USAGE: &str = "Usage: :ftemplate save|insert <n>|delete <n>";
const HISTORY_USAGE: &str = "Usage: :history <n>";

/// Parse one line of console input
pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if let Some(rest) = line.strip_prefix("::") {
        return Ok(ConsoleCommand::Feedback(format!(":{rest}")));
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(ConsoleCommand::Feedback(line.to_string()));
    };

    let (name, arg) = match rest.trim_start().split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest.trim(), ""),
    };
    let optional_arg = (!arg.is_empty()).then(|| arg.to_string());

    let command = match name {
        "run" | "r" => ConsoleCommand::Run(optional_arg),
        "stop" | "s" => ConsoleCommand::Stop,
        "clear" => ConsoleCommand::Clear,
        "filter" | "f" => match optional_arg {
            Some(level) => ConsoleCommand::Filter(Some(level.parse()?)),
            None => ConsoleCommand::Filter(None),
        },
        "find" | "/" => match optional_arg {
            Some(text) => ConsoleCommand::Find(text),
            None => return Err("Usage: :find <text>".to_string()),
        },
        "next" | "n" => ConsoleCommand::Next,
        "prev" | "N" => ConsoleCommand::Prev,
        "numbers" => ConsoleCommand::Numbers,
        "export" => ConsoleCommand::Export,
        "template" => ConsoleCommand::Template(optional_arg),
        "templates" => ConsoleCommand::Templates,
        "ftemplate" => ConsoleCommand::FeedbackTemplate(parse_template_action(arg)?),
        "history" => match parse_index(arg) {
            Some(index) => ConsoleCommand::History(index),
            None => return Err(HISTORY_USAGE.to_string()),
        },
        "submit" => ConsoleCommand::Submit,
        "quit" | "q" => ConsoleCommand::Quit,
        other => return Err(format!("Unknown command: :{other}")),
    };

    Ok(command)
}

fn parse_template_action(arg: &str) -> Result<TemplateAction, String> {
    let parts: Vec<&str> = arg.split_whitespace().collect();
    let action = match parts.as_slice() {
        ["save"] => Some(TemplateAction::Save),
        ["insert", index] => parse_index(index).map(TemplateAction::Insert),
        ["delete", index] => parse_index(index).map(TemplateAction::Delete),
        _ => None,
    };
    action.ok_or_else(|| FTEMPLATE_USAGE.to_string())
}

/// A 1-based list position
fn parse_index(arg: &str) -> Option<usize> {
    arg.trim().parse().ok().filter(|index| *index > 0)
}
