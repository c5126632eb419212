//! Console runner - main event loop of the console front-end
//!
//! Stdin is read on a blocking thread and forwarded as [`ConsoleInput`]. The
//! loop multiplexes input, OS signals and a [`POLL_INTERVAL`] ticker that
//! drives [`SessionController::tick`]. Controller observers only enqueue
//! output; it is rendered after each loop step with the current view settings.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use feedback_app::config::{
    load_preferences, load_project_config, save_preferences, save_project_config,
};
use feedback_app::signals::{spawn_signal_handler, ShutdownSignal};
use feedback_app::{
    export_logs, FeedbackHistory, LogSearch, ProjectConfig, SearchOutcome, SessionController,
    SessionOptions, StateCause, StateChange, UiPreferences, POLL_INTERVAL,
};
use feedback_core::prelude::*;
use feedback_core::{logging, FeedbackResult, LogLine};

use super::commands::{parse_line, ConsoleCommand, TemplateAction};
use super::HeadlessEvent;

/// How many history entries `:templates` lists and `:history` can recall
const RECENT_HISTORY: usize = 10;

/// Characters of a template or history entry shown in listings
const PREVIEW_CHARS: usize = 50;

/// Everything the console needs to open a session
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    pub project_dir: PathBuf,
    pub prompt: String,
    /// Overrides the configured run command and starts it immediately
    pub command: Option<String>,
    /// Emit NDJSON events on stdout instead of plain text on stderr
    pub json_events: bool,
    pub preferences_path: PathBuf,
}

#[derive(Debug)]
enum ConsoleInput {
    Line(String),
    Eof,
    Signal(ShutdownSignal),
}

/// Output queued by controller observers
enum SessionOutput {
    Line(LogLine),
    State(StateChange),
}

enum Flow {
    Continue,
    Finish(FeedbackResult),
}

/// Run a feedback session on the console and return its result
pub async fn run_console(options: ConsoleOptions) -> Result<FeedbackResult> {
    info!("═══════════════════════════════════════════════════════");
    info!("User Feedback console starting");
    info!("Project: {}", options.project_dir.display());
    info!("═══════════════════════════════════════════════════════");

    let (input_tx, mut input_rx) = mpsc::unbounded_channel();

    let stdin_tx = input_tx.clone();
    std::thread::spawn(move || {
        read_stdin_blocking(stdin_tx);
    });
    spawn_signal_handler(input_tx, ConsoleInput::Signal);

    let mut console = Console::open(&options);
    console.announce();

    let auto_start = options
        .command
        .as_deref()
        .or_else(|| console.config.auto_start_command())
        .map(str::to_string);
    if let Some(command) = auto_start {
        info!("Auto-starting '{}'", command);
        console.handle_command(ConsoleCommand::Run(Some(command)));
    }
    console.flush();

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut input_closed = false;

    let result = loop {
        let flow = tokio::select! {
            _ = ticker.tick() => {
                console.session.tick();
                if input_closed && !console.session.is_running() {
                    Flow::Finish(console.finish_after_eof())
                } else {
                    Flow::Continue
                }
            }
            input = input_rx.recv(), if !input_closed => match input {
                Some(ConsoleInput::Line(line)) => console.handle_line(&line),
                Some(ConsoleInput::Eof) => {
                    info!("Stdin closed, finishing once the command exits");
                    input_closed = true;
                    Flow::Continue
                }
                Some(ConsoleInput::Signal(signal)) => {
                    info!("Closing session on {} signal", signal);
                    Flow::Finish(console.session.close())
                }
                None => Flow::Finish(console.session.close()),
            },
        };

        console.flush();
        if let Flow::Finish(result) = flow {
            break result;
        }
    };

    console.flush();
    info!("User Feedback console exiting");
    Ok(result)
}

struct Console {
    session: SessionController,
    output_rx: mpsc::UnboundedReceiver<SessionOutput>,
    config: ProjectConfig,
    history: FeedbackHistory,
    prefs: UiPreferences,
    search: LogSearch,
    /// Feedback typed so far, one entry per input line
    feedback: Vec<String>,
    options: ConsoleOptions,
}

impl Console {
    fn open(options: &ConsoleOptions) -> Self {
        let (output_tx, output_rx) = mpsc::unbounded_channel();

        let mut session = SessionController::new(SessionOptions::new(&options.project_dir));
        let line_tx = output_tx.clone();
        session.on_log_appended(move |line| {
            let _ = line_tx.send(SessionOutput::Line(line.clone()));
        });
        session.on_state_changed(move |change| {
            let _ = output_tx.send(SessionOutput::State(change.clone()));
        });

        Self {
            session,
            output_rx,
            config: load_project_config(&options.project_dir),
            history: FeedbackHistory::load(&options.project_dir),
            prefs: load_preferences(&options.preferences_path),
            search: LogSearch::new(),
            feedback: Vec::new(),
            options: options.clone(),
        }
    }

    fn announce(&self) {
        if self.options.json_events {
            HeadlessEvent::session_opened(
                &self.options.project_dir.display().to_string(),
                &self.options.prompt,
            )
            .emit();
            return;
        }

        eprintln!("{}", self.options.prompt);
        eprintln!();
        eprintln!("Project: {}", self.options.project_dir.display());
        if !self.config.run_command.is_empty() {
            eprintln!("Run command: {}", self.config.run_command);
        }
        eprintln!("Type feedback, or :run, :stop, :filter, :find, :templates, :submit, :quit");
        eprintln!("Diagnostic log: {}", logging::log_directory().display());
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        match parse_line(line) {
            Ok(command) => self.handle_command(command),
            Err(message) => {
                self.error(&message);
                Flow::Continue
            }
        }
    }

    fn handle_command(&mut self, command: ConsoleCommand) -> Flow {
        match command {
            ConsoleCommand::Run(command) => {
                let command = command.unwrap_or_else(|| self.config.run_command.clone());
                match self.session.start(&command) {
                    Ok(()) => self.config.run_command = command.trim().to_string(),
                    // Already written to the log
                    Err(Error::ProcessSpawn { .. }) => {}
                    Err(e) => self.report(&e),
                }
            }
            ConsoleCommand::Stop => {
                if !self.session.stop() {
                    self.notice("Nothing is running");
                }
            }
            ConsoleCommand::Clear => {
                self.session.clear_logs();
                self.notice("Logs cleared");
            }
            ConsoleCommand::Filter(filter) => {
                self.prefs.log_filter = filter.unwrap_or_else(|| self.prefs.log_filter.cycle());
                self.save_preferences();
                self.notice(&format!("Filter: {}", self.prefs.log_filter.display_name()));
                self.redraw();
            }
            ConsoleCommand::Find(query) => {
                self.search.set_query(&query);
                let outcome = self.search.next_match(self.session.store());
                self.show_search(outcome);
            }
            ConsoleCommand::Next => {
                let outcome = self.search.next_match(self.session.store());
                self.show_search(outcome);
            }
            ConsoleCommand::Prev => {
                let outcome = self.search.prev_match(self.session.store());
                self.show_search(outcome);
            }
            ConsoleCommand::Numbers => {
                self.prefs.show_line_numbers = !self.prefs.show_line_numbers;
                self.save_preferences();
                self.redraw();
            }
            ConsoleCommand::Export => {
                match export_logs(self.session.store(), &self.options.project_dir) {
                    Ok(path) => self.notice(&format!("✓ Exported to {}", path.display())),
                    Err(e) => self.report(&e),
                }
            }
            ConsoleCommand::Template(command) => {
                let command = command.unwrap_or_else(|| self.config.run_command.clone());
                if self.config.add_command_template(&command) {
                    self.persist_config("✓ Saved!");
                }
            }
            ConsoleCommand::Templates => self.list_templates(),
            ConsoleCommand::FeedbackTemplate(action) => self.feedback_template(action),
            ConsoleCommand::History(index) => self.recall_history(index),
            ConsoleCommand::Submit => {
                let feedback = self.feedback.join("\n");
                if let Err(e) = self.history.record(&feedback, &self.options.prompt) {
                    warn!("Failed to save history: {}", e);
                }
                match self.session.submit(&feedback) {
                    Ok(result) => return Flow::Finish(result),
                    Err(e) => self.report(&e),
                }
            }
            ConsoleCommand::Quit => return Flow::Finish(self.session.close()),
            ConsoleCommand::Feedback(text) => self.feedback.push(text),
        }

        Flow::Continue
    }

    fn feedback_template(&mut self, action: TemplateAction) {
        match action {
            TemplateAction::Save => {
                let feedback = self.feedback.join("\n");
                if feedback.trim().is_empty() {
                    self.notice("Type some feedback first");
                } else if !self.config.add_feedback_template(&feedback) {
                    self.notice("Template already saved");
                } else {
                    self.persist_config("✓ Template saved!");
                }
            }
            TemplateAction::Insert(index) => match self.config.feedback_templates.get(index - 1) {
                Some(template) => {
                    self.feedback.extend(template.lines().map(str::to_string));
                    self.notice(&format!("Inserted template {index}"));
                }
                None => self.error(&format!("No feedback template {index}")),
            },
            TemplateAction::Delete(index) => {
                match self.config.feedback_templates.get(index - 1).cloned() {
                    Some(template) => {
                        self.config.remove_feedback_template(&template);
                        self.persist_config(&format!("Deleted template {index}"));
                    }
                    None => self.error(&format!("No feedback template {index}")),
                }
            }
        }
    }

    /// Replace the typed feedback with a recent history entry
    fn recall_history(&mut self, index: usize) {
        let entry = self.history.recent(RECENT_HISTORY).nth(index - 1).cloned();
        match entry {
            Some(entry) => {
                self.feedback = entry.feedback.lines().map(str::to_string).collect();
                self.notice(&format!("Recalled {}", entry.label()));
            }
            None => self.error(&format!("No history entry {index}")),
        }
    }

    /// Stdin is gone: submit what was typed, or just close
    fn finish_after_eof(&mut self) -> FeedbackResult {
        if self.feedback.iter().all(|line| line.trim().is_empty()) {
            return self.session.close();
        }
        match self.handle_command(ConsoleCommand::Submit) {
            Flow::Finish(result) => result,
            Flow::Continue => self.session.close(),
        }
    }

    /// Render queued controller output
    fn flush(&mut self) {
        while let Ok(output) = self.output_rx.try_recv() {
            match output {
                SessionOutput::Line(line) => self.show_line(&line),
                SessionOutput::State(change) => self.show_state(&change),
            }
        }
    }

    fn show_line(&self, line: &LogLine) {
        if self.options.json_events {
            HeadlessEvent::log(line).emit();
        } else if self.prefs.log_filter.matches(line.level()) {
            eprintln!("{}", line.display_line(self.prefs.show_line_numbers));
        }
    }

    fn show_state(&self, change: &StateChange) {
        if self.options.json_events {
            HeadlessEvent::state_changed(change).emit();
            return;
        }
        match &change.cause {
            StateCause::Stopped => eprintln!("■ Stopped"),
            StateCause::Exited { .. } => eprintln!("Type your feedback, then :submit"),
            _ => {}
        }
    }

    /// Re-print the whole log with the current filter and numbering
    fn redraw(&self) {
        if self.options.json_events {
            return;
        }
        for line in self.session.store().filtered(self.prefs.log_filter) {
            eprintln!("{}", line.display_line(self.prefs.show_line_numbers));
        }
    }

    fn show_search(&self, outcome: SearchOutcome) {
        if self.options.json_events {
            HeadlessEvent::search_result(self.search.query(), outcome).emit();
            return;
        }
        match outcome.sequence().and_then(|seq| self.session.store().get(seq)) {
            Some(line) => eprintln!("{} {}", outcome.display_status(), line.display_line(true)),
            None => eprintln!("{}", outcome.display_status()),
        }
    }

    fn list_templates(&self) {
        let mut lines = Vec::new();
        lines.push("Command templates:".to_string());
        lines.extend(self.config.command_templates.iter().map(|t| format!("  {t}")));
        lines.push("Feedback templates (:ftemplate insert|delete <n>):".to_string());
        lines.extend(
            self.config
                .feedback_templates
                .iter()
                .enumerate()
                .map(|(i, t)| format!("  {}. {}", i + 1, preview(t))),
        );
        lines.push("Recent feedback (:history <n>):".to_string());
        lines.extend(
            self.history
                .recent(RECENT_HISTORY)
                .enumerate()
                .map(|(i, entry)| format!("  {}. {}", i + 1, entry.label())),
        );
        self.notice(&lines.join("\n"));
    }

    fn persist_config(&self, saved_message: &str) {
        match save_project_config(&self.options.project_dir, &self.config) {
            Ok(()) => self.notice(saved_message),
            Err(e) => self.report(&e),
        }
    }

    fn save_preferences(&self) {
        if let Err(e) = save_preferences(&self.options.preferences_path, &self.prefs) {
            warn!("Failed to save preferences: {}", e);
        }
    }

    fn notice(&self, message: &str) {
        if self.options.json_events {
            HeadlessEvent::notice(message).emit();
        } else {
            eprintln!("{message}");
        }
    }

    fn error(&self, message: &str) {
        if self.options.json_events {
            HeadlessEvent::error(message, false).emit();
        } else {
            eprintln!("Error: {message}");
        }
    }

    fn report(&self, err: &Error) {
        if !err.is_recoverable() {
            warn!("Session error: {:?}", err);
        }
        if self.options.json_events {
            HeadlessEvent::error(err.to_string(), err.is_fatal()).emit();
        } else {
            eprintln!("Error: {err}");
        }
    }
}

/// First characters of `text` on one line, with an ellipsis when cut
fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

/// Read stdin lines and forward them (blocking, runs on its own thread)
fn read_stdin_blocking(tx: mpsc::UnboundedSender<ConsoleInput>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => {
                if tx.send(ConsoleInput::Line(line)).is_err() {
                    return;
                }
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    let _ = tx.send(ConsoleInput::Eof);
    info!("Stdin reader exiting");
}
