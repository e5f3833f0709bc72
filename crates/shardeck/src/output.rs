//! Output formatting: table or JSON.
//!
//! Table uses `tabled`, JSON serializes the data itself via serde.
//! Status words are colored with `owo-colors` when color is enabled.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use shardeck_core::SystemStatus;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Resolved presentation settings for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Printer {
    /// Render a list: a table of `to_row` rows, or the data as JSON.
    pub fn list<T, R>(&self, data: &[T], to_row: impl Fn(&T) -> R) -> Result<String, CliError>
    where
        T: serde::Serialize,
        R: Tabled,
    {
        match self.format {
            OutputFormat::Table => {
                let rows: Vec<R> = data.iter().map(to_row).collect();
                Ok(render_table(&rows))
            }
            OutputFormat::Json => render_json(data),
        }
    }

    /// Render one item: `detail_fn` text, or the item as JSON.
    pub fn single<T>(&self, data: &T, detail_fn: impl Fn(&T) -> String) -> Result<String, CliError>
    where
        T: serde::Serialize + ?Sized,
    {
        match self.format {
            OutputFormat::Table => Ok(detail_fn(data)),
            OutputFormat::Json => render_json(data),
        }
    }

    /// Print to stdout, respecting quiet mode.
    pub fn print(&self, output: &str) {
        print_output(output, self.quiet);
    }

    /// Status word, colored by severity.
    pub fn status(&self, status: SystemStatus) -> String {
        let text = status.to_string();
        if !self.color {
            return text;
        }
        match status {
            SystemStatus::Checking => text.yellow().to_string(),
            SystemStatus::Healthy => text.green().bold().to_string(),
            SystemStatus::Unhealthy => text.red().bold().to_string(),
        }
    }

    /// Dimmed secondary text.
    pub fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }

    /// Error text, in red.
    pub fn error(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_owned()
        }
    }
}

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON.
pub fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Age of `then` relative to `now`, the way the status bar shows it.
pub fn last_update_text(then: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(then) = then else {
        return "never updated".into();
    };
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        return "just now".into();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    then.format("%Y-%m-%d").to_string()
}

/// Percentage with one decimal.
pub fn percent(value: f64) -> String {
    format!("{value:.1}%")
}
