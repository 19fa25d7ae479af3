//! Terminal output for the ares-research CLI.
//!
//! Every status line is `<marker> <message>`; with colors off the marker is a
//! bracketed tag so output stays greppable in CI logs.

use owo_colors::OwoColorize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Ok,
    Info,
    Warn,
    Error,
    Step,
    Skip,
}

impl Marker {
    fn tag(self) -> &'static str {
        match self {
            Marker::Ok => "[OK]",
            Marker::Info => "[INFO]",
            Marker::Warn => "[WARN]",
            Marker::Error => "[ERROR]",
            Marker::Step => "[STEP]",
            Marker::Skip => "[SKIPPED]",
        }
    }

    fn painted(self) -> String {
        match self {
            Marker::Ok => "✓".green().bold().to_string(),
            Marker::Info => "•".blue().to_string(),
            Marker::Warn => "⚠".yellow().bold().to_string(),
            Marker::Error => "✗".red().bold().to_string(),
            Marker::Step => "›".cyan().bold().to_string(),
            Marker::Skip => "○".yellow().to_string(),
        }
    }
}

/// Writes status lines, sections and streamed answers to the terminal
#[derive(Debug, Clone, Copy)]
pub struct Output {
    colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn is_colored(&self) -> bool {
        self.colored
    }

    fn status_line(&self, marker: Marker, message: &str) -> String {
        if self.colored {
            format!("  {} {}", marker.painted(), message)
        } else {
            format!("  {} {}", marker.tag(), message)
        }
    }

    fn status(&self, marker: Marker, message: &str) {
        let line = self.status_line(marker, message);
        if marker == Marker::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    pub fn success(&self, message: &str) {
        self.status(Marker::Ok, message);
    }

    pub fn info(&self, message: &str) {
        self.status(Marker::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.status(Marker::Warn, message);
    }

    /// Goes to stderr
    pub fn error(&self, message: &str) {
        self.status(Marker::Error, message);
    }

    /// Research stage notification, one per `8:` annotation
    pub fn stage(&self, label: &str) {
        self.status(Marker::Step, label);
    }

    /// One answer delta, flushed immediately so the reply appears as it streams
    pub fn token(&self, delta: &str) {
        print!("{}", delta);
        io::stdout().flush().ok();
    }

    /// A file written by `init`
    pub fn created(&self, kind: &str, path: &str) {
        self.status(Marker::Ok, &format!("{} {}", kind, path));
    }

    /// A file `init` left alone
    pub fn skipped(&self, path: &str, reason: &str) {
        self.status(Marker::Skip, &format!("{} ({})", path, reason));
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value);
        } else {
            println!("    {}: {}", key, value);
        }
    }

    pub fn list_item(&self, item: &str) {
        println!("    - {}", item);
    }

    /// Shell command the user is expected to run next
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    pub fn newline(&self) {
        println!();
    }
}
