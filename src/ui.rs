use std::io::{self, Write};

use owo_colors::OwoColorize;

/// Terminal output handle. Progress and diagnostics go to stderr, the
/// model's answer to stdout; `quiet` suppresses everything except the
/// answer and fatal errors.
#[derive(Debug, Clone, Copy)]
pub struct Ui {
    quiet: bool,
}

impl Ui {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Progress line (yellow, stderr).
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.bright_yellow());
        }
    }

    /// Completion line (green, stderr).
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.bright_green());
        }
    }

    /// Blank separator on stderr.
    pub fn blank(&self) {
        if !self.quiet {
            eprintln!();
        }
    }

    /// Model answer block (cyan, stdout).
    pub fn answer(&self, msg: &str) {
        println!("{}", answer_style(msg));
    }

    /// One streamed piece of the answer, same palette as [`Ui::answer`] but
    /// without a trailing newline. Flushed so partial lines show immediately.
    pub fn answer_fragment(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", answer_style(text))?;
        stdout.flush()
    }
}

fn answer_style(text: &str) -> String {
    text.bright_cyan().to_string()
}

/// Fatal error line (red, stderr). Never suppressed.
pub fn error(msg: &str) {
    eprintln!("{}", msg.bright_red());
}
