use std::io::Write;

use crossterm::cursor::MoveToColumn;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

/// The single status line. The controller is its only writer.
pub trait StatusDisplay {
    fn render(&mut self, message: &str);
}

/// Draws the status line on stdout, overwriting the previous one.
pub struct TerminalDisplay {
    out: std::io::Stdout,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusDisplay for TerminalDisplay {
    fn render(&mut self, message: &str) {
        let drawn = crossterm::queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(format!("> {message}"))
        )
        .and_then(|_| self.out.flush());
        if let Err(e) = drawn {
            log::warn!("Display write failed: {e}");
        }
    }
}

/// Prints each status line on its own line, for replays and piped output.
pub struct LineDisplay;

impl StatusDisplay for LineDisplay {
    fn render(&mut self, message: &str) {
        println!("{message}");
    }
}
