//! Rendering compile errors together with the offending source line.
//!
//! ```text
//! error: integer literal out of range for 'u8'
//!  --> src/lib.mys:2:12
//!   |
//! 2 |     return 256
//!   |            ^^^
//! ```

use diagnostics::CompileError;
use span::LineWithHighlight;
use std::io::{self, Write};
use utility::paint::{AnsiColor, Effects, Painter, Style};

const ACCENT: Style = AnsiColor::Red.on_default().effects(Effects::BOLD);

/// Render the error, highlighting the given line if the location of the error is known.
pub(crate) fn render(
    error: &CompileError,
    path: &str,
    line: Option<LineWithHighlight<'_>>,
    painter: &mut Painter,
) -> io::Result<()> {
    painter.set(ACCENT)?;
    write!(painter, "{}", if error.is_internal() { "internal error" } else { "error" })?;
    painter.unset()?;
    painter.set(Effects::BOLD)?;
    writeln!(painter, ": {}", error.message)?;
    painter.unset()?;

    let number = line.as_ref().map_or(error.line, |line| line.number);
    let padding = " ".repeat(number.max(1).to_string().len());
    let bar = |painter: &mut Painter| -> io::Result<()> {
        painter.set(AnsiColor::Blue)?;
        write!(painter, "{padding} |")?;
        painter.unset()
    };

    painter.set(AnsiColor::Blue)?;
    write!(painter, "{padding}--> ")?;
    painter.unset()?;
    match &line {
        Some(_) => writeln!(painter, "{path}:{}:{}", error.line, error.column + 1)?,
        None => writeln!(painter, "{path}")?,
    }

    if let Some(line) = line {
        bar(painter)?;
        writeln!(painter)?;
        painter.set(AnsiColor::Blue)?;
        write!(painter, "{} |", line.number)?;
        painter.unset()?;
        writeln!(painter, " {}", line.content)?;
        bar(painter)?;
        write!(painter, " {}", " ".repeat(line.prefix_width))?;
        painter.set(ACCENT)?;
        writeln!(painter, "{}", "^".repeat(line.width))?;
        painter.unset()?;
    }

    for note in &error.notes {
        bar(painter)?;
        writeln!(painter)?;
        painter.set(AnsiColor::Blue)?;
        write!(painter, "{padding} = ")?;
        painter.unset()?;
        painter.set(Effects::BOLD)?;
        write!(painter, "note")?;
        painter.unset()?;
        writeln!(painter, ": {note}")?;
    }

    Ok(())
}
