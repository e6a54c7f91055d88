//! Styled terminal output for diagnostics.
//!
//! A [`Painter`] keeps a stack of active styles. Popping a style resets the terminal and
//! reapplies the styles still on the stack, so nested highlights compose.

use crate::SmallVec;
use std::{
    io::{self, BufWriter, StderrLock, Write},
    string::FromUtf8Error,
};
use supports_color::Stream;

pub use anstyle::{AnsiColor, Effects, Style};

/// Render into a string, e.g. to compare rendered diagnostics in tests.
pub fn paint_to_string(
    paint: impl FnOnce(&mut Painter) -> io::Result<()>,
    choice: ColorChoice,
) -> Result<String, FromUtf8Error> {
    let mut painter = Painter::new(Sink::Buffer(Vec::new()), choice.colorize(None));
    // an in-memory sink never fails
    let _ = paint(&mut painter);
    String::from_utf8(painter.into_buffer())
}

/// Render to standard error, flushing once the closure returns.
pub fn epaint(
    paint: impl FnOnce(&mut Painter) -> io::Result<()>,
    choice: ColorChoice,
) -> io::Result<()> {
    let sink = Sink::Stderr(BufWriter::new(io::stderr().lock()));
    let mut painter = Painter::new(sink, choice.colorize(Some(Stream::Stderr)));
    paint(&mut painter)?;
    painter.flush()
}

pub struct Painter {
    sink: Sink,
    enabled: bool,
    styles: SmallVec<Style, 3>,
}

impl Painter {
    fn new(sink: Sink, enabled: bool) -> Self {
        Self {
            sink,
            enabled,
            styles: SmallVec::new(),
        }
    }

    /// Push a style and apply it to everything written until the matching [`Self::unset`].
    pub fn set(&mut self, style: impl IntoStyle) -> io::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let style = style.into_style();
        self.styles.push(style);
        style.write_to(&mut self.sink)
    }

    /// Pop the innermost style.
    pub fn unset(&mut self) -> io::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if let Some(style) = self.styles.pop() {
            style.write_reset_to(&mut self.sink)?;
        }
        for style in &self.styles {
            style.write_to(&mut self.sink)?;
        }

        Ok(())
    }

    fn into_buffer(self) -> Vec<u8> {
        match self.sink {
            Sink::Buffer(buffer) => buffer,
            Sink::Stderr(_) => Vec::new(),
        }
    }
}

impl Write for Painter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.sink.write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

enum Sink {
    Stderr(BufWriter<StderrLock<'static>>),
    Buffer(Vec<u8>),
}

impl Write for Sink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stderr(stderr) => stderr.write(bytes),
            Self::Buffer(buffer) => buffer.write(bytes),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stderr(stderr) => stderr.flush(),
            Self::Buffer(_) => Ok(()),
        }
    }
}

/// The value of `--color`.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorChoice {
    /// Color if the stream is a terminal that supports it.
    #[default]
    Auto,
    Never,
    Always,
}

impl ColorChoice {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Never => "never",
            Self::Always => "always",
        }
    }

    fn colorize(self, stream: Option<Stream>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => stream
                .and_then(supports_color::on_cached)
                .is_some_and(|support| support.has_basic),
        }
    }
}

pub trait IntoStyle {
    fn into_style(self) -> Style;
}

impl IntoStyle for Style {
    fn into_style(self) -> Style {
        self
    }
}

impl IntoStyle for AnsiColor {
    fn into_style(self) -> Style {
        self.on_default()
    }
}

impl IntoStyle for Effects {
    fn into_style(self) -> Style {
        Style::new().effects(self)
    }
}

#[cfg(test)]
mod test {
    use super::{paint_to_string, AnsiColor, ColorChoice, Effects, Style};
    use std::io::Write;

    #[test]
    fn styles_are_dropped_without_color() {
        let text = paint_to_string(
            |painter| {
                painter.set(AnsiColor::Red)?;
                write!(painter, "error")?;
                painter.unset()
            },
            ColorChoice::Never,
        );

        assert_eq!(text.as_deref(), Ok("error"));
    }

    #[test]
    fn outer_style_is_reapplied_after_inner_one() {
        let text = paint_to_string(
            |painter| {
                painter.set(Effects::BOLD)?;
                painter.set(AnsiColor::Red)?;
                write!(painter, "x")?;
                painter.unset()?;
                write!(painter, "y")?;
                painter.unset()
            },
            ColorChoice::Always,
        );

        let bold = Style::new().effects(Effects::BOLD).render().to_string();
        let text = text.unwrap_or_default();
        assert!(text.ends_with(&format!("{bold}y\u{1b}[0m")));
    }
}
