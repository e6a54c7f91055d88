use super::{ByteIndex, Span, Spanning};
use std::{fmt, ops::Range, path::PathBuf};
use unicode_width::UnicodeWidthStr;

#[cfg(test)]
mod test;

/// A mapping from [index](SourceFileIndex) to [source file](SourceFile).
///
/// The source files are laid out next to each other and padded on their left by one byte to
/// reserve space for _end of input_ pseudo tokens. Additionally, this frees up the byte index `0`
/// and allows `Span::default()` to be interpreted as an _unknown location_.
///
/// ```text
/// | |  f0  | |  f1  | ...
///  ^ ^      ^ ^
///  | |      | source file f1
///  | |      padding
///  | source file f0
///  padding, unknown location
/// ```
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    fn next_offset(&self) -> ByteIndex {
        const PADDING: u32 = 1;

        self.files
            .last()
            .map(|file| file.span.end())
            .unwrap_or_default()
            + PADDING
    }

    /// Add text to the map creating a [`SourceFile`] in the process.
    pub fn add(&mut self, name: impl Into<FileName>, content: String) -> SourceFileIndex {
        let index = SourceFileIndex(self.files.len());
        let file = SourceFile::new(name, content, self.next_offset());
        self.files.push(file);
        index
    }

    pub fn add_str(&mut self, name: impl Into<FileName>, content: &str) -> SourceFileIndex {
        self.add(name, content.to_owned())
    }

    /// The file the given span points into, if the span is known.
    pub fn file(&self, span: Span) -> Option<&SourceFile> {
        if span.is_unknown() {
            return None;
        }

        let index = self
            .files
            .partition_point(|file| file.span.end() < span.start());
        self.files
            .get(index)
            .filter(|file| file.span.contains(span.start()))
    }

    /// Resolve a span to the string content it points to.
    pub fn snippet(&self, span: Span) -> Option<&str> {
        let file = self.file(span)?;
        Some(&file.content[file.local_range(span)])
    }

    /// Resolve the start of a span to a one-based line and a zero-based column.
    ///
    /// The column is a byte offset into the line.
    pub fn location(&self, span: Span) -> Option<Location> {
        let file = self.file(span)?;
        let offset = file.local_offset(span.start());
        let prefix = &file.content[..offset];

        let line = prefix.matches('\n').count() + 1;
        let line_start = prefix.rfind('\n').map_or(0, |index| index + 1);

        Some(Location {
            file: file.name.clone(),
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column: u32::try_from(offset - line_start).unwrap_or(u32::MAX),
        })
    }

    /// The line containing the start of the span together with the extent of the highlight.
    ///
    /// Highlights spanning multiple lines are cut off at the end of the first line.
    pub fn line_with_highlight(&self, span: Span) -> Option<LineWithHighlight<'_>> {
        let file = self.file(span)?;
        let location = self.location(span)?;
        let start = file.local_offset(span.start());
        let end = file.local_offset(span.end());

        let line_start = start - location.column as usize;
        let line_end = file.content[start..]
            .find('\n')
            .map_or(file.content.len(), |index| start + index);
        let end = end.min(line_end);

        let prefix = &file.content[line_start..start];
        let highlight = &file.content[start..end];

        Some(LineWithHighlight {
            number: location.line,
            content: &file.content[line_start..line_end],
            prefix_width: prefix.width(),
            width: highlight.width().max(1),
        })
    }
}

impl std::ops::Index<SourceFileIndex> for SourceMap {
    type Output = SourceFile;

    fn index(&self, index: SourceFileIndex) -> &Self::Output {
        &self.files[index.0]
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct SourceFileIndex(usize);

/// A resolved source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: FileName,
    /// One-based line number.
    pub line: u32,
    /// Zero-based byte offset into the line.
    pub column: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub struct LineWithHighlight<'a> {
    /// One-based line number.
    pub number: u32,
    /// The content of the entire line that contains the start of the highlight.
    pub content: &'a str,
    pub prefix_width: usize,
    pub width: usize,
}

/// A source file.
///
/// Obtained by and contained within a [source map](SourceMap).
pub struct SourceFile {
    name: FileName,
    content: String,
    span: Span,
}

impl SourceFile {
    /// Create a new source file.
    ///
    /// The [byte index](ByteIndex) `start` locates the file in a [source map](SourceMap).
    fn new(name: impl Into<FileName>, content: String, start: ByteIndex) -> Self {
        Self {
            span: Span::with_length(start, u32::try_from(content.len()).unwrap_or(u32::MAX)),
            name: name.into(),
            content,
        }
    }

    pub fn name(&self) -> &FileName {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Map a file-local byte offset to a global byte index.
    pub fn global(&self, offset: usize) -> ByteIndex {
        self.span.start() + u32::try_from(offset).unwrap_or(u32::MAX)
    }

    /// Map a global byte index to a file-local byte offset.
    pub fn local_offset(&self, index: ByteIndex) -> usize {
        (index.value() - self.span.start().value()) as usize
    }

    fn local_range(&self, span: Span) -> Range<usize> {
        self.local_offset(span.start())..self.local_offset(span.end())
    }
}

impl Spanning for SourceFile {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum FileName {
    Anonymous,
    Path(PathBuf),
    Module(String),
}

impl From<PathBuf> for FileName {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&str> for FileName {
    fn from(name: &str) -> Self {
        Self::Module(name.to_owned())
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("<anonymous>"),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Module(name) => f.write_str(name),
        }
    }
}
