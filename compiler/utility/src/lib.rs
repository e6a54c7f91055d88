//! Utility functionality and definitions.

use difference::{Changeset, Difference};
use std::fmt;

pub use atom::Atom;
pub use num_bigint::{BigInt as Int, Sign};
pub use num_traits::{ToPrimitive, Zero};
pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub mod atom;
pub mod paint;

pub const FILE_EXTENSION: &str = "mys";

pub type Str = std::borrow::Cow<'static, str>;

pub type SmallVec<T, const N: usize> = smallvec::SmallVec<[T; N]>;

#[macro_export]
macro_rules! obtain {
    ($expr:expr, $pat:pat $( if $guard:expr )? $(,)? => $mapping:expr $(,)?) => {
        match $expr {
            $pat $( if $guard )? => Some($mapping),
            _ => None
        }
    };
}

/// Use the singular or the plural form of the given word depending on the given amount.
///
/// # Examples
///
/// ```
/// # use utility::pluralize;
/// assert_eq!(pluralize!(1, "argument"), "argument");
/// assert_eq!(pluralize!(3, "argument"), "arguments");
/// ```
#[macro_export]
macro_rules! pluralize {
    ($amount:expr, $singular:literal $(,)?) => {
        match $amount {
            1 => $singular,
            _ => concat!($singular, "s"),
        }
    };
}

/// Whether the name is written in `snake_case`, optionally with one leading underscore.
pub fn is_snake_case(name: &str) -> bool {
    let name = name.strip_prefix('_').unwrap_or(name);
    let mut characters = name.chars();

    characters.next().is_some_and(|character| character.is_ascii_lowercase())
        && characters.all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        })
}

/// Whether the name is written in `UPPER_SNAKE_CASE`.
pub fn is_upper_snake_case(name: &str) -> bool {
    let mut characters = name.chars();

    characters.next().is_some_and(|character| character.is_ascii_uppercase())
        && characters.all(|character| {
            character.is_ascii_uppercase() || character.is_ascii_digit() || character == '_'
        })
}

/// Whether the name is written in `PascalCase`.
pub fn is_pascal_case(name: &str) -> bool {
    let mut characters = name.chars();

    characters.next().is_some_and(|character| character.is_ascii_uppercase())
        && characters.all(|character| character.is_ascii_alphanumeric())
}

/// Turn a `snake_case` name into `PascalCase`.
pub fn to_pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut characters = segment.chars();
            characters
                .next()
                .map(|first| first.to_ascii_uppercase().to_string() + characters.as_str())
                .unwrap_or_default()
        })
        .collect()
}

pub fn difference(original: &str, edit: &str, split: &str) -> String {
    use paint::{AnsiColor, ColorChoice, Style};
    use std::io::Write;

    paint::paint_to_string(
        |painter| {
            // the provided Display implementation for Changesets is unreadable when whitespace differs
            for difference in Changeset::new(original, edit, split).diffs {
                match difference {
                    Difference::Same(lines) => {
                        for line in lines.lines() {
                            writeln!(painter, "  {line}")?;
                        }
                    }
                    Difference::Add(lines) => {
                        for line in lines.lines().chain(lines.is_empty().then_some("")) {
                            painter.set(Style::new().bg_color(Some(AnsiColor::Green.into())))?;
                            write!(painter, "+")?;
                            painter.unset()?;
                            painter.set(AnsiColor::Green)?;
                            writeln!(painter, " {line}")?;
                            painter.unset()?;
                        }
                    }
                    Difference::Rem(lines) => {
                        for line in lines.lines().chain(lines.is_empty().then_some("")) {
                            painter.set(Style::new().bg_color(Some(AnsiColor::Red.into())))?;
                            write!(painter, "-")?;
                            painter.unset()?;
                            painter.set(AnsiColor::Red)?;
                            writeln!(painter, " {line}")?;
                            painter.unset()?;
                        }
                    }
                }
            }

            Ok(())
        },
        ColorChoice::Auto,
    )
    .unwrap_or_default()
}

pub trait ListingExt {
    fn list(self, conjunction: Conjunction) -> String;
}

impl<I> ListingExt for I
where
    I: Iterator + Clone,
    I::Item: fmt::Display,
{
    fn list(self, conjunction: Conjunction) -> String {
        let mut this = self.peekable();
        let mut first = true;
        let mut result = String::new();

        while let Some(item) = this.next() {
            if !first {
                if this.peek().is_some() {
                    result += ", ";
                } else {
                    use std::fmt::Write;
                    let _ = write!(result, " {conjunction} ");
                }
            }

            result += &item.to_string();
            first = false;
        }

        result
    }
}

#[derive(Clone, Copy)]
pub enum Conjunction {
    And,
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

pub trait QuoteExt {
    fn quote(&self) -> String;
}

impl<D: fmt::Display + ?Sized> QuoteExt for D {
    fn quote(&self) -> String {
        format!("'{self}'")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quoting_borrowed_and_owned_values() {
        let name = String::from("main");
        let borrowed = &name;

        assert_eq!(borrowed.quote(), "'main'");
        assert_eq!(name.quote(), "'main'");
        assert_eq!("module".quote(), "'module'");
    }

    #[test]
    fn difference_marks_removed_and_added_lines() {
        let difference = difference("same\nold\n", "same\nnew\n", "\n");

        assert!(difference.contains("  same"));
        assert!(difference.contains("- old"));
        assert!(difference.contains("+ new"));
    }

    #[test]
    fn listing_no_elements() {
        assert_eq!(std::iter::empty::<u8>().list(Conjunction::And), "");
    }

    #[test]
    fn listing_two_elements() {
        assert_eq!(
            [false, true].into_iter().list(Conjunction::And),
            "false and true"
        );
    }

    #[test]
    fn listing_three_elements() {
        assert_eq!([1, 2, 3].into_iter().list(Conjunction::Or), "1, 2 or 3");
    }

    #[test]
    fn naming_conventions() {
        assert!(is_snake_case("foo_bar2"));
        assert!(is_snake_case("_private"));
        assert!(!is_snake_case("fooBar"));
        assert!(!is_snake_case("__x"));
        assert!(!is_snake_case(""));
        assert!(is_upper_snake_case("MAX_VALUE"));
        assert!(!is_upper_snake_case("Max"));
        assert!(is_pascal_case("HttpServer2"));
        assert!(!is_pascal_case("Http_Server"));
        assert!(!is_pascal_case("httpServer"));
    }

    #[test]
    fn snake_to_pascal() {
        assert_eq!(to_pascal_case("count_down"), "CountDown");
        assert_eq!(to_pascal_case("_fib"), "Fib");
        assert_eq!(to_pascal_case("x"), "X");
    }
}
