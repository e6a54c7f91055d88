use crate::HashMap;
use std::{
    fmt,
    sync::{LazyLock, Mutex},
};

/// An interned string.
///
/// Atoms are cheap to copy, hash and compare for equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom(u32);

impl Atom {
    pub fn to_str(self) -> &'static str {
        Interner::the()
            .lock()
            .unwrap_or_else(|error| error.into_inner())
            .get(self)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Interner::the()
            .lock()
            .unwrap_or_else(|error| error.into_inner())
            .intern_borrowed(value)
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Interner::the()
            .lock()
            .unwrap_or_else(|error| error.into_inner())
            .intern_owned(value)
    }
}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        self.to_str() == other
    }
}

impl PartialEq<&str> for Atom {
    fn eq(&self, other: &&str) -> bool {
        self.to_str() == *other
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

// Ordering impls for Atom would be a pitfall: comparison by index is fast but
// unintuitive, comparison by string is slow. Use `Atom::to_str` explicitly.

struct Interner {
    atoms: HashMap<&'static str, Atom>,
    strings: Vec<&'static str>,
}

impl Interner {
    fn the() -> &'static Mutex<Self> {
        static SELF: LazyLock<Mutex<Interner>> = LazyLock::new(|| Mutex::new(Interner::new()));

        &SELF
    }

    fn with(values: Vec<&'static str>) -> Self {
        Self {
            atoms: values
                .iter()
                .zip(0..)
                .map(|(&string, atom)| (string, Atom(atom)))
                .collect(),
            strings: values,
        }
    }

    fn intern_borrowed(&mut self, value: &str) -> Atom {
        if let Some(&atom) = self.atoms.get(value) {
            return atom;
        }

        self.insert(Box::leak(Box::from(value)))
    }

    fn intern_owned(&mut self, value: String) -> Atom {
        if let Some(&atom) = self.atoms.get(&*value) {
            return atom;
        }

        self.insert(String::leak(value))
    }

    fn insert(&mut self, value: &'static str) -> Atom {
        #[allow(clippy::cast_possible_truncation)]
        let atom = Atom(self.strings.len() as u32);
        self.strings.push(value);
        self.atoms.insert(value, atom);
        atom
    }

    fn get(&self, atom: Atom) -> &'static str {
        self.strings[atom.0 as usize]
    }
}

macro_rules! atoms {
    ($( $index:literal $atom:ident => $string:literal ),* $(,)?) => {
        impl Atom {
            $( pub const $atom: Self = Self($index); )*
        }

        impl Interner {
            fn new() -> Self {
                Self::with(vec![$( $string ),*])
            }
        }
    };
}

atoms! {
    0 MAIN => "main",
    1 SELF => "self",
    2 INIT => "__init__",
    3 DEL => "__del__",
    4 STR => "__str__",
    5 NEXT => "next",
    6 ERROR => "Error",
    7 GENERIC => "generic",
    8 RAISES => "raises",
    9 TEST => "test",
    10 TRAIT => "trait",
    11 ENUM => "enum",
    12 OPTIONAL => "optional",
    13 WEAK => "weak",
    14 ITERATOR => "iterator",
    15 STATE => "_state",
    16 NONE => "None",
    17 PRINT => "print",
    18 LEN => "len",
    19 RANGE => "range",
    20 ENUMERATE => "enumerate",
    21 ZIP => "zip",
    22 SLICE => "slice",
    23 REVERSED => "reversed",
    24 UNDERSCORE => "_",
}

#[cfg(test)]
mod test {
    use super::Atom;

    #[test]
    fn predefined_atoms_are_interned() {
        assert_eq!(Atom::from("main"), Atom::MAIN);
        assert_eq!(Atom::from("__init__".to_owned()), Atom::INIT);
        assert_eq!(Atom::REVERSED.to_str(), "reversed");
    }

    #[test]
    fn interning_is_idempotent() {
        let first = Atom::from("some_fresh_identifier");
        let second = Atom::from("some_fresh_identifier".to_owned());
        assert_eq!(first, second);
        assert_eq!(first.to_str(), "some_fresh_identifier");
    }
}
