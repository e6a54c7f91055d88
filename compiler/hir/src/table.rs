use std::fmt;
use utility::{Atom, HashMap};

/// A map from names to values that remembers the insertion order.
///
/// Declaration order matters for emitted code (e.g. the parameters of synthesized constructors).
#[derive(Clone, PartialEq, Eq)]
pub struct Table<V> {
    entries: Vec<(Atom, V)>,
    indices: HashMap<Atom, usize>,
}

impl<V> Table<V> {
    pub fn get(&self, name: Atom) -> Option<&V> {
        self.indices.get(&name).map(|&index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, name: Atom) -> Option<&mut V> {
        self.indices
            .get(&name)
            .map(|&index| &mut self.entries[index].1)
    }

    pub fn contains(&self, name: Atom) -> bool {
        self.indices.contains_key(&name)
    }

    /// Insert a value returning the previous one if the name was already present.
    ///
    /// The position of an existing entry is retained.
    pub fn insert(&mut self, name: Atom, value: V) -> Option<V> {
        match self.indices.get(&name) {
            Some(&index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.indices.insert(name, self.entries.len());
                self.entries.push((name, value));
                None
            }
        }
    }

    /// The value under the given name, inserting the default if absent.
    pub fn entry(&mut self, name: Atom) -> &mut V
    where
        V: Default,
    {
        let index = match self.indices.get(&name) {
            Some(&index) => index,
            None => {
                self.insert(name, V::default());
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Atom, &V)> {
        self.entries.iter().map(|(name, value)| (*name, value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Atom, &mut V)> {
        self.entries.iter_mut().map(|(name, value)| (*name, value))
    }

    pub fn names(&self) -> impl Iterator<Item = Atom> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            indices: HashMap::default(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Table<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V> FromIterator<(Atom, V)> for Table<V> {
    fn from_iter<I: IntoIterator<Item = (Atom, V)>>(iter: I) -> Self {
        let mut table = Self::default();
        for (name, value) in iter {
            table.insert(name, value);
        }
        table
    }
}
