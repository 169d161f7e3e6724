//! Case-insensitive identifiers.
//!
//! Pascal-family identifiers compare without regard to case. Every map keyed
//! by an identifier goes through [`CiMap`], which normalizes keys once on the
//! way in so dispatch code never compares strings ad hoc.

use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Lower-case `s` for use as a lookup key.
///
/// Borrows when the input is already folded, which is the common case for
/// keys produced by the engine itself.
#[inline]
pub fn fold_case(s: &str) -> Cow<'_, str> {
    if s.chars().any(char::is_uppercase) {
        Cow::Owned(s.to_lowercase())
    } else {
        Cow::Borrowed(s)
    }
}

/// An identifier that keeps its declared spelling but compares folded.
///
/// Cloning is cheap (two `Rc<str>` bumps).
#[derive(Clone)]
pub struct Name {
    text: Rc<str>,
    key: Rc<str>,
}

impl Name {
    pub fn new(text: &str) -> Self {
        let key: Rc<str> = match fold_case(text) {
            Cow::Borrowed(_) => Rc::from(text),
            Cow::Owned(folded) => Rc::from(folded),
        };
        Name {
            text: Rc::from(text),
            key,
        }
    }

    /// Declared spelling, used in messages and `ClassName`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Folded form used for comparisons and hashing.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Case-insensitive comparison against a plain string.
    #[inline]
    pub fn matches(&self, other: &str) -> bool {
        *self.key == *fold_case(other)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name::new(&s)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.text)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Insertion-ordered map with case-insensitive string keys.
///
/// Entries keep the spelling they were first inserted with. Iteration
/// follows insertion order, which is declaration order for fields and
/// members.
#[derive(Clone)]
pub struct CiMap<V> {
    index: FxHashMap<Rc<str>, usize>,
    entries: Vec<(Name, V)>,
}

impl<V> CiMap<V> {
    pub fn new() -> Self {
        CiMap {
            index: FxHashMap::default(),
            entries: Vec::new(),
        }
    }

    /// Insert or overwrite. Returns the previous value for the key.
    pub fn insert(&mut self, name: impl Into<Name>, value: V) -> Option<V> {
        let name = name.into();
        if let Some(&slot) = self.index.get(name.key()) {
            return Some(std::mem::replace(&mut self.entries[slot].1, value));
        }
        self.index.insert(Rc::clone(&name.key), self.entries.len());
        self.entries.push((name, value));
        None
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&V> {
        let slot = *self.index.get(&*fold_case(name))?;
        Some(&self.entries[slot].1)
    }

    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        let slot = *self.index.get(&*fold_case(name))?;
        Some(&mut self.entries[slot].1)
    }

    /// Look up the entry together with its declared spelling.
    pub fn get_entry(&self, name: &str) -> Option<(&Name, &V)> {
        let slot = *self.index.get(&*fold_case(name))?;
        let (k, v) = &self.entries[slot];
        Some((k, v))
    }

    #[inline]
    pub fn contains_key(&self, name: &str) -> bool {
        self.index.contains_key(&*fold_case(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Name, &mut V)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }
}

impl<V> Default for CiMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for CiMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: PartialEq> PartialEq for CiMap<V> {
    /// Same key set and equal values, regardless of insertion order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k.key()).is_some_and(|ov| ov == v))
    }
}

impl<N: Into<Name>, V> FromIterator<(N, V)> for CiMap<V> {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut map = CiMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V> IntoIterator for CiMap<V> {
    type Item = (Name, V);
    type IntoIter = std::vec::IntoIter<(Name, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests;
