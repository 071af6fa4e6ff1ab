use std::fmt;

use indexmap::IndexMap;
use indexmap::map::{Entry, IntoValues, Values};

/// Normalized form used for key comparison.
fn casefold(key: &str) -> String {
    key.to_lowercase()
}

/// An insertion-ordered map with caseless keys.
///
/// Lookup and membership tests compare keys casefolded, while iteration hands
/// back the spelling the caller actually wrote. Overwriting a key keeps its
/// slot where it was but adopts the new spelling:
///
/// ```
/// use unitfile::CaselessMap;
///
/// let mut map = CaselessMap::new();
/// map.insert("Accept", 1);
/// map.insert("aCCEPT", 2);
/// assert_eq!(map.get("accept"), Some(&2));
/// assert_eq!(map.keys().collect::<Vec<_>>(), vec!["aCCEPT"]);
/// ```
///
/// Two maps are equal when their casefolded key/value pairs are equal; the
/// stored spellings play no part in the comparison. Constructing a map from
/// pairs whose keys casefold to the same string keeps only the last pair.
#[derive(Clone)]
pub struct CaselessMap<V> {
    entries: IndexMap<String, (String, V)>,
}

impl<V> CaselessMap<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Stores `value` under the casefolded key, returning the value it
    /// replaced. A replaced slot keeps its position but takes on `key`'s
    /// spelling.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        let folded = casefold(&key);
        self.entries.insert(folded, (key, value)).map(|(_, old)| old)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(&casefold(key)).map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(&casefold(key)).map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&casefold(key))
    }

    /// Removes the slot for `key`, preserving the order of the remaining
    /// entries.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries
            .shift_remove(&casefold(key))
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(spelling, value)` pairs in slot-insertion order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.entries.values(),
        }
    }

    /// Iterates the stored spellings in slot-insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(key, _)| key.as_str())
    }

    /// Like [`CaselessMap::get_mut`], but also adopts `key`'s spelling, the
    /// way a plain insert would.
    pub(crate) fn slot_mut(&mut self, key: &str) -> Option<&mut V> {
        let (display, value) = self.entries.get_mut(&casefold(key))?;
        if display != key {
            *display = key.to_owned();
        }
        Some(value)
    }

    /// Inserts `value`, or hands it to `merge` together with the value
    /// already stored under `key`. Either way the slot ends up with `key`'s
    /// spelling.
    pub(crate) fn insert_or_merge(&mut self, key: &str, value: V, merge: impl FnOnce(&mut V, V)) {
        match self.entries.entry(casefold(key)) {
            Entry::Occupied(mut slot) => {
                let (display, existing) = slot.get_mut();
                if display != key {
                    *display = key.to_owned();
                }
                merge(existing, value);
            }
            Entry::Vacant(slot) => {
                slot.insert((key.to_owned(), value));
            }
        }
    }
}

impl<V> Default for CaselessMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: PartialEq> PartialEq for CaselessMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|(folded, (_, value))| {
                other
                    .entries
                    .get(folded)
                    .is_some_and(|(_, theirs)| value == theirs)
            })
    }
}

impl<V: fmt::Debug> fmt::Debug for CaselessMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for CaselessMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V> Extend<(K, V)> for CaselessMap<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<V> IntoIterator for CaselessMap<V> {
    type Item = (String, V);
    type IntoIter = IntoValues<String, (String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<'a, V> IntoIterator for &'a CaselessMap<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowed iterator over `(spelling, value)` pairs.
pub struct Iter<'a, V> {
    inner: Values<'a, String, (String, V)>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, value)| (key.as_str(), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case() {
        let mut map = CaselessMap::new();
        map.insert("Accept", "application/json");

        assert_eq!(map.get("accept"), Some(&"application/json"));
        assert_eq!(map.get("ACCEPT"), Some(&"application/json"));
        assert!(map.contains_key("aCcEpT"));
        assert_eq!(map.get("content-type"), None);
    }

    #[test]
    fn latest_spelling_wins() {
        let mut map = CaselessMap::new();
        map.insert("A", 1);
        map.insert("a", 2);

        assert_eq!(map.len(), 1);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("a", &2)]);
    }

    #[test]
    fn slot_order_survives_overwrites() {
        let mut map = CaselessMap::new();
        map.insert("first", 1);
        map.insert("second", 2);
        map.insert("FIRST", 10);

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["FIRST", "second"]);
        assert_eq!(map.get("first"), Some(&10));
    }

    #[test]
    fn equality_ignores_spelling_and_order() {
        let left: CaselessMap<i32> = [("Alpha", 1), ("Beta", 2)].into_iter().collect();
        let right: CaselessMap<i32> = [("beta", 2), ("ALPHA", 1)].into_iter().collect();

        assert_eq!(left, right);

        let different: CaselessMap<i32> = [("alpha", 1)].into_iter().collect();
        assert_ne!(left, different);
    }

    #[test]
    fn remove_accepts_any_spelling() {
        let mut map = CaselessMap::new();
        map.insert("Key", "value");

        assert_eq!(map.remove("KEY"), Some("value"));
        assert!(map.is_empty());
        assert_eq!(map.remove("key"), None);
    }
}
