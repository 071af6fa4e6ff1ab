use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::slice;

use crate::caseless::CaselessMap;

/// The body of one section: keys mapped to their values.
pub type SectionContent = CaselessMap<Value>;

/// A parsed file: section names mapped to one body each, or to several when
/// the name occurred more than once.
pub type UnitFile = CaselessMap<SectionEntry>;

/// A value a key processor produced that the parser and writer carry through
/// without interpreting.
///
/// Blanket-implemented for every `'static` type that is `Debug + Display`,
/// so processors can return plain numbers, durations, and the like.
pub trait OpaqueValue: Any + fmt::Debug + fmt::Display {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + fmt::Display> OpaqueValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A stored value: raw text as parsed, a list collected from repeated keys
/// (or built by a processor), or whatever else a processor returned.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    List(Vec<Value>),
    Opaque(Rc<dyn OpaqueValue>),
}

impl Value {
    /// Wraps a processor result that is neither text nor a list.
    #[must_use]
    pub fn opaque(value: impl OpaqueValue) -> Self {
        Self::Opaque(Rc::new(value))
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrows the concrete type behind an opaque value.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(value) => value.as_ref().as_any().downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Opaque(value) => fmt::Display::fmt(value, f),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, f)?;
                }
                Ok(())
            }
        }
    }
}

// Opaque values compare by identity; the core never inspects them.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

/// What a section name maps to: one body, or every body that was written
/// under that name, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionEntry {
    One(SectionContent),
    Many(Vec<SectionContent>),
}

impl SectionEntry {
    /// Views the entry as a slice of bodies, whether it holds one or many.
    #[must_use]
    pub fn as_slice(&self) -> &[SectionContent] {
        match self {
            Self::One(content) => slice::from_ref(content),
            Self::Many(contents) => contents,
        }
    }

    pub fn iter(&self) -> slice::Iter<'_, SectionContent> {
        self.as_slice().iter()
    }
}

impl<'a> IntoIterator for &'a SectionEntry {
    type Item = &'a SectionContent;
    type IntoIter = slice::Iter<'a, SectionContent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Duplicate handling shared by keys within a section and sections within a
/// file: an occupied slot is promoted to a list and extended.
pub(crate) trait Merge {
    fn merge(&mut self, incoming: Self, concat: bool);
}

impl Merge for Value {
    fn merge(&mut self, incoming: Self, concat: bool) {
        if concat {
            if let (Self::Text(current), Self::Text(fragment)) = (&mut *self, &incoming) {
                current.push_str(fragment);
                return;
            }
        }
        if !matches!(self, Self::List(_)) {
            let previous = std::mem::replace(self, Self::List(Vec::new()));
            if let Self::List(items) = self {
                items.push(previous);
            }
        }
        if let Self::List(items) = self {
            match incoming {
                Self::List(more) => items.extend(more),
                single => items.push(single),
            }
        }
    }
}

impl Merge for SectionEntry {
    fn merge(&mut self, incoming: Self, _concat: bool) {
        if matches!(self, Self::One(_)) {
            let previous = std::mem::replace(self, Self::Many(Vec::new()));
            if let (Self::Many(list), Self::One(content)) = (&mut *self, previous) {
                list.push(content);
            }
        }
        if let Self::Many(list) = self {
            match incoming {
                Self::One(content) => list.push(content),
                Self::Many(contents) => list.extend(contents),
            }
        }
    }
}
