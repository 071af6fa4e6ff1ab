use std::io::BufRead;
use std::mem;

use tracing::{debug, trace};

use crate::caseless::CaselessMap;
use crate::error::ParseError;
use crate::value::{Merge, SectionContent, SectionEntry, UnitFile, Value};

/// Transforms the finished body of a section before it is merged into the
/// parsed file; returning [`SectionEntry::Many`] forces a list even for a
/// single occurrence.
pub type SectionProcessor = Box<dyn Fn(SectionContent) -> SectionEntry>;

/// Transforms a value before it is stored. For multiline values the
/// processor runs once, on the fully accumulated value.
pub type KeyProcessor = Box<dyn Fn(Value) -> Value>;

/// Section processors keyed by section name (caseless).
pub type SectionProcessors = CaselessMap<SectionProcessor>;

/// Key processors keyed by `"Key"`, or `"Section.Key"` to target one section
/// only; the qualified form wins when both are registered (caseless).
pub type KeyProcessors = CaselessMap<KeyProcessor>;

/// Parses unit-file text from an iterator of lines.
///
/// The input is consumed strictly once, front to back; the first malformed
/// line aborts the parse. See the crate docs for the accepted syntax.
pub fn parse<I>(
    lines: I,
    sections: &SectionProcessors,
    keys: &KeyProcessors,
) -> Result<UnitFile, ParseError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut parser = Parser::new(sections, keys);
    for (number, line) in lines.into_iter().enumerate() {
        parser.feed(number, line.as_ref())?;
    }
    Ok(parser.finish())
}

/// Parses unit-file text from a buffered reader. Read failures surface as
/// [`ParseError::Read`].
pub fn from_reader<R>(
    reader: R,
    sections: &SectionProcessors,
    keys: &KeyProcessors,
) -> Result<UnitFile, ParseError>
where
    R: BufRead,
{
    let mut parser = Parser::new(sections, keys);
    for (number, line) in reader.lines().enumerate() {
        parser.feed(number, &line?)?;
    }
    Ok(parser.finish())
}

/// Where the machine stands between lines.
#[derive(Debug)]
enum State {
    /// Nothing but comments and blank lines seen so far.
    AwaitingSection,
    /// Collecting keys for the named section.
    InSection { section: String },
    /// The value for `key` ended with the continuation marker and is still
    /// accumulating fragments.
    InContinuation { section: String, key: String },
}

struct Parser<'p> {
    state: State,
    content: SectionContent,
    structure: UnitFile,
    sections: &'p SectionProcessors,
    keys: &'p KeyProcessors,
}

impl<'p> Parser<'p> {
    fn new(sections: &'p SectionProcessors, keys: &'p KeyProcessors) -> Self {
        Self {
            state: State::AwaitingSection,
            content: SectionContent::new(),
            structure: UnitFile::new(),
            sections,
            keys,
        }
    }

    /// Advances the machine by one physical line. `number` is the 0-based
    /// line index, which is what the error variants report.
    fn feed(&mut self, number: usize, raw: &str) -> Result<(), ParseError> {
        let line = raw.trim();
        match classify(line) {
            // Comments never touch the state, which is how one can sit in
            // the middle of a multiline value without ending it.
            LineKind::Comment => Ok(()),
            LineKind::Section(name) => {
                if matches!(self.state, State::InContinuation { .. }) {
                    return Err(ParseError::IncompleteMultiline { line: number - 1 });
                }
                self.open_section(name);
                Ok(())
            }
            LineKind::KeyValue { key, value } => match self.state {
                State::InContinuation { .. } => {
                    Err(ParseError::IncompleteMultiline { line: number - 1 })
                }
                State::AwaitingSection => Err(ParseError::SectionlessKey { line: number }),
                State::InSection { .. } => {
                    self.store_value(key, value);
                    Ok(())
                }
            },
            LineKind::Other(text) => {
                if matches!(self.state, State::InContinuation { .. }) {
                    self.extend_value(text);
                    Ok(())
                } else if text.is_empty() {
                    Ok(())
                } else {
                    Err(ParseError::Syntax {
                        text: text.to_owned(),
                        line: number,
                    })
                }
            }
        }
    }

    /// End of input. A still-open continuation is finalized as if its last
    /// fragment had ended normally, then the open section is flushed.
    fn finish(mut self) -> UnitFile {
        if let State::InContinuation { key, .. } = &self.state {
            let key = key.clone();
            self.apply_deferred(&key);
        }
        let state = mem::replace(&mut self.state, State::AwaitingSection);
        if let State::InSection { section } | State::InContinuation { section, .. } = state {
            let content = mem::take(&mut self.content);
            self.flush_section(section, content);
        }
        self.structure
    }

    /// Finalizes the open section, if any, and starts collecting `name`.
    fn open_section(&mut self, name: &str) {
        trace!(section = name, "section header");
        let previous = mem::replace(
            &mut self.state,
            State::InSection {
                section: name.to_owned(),
            },
        );
        if let State::InSection { section } = previous {
            let content = mem::take(&mut self.content);
            self.flush_section(section, content);
        }
    }

    /// Runs the section processor and merges the finished body into the
    /// structure. Sections that never collected a key are dropped.
    fn flush_section(&mut self, section: String, content: SectionContent) {
        if content.is_empty() {
            return;
        }
        debug!(section = %section, keys = content.len(), "section finished");
        let entry = match self.sections.get(&section) {
            Some(processor) => processor(content),
            None => SectionEntry::One(content),
        };
        set_value(&mut self.structure, &section, entry, false);
    }

    /// Stores the value of a `Key=Value` line. A value ending in the
    /// continuation marker is stored as-is and its processor deferred until
    /// the last fragment arrives.
    fn store_value(&mut self, key: &str, raw: &str) {
        let (partial, continued) = split_continuation(raw);
        let mut value = Value::Text(partial.to_owned());
        if !continued && let Some(processor) = self.key_processor(key) {
            value = processor(value);
        }
        set_value(&mut self.content, key, value, continued);
        if continued {
            let State::InSection { section } =
                mem::replace(&mut self.state, State::AwaitingSection)
            else {
                unreachable!("checked by feed");
            };
            self.state = State::InContinuation {
                section,
                key: key.to_owned(),
            };
        }
    }

    /// The whole trimmed line is the next fragment of the open multiline
    /// value. Fragments concatenate with no separator; callers wanting one
    /// must leave it inside each physical line.
    fn extend_value(&mut self, fragment: &str) {
        let (partial, continued) = split_continuation(fragment);
        let State::InContinuation { key, .. } = &self.state else {
            unreachable!("checked by feed");
        };
        let key = key.clone();
        set_value(&mut self.content, &key, Value::Text(partial.to_owned()), true);
        if !continued {
            self.apply_deferred(&key);
            let State::InContinuation { section, .. } =
                mem::replace(&mut self.state, State::AwaitingSection)
            else {
                unreachable!("state cannot have changed");
            };
            self.state = State::InSection { section };
        }
    }

    /// A continuation finished: the processor that was deferred while
    /// fragments accumulated now runs on the whole stored value.
    fn apply_deferred(&mut self, key: &str) {
        let Some(processor) = self.key_processor(key) else {
            return;
        };
        if let Some(slot) = self.content.slot_mut(key) {
            let value = mem::replace(slot, Value::Text(String::new()));
            *slot = processor(value);
        }
    }

    /// Resolves `Section.Key` before the bare `Key` form.
    fn key_processor(&self, key: &str) -> Option<&'p KeyProcessor> {
        let (State::InSection { section } | State::InContinuation { section, .. }) = &self.state
        else {
            return None;
        };
        self.keys
            .get(&format!("{section}.{key}"))
            .or_else(|| self.keys.get(key))
    }
}

/// Stores `value` under `key`, combining with an occupied slot per the
/// duplicate rule: plain text concatenates when `concat` is set, anything
/// else promotes the slot to a list and appends.
// TODO: an empty assignment should reset the slot instead, as systemd does.
fn set_value<V: Merge>(map: &mut CaselessMap<V>, key: &str, value: V, concat: bool) {
    map.insert_or_merge(key, value, |existing, incoming| {
        existing.merge(incoming, concat);
    });
}

/// One whitespace-trimmed line, classified by the grammar. `Other` covers
/// blank lines, continuation fragments, and syntax errors; which of those it
/// is depends on the machine state.
enum LineKind<'l> {
    Comment,
    Section(&'l str),
    KeyValue { key: &'l str, value: &'l str },
    Other(&'l str),
}

fn classify(line: &str) -> LineKind<'_> {
    if line.starts_with(['#', ';']) {
        return LineKind::Comment;
    }
    if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']'))
        && !name.is_empty()
    {
        return LineKind::Section(name);
    }
    if let Some((key, value)) = split_key_value(line) {
        return LineKind::KeyValue { key, value };
    }
    LineKind::Other(line)
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim_end();
    if key.is_empty() || !key.chars().all(is_key_char) {
        return None;
    }
    Some((key, value.trim_start()))
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Splits the continuation marker off a trimmed value, reporting whether the
/// value carries on to the next line.
fn split_continuation(value: &str) -> (&str, bool) {
    match value.strip_suffix('\\') {
        Some(partial) => (partial, true),
        None => (value, false),
    }
}
