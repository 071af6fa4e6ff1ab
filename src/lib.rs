#![warn(
    clippy::correctness,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::style,
    clippy::pedantic
)]

//! Parser and writer for systemd-style unit files: `[Section]` headers,
//! `Key=Value` lines, `#`/`;` comments, and backslash line continuations.
//!
//! <https://www.freedesktop.org/software/systemd/man/256/systemd.syntax.html>
//!
//! - leading and trailing whitespace on each line is ignored
//! - comments occupy a whole line; a `;` after a value belongs to the value
//! - comments may interrupt a multiline value without ending it
//! - fragments of a multiline value are joined with no separator
//! - repeated sections and repeated keys collect into lists, in file order
//! - section and key lookup is caseless; the spelling written last is kept
//!
//! Caller-supplied processors can reshape sections and values while the file
//! is parsed:
//!
//! ```
//! use unitfile::{KeyProcessors, SectionEntry, SectionProcessors, Value};
//!
//! let text = "\
//! [Interface]
//! ListenPort = 51820
//!
//! [Peer]
//! AllowedIPs = 10.0.0.0/24,10.1.0.0/24
//! ";
//!
//! let mut keys = KeyProcessors::new();
//! // Split AllowedIPs on commas.
//! keys.insert(
//!     "AllowedIPs",
//!     Box::new(|value: Value| match value {
//!         Value::Text(text) => Value::List(
//!             text.split(',').filter(|s| !s.is_empty()).map(Value::from).collect(),
//!         ),
//!         other => other,
//!     }),
//! );
//!
//! let config = unitfile::parse(text.lines(), &SectionProcessors::new(), &keys)
//!     .expect("failed to parse unit text");
//!
//! let Some(SectionEntry::One(peer)) = config.get("peer") else {
//!     unreachable!();
//! };
//! assert_eq!(
//!     peer.get("allowedips"),
//!     Some(&Value::List(vec![
//!         Value::from("10.0.0.0/24"),
//!         Value::from("10.1.0.0/24"),
//!     ]))
//! );
//! ```

mod caseless;
mod error;
mod parser;
mod value;
mod writer;

pub use crate::caseless::CaselessMap;
pub use crate::error::ParseError;
pub use crate::parser::{
    KeyProcessor, KeyProcessors, SectionProcessor, SectionProcessors, from_reader, parse,
};
pub use crate::value::{OpaqueValue, SectionContent, SectionEntry, UnitFile, Value};
pub use crate::writer::dump;
