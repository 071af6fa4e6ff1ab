use std::io::{self, Write};

use crate::value::{UnitFile, Value};

/// Writes `config` back out as unit-file text, returning the number of bytes
/// written.
///
/// Each section body becomes a `[Name]` header, one `key = value` line per
/// value (lists get one line per element), and a trailing blank line. Values
/// are emitted verbatim: no escaping, no quoting, no wrapping of long lines.
/// Output already handed to the sink stays there if a write fails; callers
/// needing atomicity should buffer.
pub fn dump<W: Write>(sink: &mut W, config: &UnitFile) -> io::Result<usize> {
    let mut written = 0;
    for (section, entry) in config.iter() {
        for content in entry.iter() {
            written += write_chunk(sink, &format!("[{section}]\n"))?;
            for (key, value) in content.iter() {
                match value {
                    Value::List(items) => {
                        for item in items {
                            written += write_chunk(sink, &format!("{key} = {item}\n"))?;
                        }
                    }
                    single => written += write_chunk(sink, &format!("{key} = {single}\n"))?,
                }
            }
            written += write_chunk(sink, "\n")?;
        }
    }
    Ok(written)
}

fn write_chunk<W: Write>(sink: &mut W, chunk: &str) -> io::Result<usize> {
    sink.write_all(chunk.as_bytes())?;
    Ok(chunk.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{KeyProcessors, SectionProcessors, parse};

    fn parse_text(text: &str) -> UnitFile {
        parse(text.lines(), &SectionProcessors::new(), &KeyProcessors::new())
            .expect("failed to parse unit text")
    }

    fn dump_to_string(config: &UnitFile) -> (String, usize) {
        let mut buffer = Vec::new();
        let written = dump(&mut buffer, config).expect("failed to write to a Vec");
        (String::from_utf8(buffer).expect("wrote invalid UTF-8"), written)
    }

    #[test]
    fn writes_sections_with_trailing_blank_lines() {
        let config = parse_text(
            "[Unit]\n\
             Description=demo\n\
             [Install]\n\
             WantedBy=multi-user.target\n",
        );

        let (text, written) = dump_to_string(&config);
        assert_eq!(
            text,
            "[Unit]\nDescription = demo\n\n[Install]\nWantedBy = multi-user.target\n\n"
        );
        assert_eq!(written, text.len());
    }

    #[test]
    fn lists_write_one_line_per_element() {
        let config = parse_text(
            "[Network]\n\
             Address=10.0.0.1\n\
             Address=10.0.0.2\n",
        );

        let (text, _) = dump_to_string(&config);
        assert_eq!(
            text,
            "[Network]\nAddress = 10.0.0.1\nAddress = 10.0.0.2\n\n"
        );
    }

    #[test]
    fn duplicate_sections_write_separate_blocks() {
        let config = parse_text(
            "[Peer]\n\
             Endpoint=one\n\
             [Peer]\n\
             Endpoint=two\n",
        );

        let (text, _) = dump_to_string(&config);
        assert_eq!(
            text,
            "[Peer]\nEndpoint = one\n\n[Peer]\nEndpoint = two\n\n"
        );
    }

    #[test]
    fn round_trips_scalar_structures() {
        let original = parse_text(
            "[Unit]\n\
             Description=a demo\n\
             After=network.target\n\
             \n\
             [Service]\n\
             ExecStart=/bin/true\n",
        );

        let (text, _) = dump_to_string(&original);
        let reparsed = parse_text(&text);
        assert_eq!(reparsed, original);
    }
}
