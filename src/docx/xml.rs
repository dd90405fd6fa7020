use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sha2::{Digest, Sha256};

use crate::error::{Result, ReviewError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlEvent {
    Decl {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Empty {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text {
        text: String,
    },
    CData {
        text: String,
    },
    Comment {
        text: String,
    },
    PI {
        content: String,
    },
    DocType {
        text: String,
    },
}

/// Reads an XML part into a flat event list.
///
/// Text is unescaped, attribute values are kept exactly as they appear in the
/// source (still escaped) so that untouched attributes round-trip unchanged.
pub fn read_events(part: &str, xml_bytes: &[u8]) -> Result<Vec<XmlEvent>> {
    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(false);

    let mut events: Vec<XmlEvent> = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let ev = reader
            .read_event_into(&mut buf)
            .map_err(|e| ReviewError::xml(part, format!("at byte {}: {e}", reader.buffer_position())))?;
        match ev {
            Event::Eof => break,
            Event::Decl(d) => {
                let version = d
                    .version()
                    .map(bytes_to_string)
                    .map_err(|e| ReviewError::xml(part, e))?;
                let encoding = d.encoding().and_then(|r| r.ok()).map(bytes_to_string);
                let standalone = d.standalone().and_then(|r| r.ok()).map(bytes_to_string);
                events.push(XmlEvent::Decl {
                    version,
                    encoding,
                    standalone,
                });
            }
            Event::Start(s) => events.push(XmlEvent::Start {
                name: bytes_to_string(s.name().as_ref()),
                attrs: collect_attrs(part, &s)?,
            }),
            Event::End(e) => events.push(XmlEvent::End {
                name: bytes_to_string(e.name().as_ref()),
            }),
            Event::Empty(s) => events.push(XmlEvent::Empty {
                name: bytes_to_string(s.name().as_ref()),
                attrs: collect_attrs(part, &s)?,
            }),
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| ReviewError::xml(part, e))?
                    .into_owned();
                events.push(XmlEvent::Text { text });
            }
            Event::CData(t) => events.push(XmlEvent::CData {
                text: bytes_to_string(t.into_inner()),
            }),
            Event::Comment(t) => events.push(XmlEvent::Comment {
                text: bytes_to_string(t.into_inner()),
            }),
            Event::PI(t) => {
                let target = bytes_to_string(t.target());
                let content = bytes_to_string(t.content());
                events.push(XmlEvent::PI {
                    content: format!("{target}{content}"),
                });
            }
            Event::DocType(t) => events.push(XmlEvent::DocType {
                text: bytes_to_string(t.into_inner()),
            }),
        }
    }
    Ok(events)
}

fn collect_attrs(part: &str, s: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for a in s.attributes() {
        let a = a.map_err(|e| ReviewError::xml(part, e))?;
        // Raw bytes: character references such as `&#xD;` inside VML attributes must survive.
        attrs.push((bytes_to_string(a.key.as_ref()), bytes_to_string(a.value.as_ref())));
    }
    Ok(attrs)
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Unescapes a raw attribute value; falls back to the raw text on bad references.
pub fn unescape_attr(raw: &str) -> String {
    match quick_xml::escape::unescape(raw) {
        Ok(v) => v.into_owned(),
        Err(_) => raw.to_string(),
    }
}

pub fn write_events(events: &[XmlEvent]) -> Vec<u8> {
    let mut out = String::new();

    fn write_start_like(out: &mut String, name: &str, attrs: &[(String, String)], empty: bool) {
        out.push('<');
        out.push_str(name);
        // Attribute values are stored escaped already.
        for (k, v) in attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(v);
            out.push('"');
        }
        out.push_str(if empty { "/>" } else { ">" });
    }

    for ev in events {
        match ev {
            XmlEvent::Decl {
                version,
                encoding,
                standalone,
            } => {
                out.push_str("<?xml version=\"");
                out.push_str(version);
                out.push('"');
                if let Some(e) = encoding {
                    out.push_str(" encoding=\"");
                    out.push_str(e);
                    out.push('"');
                }
                if let Some(s) = standalone {
                    out.push_str(" standalone=\"");
                    out.push_str(s);
                    out.push('"');
                }
                out.push_str("?>");
            }
            XmlEvent::Start { name, attrs } => write_start_like(&mut out, name, attrs, false),
            XmlEvent::End { name } => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            XmlEvent::Empty { name, attrs } => write_start_like(&mut out, name, attrs, true),
            XmlEvent::Text { text } => out.push_str(&escape_text(text)),
            XmlEvent::CData { text } => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            XmlEvent::Comment { text } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            XmlEvent::PI { content } => {
                out.push_str("<?");
                out.push_str(content);
                out.push_str("?>");
            }
            XmlEvent::DocType { text } => {
                out.push_str("<!DOCTYPE");
                out.push_str(text);
                out.push('>');
            }
        }
    }
    out.into_bytes()
}

/// Hash of the event stream, insensitive to attribute order and to the
/// `<a></a>` versus `<a/>` spelling of an empty element.
pub fn event_hash(events: &[XmlEvent]) -> String {
    let mut hasher = Sha256::new();
    let mut pending_start = false;

    for ev in events {
        match ev {
            XmlEvent::Start { name, attrs } => {
                hash_start_like(&mut hasher, name, attrs);
                pending_start = true;
                continue;
            }
            XmlEvent::Empty { name, attrs } => {
                hash_start_like(&mut hasher, name, attrs);
                hash_end(&mut hasher, name);
            }
            XmlEvent::End { name } => hash_end(&mut hasher, name),
            XmlEvent::Text { text } => {
                if pending_start || !text.trim().is_empty() {
                    hasher.update(b"T:");
                    hasher.update(text.as_bytes());
                    hasher.update(b"\n");
                }
            }
            XmlEvent::Decl {
                version,
                encoding,
                standalone,
            } => {
                hasher.update(b"D:");
                hasher.update(version.as_bytes());
                hasher.update(b"|");
                hasher.update(encoding.as_deref().unwrap_or("").as_bytes());
                hasher.update(b"|");
                hasher.update(standalone.as_deref().unwrap_or("").as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::CData { text } => {
                hasher.update(b"C:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::Comment { text } => {
                hasher.update(b"M:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::PI { content } => {
                hasher.update(b"P:");
                hasher.update(content.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::DocType { text } => {
                hasher.update(b"Y:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
        }
        pending_start = false;
    }
    hex::encode(hasher.finalize())
}

fn hash_start_like(hasher: &mut Sha256, name: &str, attrs: &[(String, String)]) {
    hasher.update(b"S:");
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    let mut sorted: Vec<(String, String)> = attrs
        .iter()
        .map(|(k, v)| (k.clone(), unescape_attr(v)))
        .collect();
    sorted.sort();
    for (k, v) in sorted {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"\n");
}

fn hash_end(hasher: &mut Sha256, name: &str) {
    hasher.update(b"E:");
    hasher.update(name.as_bytes());
    hasher.update(b"\n");
}
