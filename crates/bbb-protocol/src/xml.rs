//! XML⇄map codec.
//!
//! Decoding turns a response document into nested [`Value`]s:
//!
//! - an element holding only text becomes a [`Value::Str`], never a number
//!   or flag;
//! - sibling elements sharing a name become a [`Value::List`] in document
//!   order;
//! - attributes become map entries, with the element text under `content`;
//! - empty (or whitespace-only) elements become an empty [`Value::Map`].
//!
//! Encoding is the reverse for outgoing payloads: scalar entries become
//! attributes, `content` becomes the element text, maps and lists become
//! child elements.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use bbb_core::{ResponseMap, Value};

use crate::error::XmlError;

/// Key holding the text of an element that also has attributes or children.
pub const CONTENT_KEY: &str = "content";

/// A decoded document: the root element's name and its decoded value.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Name of the top-level element (e.g. `response`).
    pub root: String,
    /// Decoded content of the top-level element.
    pub body: Value,
}

impl Document {
    /// Consumes the document, returning the root's fields.
    ///
    /// Returns `None` when the root holds plain text instead of fields.
    pub fn into_map(self) -> Option<ResponseMap> {
        match self.body {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

/// An element being decoded.
struct Frame {
    name: String,
    attributes: Vec<(String, String)>,
    children: ResponseMap,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::Malformed(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| XmlError::Malformed(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: ResponseMap::new(),
            text: String::new(),
        })
    }

    /// Adds a decoded child, turning repeated names into a list.
    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, Value::Null);
                *existing = Value::List(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn into_value(self) -> Value {
        let has_text = !self.text.trim().is_empty();

        if self.attributes.is_empty() && self.children.is_empty() {
            return if has_text {
                Value::Str(self.text)
            } else {
                Value::Map(ResponseMap::new())
            };
        }

        let mixed = !self.children.is_empty();
        let mut map = ResponseMap::new();
        for (key, value) in self.attributes {
            map.insert(key, value);
        }
        for (key, value) in self.children {
            map.insert(key, value);
        }
        if has_text {
            let text = if mixed {
                self.text.trim().to_string()
            } else {
                self.text
            };
            map.insert(CONTENT_KEY, text);
        }
        Value::Map(map)
    }
}

/// Decodes an XML document.
///
/// # Errors
///
/// Returns an [`XmlError`] if the input is not a single well-formed element.
pub fn decode(xml: &str) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Frame> = Vec::new();
    let mut document: Option<Document> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::Malformed(format!("{} (at byte {})", e, reader.buffer_position())))?;

        match event {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let frame = Frame::open(&start)?;
                close(frame, &mut stack, &mut document)?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| XmlError::Malformed("unmatched closing tag".to_string()))?;
                close(frame, &mut stack, &mut document)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlError::Malformed(e.to_string()))?;
                match stack.last_mut() {
                    Some(frame) => frame.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(XmlError::Malformed(
                            "text outside of the root element".to_string(),
                        ));
                    }
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Unclosed(open.name.clone()));
    }
    document.ok_or(XmlError::MissingRoot)
}

fn close(
    frame: Frame,
    stack: &mut [Frame],
    document: &mut Option<Document>,
) -> Result<(), XmlError> {
    let name = frame.name.clone();
    let value = frame.into_value();
    match stack.last_mut() {
        Some(parent) => parent.add_child(name, value),
        None if document.is_some() => return Err(XmlError::MultipleRoots(name)),
        None => {
            *document = Some(Document {
                root: name,
                body: value,
            })
        }
    }
    Ok(())
}

/// Encodes a map as an XML document rooted at `root`.
///
/// Scalar entries are written as attributes in insertion order, the
/// `content` entry as text, nested maps as child elements and lists as
/// repeated child elements. `Null` entries are skipped.
///
/// # Errors
///
/// Returns [`XmlError::Write`] if serialization fails.
pub fn encode(root: &str, body: &ResponseMap) -> Result<String, XmlError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;
    write_element(&mut writer, root, body)?;
    String::from_utf8(writer.into_inner()).map_err(write_error)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    map: &ResponseMap,
) -> Result<(), XmlError> {
    let mut start = BytesStart::new(name);
    let mut text: Option<String> = None;
    let mut children: Vec<(&str, &Value)> = Vec::new();

    for (key, value) in map.iter() {
        match value {
            Value::Map(_) | Value::List(_) => children.push((key, value)),
            Value::Null => {}
            _ if key == CONTENT_KEY => text = Some(value.to_string()),
            scalar => start.push_attribute((key, scalar.to_string().as_str())),
        }
    }

    if text.is_none() && children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(&text)))
            .map_err(write_error)?;
    }
    for (key, value) in children {
        write_child(writer, key, value)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_error)
}

fn write_child(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), XmlError> {
    match value {
        Value::Map(map) => write_element(writer, name, map),
        Value::List(items) => {
            for item in items {
                write_child(writer, name, item)?;
            }
            Ok(())
        }
        Value::Null => Ok(()),
        scalar => {
            let text = scalar.to_string();
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(write_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(write_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_error)
        }
    }
}

fn write_error(e: impl std::fmt::Display) -> XmlError {
    XmlError::Write(e.to_string())
}
