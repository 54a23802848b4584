//! Streaming XML events
//!
//! The WSDL parser consumes a flat sequence of start/end/text events. This
//! module produces that sequence from raw bytes with quick-xml. Names are
//! reported as written (`prefix:local`); namespace resolution is left to
//! the consumer.

use crate::error::ParseError;
use crate::limits::Limits;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A single parse event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Start tag (also emitted for empty elements, followed by `End`)
    Start {
        /// Raw tag name
        name: String,
        /// Raw attribute names and unescaped values, in document order
        attributes: Vec<(String, String)>,
        /// Byte offset of the tag
        position: usize,
    },
    /// End tag
    End {
        /// Raw tag name
        name: String,
    },
    /// Character data
    Text(String),
}

/// Iterator of [`XmlEvent`]s over an in-memory document
pub struct XmlEventReader<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    pending_end: Option<String>,
    depth: usize,
    limits: Limits,
    finished: bool,
}

impl<'a> XmlEventReader<'a> {
    /// Create a reader with default limits
    pub fn new(xml: &'a [u8]) -> Self {
        Self::with_limits(xml, Limits::default())
    }

    /// Create a reader with explicit limits
    pub fn with_limits(xml: &'a [u8], limits: Limits) -> Self {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            pending_end: None,
            depth: 0,
            limits,
            finished: false,
        }
    }

    fn xml_error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::Xml {
            position: self.reader.buffer_position(),
            reason: reason.into(),
        }
    }

    fn start_event(&self, start: &BytesStart, position: usize) -> Result<XmlEvent, ParseError> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| self.xml_error(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut attributes = Vec::new();
        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| self.xml_error(format!("Failed to parse attribute: {}", e)))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| self.xml_error(format!("Invalid attribute name: {}", e)))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| self.xml_error(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();
            attributes.push((key, value));
        }
        self.limits.check_attributes(attributes.len())?;

        Ok(XmlEvent::Start {
            name,
            attributes,
            position,
        })
    }

    fn next_event(&mut self) -> Option<Result<XmlEvent, ParseError>> {
        if let Some(name) = self.pending_end.take() {
            self.depth -= 1;
            return Some(Ok(XmlEvent::End { name }));
        }

        loop {
            let position = self.reader.buffer_position();
            self.buf.clear();
            let result = self
                .reader
                .read_event_into(&mut self.buf)
                .map(|event| event.into_owned());
            let event = match result {
                Ok(event) => event,
                Err(e) => return Some(Err(self.xml_error(e.to_string()))),
            };

            match event {
                Event::Start(e) => {
                    self.depth += 1;
                    if let Err(limit) = self.limits.check_xml_depth(self.depth) {
                        return Some(Err(limit.into()));
                    }
                    return Some(self.start_event(&e, position));
                }
                Event::Empty(e) => {
                    self.depth += 1;
                    if let Err(limit) = self.limits.check_xml_depth(self.depth) {
                        return Some(Err(limit.into()));
                    }
                    let start = self.start_event(&e, position);
                    if let Ok(XmlEvent::Start { name, .. }) = &start {
                        self.pending_end = Some(name.clone());
                    }
                    return Some(start);
                }
                Event::End(e) => {
                    self.depth = self.depth.saturating_sub(1);
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    return Some(Ok(XmlEvent::End { name }));
                }
                Event::Text(e) => match e.unescape() {
                    Ok(text) => return Some(Ok(XmlEvent::Text(text.to_string()))),
                    Err(err) => {
                        return Some(Err(
                            self.xml_error(format!("Failed to unescape text: {}", err))
                        ))
                    }
                },
                Event::CData(e) => {
                    let raw = e.into_inner();
                    return Some(Ok(XmlEvent::Text(String::from_utf8_lossy(&raw).to_string())));
                }
                Event::Eof => {
                    if self.depth > 0 {
                        return Some(Err(self.xml_error("unexpected end of document")));
                    }
                    return None;
                }
                _ => continue,
            }
        }
    }
}

impl<'a> Iterator for XmlEventReader<'a> {
    type Item = Result<XmlEvent, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let next = self.next_event();
        if matches!(next, None | Some(Err(_))) {
            self.finished = true;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Result<Vec<XmlEvent>, ParseError> {
        XmlEventReader::new(xml.as_bytes()).collect()
    }

    #[test]
    fn test_start_end_text() {
        let events = collect(r#"<a x="1"><b>hi</b></a>"#).unwrap();
        assert_eq!(
            events,
            vec![
                XmlEvent::Start {
                    name: "a".to_string(),
                    attributes: vec![("x".to_string(), "1".to_string())],
                    position: 0,
                },
                XmlEvent::Start {
                    name: "b".to_string(),
                    attributes: vec![],
                    position: 9,
                },
                XmlEvent::Text("hi".to_string()),
                XmlEvent::End {
                    name: "b".to_string()
                },
                XmlEvent::End {
                    name: "a".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_empty_element_expands() {
        let events = collect(r#"<a><b/></a>"#).unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[2], XmlEvent::End { name } if name == "b"));
    }

    #[test]
    fn test_malformed_reports_position() {
        let err = collect("<a><b></c></a>").unwrap_err();
        assert!(matches!(err, ParseError::Xml { .. }));
    }

    #[test]
    fn test_truncated_document() {
        let err = collect("<a><b>").unwrap_err();
        assert!(matches!(err, ParseError::Xml { .. }));
    }

    #[test]
    fn test_depth_limit() {
        let mut limits = Limits::default();
        limits.max_xml_depth = 1;
        let result: Result<Vec<_>, _> =
            XmlEventReader::with_limits(b"<a><b/></a>", limits).collect();
        assert!(matches!(result, Err(ParseError::Limit(_))));
    }
}
