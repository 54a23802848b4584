//! Character encodings of SOAP messages
//!
//! Messages are built and parsed as UTF-8. A [`Charset`] converts them at
//! the wire boundary, so a peer may exchange ISO-8859-1 or US-ASCII
//! envelopes named in the `Content-Type` header.

use crate::error::{DecodeError, EncodeError};
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// A supported message encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Charset {
    /// UTF-8
    #[default]
    Utf8,
    /// ISO-8859-1
    Latin1,
    /// US-ASCII
    Ascii,
}

impl Charset {
    /// Canonical name, as written in headers and XML declarations
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Ascii => "US-ASCII",
        }
    }

    /// `text/xml` content type carrying this charset
    pub fn content_type(self) -> String {
        format!("text/xml; charset={}", self.name())
    }

    /// Charset named by a `Content-Type` header, UTF-8 when none is given
    pub fn from_content_type(content_type: &str) -> Result<Self, String> {
        let parameter = content_type.split(';').skip(1).find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"'))
        });
        match parameter {
            Some(name) => name.parse(),
            None => Ok(Charset::Utf8),
        }
    }

    /// Convert wire bytes in this charset to UTF-8
    pub fn decode<'a>(self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, DecodeError> {
        match self {
            Charset::Utf8 => Ok(Cow::Borrowed(bytes)),
            Charset::Latin1 => {
                let text: String = bytes.iter().map(|&b| char::from(b)).collect();
                Ok(Cow::Owned(text.into_bytes()))
            }
            Charset::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                None => Ok(Cow::Borrowed(bytes)),
                Some(offset) => Err(DecodeError::Charset(format!(
                    "byte 0x{:02X} at offset {} is not US-ASCII",
                    bytes[offset], offset
                ))),
            },
        }
    }

    /// Convert a UTF-8 document to this charset
    ///
    /// Characters the charset cannot hold are written as numeric character
    /// references.
    pub fn encode(self, utf8: &[u8]) -> Result<Vec<u8>, EncodeError> {
        if self == Charset::Utf8 {
            return Ok(utf8.to_vec());
        }
        let text = std::str::from_utf8(utf8).map_err(|e| EncodeError::Xml(e.to_string()))?;
        let limit = match self {
            Charset::Latin1 => 0xFF,
            _ => 0x7F,
        };
        let mut out = Vec::with_capacity(text.len());
        for c in text.chars() {
            let code = u32::from(c);
            if code <= limit {
                out.push(code as u8);
            } else {
                out.extend_from_slice(format!("&#{};", code).as_bytes());
            }
        }
        Ok(out)
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Ok(Charset::Utf8),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" => Ok(Charset::Latin1),
            "US-ASCII" | "ASCII" => Ok(Charset::Ascii),
            other => Err(format!(
                "unsupported encoding '{}', use one of ISO-8859-1, US-ASCII, UTF-8",
                other
            )),
        }
    }
}

impl TryFrom<String> for Charset {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
