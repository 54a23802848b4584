//! SOAP faults
//!
//! A [`Fault`] is the terminal error outcome of a client call or a server
//! dispatch, and the only error vocabulary that crosses the wire.

use crate::namespaces::QName;
use crate::value::ValueTree;
use crate::SOAP_ENVELOPE_NAMESPACE;
use std::fmt;

/// Malformed request, bad parameters, unknown method
pub const FAULT_CLIENT: &str = "Client";
/// Failure while processing a valid request
pub const FAULT_SERVER: &str = "Server";
/// A mandatory header was not understood
pub const FAULT_MUST_UNDERSTAND: &str = "MustUnderstand";
/// Unsupported envelope namespace
pub const FAULT_VERSION_MISMATCH: &str = "VersionMismatch";

const STANDARD_CODES: [&str; 4] = [
    FAULT_CLIENT,
    FAULT_SERVER,
    FAULT_MUST_UNDERSTAND,
    FAULT_VERSION_MISMATCH,
];

/// A SOAP 1.1 fault
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    /// Fault code without its envelope prefix (`Client`, `Server`, ...)
    pub code: String,
    /// Human readable fault string
    pub message: String,
    /// URI of the node that raised the fault
    pub actor: Option<String>,
    /// Application specific detail
    pub detail: Option<ValueTree>,
}

impl Fault {
    /// Create a fault with any code
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            actor: None,
            detail: None,
        }
    }

    /// `Client` fault
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(FAULT_CLIENT, message)
    }

    /// `Server` fault
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(FAULT_SERVER, message)
    }

    /// `MustUnderstand` fault
    pub fn must_understand(message: impl Into<String>) -> Self {
        Self::new(FAULT_MUST_UNDERSTAND, message)
    }

    /// `VersionMismatch` fault
    pub fn version_mismatch(message: impl Into<String>) -> Self {
        Self::new(FAULT_VERSION_MISMATCH, message)
    }

    /// Set the actor
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Set the detail
    pub fn with_detail(mut self, detail: ValueTree) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Whether the code is one of the SOAP 1.1 standard codes
    pub fn is_standard_code(&self) -> bool {
        STANDARD_CODES.contains(&self.code.as_str())
    }

    /// Recognize the fault shape in a list of struct members
    ///
    /// Keys are matched case-insensitively. Returns `None` when neither a
    /// `faultcode` nor a `faultstring` member is present.
    pub fn from_members(members: &[(QName, ValueTree)]) -> Option<Self> {
        let find = |key: &str| {
            members
                .iter()
                .find(|(name, _)| name.local_name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value)
        };

        let code = find("faultcode");
        let message = find("faultstring");
        if code.is_none() && message.is_none() {
            return None;
        }

        let text = |value: Option<&ValueTree>| value.and_then(|v| v.as_text()).unwrap_or_default();
        let code = text(code);
        let code = match code.rsplit_once(':') {
            Some((_, local)) => local.to_string(),
            None => code,
        };

        Some(Self {
            code,
            message: text(message),
            actor: find("faultactor")
                .and_then(|v| v.as_text())
                .filter(|a| !a.is_empty()),
            detail: find("detail").cloned(),
        })
    }

    /// Body entry carrying this fault
    ///
    /// Standard codes are qualified with the envelope namespace prefix.
    pub fn to_body_value(&self) -> ValueTree {
        let code = if self.is_standard_code() {
            format!("SOAP-ENV:{}", self.code)
        } else {
            self.code.clone()
        };

        let mut members = vec![
            (QName::local("faultcode"), ValueTree::untyped(code)),
            (
                QName::local("faultstring"),
                ValueTree::untyped(self.message.clone()),
            ),
        ];
        if let Some(actor) = &self.actor {
            members.push((QName::local("faultactor"), ValueTree::untyped(actor.clone())));
        }
        if let Some(detail) = &self.detail {
            members.push((QName::local("detail"), detail.clone()));
        }
        ValueTree::structure(None, members)
    }

    /// Element name of the fault body entry
    pub fn element_name() -> QName {
        QName::namespaced(SOAP_ENVELOPE_NAMESPACE, "Fault")
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(actor) = &self.actor {
            write!(f, " (actor {})", actor)?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {}
