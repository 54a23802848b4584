//! XML name validation and utilities
//!
//! Checks for NCNames and QNames used when registering operations and
//! splitting prefixed names found in WSDL attribute values.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}][A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\-\.0-9\u{B7}]*$")
        .expect("NCName pattern is valid")
});

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// Validate an NCName and return an error if invalid
pub fn validate_ncname(name: &str) -> Result<()> {
    if is_valid_ncname(name) {
        Ok(())
    } else {
        Err(Error::Name(format!("Invalid NCName: '{}'", name)))
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}

/// Strip SOAP-encoded array dimensions (`[]`, `[3]`, `[,][]`) from a type reference
///
/// Returns the bare type reference and the number of dimension groups removed.
pub fn strip_array_dimensions(reference: &str) -> (&str, usize) {
    match reference.find('[') {
        Some(idx) => (&reference[..idx], reference[idx..].matches('[').count()),
        None => (reference, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_ncname() {
        assert!(is_valid_ncname("element"));
        assert!(is_valid_ncname("my-element"));
        assert!(is_valid_ncname("_private"));
        assert!(is_valid_ncname("getQuote2"));

        assert!(!is_valid_ncname(""));
        assert!(!is_valid_ncname("prefix:element"));
        assert!(!is_valid_ncname("1st"));
        assert!(!is_valid_ncname("has space"));
    }

    #[test]
    fn test_is_valid_qname() {
        assert!(is_valid_qname("element"));
        assert!(is_valid_qname("xsd:string"));

        assert!(!is_valid_qname(""));
        assert!(!is_valid_qname(":element"));
        assert!(!is_valid_qname("element:"));
    }

    #[test]
    fn test_validate_ncname_error() {
        let err = validate_ncname("a:b").unwrap_err();
        assert!(matches!(err, Error::Name(_)));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("element"), (None, "element"));
        assert_eq!(split_qname("xsd:string"), (Some("xsd"), "string"));
    }

    #[test]
    fn test_strip_array_dimensions() {
        assert_eq!(strip_array_dimensions("xsd:string[]"), ("xsd:string", 1));
        assert_eq!(strip_array_dimensions("xsd:int[3]"), ("xsd:int", 1));
        assert_eq!(strip_array_dimensions("tns:Row[][]"), ("tns:Row", 2));
        assert_eq!(strip_array_dimensions("xsd:string"), ("xsd:string", 0));
    }
}
