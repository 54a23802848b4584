//! Limits and constraints for document processing
//!
//! This module defines limits that bound the resources spent on WSDL
//! documents, imports and inbound envelopes.

use crate::error::LimitExceeded;
use serde::Deserialize;

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum element nesting depth
    pub max_xml_depth: usize,

    /// Maximum document size in bytes
    pub max_xml_size: usize,

    /// Maximum number of attributes per element
    pub max_attributes: usize,

    /// Maximum nesting of WSDL/schema imports
    pub max_import_depth: usize,

    /// Maximum chain of `href` multi-reference indirections
    pub max_href_depth: usize,

    /// Maximum number of value nodes read from one envelope, counting every
    /// copy made when several `href`s point at the same element
    pub max_value_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_attributes: 1000,
            max_import_depth: 16,
            max_href_depth: 64,
            max_value_nodes: 1_000_000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_attributes: 100,
            max_import_depth: 4,
            max_href_depth: 16,
            max_value_nodes: 100_000,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_attributes: 10000,
            max_import_depth: 64,
            max_href_depth: 1024,
            max_value_nodes: 50_000_000,
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<(), LimitExceeded> {
        check("XML depth", depth, self.max_xml_depth)
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<(), LimitExceeded> {
        check("XML size in bytes", size, self.max_xml_size)
    }

    /// Check if number of attributes is within limits
    pub fn check_attributes(&self, count: usize) -> Result<(), LimitExceeded> {
        check("attribute count", count, self.max_attributes)
    }

    /// Check if import nesting is within limits
    pub fn check_import_depth(&self, depth: usize) -> Result<(), LimitExceeded> {
        check("import depth", depth, self.max_import_depth)
    }

    /// Check if href indirection is within limits
    pub fn check_href_depth(&self, depth: usize) -> Result<(), LimitExceeded> {
        check("href depth", depth, self.max_href_depth)
    }

    /// Check if the number of decoded value nodes is within limits
    pub fn check_value_nodes(&self, count: usize) -> Result<(), LimitExceeded> {
        check("value nodes", count, self.max_value_nodes)
    }
}

fn check(what: &'static str, actual: usize, max: usize) -> Result<(), LimitExceeded> {
    if actual > max {
        Err(LimitExceeded { what, actual, max })
    } else {
        Ok(())
    }
}
