//! HTML element extraction
//!
//! This module turns a page body and a CSS selector into the attributes of
//! every matching element. Link resolution happens in the callers, against
//! the URL the page was fetched from.

use scraper::{Html, Selector};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while extracting elements
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// One matched element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub attributes: HashMap<String, String>,
}

impl Element {
    /// Returns the value of attribute `name`, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Capability to select elements out of a page body
pub trait Extract: Send + Sync {
    /// Returns every element of `body` matching `selector`, in document order
    fn extract(&self, body: &[u8], selector: &str) -> Result<Vec<Element>, ExtractError>;
}

/// [`Extract`] backed by the `scraper` HTML parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl Extract for HtmlExtractor {
    fn extract(&self, body: &[u8], selector: &str) -> Result<Vec<Element>, ExtractError> {
        let parsed = Selector::parse(selector).map_err(|e| ExtractError::Selector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })?;

        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        Ok(document
            .select(&parsed)
            .map(|element| Element {
                attributes: element
                    .value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            })
            .collect())
    }
}

/// Collects one attribute from every element that carries it
pub fn attribute_values<'a>(
    elements: &'a [Element],
    name: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    elements.iter().filter_map(move |element| element.attr(name))
}
