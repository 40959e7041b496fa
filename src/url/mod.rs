//! URL handling module for Catalog-Ripper
//!
//! This module provides link resolution, domain extraction, and the
//! product URL classification used by category discovery.

mod domain;
mod resolve;

// Re-export main functions
pub use domain::extract_domain;
pub use resolve::resolve_link;

/// Decides whether a discovered link points at a product detail page
///
/// Category pages link to many things besides products (banners, filters,
/// editorial content). Each retailer supplies its own rule.
pub trait ProductClassifier: Send + Sync {
    /// Returns true if `url` is a product detail page
    fn is_product(&self, url: &str) -> bool;
}

/// Accepts URLs that contain a fixed path fragment
///
/// # Examples
///
/// ```
/// use catalog_ripper::url::{PathFragmentClassifier, ProductClassifier};
///
/// let classifier = PathFragmentClassifier::new("www.bloomingdales.com/shop/product/");
/// assert!(classifier.is_product("https://www.bloomingdales.com/shop/product/jacket?ID=1"));
/// assert!(!classifier.is_product("https://www.bloomingdales.com/shop/mens?id=3864"));
/// ```
#[derive(Debug, Clone)]
pub struct PathFragmentClassifier {
    fragment: String,
}

impl PathFragmentClassifier {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

impl ProductClassifier for PathFragmentClassifier {
    fn is_product(&self, url: &str) -> bool {
        url.contains(&self.fragment)
    }
}

impl<F> ProductClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_product(&self, url: &str) -> bool {
        self(url)
    }
}
