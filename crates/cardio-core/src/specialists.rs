//! Specialist lookup.
//!
//! When disease is likely, the report links to specialists near the user.
//! The directory only builds search URLs; it holds no doctor data.

use serde::{Deserialize, Serialize};

/// Default search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";

/// A kind of specialist to recommend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialistCategory {
    /// Link text shown to the user
    pub title: String,

    /// Category label sent to the directory
    pub query: String,
}

impl SpecialistCategory {
    pub fn new(title: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            query: query.into(),
        }
    }
}

/// Categories recommended when no configuration overrides them.
pub fn default_categories() -> Vec<SpecialistCategory> {
    vec![
        SpecialistCategory::new("Primary Care Doctor", "Primary Care Provider"),
        SpecialistCategory::new("Cardiologist", "Cardiologist"),
    ]
}

/// A rendered link to a specialist search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialistLink {
    pub title: String,
    pub category: String,
    pub url: String,
}

/// Resolves a specialist category to a search URL near the user.
pub trait SpecialistDirectory: Send + Sync {
    fn search_url(&self, category: &str) -> String;

    fn link(&self, category: &SpecialistCategory) -> SpecialistLink {
        SpecialistLink {
            title: category.title.clone(),
            category: category.query.clone(),
            url: self.search_url(&category.query),
        }
    }
}

/// Builds `<base_url>?q=<category> near <location>` search links.
#[derive(Debug, Clone)]
pub struct SearchEngineDirectory {
    base_url: String,
    location: Option<String>,
}

impl SearchEngineDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            location: None,
        }
    }

    /// Search near a named place instead of "near me".
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        self.location = if location.trim().is_empty() {
            None
        } else {
            Some(location)
        };
        self
    }
}

impl Default for SearchEngineDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_URL)
    }
}

impl SpecialistDirectory for SearchEngineDirectory {
    fn search_url(&self, category: &str) -> String {
        let query = match &self.location {
            Some(location) => format!("{} near {}", category.trim(), location.trim()),
            None => format!("{} near me", category.trim()),
        };
        let separator = if self.base_url.contains('?') { '&' } else { '?' };

        tracing::debug!(category, "Built specialist search link");
        format!("{}{}q={}", self.base_url, separator, form_encode(&query))
    }
}

/// `application/x-www-form-urlencoded` encoding of a query value.
fn form_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_me_by_default() {
        let directory = SearchEngineDirectory::default();
        assert_eq!(
            directory.search_url("Cardiologist"),
            "https://www.google.com/search?q=Cardiologist+near+me"
        );
    }

    #[test]
    fn test_location_is_encoded() {
        let directory = SearchEngineDirectory::new("https://duckduckgo.com/")
            .with_location("São Paulo, BR");
        assert_eq!(
            directory.search_url("Primary Care Provider"),
            "https://duckduckgo.com/?q=Primary+Care+Provider+near+S%C3%A3o+Paulo%2C+BR"
        );
    }

    #[test]
    fn test_blank_location_falls_back_to_near_me() {
        let directory = SearchEngineDirectory::default().with_location("  ");
        assert!(directory.search_url("Cardiologist").ends_with("near+me"));
    }

    #[test]
    fn test_existing_query_string_is_extended() {
        let directory = SearchEngineDirectory::new("https://search.example/find?lang=en");
        assert_eq!(
            directory.search_url("Cardiologist"),
            "https://search.example/find?lang=en&q=Cardiologist+near+me"
        );
    }

    #[test]
    fn test_link_uses_title_and_query() {
        let directory = SearchEngineDirectory::default();
        let link = directory.link(&default_categories()[0]);
        assert_eq!(link.title, "Primary Care Doctor");
        assert_eq!(link.category, "Primary Care Provider");
        assert!(link.url.contains("Primary+Care+Provider"));
    }
}
