//! Allow-listed source catalog

use serde::{Deserialize, Serialize};

/// A named reference site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Ordered name -> URL mapping, fixed for the life of the process.
///
/// The first inserted entry is the default source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCatalog {
    entries: Vec<Source>,
}

impl SourceCatalog {
    /// Build a catalog. Returns `None` when `entries` is empty since routing
    /// needs a default.
    ///
    /// Later duplicates of a name are ignored.
    pub fn new(entries: impl IntoIterator<Item = Source>) -> Option<Self> {
        let mut deduped: Vec<Source> = Vec::new();
        for source in entries {
            if deduped.iter().any(|s| s.name == source.name) {
                tracing::warn!(name = %source.name, "Ignoring duplicate source name");
                continue;
            }
            deduped.push(source);
        }
        if deduped.is_empty() {
            None
        } else {
            Some(Self { entries: deduped })
        }
    }

    pub fn default_source(&self) -> &Source {
        // Construction guarantees at least one entry
        &self.entries[0]
    }

    pub fn default_url(&self) -> &str {
        &self.default_source().url
    }

    pub fn url_for(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.url.as_str())
    }

    /// Reverse lookup of the human-readable name bound to `url`
    pub fn name_for(&self, url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|s| s.url == url)
            .map(|s| s.name.as_str())
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.entries.iter().any(|s| s.url == url)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self {
            entries: vec![
                Source::new("Mayo Clinic", "https://www.mayoclinic.org/diseases-conditions"),
                Source::new("NHS", "https://www.nhs.uk/conditions/"),
                Source::new("WHO", "https://www.who.int/health-topics"),
                Source::new("Johns Hopkins", "https://www.hopkinsmedicine.org/health"),
            ],
        }
    }
}
