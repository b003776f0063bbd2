//! Keyword routing from a question to a single source

use super::SourceCatalog;
use serde::{Deserialize, Serialize};

/// A set of keywords bound to a source name. Groups are tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub keywords: Vec<String>,
    pub source: String,
}

impl KeywordGroup {
    pub fn new<I, S>(keywords: I, source: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
            source: source.into(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && lowered.contains(k.as_str()))
    }

    /// Priority order used when nothing else is configured
    pub fn defaults() -> Vec<KeywordGroup> {
        vec![
            KeywordGroup::new(["covid", "virus", "pandemic"], "WHO"),
            KeywordGroup::new(["cancer", "diabetes", "disease"], "Mayo Clinic"),
            KeywordGroup::new(["symptom", "treatment", "illness"], "NHS"),
        ]
    }
}

/// Resolves a question to exactly one catalog URL. Never fails.
#[derive(Debug, Clone)]
pub struct SourceRouter {
    catalog: SourceCatalog,
    groups: Vec<KeywordGroup>,
}

impl SourceRouter {
    pub fn new(catalog: SourceCatalog, groups: Vec<KeywordGroup>) -> Self {
        Self { catalog, groups }
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    /// First matching group wins; a group whose source is missing from the
    /// catalog, or no match at all, yields the default source.
    pub fn select_source(&self, question: &str) -> &str {
        let lowered = question.to_lowercase();
        let Some(group) = self.groups.iter().find(|g| g.matches(&lowered)) else {
            return self.catalog.default_url();
        };
        self.catalog.url_for(&group.source).unwrap_or_else(|| {
            tracing::debug!(source = %group.source, "Routed source not in catalog, using default");
            self.catalog.default_url()
        })
    }
}

impl Default for SourceRouter {
    fn default() -> Self {
        Self::new(SourceCatalog::default(), KeywordGroup::defaults())
    }
}
