//! Endpoint → paging protocol lookup.

use std::collections::HashMap;

use serde::Serialize;

/// Paging protocol spoken by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStrategy {
    /// Opaque continuation tokens (`cursor` / `limit`).
    Cursor,
    /// Numeric indices (`skip` / `top`).
    Offset,
}

/// How one endpoint is paged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointPaging {
    pub strategy: PaginationStrategy,
    pub default_page_size: u32,
}

impl EndpointPaging {
    pub const fn cursor(default_page_size: u32) -> Self {
        Self {
            strategy: PaginationStrategy::Cursor,
            default_page_size,
        }
    }

    pub const fn offset(default_page_size: u32) -> Self {
        Self {
            strategy: PaginationStrategy::Offset,
            default_page_size,
        }
    }
}

/// Paging used for endpoints missing from the table.
pub const FALLBACK_PAGING: EndpointPaging = EndpointPaging::offset(25);

const BUILTIN: &[(&str, EndpointPaging)] = &[
    ("issues", EndpointPaging::cursor(100)),
    ("comments", EndpointPaging::cursor(50)),
    ("activity", EndpointPaging::cursor(200)),
    ("projects", EndpointPaging::offset(100)),
    ("users", EndpointPaging::offset(100)),
    ("teams", EndpointPaging::offset(50)),
    ("labels", EndpointPaging::offset(200)),
];

/// Immutable endpoint → paging table.
///
/// Built once per process and shared by reference; nothing mutates it after
/// construction.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    table: HashMap<String, EndpointPaging>,
    fallback: EndpointPaging,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PaginationConfig {
    /// The table for the tracker's documented endpoints.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|(endpoint, paging)| ((*endpoint).to_string(), *paging)),
        )
    }

    /// Build a table from explicit entries, with the default fallback.
    pub fn new(entries: impl IntoIterator<Item = (String, EndpointPaging)>) -> Self {
        Self {
            table: entries
                .into_iter()
                .map(|(endpoint, paging)| (normalize(&endpoint), paging))
                .collect(),
            fallback: FALLBACK_PAGING,
        }
    }

    /// Replace the paging used for unknown endpoints.
    #[must_use]
    pub fn with_fallback(mut self, fallback: EndpointPaging) -> Self {
        self.fallback = fallback;
        self
    }

    /// Pick the paging for an endpoint.
    ///
    /// Tries the full normalized path, then its last segment, so nested
    /// collections like `projects/ABC/issues` page like `issues`. Unknown
    /// endpoints get the offset fallback; listing never fails here.
    pub fn select(&self, endpoint: &str) -> EndpointPaging {
        let normalized = normalize(endpoint);
        if let Some(paging) = self.table.get(&normalized) {
            return *paging;
        }

        let last = normalized.rsplit('/').next().unwrap_or_default();
        match self.table.get(last) {
            Some(paging) => *paging,
            None => {
                tracing::debug!(endpoint, "No paging entry, using offset fallback");
                self.fallback
            }
        }
    }
}

fn normalize(endpoint: &str) -> String {
    endpoint
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_matches('/')
        .to_ascii_lowercase()
}
