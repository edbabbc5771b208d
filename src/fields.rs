//! Field selection for listing queries.
//!
//! Builds the smallest `fields=` parameter that covers what the caller wants
//! to display, so listings do not pull whole resource payloads.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Ordered query parameters, as sent on the wire.
pub type QueryParams = Vec<(String, String)>;

/// Name of the field-selection query parameter.
pub const FIELDS_PARAM: &str = "fields";

/// Keys that position a listing rather than shape it.
const PAGING_PARAMS: &[&str] = &["cursor", "limit", "skip", "top"];

/// Resource kinds with a known default field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Issue,
    Project,
    User,
    Team,
    Comment,
}

impl ResourceKind {
    /// Guess the kind from an endpoint path (`projects/ABC/issues` is an issue listing).
    pub fn from_endpoint(endpoint: &str) -> Option<Self> {
        let last = endpoint
            .split('?')
            .next()
            .unwrap_or_default()
            .trim_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match last.as_str() {
            "issues" | "issue" => Some(Self::Issue),
            "projects" | "project" => Some(Self::Project),
            "users" | "user" => Some(Self::User),
            "teams" | "team" => Some(Self::Team),
            "comments" | "comment" => Some(Self::Comment),
            _ => None,
        }
    }

    /// Fields fetched when the caller asks for none.
    pub fn default_fields(self) -> &'static [&'static str] {
        match self {
            Self::Issue => &["id", "title", "status", "priority", "assignee", "updated_at"],
            Self::Project => &["id", "key", "name", "team"],
            Self::User => &["id", "name", "email"],
            Self::Team => &["id", "name"],
            Self::Comment => &["id", "author", "body", "created_at"],
        }
    }
}

/// Default fields for endpoints of unknown kind.
const GENERIC_DEFAULT_FIELDS: &[&str] = &["id", "name", "title"];

/// Combine base parameters with requested and excluded fields.
///
/// - base keys are deduplicated: the last value wins, the first position is kept;
/// - a `fields` key in `base` is merged into `requested`;
/// - requested entries may be comma-separated and are deduplicated in order;
/// - with nothing requested, the default set for `kind` is used;
/// - excluded fields are removed, `id` is always kept first.
///
/// ```
/// use trackapi::{optimize_query, ResourceKind};
///
/// let params = optimize_query(
///     &[("status".to_string(), "open".to_string())],
///     &["title,assignee".to_string(), "title".to_string()],
///     &[],
///     Some(ResourceKind::Issue),
/// );
/// assert_eq!(params[0], ("status".to_string(), "open".to_string()));
/// assert_eq!(params[1], ("fields".to_string(), "id,title,assignee".to_string()));
/// ```
pub fn optimize_query(
    base: &[(String, String)],
    requested: &[String],
    exclude: &[String],
    kind: Option<ResourceKind>,
) -> QueryParams {
    let mut params: QueryParams = Vec::with_capacity(base.len() + 1);
    let mut requested_fields: Vec<String> = Vec::new();

    for (key, value) in base {
        if key == FIELDS_PARAM {
            requested_fields.extend(split_fields(value));
            continue;
        }
        if is_paging_param(key) {
            tracing::debug!(key = %key, "Dropping paging parameter; the paginator sets it");
            continue;
        }
        match params.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.clone(),
            None => params.push((key.clone(), value.clone())),
        }
    }

    requested_fields.extend(requested.iter().flat_map(|r| split_fields(r)));

    if requested_fields.is_empty() {
        let defaults = kind.map_or(GENERIC_DEFAULT_FIELDS, ResourceKind::default_fields);
        requested_fields.extend(defaults.iter().map(|f| (*f).to_string()));
    }

    let excluded: HashSet<String> = exclude.iter().flat_map(|e| split_fields(e)).collect();

    let mut seen = HashSet::new();
    let mut fields = vec!["id".to_string()];
    seen.insert("id".to_string());
    for field in requested_fields {
        if excluded.contains(&field) || !seen.insert(field.clone()) {
            continue;
        }
        fields.push(field);
    }

    params.push((FIELDS_PARAM.to_string(), fields.join(",")));
    params
}

/// Whether `key` is owned by the paginators (`cursor`, `limit`, `skip`, `top`).
pub fn is_paging_param(key: &str) -> bool {
    PAGING_PARAMS.contains(&key)
}

/// The field list carried by a `fields` parameter, in order.
pub fn selected_fields(params: &[(String, String)]) -> Vec<String> {
    params
        .iter()
        .filter(|(k, _)| k == FIELDS_PARAM)
        .flat_map(|(_, v)| split_fields(v))
        .collect()
}

/// Stable token identifying a query's shape (endpoint, filters, field set).
///
/// Paging keys do not contribute, so every page of one listing shares the
/// same signature.
pub fn query_signature(endpoint: &str, params: &[(String, String)]) -> String {
    let mut shaped: Vec<(&str, &str)> = params
        .iter()
        .filter(|(k, _)| !is_paging_param(k))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    shaped.sort_unstable();

    let mut hasher = DefaultHasher::new();
    endpoint.trim_matches('/').to_ascii_lowercase().hash(&mut hasher);
    shaped.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn split_fields(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}
