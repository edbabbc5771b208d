//! Mock server state management.
//!
//! Provides the in-memory data store for the mock tracker API server.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// An issue as stored by the mock tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockIssue {
    pub id: String,
    pub project: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub assignee: Option<String>,
    pub updated_at: String,
}

/// A project (the container issues are created in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockProject {
    pub id: String,
    pub key: String,
    pub name: String,
    pub team: String,
}

/// A tracker user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Why a create was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    UnknownProject,
    MissingTitle,
    Injected,
}

/// Shared state for the mock server.
///
/// This struct holds all the mock data that the server will serve.
/// It's wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug, Default)]
pub struct MockState {
    /// Issues in creation order.
    pub issues: Vec<MockIssue>,

    /// Projects in listing order.
    pub projects: Vec<MockProject>,

    /// Users in listing order.
    pub users: Vec<MockUser>,

    /// Creates with one of these titles fail with a 500.
    pub fail_titles: HashSet<String>,

    /// List requests beyond this many fail with a 503.
    pub fail_list_after: Option<usize>,

    /// List requests served so far.
    pub list_requests: usize,

    /// Ids removed through `DELETE /issues/:id`, in order.
    pub deleted: Vec<String>,

    /// Optional authentication token. If set, requests must include this token.
    pub required_token: Option<String>,

    next_issue_number: u64,
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Add a project to the state.
    pub fn with_project(mut self, project: MockProject) -> Self {
        self.projects.push(project);
        self
    }

    /// Add an issue to the state.
    pub fn with_issue(mut self, issue: MockIssue) -> Self {
        self.insert_issue(issue);
        self
    }

    /// Add a user to the state.
    pub fn with_user(mut self, user: MockUser) -> Self {
        self.users.push(user);
        self
    }

    /// Make creates with this title fail.
    pub fn with_failing_title(mut self, title: &str) -> Self {
        self.fail_titles.insert(title.to_string());
        self
    }

    /// Let only the first `requests` list calls succeed.
    pub fn with_list_failure_after(mut self, requests: usize) -> Self {
        self.fail_list_after = Some(requests);
        self
    }

    /// Set the required authentication token.
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    pub(crate) fn insert_issue(&mut self, issue: MockIssue) {
        if let Some(n) = issue
            .id
            .rsplit('-')
            .next()
            .and_then(|n| n.parse::<u64>().ok())
        {
            self.next_issue_number = self.next_issue_number.max(n);
        }
        self.issues.push(issue);
    }

    /// Count a list request; false when it should fail.
    pub fn admit_list_request(&mut self) -> bool {
        self.list_requests += 1;
        self.fail_list_after
            .map_or(true, |limit| self.list_requests <= limit)
    }

    /// Get a project by id or key.
    pub fn get_project(&self, id_or_key: &str) -> Option<&MockProject> {
        self.projects
            .iter()
            .find(|p| p.id == id_or_key || p.key.eq_ignore_ascii_case(id_or_key))
    }

    /// Get an issue by id.
    pub fn get_issue(&self, id: &str) -> Option<&MockIssue> {
        self.issues.iter().find(|i| i.id == id)
    }

    /// List issues, optionally filtered by project key and status.
    pub fn list_issues(&self, project: Option<&str>, status: Option<&str>) -> Vec<&MockIssue> {
        self.issues
            .iter()
            .filter(|i| project.map_or(true, |p| i.project.eq_ignore_ascii_case(p)))
            .filter(|i| status.map_or(true, |s| i.status.eq_ignore_ascii_case(s)))
            .collect()
    }

    /// List projects, optionally filtered by team.
    pub fn list_projects(&self, team: Option<&str>) -> Vec<&MockProject> {
        self.projects
            .iter()
            .filter(|p| team.map_or(true, |t| p.team.eq_ignore_ascii_case(t)))
            .collect()
    }

    /// Create an issue in a project from raw request fields.
    pub fn create_issue(
        &mut self,
        project: &str,
        fields: &Map<String, Value>,
    ) -> Result<MockIssue, CreateError> {
        let project_key = self
            .get_project(project)
            .map(|p| p.key.clone())
            .ok_or(CreateError::UnknownProject)?;

        let title = text(fields, "title").ok_or(CreateError::MissingTitle)?;
        if self.fail_titles.contains(&title) {
            return Err(CreateError::Injected);
        }

        self.next_issue_number += 1;
        let issue = MockIssue {
            id: format!("ISS-{}", self.next_issue_number),
            project: project_key,
            title,
            status: text(fields, "status").unwrap_or_else(|| "open".to_string()),
            priority: text(fields, "priority").unwrap_or_else(|| "medium".to_string()),
            assignee: text(fields, "assignee"),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        self.issues.push(issue.clone());
        Ok(issue)
    }

    /// Apply the known fields of an update; unknown keys are ignored.
    pub fn update_issue(&mut self, id: &str, fields: &Map<String, Value>) -> Option<&MockIssue> {
        let issue = self.issues.iter_mut().find(|i| i.id == id)?;

        if let Some(title) = text(fields, "title") {
            issue.title = title;
        }
        if let Some(status) = text(fields, "status") {
            issue.status = status;
        }
        if let Some(priority) = text(fields, "priority") {
            issue.priority = priority;
        }
        if let Some(assignee) = text(fields, "assignee") {
            issue.assignee = Some(assignee);
        }
        issue.updated_at = chrono::Utc::now().to_rfc3339();

        Some(issue)
    }

    /// Remove an issue; false when it did not exist.
    pub fn delete_issue(&mut self, id: &str) -> bool {
        let before = self.issues.len();
        self.issues.retain(|i| i.id != id);
        let removed = self.issues.len() < before;
        if removed {
            self.deleted.push(id.to_string());
        }
        removed
    }
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
