//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic test data.

use chrono::{DateTime, Duration, Utc};

use super::state::{MockIssue, MockProject, MockUser};

const STATUSES: [&str; 3] = ["open", "in_progress", "closed"];
const PRIORITIES: [&str; 3] = ["low", "medium", "high"];
const ASSIGNEES: [&str; 4] = ["kim", "ana", "li", "sam"];

/// 2024-01-01T00:00:00Z
const BASE_TIMESTAMP: i64 = 1_704_067_200;

/// Collection of fixture factories for test data.
pub struct Fixtures;

/// The data set the default mock server starts with.
#[derive(Debug, Clone)]
pub struct DefaultScenario {
    pub projects: Vec<MockProject>,
    pub issues: Vec<MockIssue>,
    pub users: Vec<MockUser>,
}

impl Fixtures {
    // =========================================================================
    // Project Fixtures
    // =========================================================================

    /// Create a project; its id is derived from the key.
    pub fn project(key: &str, name: &str, team: &str) -> MockProject {
        MockProject {
            id: format!("prj-{}", key.to_ascii_lowercase()),
            key: key.to_string(),
            name: name.to_string(),
            team: team.to_string(),
        }
    }

    /// `count` projects named `P001`, `P002`, ... spread over two teams.
    pub fn numbered_projects(count: usize) -> Vec<MockProject> {
        (1..=count)
            .map(|n| {
                let team = if n % 2 == 0 { "platform" } else { "product" };
                Self::project(&format!("P{n:03}"), &format!("Project {n}"), team)
            })
            .collect()
    }

    // =========================================================================
    // Issue Fixtures
    // =========================================================================

    /// Create issue `ISS-<n>` in a project. Status, priority and assignee cycle with `n`.
    pub fn issue(n: u64, project: &str, title: &str) -> MockIssue {
        let i = n as usize;
        let updated_at = DateTime::<Utc>::from_timestamp(BASE_TIMESTAMP, 0).unwrap_or_default()
            + Duration::minutes(n as i64);

        MockIssue {
            id: format!("ISS-{n}"),
            project: project.to_string(),
            title: title.to_string(),
            status: STATUSES[i % STATUSES.len()].to_string(),
            priority: PRIORITIES[i % PRIORITIES.len()].to_string(),
            assignee: (i % 5 != 0).then(|| ASSIGNEES[i % ASSIGNEES.len()].to_string()),
            updated_at: updated_at.to_rfc3339(),
        }
    }

    /// Issues `ISS-<first>` .. `ISS-<first + count - 1>` in one project.
    pub fn issues(first: u64, count: u64, project: &str) -> Vec<MockIssue> {
        (first..first + count)
            .map(|n| Self::issue(n, project, &format!("Issue {n}")))
            .collect()
    }

    // =========================================================================
    // User Fixtures
    // =========================================================================

    /// Create user `u<n>`.
    pub fn user(n: usize) -> MockUser {
        MockUser {
            id: format!("u{n}"),
            name: format!("User {n}"),
            email: format!("user{n}@example.com"),
        }
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// Two projects, 250 issues across them, 120 users.
    ///
    /// Large enough that every builtin page size needs more than one page.
    pub fn default_scenario() -> DefaultScenario {
        let mut issues = Self::issues(1, 150, "CORE");
        issues.extend(Self::issues(151, 100, "WEB"));

        DefaultScenario {
            projects: vec![
                Self::project("CORE", "Core Platform", "platform"),
                Self::project("WEB", "Web Frontend", "product"),
            ],
            issues,
            users: (1..=120).map(Self::user).collect(),
        }
    }
}
