use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::access::{Denial, Grant, ProjectScope, Viewer};
use crate::config::ConfigError;
use crate::db::{
    self, AccountRecord, BugSummary, PermissionRecord, ProjectRecord, ProjectSummary,
};
use crate::domain::account::AccountRole;
use crate::domain::bug::{Severity, Status};
use crate::domain::project::{ProjectPermission, Visibility};
use crate::domain::ParseEnumError;
use crate::notify::{Notifier, NotifyError, Recipient};

mod accounts;
mod bugs;
mod comments;
mod permissions;
mod projects;

pub use accounts::{InitSummary, Registration};
pub use bugs::{BugPatch, NewBug};
pub use projects::ProjectInput;

/// Seeded at `init`; deleting it is always refused.
pub const PROTECTED_PROJECT_ID: &str = "bff592a4-c7f6-43d1-9640-469ee5d4da1e";

pub struct App {
    conn: Connection,
    notifier: Box<dyn Notifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub account_id: String,
    pub username: String,
    pub role: AccountRole,
    pub role_label: &'static str,
}

impl From<&Viewer> for Identity {
    fn from(value: &Viewer) -> Self {
        Self {
            account_id: value.account_id.clone(),
            username: value.username.clone(),
            role: value.role,
            role_label: value.role.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub icon: Option<String>,
    pub role: AccountRole,
    pub role_label: &'static str,
    pub suspended: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<AccountRecord> for AccountView {
    fn from(value: AccountRecord) -> Self {
        Self {
            id: value.id,
            username: value.username,
            email: value.email,
            icon: value.icon,
            role: value.role,
            role_label: value.role.label(),
            suspended: value.suspended,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerView {
    pub id: String,
    pub username: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub link: Option<String>,
    pub visibility: Visibility,
    pub visibility_label: &'static str,
    pub description: Option<String>,
    pub formatted_description: Option<String>,
    pub tags: Vec<String>,
    pub owner: OwnerView,
    pub open_bugs: usize,
    pub total_bugs: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
}

impl From<ProjectSummary> for ProjectView {
    fn from(value: ProjectSummary) -> Self {
        let project = value.project;
        Self {
            owner: OwnerView {
                id: project.owner_id,
                username: value.owner_name,
                icon: value.owner_icon,
            },
            id: project.id,
            name: project.name,
            summary: project.summary,
            link: project.link,
            visibility: project.visibility,
            visibility_label: project.visibility.label(),
            description: project.description,
            formatted_description: project.formatted_description,
            tags: project.tags,
            open_bugs: value.open_bugs,
            total_bugs: value.total_bugs,
            created_at: project.created_at,
            modified_at: project.modified_at,
        }
    }
}

/// The list form of a project: no descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectPreview {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub owner_name: String,
    pub owner_icon: Option<String>,
    pub open_bugs: usize,
    pub total_bugs: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
}

impl From<ProjectSummary> for ProjectPreview {
    fn from(value: ProjectSummary) -> Self {
        let project = value.project;
        Self {
            id: project.id,
            name: project.name,
            summary: project.summary,
            visibility: project.visibility,
            tags: project.tags,
            owner_name: value.owner_name,
            owner_icon: value.owner_icon,
            open_bugs: value.open_bugs,
            total_bugs: value.total_bugs,
            created_at: project.created_at,
            modified_at: project.modified_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BugView {
    pub id: String,
    pub project_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub severity: Severity,
    pub severity_label: &'static str,
    pub status: Status,
    pub status_label: &'static str,
    pub creator: OwnerView,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
}

impl From<BugSummary> for BugView {
    fn from(value: BugSummary) -> Self {
        let bug = value.bug;
        Self {
            creator: OwnerView {
                id: bug.creator_id,
                username: value.creator_name,
                icon: value.creator_icon,
            },
            id: bug.id,
            project_id: bug.project_id,
            summary: bug.summary,
            description: bug.description,
            severity: bug.severity,
            severity_label: bug.severity.label(),
            status: bug.status,
            status_label: bug.status.label(),
            created_at: bug.created_at,
            modified_at: bug.modified_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BugPreview {
    pub id: String,
    pub summary: String,
    pub severity: Severity,
    pub status: Status,
    pub creator_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
}

impl From<BugSummary> for BugPreview {
    fn from(value: BugSummary) -> Self {
        Self {
            id: value.bug.id,
            summary: value.bug.summary,
            severity: value.bug.severity,
            status: value.bug.status,
            creator_name: value.creator_name,
            created_at: value.bug.created_at,
            modified_at: value.bug.modified_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionView {
    pub id: String,
    pub project_id: String,
    pub account_id: String,
    pub username: String,
    pub level: ProjectPermission,
    pub level_label: &'static str,
}

impl From<PermissionRecord> for PermissionView {
    fn from(value: PermissionRecord) -> Self {
        Self {
            id: value.id,
            project_id: value.project_id,
            account_id: value.account_id,
            username: value.username,
            level: value.level,
            level_label: value.level.label(),
        }
    }
}

/// A loaded project together with every grant on it.
struct ProjectContext {
    summary: ProjectSummary,
    grants: Vec<Grant>,
}

impl ProjectContext {
    fn scope(&self) -> ProjectScope<'_> {
        scope_of(&self.summary.project, &self.grants)
    }

    fn record(&self) -> &ProjectRecord {
        &self.summary.project
    }
}

fn scope_of<'a>(project: &'a ProjectRecord, grants: &'a [Grant]) -> ProjectScope<'a> {
    ProjectScope {
        owner_id: &project.owner_id,
        visibility: project.visibility,
        grants,
    }
}

fn grant_of(record: &PermissionRecord) -> Grant {
    Grant {
        account_id: record.account_id.clone(),
        level: record.level,
    }
}

impl App {
    pub fn open(db_path: &str, notifier: Box<dyn Notifier>) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let conn = db::open_connection(db_path)?;
        let version = db::get_meta(&conn, "schema_version")?;
        tracing::debug!(
            db = db_path,
            schema_version = version.as_deref().unwrap_or("unknown"),
            "opened database"
        );
        Ok(Self { conn, notifier })
    }

    fn load_project(&self, id: &str) -> Result<ProjectContext, AppError> {
        let summary = db::get_project_summary(&self.conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("project '{id}' not found")))?;
        let grants = db::list_project_permissions(&self.conn, id)?
            .iter()
            .map(grant_of)
            .collect();
        Ok(ProjectContext { summary, grants })
    }

    fn load_bug(&self, id: &str) -> Result<BugSummary, AppError> {
        db::get_bug_summary(&self.conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("bug '{id}' not found")))
    }

    /// Grants held by the viewer, keyed by project. Listing only ever needs
    /// the viewer's own grants to decide visibility.
    fn viewer_grants(
        &self,
        viewer: Option<&Viewer>,
    ) -> Result<HashMap<String, Vec<Grant>>, AppError> {
        let mut by_project: HashMap<String, Vec<Grant>> = HashMap::new();
        if let Some(viewer) = viewer {
            for record in db::list_account_permissions(&self.conn, &viewer.account_id)? {
                by_project
                    .entry(record.project_id.clone())
                    .or_default()
                    .push(grant_of(&record));
            }
        }
        Ok(by_project)
    }

    fn recipient(&self, account_id: &str) -> Result<Option<Recipient>, AppError> {
        Ok(db::get_account(&self.conn, account_id)?.map(|account| Recipient {
            account_id: account.id,
            username: account.username,
            email: account.email,
        }))
    }

    fn notify(&self, account_id: &str, subject: &str, body: &str) -> Result<(), AppError> {
        if let Some(recipient) = self.recipient(account_id)? {
            self.notifier.send(&recipient, subject, body)?;
        }
        Ok(())
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

fn required_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Internal,
    NotAuthenticated,
    Forbidden,
    NotFound,
    Validation,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::NotAuthenticated => 3,
            ErrorKind::Forbidden => 4,
            ErrorKind::NotFound => 5,
            ErrorKind::Validation => 6,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("password hashing failed: {0}")]
    Hash(#[from] crate::auth::HashError),
    #[error(transparent)]
    Parse(#[from] ParseEnumError),
    #[error("{0}")]
    NotAuthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Io(_)
            | AppError::Db(_)
            | AppError::Notify(_)
            | AppError::Config(_)
            | AppError::Hash(_) => ErrorKind::Internal,
            AppError::Parse(_) | AppError::InvalidArgument(_) => ErrorKind::Validation,
            AppError::NotAuthenticated(_) => ErrorKind::NotAuthenticated,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl From<Denial> for AppError {
    fn from(value: Denial) -> Self {
        match value {
            Denial::NotAuthenticated => AppError::NotAuthenticated(
                "authentication required (pass --as and --password)".to_string(),
            ),
            Denial::Forbidden => {
                AppError::Forbidden("you do not have permission for this action".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests;
#[cfg(test)]
mod tests_error_paths;
