use std::str::FromStr;
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result, Row};
use time::OffsetDateTime;

use crate::domain::account::AccountRole;
use crate::domain::bug::{Severity, Status};
use crate::domain::project::{ProjectPermission, Visibility};
use crate::domain::{format_timestamp, now_utc, parse_timestamp, ParseEnumError};

pub const CURRENT_SCHEMA_VERSION: i64 = 3;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 3] = [
    Migration {
        version: 1,
        name: "baseline_tracker_schema_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email TEXT,
    icon TEXT,
    role TEXT NOT NULL,
    suspended INTEGER NOT NULL DEFAULT 0,
    password_hash TEXT NOT NULL,
    password_salt TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    summary TEXT NOT NULL,
    link TEXT,
    visibility TEXT NOT NULL,
    description TEXT,
    formatted_description TEXT,
    tags_json TEXT NOT NULL DEFAULT '[]',
    owner_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    modified_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_permissions (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    level TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bugs (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    creator_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    summary TEXT NOT NULL,
    description TEXT,
    severity TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    modified_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    bug_id TEXT NOT NULL REFERENCES bugs(id) ON DELETE CASCADE,
    owner_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    text TEXT NOT NULL,
    posted_at TEXT NOT NULL,
    edited INTEGER NOT NULL DEFAULT 0,
    is_status_update INTEGER NOT NULL DEFAULT 0,
    reply_to_id TEXT,
    is_reply_deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_id);
CREATE INDEX IF NOT EXISTS idx_user_permissions_account ON user_permissions(account_id);
CREATE INDEX IF NOT EXISTS idx_user_permissions_project ON user_permissions(project_id);
CREATE INDEX IF NOT EXISTS idx_bugs_project ON bugs(project_id);
CREATE INDEX IF NOT EXISTS idx_comments_bug ON comments(bug_id);
CREATE INDEX IF NOT EXISTS idx_comments_reply_to ON comments(reply_to_id);
"#,
    },
    Migration {
        version: 2,
        name: "unique_project_grant_v1",
        sql: r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_user_permissions_unique_grant
    ON user_permissions(project_id, account_id);
"#,
    },
    Migration {
        version: 3,
        name: "phc_password_hash_v1",
        sql: r#"
ALTER TABLE accounts DROP COLUMN password_salt;
"#,
    },
];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.name,
                format_timestamp(now_utc())
            ],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> Result<OffsetDateTime> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp '{raw}'").into(),
        )
    })
}

fn enum_at<T>(row: &Row<'_>, idx: usize) -> Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn tags_at(row: &Row<'_>, idx: usize) -> Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn tags_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

// ---------------------------------------------------------------- accounts

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub icon: Option<String>,
    pub role: AccountRole,
    pub suspended: bool,
    /// PHC string: algorithm, parameters, salt and digest in one value.
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

const ACCOUNT_COLUMNS: &str =
    "id, username, email, icon, role, suspended, password_hash, created_at";

fn account_from_row(row: &Row<'_>) -> Result<AccountRecord> {
    Ok(AccountRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        icon: row.get(3)?,
        role: enum_at(row, 4)?,
        suspended: row.get(5)?,
        password_hash: row.get(6)?,
        created_at: timestamp_at(row, 7)?,
    })
}

pub fn insert_account(conn: &Connection, account: &AccountRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO accounts (
    id, username, email, icon, role, suspended, password_hash, created_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#,
        params![
            account.id,
            account.username,
            account.email,
            account.icon,
            account.role.as_str(),
            account.suspended,
            account.password_hash,
            format_timestamp(account.created_at)
        ],
    )?;
    Ok(())
}

pub fn get_account(conn: &Connection, id: &str) -> Result<Option<AccountRecord>> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
        params![id],
        account_from_row,
    )
    .optional()
}

pub fn find_account_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<AccountRecord>> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
        params![username.trim()],
        account_from_row,
    )
    .optional()
}

pub fn find_account_by_role(
    conn: &Connection,
    role: AccountRole,
) -> Result<Option<AccountRecord>> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = ?1 LIMIT 1"),
        params![role.as_str()],
        account_from_row,
    )
    .optional()
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<AccountRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY username COLLATE NOCASE ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], account_from_row)?;
    rows.collect()
}

pub fn set_account_suspended(conn: &Connection, id: &str, suspended: bool) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET suspended = ?2 WHERE id = ?1",
        params![id, suspended],
    )?;
    Ok(())
}

pub fn set_account_role(conn: &Connection, id: &str, role: AccountRole) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET role = ?2 WHERE id = ?1",
        params![id, role.as_str()],
    )?;
    Ok(())
}

pub fn set_account_username(conn: &Connection, id: &str, username: &str) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET username = ?2 WHERE id = ?1",
        params![id, username],
    )?;
    Ok(())
}

pub fn set_account_email(conn: &Connection, id: &str, email: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET email = ?2 WHERE id = ?1",
        params![id, email],
    )?;
    Ok(())
}

pub fn set_account_icon(conn: &Connection, id: &str, icon: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET icon = ?2 WHERE id = ?1",
        params![id, icon],
    )?;
    Ok(())
}

pub fn set_account_password(conn: &Connection, id: &str, hash: &str) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET password_hash = ?2 WHERE id = ?1",
        params![id, hash],
    )?;
    Ok(())
}

/// Marks replies to every comment the account wrote, then removes the account.
/// Owned projects, grants, bugs and comments go with it through the cascade.
pub fn delete_account(conn: &Connection, id: &str) -> Result<usize> {
    let tombstoned = conn.execute(
        r#"
UPDATE comments SET is_reply_deleted = 1
WHERE reply_to_id IN (SELECT id FROM comments WHERE owner_id = ?1)
"#,
        params![id],
    )?;
    conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
    Ok(tombstoned)
}

// ---------------------------------------------------------------- projects

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub link: Option<String>,
    pub visibility: Visibility,
    pub description: Option<String>,
    pub formatted_description: Option<String>,
    pub tags: Vec<String>,
    pub owner_id: String,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

/// A project row joined with its owner and bug counts; the unit the listing
/// pipeline works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub project: ProjectRecord,
    pub owner_name: String,
    pub owner_icon: Option<String>,
    pub open_bugs: usize,
    pub total_bugs: usize,
}

const PROJECT_SUMMARY_SELECT: &str = r#"
SELECT p.id, p.name, p.summary, p.link, p.visibility, p.description,
       p.formatted_description, p.tags_json, p.owner_id, p.created_at, p.modified_at,
       a.username, a.icon,
       (SELECT COUNT(*) FROM bugs b WHERE b.project_id = p.id AND b.status = 'open'),
       (SELECT COUNT(*) FROM bugs b WHERE b.project_id = p.id)
FROM projects p
JOIN accounts a ON a.id = p.owner_id
"#;

fn project_summary_from_row(row: &Row<'_>) -> Result<ProjectSummary> {
    let open_bugs: i64 = row.get(13)?;
    let total_bugs: i64 = row.get(14)?;
    Ok(ProjectSummary {
        project: ProjectRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            summary: row.get(2)?,
            link: row.get(3)?,
            visibility: enum_at(row, 4)?,
            description: row.get(5)?,
            formatted_description: row.get(6)?,
            tags: tags_at(row, 7)?,
            owner_id: row.get(8)?,
            created_at: timestamp_at(row, 9)?,
            modified_at: timestamp_at(row, 10)?,
        },
        owner_name: row.get(11)?,
        owner_icon: row.get(12)?,
        open_bugs: usize::try_from(open_bugs).unwrap_or_default(),
        total_bugs: usize::try_from(total_bugs).unwrap_or_default(),
    })
}

pub fn insert_project(conn: &Connection, project: &ProjectRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO projects (
    id, name, summary, link, visibility, description, formatted_description,
    tags_json, owner_id, created_at, modified_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#,
        params![
            project.id,
            project.name,
            project.summary,
            project.link,
            project.visibility.as_str(),
            project.description,
            project.formatted_description,
            tags_json(&project.tags),
            project.owner_id,
            format_timestamp(project.created_at),
            format_timestamp(project.modified_at)
        ],
    )?;
    Ok(())
}

pub fn update_project(conn: &Connection, project: &ProjectRecord) -> Result<()> {
    conn.execute(
        r#"
UPDATE projects SET
    name = ?2,
    summary = ?3,
    link = ?4,
    visibility = ?5,
    description = ?6,
    formatted_description = ?7,
    tags_json = ?8,
    modified_at = ?9
WHERE id = ?1
"#,
        params![
            project.id,
            project.name,
            project.summary,
            project.link,
            project.visibility.as_str(),
            project.description,
            project.formatted_description,
            tags_json(&project.tags),
            format_timestamp(project.modified_at)
        ],
    )?;
    Ok(())
}

pub fn touch_project(conn: &Connection, id: &str, at: OffsetDateTime) -> Result<()> {
    conn.execute(
        "UPDATE projects SET modified_at = ?2 WHERE id = ?1",
        params![id, format_timestamp(at)],
    )?;
    Ok(())
}

pub fn get_project_summary(conn: &Connection, id: &str) -> Result<Option<ProjectSummary>> {
    conn.query_row(
        &format!("{PROJECT_SUMMARY_SELECT} WHERE p.id = ?1"),
        params![id],
        project_summary_from_row,
    )
    .optional()
}

pub fn list_project_summaries(conn: &Connection) -> Result<Vec<ProjectSummary>> {
    let mut stmt = conn.prepare(PROJECT_SUMMARY_SELECT)?;
    let rows = stmt.query_map([], project_summary_from_row)?;
    rows.collect()
}

pub fn delete_project(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
    Ok(())
}

// ------------------------------------------------------------- permissions

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRecord {
    pub id: String,
    pub project_id: String,
    pub account_id: String,
    pub username: String,
    pub level: ProjectPermission,
    pub created_at: OffsetDateTime,
}

const PERMISSION_SELECT: &str = r#"
SELECT up.id, up.project_id, up.account_id, a.username, up.level, up.created_at
FROM user_permissions up
JOIN accounts a ON a.id = up.account_id
"#;

fn permission_from_row(row: &Row<'_>) -> Result<PermissionRecord> {
    Ok(PermissionRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        account_id: row.get(2)?,
        username: row.get(3)?,
        level: enum_at(row, 4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

pub fn insert_permission(
    conn: &Connection,
    id: &str,
    project_id: &str,
    account_id: &str,
    level: ProjectPermission,
    at: OffsetDateTime,
) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO user_permissions (id, project_id, account_id, level, created_at)
VALUES (?1, ?2, ?3, ?4, ?5)
"#,
        params![id, project_id, account_id, level.as_str(), format_timestamp(at)],
    )?;
    Ok(())
}

pub fn get_permission(conn: &Connection, id: &str) -> Result<Option<PermissionRecord>> {
    conn.query_row(
        &format!("{PERMISSION_SELECT} WHERE up.id = ?1"),
        params![id],
        permission_from_row,
    )
    .optional()
}

pub fn find_permission(
    conn: &Connection,
    project_id: &str,
    account_id: &str,
) -> Result<Option<PermissionRecord>> {
    conn.query_row(
        &format!("{PERMISSION_SELECT} WHERE up.project_id = ?1 AND up.account_id = ?2"),
        params![project_id, account_id],
        permission_from_row,
    )
    .optional()
}

pub fn list_project_permissions(
    conn: &Connection,
    project_id: &str,
) -> Result<Vec<PermissionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{PERMISSION_SELECT} WHERE up.project_id = ?1 \
         ORDER BY a.username COLLATE NOCASE ASC, up.id ASC"
    ))?;
    let rows = stmt.query_map(params![project_id], permission_from_row)?;
    rows.collect()
}

pub fn list_account_permissions(
    conn: &Connection,
    account_id: &str,
) -> Result<Vec<PermissionRecord>> {
    let mut stmt = conn.prepare(&format!("{PERMISSION_SELECT} WHERE up.account_id = ?1"))?;
    let rows = stmt.query_map(params![account_id], permission_from_row)?;
    rows.collect()
}

pub fn set_permission_level(conn: &Connection, id: &str, level: ProjectPermission) -> Result<()> {
    conn.execute(
        "UPDATE user_permissions SET level = ?2 WHERE id = ?1",
        params![id, level.as_str()],
    )?;
    Ok(())
}

pub fn delete_permission(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM user_permissions WHERE id = ?1", params![id])?;
    Ok(())
}

// -------------------------------------------------------------------- bugs

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugRecord {
    pub id: String,
    pub project_id: String,
    pub creator_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub severity: Severity,
    pub status: Status,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugSummary {
    pub bug: BugRecord,
    pub creator_name: String,
    pub creator_icon: Option<String>,
}

const BUG_SUMMARY_SELECT: &str = r#"
SELECT b.id, b.project_id, b.creator_id, b.summary, b.description, b.severity,
       b.status, b.created_at, b.modified_at, a.username, a.icon
FROM bugs b
JOIN accounts a ON a.id = b.creator_id
"#;

fn bug_summary_from_row(row: &Row<'_>) -> Result<BugSummary> {
    Ok(BugSummary {
        bug: BugRecord {
            id: row.get(0)?,
            project_id: row.get(1)?,
            creator_id: row.get(2)?,
            summary: row.get(3)?,
            description: row.get(4)?,
            severity: enum_at(row, 5)?,
            status: enum_at(row, 6)?,
            created_at: timestamp_at(row, 7)?,
            modified_at: timestamp_at(row, 8)?,
        },
        creator_name: row.get(9)?,
        creator_icon: row.get(10)?,
    })
}

pub fn insert_bug(conn: &Connection, bug: &BugRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO bugs (
    id, project_id, creator_id, summary, description, severity, status,
    created_at, modified_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#,
        params![
            bug.id,
            bug.project_id,
            bug.creator_id,
            bug.summary,
            bug.description,
            bug.severity.as_str(),
            bug.status.as_str(),
            format_timestamp(bug.created_at),
            format_timestamp(bug.modified_at)
        ],
    )?;
    Ok(())
}

pub fn update_bug(conn: &Connection, bug: &BugRecord) -> Result<()> {
    conn.execute(
        r#"
UPDATE bugs SET
    summary = ?2,
    description = ?3,
    severity = ?4,
    status = ?5,
    modified_at = ?6
WHERE id = ?1
"#,
        params![
            bug.id,
            bug.summary,
            bug.description,
            bug.severity.as_str(),
            bug.status.as_str(),
            format_timestamp(bug.modified_at)
        ],
    )?;
    Ok(())
}

pub fn touch_bug(conn: &Connection, id: &str, at: OffsetDateTime) -> Result<()> {
    conn.execute(
        "UPDATE bugs SET modified_at = ?2 WHERE id = ?1",
        params![id, format_timestamp(at)],
    )?;
    Ok(())
}

pub fn get_bug_summary(conn: &Connection, id: &str) -> Result<Option<BugSummary>> {
    conn.query_row(
        &format!("{BUG_SUMMARY_SELECT} WHERE b.id = ?1"),
        params![id],
        bug_summary_from_row,
    )
    .optional()
}

pub fn list_bug_summaries(conn: &Connection, project_id: &str) -> Result<Vec<BugSummary>> {
    let mut stmt = conn.prepare(&format!("{BUG_SUMMARY_SELECT} WHERE b.project_id = ?1"))?;
    let rows = stmt.query_map(params![project_id], bug_summary_from_row)?;
    rows.collect()
}

pub fn count_bugs(conn: &Connection, project_id: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bugs WHERE project_id = ?1",
        params![project_id],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Removes the bug's comments and then the bug itself.
pub fn delete_bug(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM comments WHERE bug_id = ?1", params![id])?;
    conn.execute("DELETE FROM bugs WHERE id = ?1", params![id])?;
    Ok(())
}

// ---------------------------------------------------------------- comments

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub id: String,
    pub bug_id: String,
    pub owner_id: String,
    pub text: String,
    pub posted_at: OffsetDateTime,
    pub edited: bool,
    pub is_status_update: bool,
    pub reply_to_id: Option<String>,
    pub is_reply_deleted: bool,
}

/// A comment row joined with its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEntry {
    pub comment: CommentRecord,
    pub owner_name: String,
    pub owner_icon: Option<String>,
}

const COMMENT_ENTRY_SELECT: &str = r#"
SELECT c.id, c.bug_id, c.owner_id, c.text, c.posted_at, c.edited, c.is_status_update,
       c.reply_to_id, c.is_reply_deleted, a.username, a.icon
FROM comments c
JOIN accounts a ON a.id = c.owner_id
"#;

fn comment_entry_from_row(row: &Row<'_>) -> Result<CommentEntry> {
    Ok(CommentEntry {
        comment: CommentRecord {
            id: row.get(0)?,
            bug_id: row.get(1)?,
            owner_id: row.get(2)?,
            text: row.get(3)?,
            posted_at: timestamp_at(row, 4)?,
            edited: row.get(5)?,
            is_status_update: row.get(6)?,
            reply_to_id: row.get(7)?,
            is_reply_deleted: row.get(8)?,
        },
        owner_name: row.get(9)?,
        owner_icon: row.get(10)?,
    })
}

pub fn insert_comment(conn: &Connection, comment: &CommentRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO comments (
    id, bug_id, owner_id, text, posted_at, edited, is_status_update,
    reply_to_id, is_reply_deleted
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#,
        params![
            comment.id,
            comment.bug_id,
            comment.owner_id,
            comment.text,
            format_timestamp(comment.posted_at),
            comment.edited,
            comment.is_status_update,
            comment.reply_to_id,
            comment.is_reply_deleted
        ],
    )?;
    Ok(())
}

pub fn get_comment_entry(conn: &Connection, id: &str) -> Result<Option<CommentEntry>> {
    conn.query_row(
        &format!("{COMMENT_ENTRY_SELECT} WHERE c.id = ?1"),
        params![id],
        comment_entry_from_row,
    )
    .optional()
}

/// All comments of a bug in insertion order.
pub fn list_comment_entries(conn: &Connection, bug_id: &str) -> Result<Vec<CommentEntry>> {
    let mut stmt = conn.prepare(&format!(
        "{COMMENT_ENTRY_SELECT} WHERE c.bug_id = ?1 ORDER BY c.rowid ASC"
    ))?;
    let rows = stmt.query_map(params![bug_id], comment_entry_from_row)?;
    rows.collect()
}

pub fn update_comment_text(conn: &Connection, id: &str, text: &str) -> Result<()> {
    conn.execute(
        "UPDATE comments SET text = ?2, edited = 1 WHERE id = ?1",
        params![id, text],
    )?;
    Ok(())
}

/// Tombstones every reply that points at `comment_id`.
pub fn mark_replies_deleted(conn: &Connection, comment_id: &str) -> Result<usize> {
    conn.execute(
        "UPDATE comments SET is_reply_deleted = 1 WHERE reply_to_id = ?1",
        params![comment_id],
    )
}

pub fn delete_comment(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    Ok(())
}
