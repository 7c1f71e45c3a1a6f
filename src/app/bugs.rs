use rusqlite::Connection;
use time::OffsetDateTime;
use tracing::{debug, info};

use super::{new_id, optional_text, required_text, App, AppError, BugPreview, BugView};
use crate::access::{self, Viewer};
use crate::db::{self, BugRecord, CommentRecord};
use crate::domain::bug::{Severity, Status, OPENED_AUDIT_TEXT};
use crate::domain::now_utc;
use crate::listing::{self, BugFilter, ListQuery, Page};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBug {
    pub summary: String,
    pub description: Option<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugPatch {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<Status>,
}

/// Appends a system comment recording a change made by `actor_id`.
fn append_audit(
    conn: &Connection,
    bug_id: &str,
    actor_id: &str,
    text: &str,
    at: OffsetDateTime,
) -> Result<(), AppError> {
    db::insert_comment(
        conn,
        &CommentRecord {
            id: new_id(),
            bug_id: bug_id.to_string(),
            owner_id: actor_id.to_string(),
            text: text.to_string(),
            posted_at: at,
            edited: false,
            is_status_update: true,
            reply_to_id: None,
            is_reply_deleted: false,
        },
    )?;
    Ok(())
}

impl App {
    pub fn create_bug(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
        input: &NewBug,
    ) -> Result<BugView, AppError> {
        let loaded = self.load_project(project_id)?;
        access::check_contribute(viewer, &loaded.scope())?;
        let viewer = access::require_viewer(viewer)?;
        let summary = required_text("bug summary", &input.summary)?;

        let now = now_utc();
        let record = BugRecord {
            id: new_id(),
            project_id: project_id.to_string(),
            creator_id: viewer.account_id.clone(),
            summary,
            description: optional_text(input.description.as_deref()),
            severity: input.severity,
            status: Status::Open,
            created_at: now,
            modified_at: now,
        };

        let tx = self.conn.unchecked_transaction()?;
        db::insert_bug(&tx, &record)?;
        append_audit(&tx, &record.id, &viewer.account_id, OPENED_AUDIT_TEXT, now)?;
        db::touch_project(&tx, project_id, now)?;
        tx.commit()?;
        info!(bug_id = %record.id, project_id, actor = %viewer.username, "created bug");

        Ok(BugView::from(self.load_bug(&record.id)?))
    }

    pub fn update_bug(
        &self,
        viewer: Option<&Viewer>,
        bug_id: &str,
        patch: &BugPatch,
    ) -> Result<BugView, AppError> {
        let current = self.load_bug(bug_id)?;
        let loaded = self.load_project(&current.bug.project_id)?;
        access::check_bug_mutation(viewer, &loaded.scope(), &current.bug.creator_id)?;
        let viewer = access::require_viewer(viewer)?;

        let mut record = current.bug.clone();
        if let Some(summary) = patch.summary.as_deref() {
            record.summary = required_text("bug summary", summary)?;
        }
        if let Some(description) = patch.description.as_deref() {
            record.description = optional_text(Some(description));
        }

        let now = now_utc();
        let tx = self.conn.unchecked_transaction()?;
        if let Some(severity) = patch.severity.filter(|next| *next != record.severity) {
            append_audit(&tx, bug_id, &viewer.account_id, &severity.audit_text(), now)?;
            record.severity = severity;
        }
        if let Some(status) = patch.status.filter(|next| *next != record.status) {
            append_audit(&tx, bug_id, &viewer.account_id, status.audit_text(), now)?;
            record.status = status;
        }
        record.modified_at = now;
        db::update_bug(&tx, &record)?;
        db::touch_project(&tx, &record.project_id, now)?;
        tx.commit()?;
        info!(bug_id, actor = %viewer.username, "updated bug");

        Ok(BugView::from(self.load_bug(bug_id)?))
    }

    pub fn toggle_bug_status(
        &self,
        viewer: Option<&Viewer>,
        bug_id: &str,
    ) -> Result<BugView, AppError> {
        let current = self.load_bug(bug_id)?;
        let loaded = self.load_project(&current.bug.project_id)?;
        access::check_bug_mutation(viewer, &loaded.scope(), &current.bug.creator_id)?;
        let viewer = access::require_viewer(viewer)?;

        let now = now_utc();
        let mut record = current.bug;
        record.status = record.status.toggled();
        record.modified_at = now;

        let tx = self.conn.unchecked_transaction()?;
        append_audit(&tx, bug_id, &viewer.account_id, record.status.audit_text(), now)?;
        db::update_bug(&tx, &record)?;
        db::touch_project(&tx, &record.project_id, now)?;
        tx.commit()?;
        info!(bug_id, status = %record.status, actor = %viewer.username, "toggled bug status");

        if record.creator_id != viewer.account_id {
            self.notify(
                &record.creator_id,
                &format!("Bug {}", record.status.label().to_lowercase()),
                &format!(
                    "{} changed the status of '{}' to {}.",
                    viewer.username,
                    record.summary,
                    record.status.label()
                ),
            )?;
        }

        Ok(BugView::from(self.load_bug(bug_id)?))
    }

    pub fn delete_bug(&self, viewer: Option<&Viewer>, bug_id: &str) -> Result<(), AppError> {
        let current = self.load_bug(bug_id)?;
        let loaded = self.load_project(&current.bug.project_id)?;
        access::check_bug_mutation(viewer, &loaded.scope(), &current.bug.creator_id)?;

        let tx = self.conn.unchecked_transaction()?;
        db::delete_bug(&tx, bug_id)?;
        db::touch_project(&tx, &current.bug.project_id, now_utc())?;
        tx.commit()?;
        info!(bug_id, project_id = %current.bug.project_id, "deleted bug");
        Ok(())
    }

    pub fn show_bug(&self, viewer: Option<&Viewer>, bug_id: &str) -> Result<BugView, AppError> {
        let current = self.load_bug(bug_id)?;
        let loaded = self.load_project(&current.bug.project_id)?;
        access::check_view(viewer, &loaded.scope())?;
        Ok(BugView::from(current))
    }

    pub fn list_bugs(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
        page: usize,
    ) -> Result<Page<BugPreview>, AppError> {
        let filter = BugFilter {
            query: ListQuery {
                page,
                ..ListQuery::default()
            },
            ..BugFilter::default()
        };
        self.search_bugs(viewer, project_id, &filter)
    }

    pub fn search_bugs(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
        filter: &BugFilter,
    ) -> Result<Page<BugPreview>, AppError> {
        let loaded = self.load_project(project_id)?;
        let scope = loaded.scope();
        access::check_view(viewer, &scope)?;

        let bugs = db::list_bug_summaries(&self.conn, project_id)?;
        debug!(project_id, candidates = bugs.len(), "searching bugs");
        let page = listing::filter_bugs(bugs, filter, |bug| {
            bug.bug.project_id == project_id && access::can_view(viewer, &scope)
        });
        Ok(page.map(BugPreview::from))
    }

    pub fn count_bugs(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
    ) -> Result<usize, AppError> {
        let loaded = self.load_project(project_id)?;
        access::check_view(viewer, &loaded.scope())?;
        Ok(db::count_bugs(&self.conn, project_id)?)
    }
}
