use tracing::info;

use super::{new_id, required_text, App, AppError};
use crate::access::{self, Viewer};
use crate::db::{self, CommentEntry, CommentRecord};
use crate::domain::now_utc;
use crate::listing::{paginate, Page, COMMENT_PAGE_SIZE};
use crate::threading::{attach_reply_context, CommentView};

impl App {
    /// One page of a bug's comments, oldest first, with reply previews
    /// resolved against the whole bug.
    pub fn list_comments(
        &self,
        viewer: Option<&Viewer>,
        bug_id: &str,
        page: usize,
    ) -> Result<Page<CommentView>, AppError> {
        let bug = self.load_bug(bug_id)?;
        let loaded = self.load_project(&bug.bug.project_id)?;
        access::check_view(viewer, &loaded.scope())?;

        let entries = db::list_comment_entries(&self.conn, bug_id)?;
        Ok(paginate(
            attach_reply_context(&entries),
            page,
            COMMENT_PAGE_SIZE,
        ))
    }

    pub fn add_comment(
        &self,
        viewer: Option<&Viewer>,
        bug_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<CommentView, AppError> {
        let bug = self.load_bug(bug_id)?;
        let loaded = self.load_project(&bug.bug.project_id)?;
        access::check_contribute(viewer, &loaded.scope())?;
        let viewer = access::require_viewer(viewer)?;
        let text = required_text("comment text", text)?;

        if let Some(target_id) = reply_to {
            let same_bug = db::get_comment_entry(&self.conn, target_id)?
                .is_some_and(|target| target.comment.bug_id == bug_id);
            if !same_bug {
                return Err(AppError::InvalidArgument(format!(
                    "comment '{target_id}' is not a comment on bug '{bug_id}'"
                )));
            }
        }

        let now = now_utc();
        let record = CommentRecord {
            id: new_id(),
            bug_id: bug_id.to_string(),
            owner_id: viewer.account_id.clone(),
            text,
            posted_at: now,
            edited: false,
            is_status_update: false,
            reply_to_id: reply_to.map(str::to_string),
            is_reply_deleted: false,
        };

        let tx = self.conn.unchecked_transaction()?;
        db::insert_comment(&tx, &record)?;
        db::touch_bug(&tx, bug_id, now)?;
        db::touch_project(&tx, &bug.bug.project_id, now)?;
        tx.commit()?;
        info!(comment_id = %record.id, bug_id, actor = %viewer.username, "added comment");

        if bug.bug.creator_id != viewer.account_id {
            self.notify(
                &bug.bug.creator_id,
                "New comment",
                &format!(
                    "{} commented on '{}': {}",
                    viewer.username, bug.bug.summary, record.text
                ),
            )?;
        }

        self.comment_view(bug_id, &record.id)
    }

    pub fn edit_comment(
        &self,
        viewer: Option<&Viewer>,
        comment_id: &str,
        text: &str,
    ) -> Result<CommentView, AppError> {
        let viewer = access::require_viewer(viewer)?;
        let entry = self.owned_comment(viewer, comment_id)?;
        let text = required_text("comment text", text)?;
        let bug = self.load_bug(&entry.comment.bug_id)?;

        let now = now_utc();
        let tx = self.conn.unchecked_transaction()?;
        db::update_comment_text(&tx, comment_id, &text)?;
        db::touch_bug(&tx, &bug.bug.id, now)?;
        db::touch_project(&tx, &bug.bug.project_id, now)?;
        tx.commit()?;
        info!(comment_id, actor = %viewer.username, "edited comment");

        self.comment_view(&bug.bug.id, comment_id)
    }

    /// Deletes the comment and returns how many replies were tombstoned.
    pub fn delete_comment(
        &self,
        viewer: Option<&Viewer>,
        comment_id: &str,
    ) -> Result<usize, AppError> {
        let viewer = access::require_viewer(viewer)?;
        let entry = self.owned_comment(viewer, comment_id)?;
        let bug = self.load_bug(&entry.comment.bug_id)?;

        let now = now_utc();
        let tx = self.conn.unchecked_transaction()?;
        let tombstoned = db::mark_replies_deleted(&tx, comment_id)?;
        db::delete_comment(&tx, comment_id)?;
        db::touch_bug(&tx, &bug.bug.id, now)?;
        db::touch_project(&tx, &bug.bug.project_id, now)?;
        tx.commit()?;
        info!(comment_id, tombstoned, actor = %viewer.username, "deleted comment");

        Ok(tombstoned)
    }

    pub fn can_add_comment(
        &self,
        viewer: Option<&Viewer>,
        bug_id: &str,
    ) -> Result<bool, AppError> {
        let bug = self.load_bug(bug_id)?;
        let loaded = self.load_project(&bug.bug.project_id)?;
        access::check_contribute(viewer, &loaded.scope())?;
        Ok(true)
    }

    /// Loads a comment the viewer wrote. Audit comments are never editable.
    fn owned_comment(&self, viewer: &Viewer, comment_id: &str) -> Result<CommentEntry, AppError> {
        let entry = db::get_comment_entry(&self.conn, comment_id)?
            .ok_or_else(|| AppError::NotFound(format!("comment '{comment_id}' not found")))?;
        if entry.comment.is_status_update {
            return Err(AppError::Forbidden(
                "status update comments cannot be changed".to_string(),
            ));
        }
        if entry.comment.owner_id != viewer.account_id {
            return Err(AppError::Forbidden(
                "only the author can change a comment".to_string(),
            ));
        }
        Ok(entry)
    }

    fn comment_view(&self, bug_id: &str, comment_id: &str) -> Result<CommentView, AppError> {
        let entries = db::list_comment_entries(&self.conn, bug_id)?;
        attach_reply_context(&entries)
            .into_iter()
            .find(|view| view.id == comment_id)
            .ok_or_else(|| AppError::NotFound(format!("comment '{comment_id}' not found")))
    }
}
