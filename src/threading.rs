use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::db::CommentEntry;

const PREVIEW_CHARS: usize = 100;
const PREVIEW_LIMIT: usize = PREVIEW_CHARS + 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyPreview {
    pub text: String,
    pub owner_id: String,
    pub owner_name: String,
    pub owner_icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyContext {
    pub comment_id: String,
    /// `None` once the target has been deleted.
    pub preview: Option<ReplyPreview>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: String,
    pub bug_id: String,
    pub text: String,
    pub owner_id: String,
    pub owner_name: String,
    pub owner_icon: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub posted_at: OffsetDateTime,
    pub edited: bool,
    pub is_status_update: bool,
    pub reply: Option<ReplyContext>,
}

/// Resolves reply targets inside `window` (the comments of one bug) and
/// embeds a preview of each live target.
pub fn attach_reply_context(window: &[CommentEntry]) -> Vec<CommentView> {
    let by_id: HashMap<&str, &CommentEntry> = window
        .iter()
        .map(|entry| (entry.comment.id.as_str(), entry))
        .collect();

    window
        .iter()
        .map(|entry| {
            let comment = &entry.comment;
            let reply = comment.reply_to_id.as_ref().map(|target_id| ReplyContext {
                comment_id: target_id.clone(),
                preview: if comment.is_reply_deleted {
                    None
                } else {
                    by_id.get(target_id.as_str()).map(|target| preview_of(target))
                },
            });
            CommentView {
                id: comment.id.clone(),
                bug_id: comment.bug_id.clone(),
                text: comment.text.clone(),
                owner_id: comment.owner_id.clone(),
                owner_name: entry.owner_name.clone(),
                owner_icon: entry.owner_icon.clone(),
                posted_at: comment.posted_at,
                edited: comment.edited,
                is_status_update: comment.is_status_update,
                reply,
            }
        })
        .collect()
}

fn preview_of(target: &CommentEntry) -> ReplyPreview {
    ReplyPreview {
        text: truncate_preview(&target.comment.text),
        owner_id: target.comment.owner_id.clone(),
        owner_name: target.owner_name.clone(),
        owner_icon: target.owner_icon.clone(),
    }
}

pub fn truncate_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_LIMIT {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
