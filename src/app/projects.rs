use tracing::info;

use super::{
    new_id, optional_text, required_text, scope_of, App, AppError, ProjectPreview, ProjectView,
    PROTECTED_PROJECT_ID,
};
use crate::access::{self, Grant, Viewer};
use crate::db::{self, ProjectRecord, ProjectSummary};
use crate::domain::now_utc;
use crate::domain::project::{ProjectPermission, Visibility};
use crate::listing::{self, ListQuery, Page, ProjectFilter, PROJECT_PAGE_SIZE, RECENT_PROJECTS};

/// Fields for creating a project, and the optional overrides for updating one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectInput {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    pub visibility: Option<Visibility>,
    pub description: Option<String>,
    pub formatted_description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Trims, drops empties and removes case-insensitive duplicates, keeping the
/// first spelling.
pub(crate) fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    let mut out = Vec::new();
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        let folded = trimmed.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        out.push(trimmed.to_string());
    }
    out
}

impl App {
    pub fn create_project(
        &self,
        viewer: Option<&Viewer>,
        input: &ProjectInput,
    ) -> Result<ProjectView, AppError> {
        let viewer = access::require_viewer(viewer)?;
        let name = required_text("project name", input.name.as_deref().unwrap_or_default())?;
        let summary = required_text(
            "project summary",
            input.summary.as_deref().unwrap_or_default(),
        )?;
        let now = now_utc();
        let record = ProjectRecord {
            id: new_id(),
            name,
            summary,
            link: optional_text(input.link.as_deref()),
            visibility: input.visibility.unwrap_or(Visibility::Public),
            description: optional_text(input.description.as_deref()),
            formatted_description: optional_text(input.formatted_description.as_deref()),
            tags: normalize_tags(input.tags.as_deref().unwrap_or_default()),
            owner_id: viewer.account_id.clone(),
            created_at: now,
            modified_at: now,
        };

        let tx = self.conn.unchecked_transaction()?;
        db::insert_project(&tx, &record)?;
        db::insert_permission(
            &tx,
            &new_id(),
            &record.id,
            &viewer.account_id,
            ProjectPermission::Owner,
            now,
        )?;
        tx.commit()?;
        info!(project_id = %record.id, actor = %viewer.username, "created project");

        self.project_view(&record.id)
    }

    pub fn update_project(
        &self,
        viewer: Option<&Viewer>,
        id: &str,
        input: &ProjectInput,
    ) -> Result<ProjectView, AppError> {
        let loaded = self.load_project(id)?;
        access::check_manage(viewer, &loaded.scope())?;

        let mut record = loaded.record().clone();
        if let Some(name) = input.name.as_deref() {
            record.name = required_text("project name", name)?;
        }
        if let Some(summary) = input.summary.as_deref() {
            record.summary = required_text("project summary", summary)?;
        }
        if let Some(link) = input.link.as_deref() {
            record.link = optional_text(Some(link));
        }
        if let Some(visibility) = input.visibility {
            record.visibility = visibility;
        }
        if let Some(description) = input.description.as_deref() {
            record.description = optional_text(Some(description));
        }
        if let Some(formatted) = input.formatted_description.as_deref() {
            record.formatted_description = optional_text(Some(formatted));
        }
        if let Some(tags) = input.tags.as_deref() {
            record.tags = normalize_tags(tags);
        }
        record.modified_at = now_utc();

        let tx = self.conn.unchecked_transaction()?;
        db::update_project(&tx, &record)?;
        tx.commit()?;
        info!(project_id = %id, "updated project");

        self.project_view(id)
    }

    pub fn delete_project(&self, viewer: Option<&Viewer>, id: &str) -> Result<(), AppError> {
        let loaded = self.load_project(id)?;
        if id == PROTECTED_PROJECT_ID {
            return Err(AppError::Forbidden(
                "the operational project cannot be deleted".to_string(),
            ));
        }
        access::check_manage(viewer, &loaded.scope())?;

        let tx = self.conn.unchecked_transaction()?;
        db::delete_project(&tx, id)?;
        tx.commit()?;
        info!(project_id = %id, bugs = loaded.summary.total_bugs, "deleted project");
        Ok(())
    }

    pub fn show_project(
        &self,
        viewer: Option<&Viewer>,
        id: &str,
    ) -> Result<ProjectView, AppError> {
        let loaded = self.load_project(id)?;
        access::check_view(viewer, &loaded.scope())?;
        Ok(ProjectView::from(loaded.summary))
    }

    pub fn list_projects(
        &self,
        viewer: Option<&Viewer>,
        page: usize,
    ) -> Result<Page<ProjectPreview>, AppError> {
        let filter = ProjectFilter {
            query: ListQuery {
                page,
                ..ListQuery::default()
            },
            ..ProjectFilter::default()
        };
        self.search_projects(viewer, &filter)
    }

    pub fn search_projects(
        &self,
        viewer: Option<&Viewer>,
        filter: &ProjectFilter,
    ) -> Result<Page<ProjectPreview>, AppError> {
        let projects = db::list_project_summaries(&self.conn)?;
        let grants = self.viewer_grants(viewer)?;
        let page = listing::filter_projects(projects, filter, PROJECT_PAGE_SIZE, |project| {
            let held = grants
                .get(&project.project.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            access::can_view(viewer, &scope_of(&project.project, held))
        });
        Ok(page.map(ProjectPreview::from))
    }

    /// The most recently modified projects the viewer can see, or with `mine`
    /// the viewer's own projects.
    pub fn recent_projects(
        &self,
        viewer: Option<&Viewer>,
        mine: bool,
    ) -> Result<Vec<ProjectPreview>, AppError> {
        let projects = db::list_project_summaries(&self.conn)?;
        let grants = self.viewer_grants(viewer)?;
        let owner_id = if mine {
            Some(access::require_viewer(viewer)?.account_id.as_str())
        } else {
            None
        };
        let page = listing::apply(
            projects,
            &ListQuery::default(),
            Some(RECENT_PROJECTS),
            |project: &ProjectSummary| match owner_id {
                Some(owner_id) => project.project.owner_id == owner_id,
                None => {
                    let held: &[Grant] = grants
                        .get(&project.project.id)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    access::can_view(viewer, &scope_of(&project.project, held))
                }
            },
            |_| true,
        );
        Ok(page.items.into_iter().map(ProjectPreview::from).collect())
    }

    pub fn count_projects(&self, viewer: Option<&Viewer>) -> Result<usize, AppError> {
        let filter = ProjectFilter::default();
        Ok(self.search_projects(viewer, &filter)?.total)
    }

    pub fn can_view_project(&self, viewer: Option<&Viewer>, id: &str) -> Result<bool, AppError> {
        let loaded = self.load_project(id)?;
        access::check_view(viewer, &loaded.scope())?;
        Ok(true)
    }

    pub fn can_edit_project(&self, viewer: Option<&Viewer>, id: &str) -> Result<bool, AppError> {
        let loaded = self.load_project(id)?;
        access::check_contribute(viewer, &loaded.scope())?;
        Ok(true)
    }

    pub(super) fn project_view(&self, id: &str) -> Result<ProjectView, AppError> {
        let summary = db::get_project_summary(&self.conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("project '{id}' not found")))?;
        Ok(ProjectView::from(summary))
    }
}
