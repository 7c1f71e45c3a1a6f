use std::cmp::Ordering;

use serde::Serialize;
use time::OffsetDateTime;

use crate::db::{BugSummary, ProjectSummary};
use crate::domain::bug::{Severity, Status};
use crate::domain::project::OpenBugFilter;
use crate::domain::query::{DateField, SortKey, SortOrder};

pub const PROJECT_PAGE_SIZE: usize = 30;
pub const BUG_PAGE_SIZE: usize = 20;
pub const COMMENT_PAGE_SIZE: usize = 20;
pub const PERMISSION_PAGE_SIZE: usize = 20;
pub const ACCOUNT_PAGE_SIZE: usize = 20;
pub const RECENT_PROJECTS: usize = 5;

/// Anything the filter-sort-paginate pipeline can run over.
pub trait Listable {
    fn id(&self) -> &str;
    fn sort_name(&self) -> &str;
    fn timestamp(&self, field: DateField) -> OffsetDateTime;
    /// `token` is already lower-cased.
    fn matches_token(&self, token: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::LastUpdated,
            order: SortOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub text: Option<String>,
    pub date_field: DateField,
    pub date_from: Option<OffsetDateTime>,
    pub date_to: Option<OffsetDateTime>,
    pub sort: Option<SortSpec>,
    pub page: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub query: ListQuery,
    pub bug_state: OpenBugFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugFilter {
    pub query: ListQuery,
    pub creator_name: Option<String>,
    pub severities: Vec<Severity>,
    pub statuses: Vec<Status>,
    pub unpaged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Cuts one 1-based page out of an already ordered list. Page 0 reads as 1.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let total = items.len();
    let skip = (page - 1).saturating_mul(page_size);
    Page {
        total,
        page,
        page_size,
        items: items.into_iter().skip(skip).take(page_size).collect(),
    }
}

/// Runs visibility, text search, facets, date range, sort and pagination in
/// that order. `page_size: None` returns the whole filtered set as one page.
pub fn apply<T: Listable>(
    items: Vec<T>,
    query: &ListQuery,
    page_size: Option<usize>,
    visible: impl Fn(&T) -> bool,
    facets: impl Fn(&T) -> bool,
) -> Page<T> {
    let tokens = search_tokens(query.text.as_deref());
    let mut matched: Vec<T> = items
        .into_iter()
        .filter(|item| visible(item))
        .filter(|item| matches_any_token(&tokens, |token| item.matches_token(token)))
        .filter(|item| facets(item))
        .filter(|item| {
            within_range(
                item.timestamp(query.date_field),
                query.date_from,
                query.date_to,
            )
        })
        .collect();

    sort_items(&mut matched, query.sort.unwrap_or_default());

    match page_size {
        Some(size) => paginate(matched, query.page, size),
        None => Page {
            total: matched.len(),
            page: 1,
            page_size: matched.len(),
            items: matched,
        },
    }
}

pub fn filter_projects(
    projects: Vec<ProjectSummary>,
    filter: &ProjectFilter,
    page_size: usize,
    visible: impl Fn(&ProjectSummary) -> bool,
) -> Page<ProjectSummary> {
    apply(projects, &filter.query, Some(page_size), visible, |project| {
        filter.bug_state.accepts(project.open_bugs)
    })
}

pub fn filter_bugs(
    bugs: Vec<BugSummary>,
    filter: &BugFilter,
    visible: impl Fn(&BugSummary) -> bool,
) -> Page<BugSummary> {
    let creator_tokens = search_tokens(filter.creator_name.as_deref());
    let page_size = (!filter.unpaged).then_some(BUG_PAGE_SIZE);
    apply(bugs, &filter.query, page_size, visible, |bug| {
        let creator_matches = matches_any_token(&creator_tokens, |token| {
            bug.creator_name.to_lowercase().contains(token)
        });
        let severity_matches =
            filter.severities.is_empty() || filter.severities.contains(&bug.bug.severity);
        let status_matches =
            filter.statuses.is_empty() || filter.statuses.contains(&bug.bug.status);
        creator_matches && severity_matches && status_matches
    })
}

fn normalize_scalar(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

fn search_tokens(raw: Option<&str>) -> Vec<String> {
    normalize_scalar(raw)
        .map(|text| text.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// No tokens means no text filter.
fn matches_any_token(tokens: &[String], matches: impl Fn(&str) -> bool) -> bool {
    tokens.is_empty() || tokens.iter().any(|token| matches(token))
}

fn within_range(
    value: OffsetDateTime,
    from: Option<OffsetDateTime>,
    to: Option<OffsetDateTime>,
) -> bool {
    match (from, to) {
        (None, None) => true,
        (Some(lower), None) => value >= lower,
        (None, Some(upper)) => value <= upper,
        (Some(a), Some(b)) => value >= a.min(b) && value <= a.max(b),
    }
}

fn sort_items<T: Listable>(items: &mut [T], spec: SortSpec) {
    items.sort_by(|left, right| {
        let primary = match spec.key {
            SortKey::Name => left
                .sort_name()
                .to_lowercase()
                .cmp(&right.sort_name().to_lowercase()),
            SortKey::CreatedDate => left
                .timestamp(DateField::Created)
                .cmp(&right.timestamp(DateField::Created)),
            SortKey::LastUpdated => left
                .timestamp(DateField::LastUpdated)
                .cmp(&right.timestamp(DateField::LastUpdated)),
        };
        let primary = match spec.order {
            SortOrder::Ascending => primary,
            SortOrder::Descending => primary.reverse(),
        };
        match primary {
            Ordering::Equal => left.id().cmp(right.id()),
            other => other,
        }
    });
}

impl Listable for ProjectSummary {
    fn id(&self) -> &str {
        &self.project.id
    }

    fn sort_name(&self) -> &str {
        &self.project.name
    }

    fn timestamp(&self, field: DateField) -> OffsetDateTime {
        match field {
            DateField::Created => self.project.created_at,
            DateField::LastUpdated => self.project.modified_at,
        }
    }

    fn matches_token(&self, token: &str) -> bool {
        self.project.name.to_lowercase().contains(token)
            || self.project.summary.to_lowercase().contains(token)
            || self
                .project
                .tags
                .iter()
                .any(|tag| tag.to_lowercase() == token)
    }
}

impl Listable for BugSummary {
    fn id(&self) -> &str {
        &self.bug.id
    }

    fn sort_name(&self) -> &str {
        &self.bug.summary
    }

    fn timestamp(&self, field: DateField) -> OffsetDateTime {
        match field {
            DateField::Created => self.bug.created_at,
            DateField::LastUpdated => self.bug.modified_at,
        }
    }

    fn matches_token(&self, token: &str) -> bool {
        self.bug.summary.to_lowercase().contains(token)
            || self
                .bug
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(token))
    }
}
