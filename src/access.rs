//! Visibility and edit rules for projects and their bugs.
//!
//! Every check takes the viewer explicitly (`None` is anonymous) and compares
//! accounts by id. Nothing here reads storage; callers load the project scope
//! and the viewer's grants first.

use crate::domain::account::AccountRole;
use crate::domain::project::{ProjectPermission, Visibility};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub account_id: String,
    pub username: String,
    pub role: AccountRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub account_id: String,
    pub level: ProjectPermission,
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectScope<'a> {
    pub owner_id: &'a str,
    pub visibility: Visibility,
    pub grants: &'a [Grant],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("authentication required")]
    NotAuthenticated,
    #[error("not permitted")]
    Forbidden,
}

impl Viewer {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl ProjectScope<'_> {
    pub fn is_owner(&self, viewer: &Viewer) -> bool {
        self.owner_id == viewer.account_id
    }

    fn grant_for(&self, viewer: &Viewer) -> Option<ProjectPermission> {
        self.grants
            .iter()
            .find(|grant| grant.account_id == viewer.account_id)
            .map(|grant| grant.level)
    }
}

fn authenticated(viewer: Option<&Viewer>) -> Result<&Viewer, Denial> {
    viewer.ok_or(Denial::NotAuthenticated)
}

pub fn check_view(viewer: Option<&Viewer>, project: &ProjectScope<'_>) -> Result<(), Denial> {
    match project.visibility {
        Visibility::Public => Ok(()),
        Visibility::LoggedInOnly => authenticated(viewer).map(|_| ()),
        Visibility::Restricted => {
            let viewer = authenticated(viewer)?;
            if project.is_owner(viewer) || project.grant_for(viewer).is_some() {
                Ok(())
            } else {
                Err(Denial::Forbidden)
            }
        }
    }
}

pub fn can_view(viewer: Option<&Viewer>, project: &ProjectScope<'_>) -> bool {
    check_view(viewer, project).is_ok()
}

/// Owner or an `Editor` grant. Used for creating bugs and comments.
pub fn check_contribute(
    viewer: Option<&Viewer>,
    project: &ProjectScope<'_>,
) -> Result<(), Denial> {
    let viewer = authenticated(viewer)?;
    if project.is_owner(viewer)
        || project
            .grant_for(viewer)
            .is_some_and(ProjectPermission::can_contribute)
    {
        Ok(())
    } else {
        Err(Denial::Forbidden)
    }
}

pub fn check_manage(viewer: Option<&Viewer>, project: &ProjectScope<'_>) -> Result<(), Denial> {
    let viewer = authenticated(viewer)?;
    if project.is_owner(viewer) {
        Ok(())
    } else {
        Err(Denial::Forbidden)
    }
}

pub fn check_bug_mutation(
    viewer: Option<&Viewer>,
    project: &ProjectScope<'_>,
    bug_creator_id: &str,
) -> Result<(), Denial> {
    let viewer = authenticated(viewer)?;
    if project.is_owner(viewer) || viewer.account_id == bug_creator_id {
        Ok(())
    } else {
        Err(Denial::Forbidden)
    }
}

pub fn check_admin(viewer: Option<&Viewer>) -> Result<&Viewer, Denial> {
    let viewer = authenticated(viewer)?;
    if viewer.is_admin() {
        Ok(viewer)
    } else {
        Err(Denial::Forbidden)
    }
}

pub fn require_viewer(viewer: Option<&Viewer>) -> Result<&Viewer, Denial> {
    authenticated(viewer)
}
