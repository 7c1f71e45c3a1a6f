use tracing::info;

use super::{new_id, App, AppError, PermissionView};
use crate::access::{self, Viewer};
use crate::db::{self, AccountRecord};
use crate::domain::now_utc;
use crate::domain::project::ProjectPermission;
use crate::listing::{paginate, Page, PERMISSION_PAGE_SIZE};

fn assignable(level: ProjectPermission) -> Result<ProjectPermission, AppError> {
    if level.is_assignable() {
        Ok(level)
    } else {
        Err(AppError::InvalidArgument(format!(
            "permission level '{}' cannot be assigned",
            level.label()
        )))
    }
}

impl App {
    /// Every grant on the project ordered by username. Owner only.
    pub fn list_permissions(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
        page: usize,
    ) -> Result<Page<PermissionView>, AppError> {
        let loaded = self.load_project(project_id)?;
        access::check_manage(viewer, &loaded.scope())?;
        let records = db::list_project_permissions(&self.conn, project_id)?;
        Ok(paginate(records, page, PERMISSION_PAGE_SIZE).map(PermissionView::from))
    }

    pub fn grant_permission(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
        username: &str,
        level: ProjectPermission,
    ) -> Result<PermissionView, AppError> {
        let loaded = self.load_project(project_id)?;
        access::check_manage(viewer, &loaded.scope())?;
        let level = assignable(level)?;
        let target = self.grantable_account(project_id, &loaded.record().owner_id, username)?;

        let id = new_id();
        let tx = self.conn.unchecked_transaction()?;
        db::insert_permission(&tx, &id, project_id, &target.id, level, now_utc())?;
        tx.commit()?;
        info!(
            permission_id = %id,
            project_id,
            grantee = %target.username,
            %level,
            "granted permission"
        );

        self.notify(
            &target.id,
            "Project access granted",
            &format!(
                "You now have {} access to '{}'.",
                level.label(),
                loaded.record().name
            ),
        )?;
        self.permission_view(&id)
    }

    pub fn update_permission(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
        permission_id: &str,
        level: ProjectPermission,
    ) -> Result<PermissionView, AppError> {
        let loaded = self.load_project(project_id)?;
        access::check_manage(viewer, &loaded.scope())?;
        let level = assignable(level)?;
        let record = self.managed_permission(project_id, permission_id)?;

        let tx = self.conn.unchecked_transaction()?;
        db::set_permission_level(&tx, permission_id, level)?;
        tx.commit()?;
        info!(permission_id, project_id, %level, "updated permission");

        self.notify(
            &record.account_id,
            "Project access changed",
            &format!(
                "Your access to '{}' is now {}.",
                loaded.record().name,
                level.label()
            ),
        )?;
        self.permission_view(permission_id)
    }

    pub fn revoke_permission(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
        permission_id: &str,
    ) -> Result<(), AppError> {
        let loaded = self.load_project(project_id)?;
        access::check_manage(viewer, &loaded.scope())?;
        let record = self.managed_permission(project_id, permission_id)?;

        let tx = self.conn.unchecked_transaction()?;
        db::delete_permission(&tx, permission_id)?;
        tx.commit()?;
        info!(permission_id, project_id, grantee = %record.username, "revoked permission");
        Ok(())
    }

    /// True when `username` could receive a grant on the project.
    pub fn check_grant_username(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
        username: &str,
    ) -> Result<bool, AppError> {
        access::require_viewer(viewer)?;
        let loaded = self.load_project(project_id)?;
        self.grantable_account(project_id, &loaded.record().owner_id, username)?;
        Ok(true)
    }

    /// True when the viewer owns the project or holds exactly `level` on it.
    pub fn validate_permission(
        &self,
        viewer: Option<&Viewer>,
        project_id: &str,
        level: ProjectPermission,
    ) -> Result<bool, AppError> {
        let viewer = access::require_viewer(viewer)?;
        let loaded = self.load_project(project_id)?;
        if loaded.scope().is_owner(viewer) {
            return Ok(true);
        }
        let held = db::find_permission(&self.conn, project_id, &viewer.account_id)?;
        match held {
            Some(record) if record.level == level => Ok(true),
            _ => Err(AppError::Forbidden(format!(
                "you do not hold {} access to this project",
                level.label()
            ))),
        }
    }

    fn grantable_account(
        &self,
        project_id: &str,
        owner_id: &str,
        username: &str,
    ) -> Result<AccountRecord, AppError> {
        let account = db::find_account_by_username(&self.conn, username)?
            .ok_or_else(|| {
                AppError::NotFound(format!("user '{}' does not exist", username.trim()))
            })?;
        if account.id == owner_id {
            return Err(AppError::InvalidArgument(
                "the project owner cannot be given a permission".to_string(),
            ));
        }
        if db::find_permission(&self.conn, project_id, &account.id)?.is_some() {
            return Err(AppError::InvalidArgument(format!(
                "user '{}' already has a permission for this project",
                account.username
            )));
        }
        Ok(account)
    }

    fn managed_permission(
        &self,
        project_id: &str,
        permission_id: &str,
    ) -> Result<db::PermissionRecord, AppError> {
        let record = db::get_permission(&self.conn, permission_id)?.ok_or_else(|| {
            AppError::NotFound(format!("permission '{permission_id}' not found"))
        })?;
        if record.project_id != project_id {
            return Err(AppError::InvalidArgument(format!(
                "permission '{permission_id}' does not belong to project '{project_id}'"
            )));
        }
        if record.level == ProjectPermission::Owner {
            return Err(AppError::Forbidden(
                "the owner permission cannot be changed".to_string(),
            ));
        }
        Ok(record)
    }

    fn permission_view(&self, id: &str) -> Result<PermissionView, AppError> {
        db::get_permission(&self.conn, id)?
            .map(PermissionView::from)
            .ok_or_else(|| AppError::NotFound(format!("permission '{id}' not found")))
    }
}
