use serde::Serialize;
use tracing::{info, warn};

use super::{
    new_id, optional_text, required_text, AccountView, App, AppError, PROTECTED_PROJECT_ID,
};
use crate::access::{self, Denial, Viewer};
use crate::auth;
use crate::config::SeedConfig;
use crate::db::{self, AccountRecord, ProjectRecord};
use crate::domain::account::AccountRole;
use crate::domain::now_utc;
use crate::domain::project::{ProjectPermission, Visibility};
use crate::listing::{paginate, Page, ACCOUNT_PAGE_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitSummary {
    pub superuser_id: String,
    pub superuser_created: bool,
    pub project_created: bool,
}

const PROTECTED_PROJECT_NAME: &str = "Bug tracker operations";
const PROTECTED_PROJECT_SUMMARY: &str = "Problems with the bug tracker itself.";

fn checked_password(password: &str) -> Result<String, AppError> {
    match auth::password_problem(password) {
        Some(problem) => Err(AppError::InvalidArgument(problem)),
        None => Ok(auth::hash_password(password)?),
    }
}

impl App {
    /// Creates the single super user and the operational project when they
    /// are missing. Safe to run repeatedly.
    pub fn init(
        &self,
        seed: &SeedConfig,
        superuser_password: Option<&str>,
    ) -> Result<InitSummary, AppError> {
        let tx = self.conn.unchecked_transaction()?;
        let now = now_utc();

        let (superuser_id, superuser_created) =
            match db::find_account_by_role(&tx, AccountRole::SuperUser)? {
                Some(existing) => (existing.id, false),
                None => {
                    let password = superuser_password.ok_or_else(|| {
                        AppError::InvalidArgument(
                            "a super user password is required on first init".to_string(),
                        )
                    })?;
                    let password_hash = checked_password(password)?;
                    let account = AccountRecord {
                        id: new_id(),
                        username: required_text("super user name", &seed.superuser_name)?,
                        email: optional_text(Some(&seed.superuser_email)),
                        icon: None,
                        role: AccountRole::SuperUser,
                        suspended: false,
                        password_hash,
                        created_at: now,
                    };
                    db::insert_account(&tx, &account)?;
                    (account.id, true)
                }
            };

        let project_created = if db::get_project_summary(&tx, PROTECTED_PROJECT_ID)?.is_none() {
            db::insert_project(
                &tx,
                &ProjectRecord {
                    id: PROTECTED_PROJECT_ID.to_string(),
                    name: PROTECTED_PROJECT_NAME.to_string(),
                    summary: PROTECTED_PROJECT_SUMMARY.to_string(),
                    link: None,
                    visibility: Visibility::Public,
                    description: None,
                    formatted_description: None,
                    tags: Vec::new(),
                    owner_id: superuser_id.clone(),
                    created_at: now,
                    modified_at: now,
                },
            )?;
            db::insert_permission(
                &tx,
                &new_id(),
                PROTECTED_PROJECT_ID,
                &superuser_id,
                ProjectPermission::Owner,
                now,
            )?;
            true
        } else {
            false
        };

        tx.commit()?;
        info!(superuser_created, project_created, "initialized tracker");
        Ok(InitSummary {
            superuser_id,
            superuser_created,
            project_created,
        })
    }

    pub fn register(&self, input: &Registration) -> Result<AccountView, AppError> {
        let username = required_text("username", &input.username)?;
        let password_hash = checked_password(&input.password)?;
        if db::find_account_by_username(&self.conn, &username)?.is_some() {
            return Err(AppError::InvalidArgument(format!(
                "username '{username}' is already taken"
            )));
        }

        let account = AccountRecord {
            id: new_id(),
            username,
            email: optional_text(input.email.as_deref()),
            icon: None,
            role: AccountRole::Normal,
            suspended: false,
            password_hash,
            created_at: now_utc(),
        };
        let tx = self.conn.unchecked_transaction()?;
        db::insert_account(&tx, &account)?;
        tx.commit()?;
        info!(account_id = %account.id, username = %account.username, "registered account");
        Ok(AccountView::from(account))
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<Viewer, AppError> {
        let account = db::find_account_by_username(&self.conn, username)?;
        auth::check_credentials(account, password).map_err(|denial| match denial {
            Denial::NotAuthenticated => {
                AppError::NotAuthenticated("incorrect username or password".to_string())
            }
            other => AppError::from(other),
        })
    }

    pub fn verify_username(&self, username: &str) -> Result<bool, AppError> {
        Ok(db::find_account_by_username(&self.conn, username)?.is_some())
    }

    pub fn list_accounts(
        &self,
        viewer: Option<&Viewer>,
        page: usize,
    ) -> Result<Page<AccountView>, AppError> {
        access::check_admin(viewer)?;
        let accounts = db::list_accounts(&self.conn)?;
        Ok(paginate(accounts, page, ACCOUNT_PAGE_SIZE).map(AccountView::from))
    }

    pub fn toggle_suspension(
        &self,
        viewer: Option<&Viewer>,
        account_id: &str,
    ) -> Result<AccountView, AppError> {
        let admin = access::check_admin(viewer)?;
        let target = self.account(account_id)?;
        if target.role == AccountRole::SuperUser {
            return Err(AppError::Forbidden(
                "the super user cannot be suspended".to_string(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        db::set_account_suspended(&tx, account_id, !target.suspended)?;
        tx.commit()?;
        warn!(
            account_id,
            suspended = !target.suspended,
            actor = %admin.username,
            "changed account suspension"
        );
        Ok(AccountView::from(self.account(account_id)?))
    }

    pub fn set_role(
        &self,
        viewer: Option<&Viewer>,
        account_id: &str,
        role: AccountRole,
    ) -> Result<AccountView, AppError> {
        let admin = access::check_admin(viewer)?;
        if !role.is_assignable() {
            return Err(AppError::InvalidArgument(format!(
                "role '{}' cannot be assigned",
                role.label()
            )));
        }
        let target = self.account(account_id)?;
        if target.role == AccountRole::SuperUser {
            return Err(AppError::Forbidden(
                "the super user's role cannot be changed".to_string(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        db::set_account_role(&tx, account_id, role)?;
        tx.commit()?;
        info!(account_id, %role, actor = %admin.username, "changed account role");
        Ok(AccountView::from(self.account(account_id)?))
    }

    pub fn rename_account(
        &self,
        viewer: Option<&Viewer>,
        new_username: &str,
    ) -> Result<AccountView, AppError> {
        let viewer = access::require_viewer(viewer)?;
        let username = required_text("username", new_username)?;
        if let Some(existing) = db::find_account_by_username(&self.conn, &username)? {
            if existing.id != viewer.account_id {
                return Err(AppError::InvalidArgument(format!(
                    "username '{username}' is already taken"
                )));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        db::set_account_username(&tx, &viewer.account_id, &username)?;
        tx.commit()?;
        info!(
            account_id = %viewer.account_id,
            from = %viewer.username,
            to = %username,
            "renamed account"
        );
        Ok(AccountView::from(self.account(&viewer.account_id)?))
    }

    pub fn update_email(
        &self,
        viewer: Option<&Viewer>,
        email: Option<&str>,
    ) -> Result<AccountView, AppError> {
        let viewer = access::require_viewer(viewer)?;
        let tx = self.conn.unchecked_transaction()?;
        db::set_account_email(&tx, &viewer.account_id, optional_text(email).as_deref())?;
        tx.commit()?;
        info!(account_id = %viewer.account_id, "updated account email");
        Ok(AccountView::from(self.account(&viewer.account_id)?))
    }

    /// Stores a reference to an icon; the image itself lives elsewhere.
    pub fn set_icon(
        &self,
        viewer: Option<&Viewer>,
        icon: Option<&str>,
    ) -> Result<AccountView, AppError> {
        let viewer = access::require_viewer(viewer)?;
        let tx = self.conn.unchecked_transaction()?;
        db::set_account_icon(&tx, &viewer.account_id, optional_text(icon).as_deref())?;
        tx.commit()?;
        Ok(AccountView::from(self.account(&viewer.account_id)?))
    }

    pub fn change_password(
        &self,
        viewer: Option<&Viewer>,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let viewer = access::require_viewer(viewer)?;
        let account = self.account(&viewer.account_id)?;
        if !auth::verify_password(old_password, &account.password_hash) {
            return Err(AppError::NotAuthenticated(
                "current password is incorrect".to_string(),
            ));
        }
        let password_hash = checked_password(new_password)?;

        let tx = self.conn.unchecked_transaction()?;
        db::set_account_password(&tx, &account.id, &password_hash)?;
        tx.commit()?;
        info!(account_id = %account.id, "changed password");
        Ok(())
    }

    /// Removes the viewer's own account. Returns how many replies to the
    /// account's comments were tombstoned.
    pub fn delete_account(
        &self,
        viewer: Option<&Viewer>,
        account_id: &str,
    ) -> Result<usize, AppError> {
        let viewer = access::require_viewer(viewer)?;
        if viewer.account_id != account_id {
            return Err(AppError::Forbidden(
                "accounts can only delete themselves".to_string(),
            ));
        }
        let target = self.account(account_id)?;
        if target.role == AccountRole::SuperUser {
            return Err(AppError::Forbidden(
                "the super user cannot be deleted".to_string(),
            ));
        }
        if db::get_project_summary(&self.conn, PROTECTED_PROJECT_ID)?
            .is_some_and(|project| project.project.owner_id == account_id)
        {
            return Err(AppError::Forbidden(
                "the owner of the operational project cannot be deleted".to_string(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        let tombstoned = db::delete_account(&tx, account_id)?;
        tx.commit()?;
        warn!(account_id, username = %target.username, tombstoned, "deleted account");
        Ok(tombstoned)
    }

    fn account(&self, id: &str) -> Result<AccountRecord, AppError> {
        db::get_account(&self.conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("account '{id}' not found")))
    }
}
