use clap::{Args, Subcommand};

use crate::domain::account::AccountRole;
use crate::domain::project::ProjectPermission;

#[derive(Debug, Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum AccountSubcommands {
    #[command(about = "Create a normal account.")]
    Register(RegisterArgs),
    #[command(about = "Check the --as/--password credentials and print the identity.")]
    Login,
    #[command(about = "Succeeds when the username is taken.")]
    CheckName(UsernameArgs),
    #[command(about = "List every account (admins only).")]
    List(AccountListArgs),
    #[command(about = "Suspend or reinstate an account (admins only).")]
    Suspend(AccountIdArgs),
    #[command(about = "Set an account's role (admins only).")]
    Role(RoleArgs),
    #[command(about = "Rename the signed-in account.")]
    Rename(UsernameArgs),
    #[command(about = "Set or clear the signed-in account's e-mail.")]
    Email(EmailArgs),
    #[command(about = "Change the signed-in account's password.")]
    Password(PasswordArgs),
    #[command(about = "Set or clear the signed-in account's icon reference.")]
    Icon(IconArgs),
    #[command(about = "Delete the signed-in account and everything it owns.")]
    Delete(AccountIdArgs),
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(help = "Username; unique ignoring case.")]
    pub username: String,

    #[arg(short = 'e', long)]
    pub email: Option<String>,

    #[arg(
        long = "new-password",
        env = "BUGTRACK_NEW_PASSWORD",
        hide_env_values = true,
        help = "Password for the new account (at least 8 characters)."
    )]
    pub new_password: String,
}

#[derive(Debug, Args)]
pub struct UsernameArgs {
    #[arg(help = "Username.")]
    pub username: String,
}

#[derive(Debug, Args)]
pub struct AccountListArgs {
    #[arg(short = 'p', long, default_value_t = 1, help = "1-based page number.")]
    pub page: usize,
}

#[derive(Debug, Args)]
pub struct AccountIdArgs {
    #[arg(help = "Account id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct RoleArgs {
    #[arg(help = "Account id.")]
    pub id: String,

    #[arg(help = "normal or admin.")]
    pub role: AccountRole,
}

#[derive(Debug, Args)]
pub struct EmailArgs {
    #[arg(help = "New address; omit to clear.")]
    pub email: Option<String>,
}

#[derive(Debug, Args)]
pub struct PasswordArgs {
    #[arg(
        long = "new-password",
        env = "BUGTRACK_NEW_PASSWORD",
        hide_env_values = true,
        help = "Replacement password; --password must hold the current one."
    )]
    pub new_password: String,
}

#[derive(Debug, Args)]
pub struct IconArgs {
    #[arg(help = "Icon path or URL; omit to clear.")]
    pub icon: Option<String>,
}

#[derive(Debug, Args)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum CommentSubcommands {
    #[command(about = "List a bug's comments, oldest first.")]
    Ls(CommentListArgs),
    #[command(about = "Comment on a bug, optionally replying to another comment.")]
    Add(CommentAddArgs),
    #[command(about = "Rewrite one of your comments.")]
    Edit(CommentEditArgs),
    #[command(about = "Delete one of your comments.")]
    Delete(CommentIdArgs),
    #[command(about = "Succeeds when the viewer may comment on the bug.")]
    CanAdd(BugRefArgs),
}

#[derive(Debug, Args)]
pub struct CommentListArgs {
    #[arg(help = "Bug id.")]
    pub bug_id: String,

    #[arg(short = 'p', long, default_value_t = 1, help = "1-based page number.")]
    pub page: usize,
}

#[derive(Debug, Args)]
pub struct CommentAddArgs {
    #[arg(help = "Bug id.")]
    pub bug_id: String,

    #[arg(help = "Comment text.")]
    pub text: String,

    #[arg(short = 'r', long = "reply-to", help = "Id of the comment being answered.")]
    pub reply_to: Option<String>,
}

#[derive(Debug, Args)]
pub struct CommentEditArgs {
    #[arg(help = "Comment id.")]
    pub id: String,

    #[arg(help = "Replacement text.")]
    pub text: String,
}

#[derive(Debug, Args)]
pub struct CommentIdArgs {
    #[arg(help = "Comment id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct BugRefArgs {
    #[arg(help = "Bug id.")]
    pub bug_id: String,
}

#[derive(Debug, Args)]
pub struct PermissionArgs {
    #[command(subcommand)]
    pub command: PermissionSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum PermissionSubcommands {
    #[command(about = "List a project's grants (owner only).")]
    Ls(PermissionListArgs),
    #[command(about = "Grant an account access to a project.")]
    Grant(GrantArgs),
    #[command(about = "Change the level of a grant.")]
    Update(PermissionUpdateArgs),
    #[command(about = "Remove a grant.")]
    Revoke(PermissionRefArgs),
    #[command(about = "Succeeds when the username could receive a grant.")]
    CheckName(GrantNameArgs),
    #[command(about = "Succeeds when the viewer owns the project or holds the level.")]
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct PermissionListArgs {
    #[arg(help = "Project id.")]
    pub project_id: String,

    #[arg(short = 'p', long, default_value_t = 1, help = "1-based page number.")]
    pub page: usize,
}

#[derive(Debug, Args)]
pub struct GrantArgs {
    #[arg(help = "Project id.")]
    pub project_id: String,

    #[arg(help = "Username receiving the grant.")]
    pub username: String,

    #[arg(short = 'l', long, default_value = "viewer", help = "viewer or editor.")]
    pub level: ProjectPermission,
}

#[derive(Debug, Args)]
pub struct PermissionUpdateArgs {
    #[arg(help = "Project id.")]
    pub project_id: String,

    #[arg(help = "Permission id.")]
    pub permission_id: String,

    #[arg(help = "viewer or editor.")]
    pub level: ProjectPermission,
}

#[derive(Debug, Args)]
pub struct PermissionRefArgs {
    #[arg(help = "Project id.")]
    pub project_id: String,

    #[arg(help = "Permission id.")]
    pub permission_id: String,
}

#[derive(Debug, Args)]
pub struct GrantNameArgs {
    #[arg(help = "Project id.")]
    pub project_id: String,

    #[arg(help = "Username.")]
    pub username: String,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(help = "Project id.")]
    pub project_id: String,

    #[arg(help = "viewer, editor or owner.")]
    pub level: ProjectPermission,
}
