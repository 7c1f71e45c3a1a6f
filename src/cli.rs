use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};

use crate::domain::bug::{Severity, Status};
use crate::domain::project::{OpenBugFilter, Visibility};
use crate::domain::query::{DateField, SortKey, SortOrder};

pub use crate::cli_ops::*;

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "bugtrack")]
#[command(bin_name = "bugtrack")]
#[command(version)]
#[command(about = "A multi-user bug tracker backed by a local SQLite database")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "BUGTRACK_DB_PATH",
        global = true,
        help = "Path to the SQLite database (overrides [storage] db_path)."
    )]
    pub db: Option<String>,

    #[arg(
        short = 'c',
        long,
        env = "BUGTRACK_CONFIG",
        default_value = crate::config::DEFAULT_CONFIG_PATH,
        global = true,
        help = "Path to the TOML configuration file."
    )]
    pub config: PathBuf,

    #[arg(
        long = "as",
        value_name = "USERNAME",
        env = "BUGTRACK_USER",
        global = true,
        help = "Act as this account. Omit to act anonymously."
    )]
    pub as_user: Option<String>,

    #[arg(
        long,
        env = "BUGTRACK_PASSWORD",
        global = true,
        hide_env_values = true,
        help = "Password for --as."
    )]
    pub password: Option<String>,

    #[arg(short = 'j', long, global = true, help = "Render machine-readable JSON.")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Create the schema, the super user and the operational project.")]
    Init(InitArgs),
    #[command(about = "Register, sign in and administer accounts.")]
    Account(AccountArgs),
    #[command(about = "Create, browse and manage projects.")]
    Project(ProjectArgs),
    #[command(about = "Report, browse and triage bugs.")]
    Bug(BugArgs),
    #[command(about = "Discuss a bug.")]
    Comment(CommentArgs),
    #[command(about = "Share a project with other accounts.")]
    Permission(PermissionArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(
        long,
        env = "BUGTRACK_SUPERUSER_PASSWORD",
        hide_env_values = true,
        help = "Password for the super user. Required on the first run only."
    )]
    pub superuser_password: Option<String>,
}

/// Search, sort and paging flags shared by project and bug search.
#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(short = 't', long, help = "Match any whitespace-separated word.")]
    pub text: Option<String>,

    #[arg(short = 's', long, help = "Sort by name, created_date or last_updated.")]
    pub sort: Option<SortKey>,

    #[arg(
        short = 'o',
        long,
        requires = "sort",
        help = "Sort order: asc or desc (default asc)."
    )]
    pub order: Option<SortOrder>,

    #[arg(long, help = "Date field for --from/--to: created or last_updated.")]
    pub date_field: Option<DateField>,

    #[arg(long, help = "Earliest date, RFC 3339 or YYYY-MM-DD.")]
    pub from: Option<String>,

    #[arg(long, help = "Latest date, RFC 3339 or YYYY-MM-DD.")]
    pub to: Option<String>,

    #[arg(short = 'p', long, default_value_t = 1, help = "1-based page number.")]
    pub page: usize,
}

#[derive(Debug, Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ProjectSubcommands {
    #[command(about = "Create a project owned by the signed-in account.")]
    New(ProjectNewArgs),
    #[command(about = "Change a project's fields (owner only).")]
    Update(ProjectUpdateArgs),
    #[command(about = "Delete a project with all of its bugs (owner only).")]
    Delete(ProjectIdArgs),
    #[command(about = "Show one project.")]
    Show(ProjectIdArgs),
    #[command(about = "List visible projects, most recently updated first.")]
    Ls(PageArgs),
    #[command(about = "Search visible projects.")]
    Search(ProjectSearchArgs),
    #[command(about = "The five most recently updated projects.")]
    Recent(RecentArgs),
    #[command(about = "Count visible projects.")]
    Count,
    #[command(about = "Succeeds when the viewer may see the project.")]
    CanView(ProjectIdArgs),
    #[command(about = "Succeeds when the viewer may report bugs on the project.")]
    CanEdit(ProjectIdArgs),
}

#[derive(Debug, Args)]
pub struct ProjectNewArgs {
    #[arg(help = "Project name.")]
    pub name: String,

    #[arg(short = 's', long, help = "One-line summary.")]
    pub summary: String,

    #[arg(short = 'l', long, help = "Link to the project's home page.")]
    pub link: Option<String>,

    #[arg(
        short = 'v',
        long,
        default_value = "public",
        help = "public, logged_in_only or restricted."
    )]
    pub visibility: Visibility,

    #[arg(long = "desc", help = "Plain-text description.")]
    pub description: Option<String>,

    #[arg(long = "formatted-desc", help = "Pre-rendered description markup.")]
    pub formatted_description: Option<String>,

    #[arg(long = "tag", help = "Tag; repeat for several.")]
    pub tags: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ProjectUpdateArgs {
    #[arg(help = "Project id.")]
    pub id: String,

    #[arg(short = 'n', long)]
    pub name: Option<String>,

    #[arg(short = 's', long)]
    pub summary: Option<String>,

    #[arg(short = 'l', long, help = "New link; pass an empty value to clear.")]
    pub link: Option<String>,

    #[arg(short = 'v', long)]
    pub visibility: Option<Visibility>,

    #[arg(long = "desc", help = "New description; pass an empty value to clear.")]
    pub description: Option<String>,

    #[arg(long = "formatted-desc")]
    pub formatted_description: Option<String>,

    #[arg(long = "tag", help = "Replace the tags; repeat for several.")]
    pub tags: Vec<String>,

    #[arg(long, conflicts_with = "tags", help = "Remove every tag.")]
    pub clear_tags: bool,
}

#[derive(Debug, Args)]
pub struct ProjectIdArgs {
    #[arg(help = "Project id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct PageArgs {
    #[arg(short = 'p', long, default_value_t = 1, help = "1-based page number.")]
    pub page: usize,
}

#[derive(Debug, Args)]
pub struct ProjectSearchArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    #[arg(
        short = 'b',
        long = "bugs",
        default_value = "all",
        help = "all, open (has open bugs) or none (no open bugs)."
    )]
    pub bug_state: OpenBugFilter,
}

#[derive(Debug, Args)]
pub struct RecentArgs {
    #[arg(short = 'm', long, help = "Only projects the signed-in account owns.")]
    pub mine: bool,
}

#[derive(Debug, Args)]
pub struct BugArgs {
    #[command(subcommand)]
    pub command: BugSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum BugSubcommands {
    #[command(about = "Report a bug on a project.")]
    New(BugNewArgs),
    #[command(about = "Change a bug's fields (owner or reporter).")]
    Update(BugUpdateArgs),
    #[command(about = "Close an open bug or reopen a closed one.")]
    Toggle(BugIdArgs),
    #[command(about = "Delete a bug and its comments.")]
    Delete(BugIdArgs),
    #[command(about = "Show one bug.")]
    Show(BugIdArgs),
    #[command(about = "List a project's bugs, most recently updated first.")]
    Ls(BugListArgs),
    #[command(about = "Search a project's bugs.")]
    Search(BugSearchArgs),
    #[command(about = "Count a project's bugs.")]
    Count(ProjectIdArgs),
}

#[derive(Debug, Args)]
pub struct BugNewArgs {
    #[arg(help = "Project id.")]
    pub project_id: String,

    #[arg(help = "One-line summary.")]
    pub summary: String,

    #[arg(long = "desc")]
    pub description: Option<String>,

    #[arg(
        short = 'S',
        long,
        default_value = "low",
        help = "low, medium or high."
    )]
    pub severity: Severity,
}

#[derive(Debug, Args)]
pub struct BugUpdateArgs {
    #[arg(help = "Bug id.")]
    pub id: String,

    #[arg(short = 's', long)]
    pub summary: Option<String>,

    #[arg(long = "desc", help = "New description; pass an empty value to clear.")]
    pub description: Option<String>,

    #[arg(short = 'S', long)]
    pub severity: Option<Severity>,

    #[arg(long)]
    pub status: Option<Status>,
}

#[derive(Debug, Args)]
pub struct BugIdArgs {
    #[arg(help = "Bug id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct BugListArgs {
    #[arg(help = "Project id.")]
    pub project_id: String,

    #[arg(short = 'p', long, default_value_t = 1, help = "1-based page number.")]
    pub page: usize,
}

#[derive(Debug, Args)]
pub struct BugSearchArgs {
    #[arg(help = "Project id.")]
    pub project_id: String,

    #[command(flatten)]
    pub query: QueryArgs,

    #[arg(long, help = "Match any word of the reporter's username.")]
    pub creator: Option<String>,

    #[arg(long = "severity", help = "Keep only these severities; repeatable.")]
    pub severities: Vec<Severity>,

    #[arg(long = "status", help = "Keep only these statuses; repeatable.")]
    pub statuses: Vec<Status>,

    #[arg(short = 'a', long, help = "Return every match on one page.")]
    pub all: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
