use serde::Serialize;

use crate::access::Viewer;
use crate::app::{App, AppError, BugPatch, Identity, NewBug, ProjectInput, Registration};
use crate::cli::{
    AccountSubcommands, BugSearchArgs, BugSubcommands, CommentSubcommands, PermissionSubcommands,
    ProjectSearchArgs, ProjectSubcommands, ProjectUpdateArgs, QueryArgs,
};
use crate::domain::parse_timestamp;
use crate::listing::{BugFilter, ListQuery, ProjectFilter, SortSpec};
use crate::ui;

/// Output mode plus the identity every command runs as.
pub struct Context<'a> {
    pub app: &'a App,
    pub viewer: Option<&'a Viewer>,
    /// The `--password` value; `account password` treats it as the current one.
    pub password: Option<&'a str>,
    pub json: bool,
}

impl Context<'_> {
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) {
        if self.json {
            crate::print_json(value);
        } else {
            human(value);
        }
    }

    fn confirm(&self, value: bool) {
        self.emit(&value, |value| println!("{value}"));
    }
}

pub fn run_account(ctx: &Context<'_>, command: AccountSubcommands) -> Result<(), AppError> {
    let app = ctx.app;
    match command {
        AccountSubcommands::Register(args) => {
            let account = app.register(&Registration {
                username: args.username,
                email: args.email,
                password: args.new_password,
            })?;
            ctx.emit(&account, |account| {
                println!("created account {} {}", account.id, account.username)
            });
        }
        AccountSubcommands::Login => {
            let viewer = ctx.viewer.ok_or_else(|| {
                AppError::NotAuthenticated("pass --as and --password to sign in".to_string())
            })?;
            ctx.emit(&Identity::from(viewer), |identity| {
                println!(
                    "signed in as {} ({})",
                    identity.username, identity.role_label
                )
            });
        }
        AccountSubcommands::CheckName(args) => {
            let taken = app.verify_username(&args.username)?;
            if !taken {
                return Err(AppError::NotFound(format!(
                    "user '{}' does not exist",
                    args.username.trim()
                )));
            }
            ctx.confirm(taken);
        }
        AccountSubcommands::List(args) => {
            let page = app.list_accounts(ctx.viewer, args.page)?;
            ctx.emit(&page, ui::print_account_page);
        }
        AccountSubcommands::Suspend(args) => {
            let account = app.toggle_suspension(ctx.viewer, &args.id)?;
            ctx.emit(&account, |account| {
                let state = if account.suspended {
                    "suspended"
                } else {
                    "reinstated"
                };
                println!("{state} {} {}", account.id, account.username)
            });
        }
        AccountSubcommands::Role(args) => {
            let account = app.set_role(ctx.viewer, &args.id, args.role)?;
            ctx.emit(&account, |account| {
                println!("updated {} -> {}", account.username, account.role_label)
            });
        }
        AccountSubcommands::Rename(args) => {
            let account = app.rename_account(ctx.viewer, &args.username)?;
            ctx.emit(&account, |account| println!("renamed to {}", account.username));
        }
        AccountSubcommands::Email(args) => {
            let account = app.update_email(ctx.viewer, args.email.as_deref())?;
            ctx.emit(&account, |account| match account.email.as_deref() {
                Some(email) => println!("email set to {email}"),
                None => println!("email cleared"),
            });
        }
        AccountSubcommands::Password(args) => {
            let current = ctx.password.unwrap_or_default();
            app.change_password(ctx.viewer, current, &args.new_password)?;
            ctx.confirm(true);
        }
        AccountSubcommands::Icon(args) => {
            let account = app.set_icon(ctx.viewer, args.icon.as_deref())?;
            ctx.emit(&account, |account| match account.icon.as_deref() {
                Some(icon) => println!("icon set to {icon}"),
                None => println!("icon cleared"),
            });
        }
        AccountSubcommands::Delete(args) => {
            let tombstoned = app.delete_account(ctx.viewer, &args.id)?;
            ctx.emit(&tombstoned, |count| {
                println!("deleted account {} ({count} repl(ies) tombstoned)", args.id)
            });
        }
    }
    Ok(())
}

pub fn run_project(ctx: &Context<'_>, command: ProjectSubcommands) -> Result<(), AppError> {
    let app = ctx.app;
    match command {
        ProjectSubcommands::New(args) => {
            let project = app.create_project(
                ctx.viewer,
                &ProjectInput {
                    name: Some(args.name),
                    summary: Some(args.summary),
                    link: args.link,
                    visibility: Some(args.visibility),
                    description: args.description,
                    formatted_description: args.formatted_description,
                    tags: Some(args.tags),
                },
            )?;
            ctx.emit(&project, |project| {
                println!("created project {} {}", project.id, project.name)
            });
        }
        ProjectSubcommands::Update(args) => {
            let id = args.id.clone();
            let project = app.update_project(ctx.viewer, &id, &project_patch(args))?;
            ctx.emit(&project, |project| {
                println!("updated project {} {}", project.id, project.name)
            });
        }
        ProjectSubcommands::Delete(args) => {
            app.delete_project(ctx.viewer, &args.id)?;
            ctx.emit(&args.id, |id| println!("deleted project {id}"));
        }
        ProjectSubcommands::Show(args) => {
            let project = app.show_project(ctx.viewer, &args.id)?;
            ctx.emit(&project, ui::print_project);
        }
        ProjectSubcommands::Ls(args) => {
            let page = app.list_projects(ctx.viewer, args.page)?;
            ctx.emit(&page, ui::print_project_page);
        }
        ProjectSubcommands::Search(args) => {
            let page = app.search_projects(ctx.viewer, &project_filter(args)?)?;
            ctx.emit(&page, ui::print_project_page);
        }
        ProjectSubcommands::Recent(args) => {
            let projects = app.recent_projects(ctx.viewer, args.mine)?;
            ctx.emit(&projects, |projects| ui::print_recent_projects(projects));
        }
        ProjectSubcommands::Count => {
            let count = app.count_projects(ctx.viewer)?;
            ctx.emit(&count, |count| println!("{count}"));
        }
        ProjectSubcommands::CanView(args) => {
            ctx.confirm(app.can_view_project(ctx.viewer, &args.id)?);
        }
        ProjectSubcommands::CanEdit(args) => {
            ctx.confirm(app.can_edit_project(ctx.viewer, &args.id)?);
        }
    }
    Ok(())
}

pub fn run_bug(ctx: &Context<'_>, command: BugSubcommands) -> Result<(), AppError> {
    let app = ctx.app;
    match command {
        BugSubcommands::New(args) => {
            let bug = app.create_bug(
                ctx.viewer,
                &args.project_id,
                &NewBug {
                    summary: args.summary,
                    description: args.description,
                    severity: args.severity,
                },
            )?;
            ctx.emit(&bug, |bug| {
                println!("created bug {} {}", bug.id, bug.summary)
            });
        }
        BugSubcommands::Update(args) => {
            let bug = app.update_bug(
                ctx.viewer,
                &args.id,
                &BugPatch {
                    summary: args.summary,
                    description: args.description,
                    severity: args.severity,
                    status: args.status,
                },
            )?;
            ctx.emit(&bug, |bug| {
                println!(
                    "updated bug {} [{}] ({})",
                    bug.id, bug.status_label, bug.severity_label
                )
            });
        }
        BugSubcommands::Toggle(args) => {
            let bug = app.toggle_bug_status(ctx.viewer, &args.id)?;
            ctx.emit(&bug, |bug| println!("updated {} -> {}", bug.id, bug.status));
        }
        BugSubcommands::Delete(args) => {
            app.delete_bug(ctx.viewer, &args.id)?;
            ctx.emit(&args.id, |id| println!("deleted bug {id}"));
        }
        BugSubcommands::Show(args) => {
            let bug = app.show_bug(ctx.viewer, &args.id)?;
            ctx.emit(&bug, ui::print_bug);
        }
        BugSubcommands::Ls(args) => {
            let page = app.list_bugs(ctx.viewer, &args.project_id, args.page)?;
            ctx.emit(&page, ui::print_bug_page);
        }
        BugSubcommands::Search(args) => {
            let project_id = args.project_id.clone();
            let page = app.search_bugs(ctx.viewer, &project_id, &bug_filter(args)?)?;
            ctx.emit(&page, ui::print_bug_page);
        }
        BugSubcommands::Count(args) => {
            let count = app.count_bugs(ctx.viewer, &args.id)?;
            ctx.emit(&count, |count| println!("{count}"));
        }
    }
    Ok(())
}

pub fn run_comment(ctx: &Context<'_>, command: CommentSubcommands) -> Result<(), AppError> {
    let app = ctx.app;
    match command {
        CommentSubcommands::Ls(args) => {
            let page = app.list_comments(ctx.viewer, &args.bug_id, args.page)?;
            ctx.emit(&page, ui::print_comment_page);
        }
        CommentSubcommands::Add(args) => {
            let comment = app.add_comment(
                ctx.viewer,
                &args.bug_id,
                &args.text,
                args.reply_to.as_deref(),
            )?;
            ctx.emit(&comment, |comment| {
                println!("created comment {} on {}", comment.id, comment.bug_id)
            });
        }
        CommentSubcommands::Edit(args) => {
            let comment = app.edit_comment(ctx.viewer, &args.id, &args.text)?;
            ctx.emit(&comment, |comment| println!("updated comment {}", comment.id));
        }
        CommentSubcommands::Delete(args) => {
            let tombstoned = app.delete_comment(ctx.viewer, &args.id)?;
            ctx.emit(&tombstoned, |count| {
                println!("deleted comment {} ({count} repl(ies) tombstoned)", args.id)
            });
        }
        CommentSubcommands::CanAdd(args) => {
            ctx.confirm(app.can_add_comment(ctx.viewer, &args.bug_id)?);
        }
    }
    Ok(())
}

pub fn run_permission(ctx: &Context<'_>, command: PermissionSubcommands) -> Result<(), AppError> {
    let app = ctx.app;
    match command {
        PermissionSubcommands::Ls(args) => {
            let page = app.list_permissions(ctx.viewer, &args.project_id, args.page)?;
            ctx.emit(&page, ui::print_permission_page);
        }
        PermissionSubcommands::Grant(args) => {
            let permission =
                app.grant_permission(ctx.viewer, &args.project_id, &args.username, args.level)?;
            ctx.emit(&permission, |permission| {
                println!(
                    "created permission {} {} [{}]",
                    permission.id, permission.username, permission.level_label
                )
            });
        }
        PermissionSubcommands::Update(args) => {
            let permission = app.update_permission(
                ctx.viewer,
                &args.project_id,
                &args.permission_id,
                args.level,
            )?;
            ctx.emit(&permission, |permission| {
                println!(
                    "updated permission {} -> {}",
                    permission.id, permission.level_label
                )
            });
        }
        PermissionSubcommands::Revoke(args) => {
            app.revoke_permission(ctx.viewer, &args.project_id, &args.permission_id)?;
            ctx.emit(&args.permission_id, |id| println!("revoked permission {id}"));
        }
        PermissionSubcommands::CheckName(args) => {
            ctx.confirm(app.check_grant_username(ctx.viewer, &args.project_id, &args.username)?);
        }
        PermissionSubcommands::Validate(args) => {
            ctx.confirm(app.validate_permission(ctx.viewer, &args.project_id, args.level)?);
        }
    }
    Ok(())
}

fn project_patch(args: ProjectUpdateArgs) -> ProjectInput {
    let tags = if args.clear_tags {
        Some(Vec::new())
    } else if args.tags.is_empty() {
        None
    } else {
        Some(args.tags)
    };
    ProjectInput {
        name: args.name,
        summary: args.summary,
        link: args.link,
        visibility: args.visibility,
        description: args.description,
        formatted_description: args.formatted_description,
        tags,
    }
}

fn list_query(args: QueryArgs) -> Result<ListQuery, AppError> {
    Ok(ListQuery {
        text: args.text,
        date_field: args.date_field.unwrap_or_default(),
        date_from: date_arg("--from", args.from.as_deref())?,
        date_to: date_arg("--to", args.to.as_deref())?,
        sort: args.sort.map(|key| SortSpec {
            key,
            order: args.order.unwrap_or_default(),
        }),
        page: args.page,
    })
}

fn date_arg(flag: &str, raw: Option<&str>) -> Result<Option<time::OffsetDateTime>, AppError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw).map(Some).ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "{flag} expects an RFC 3339 timestamp or YYYY-MM-DD, got '{raw}'"
            ))
        }),
    }
}

fn project_filter(args: ProjectSearchArgs) -> Result<ProjectFilter, AppError> {
    Ok(ProjectFilter {
        query: list_query(args.query)?,
        bug_state: args.bug_state,
    })
}

fn bug_filter(args: BugSearchArgs) -> Result<BugFilter, AppError> {
    Ok(BugFilter {
        query: list_query(args.query)?,
        creator_name: args.creator,
        severities: args.severities,
        statuses: args.statuses,
        unpaged: args.all,
    })
}
