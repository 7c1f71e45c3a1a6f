use std::io::{self, IsTerminal};

use crate::app::{AccountView, BugPreview, BugView, PermissionView, ProjectPreview, ProjectView};
use crate::domain::bug::{Severity, Status};
use crate::domain::format_timestamp;
use crate::listing::Page;
use crate::threading::CommentView;

pub fn print_project_page(page: &Page<ProjectPreview>) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Projects"));
    if page.items.is_empty() {
        println!("{}", palette.dim("no projects matched"));
    }
    for project in &page.items {
        println!("{}", format_project_row(project, &palette));
    }
    println!("{}", palette.dim(&page_footer(page, "project")));
}

pub fn print_recent_projects(projects: &[ProjectPreview]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Recently updated"));
    if projects.is_empty() {
        println!("{}", palette.dim("no projects yet"));
    }
    for project in projects {
        println!("{}", format_project_row(project, &palette));
    }
}

fn format_project_row(project: &ProjectPreview, palette: &Palette) -> String {
    let mut line = format!(
        "{} {} {} {}",
        palette.id(&project.id),
        palette.dim(&format!("[{}]", project.visibility.label())),
        project.name,
        palette.dim(&format!(
            "({} open / {} bugs, owner {})",
            project.open_bugs, project.total_bugs, project.owner_name
        ))
    );
    if !project.tags.is_empty() {
        line.push(' ');
        line.push_str(&palette.tags(&format!("#{}", project.tags.join(" #"))));
    }
    line
}

pub fn print_project(project: &ProjectView) {
    let palette = Palette::auto();
    println!("{} {}", palette.id(&project.id), palette.heading(&project.name));
    for (label, value) in project_fields(project) {
        println!("  {} {}", palette.dim(&format!("{label:<12}")), value);
    }
}

fn project_fields(project: &ProjectView) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("summary", project.summary.clone()),
        ("visibility", project.visibility_label.to_string()),
        ("owner", project.owner.username.clone()),
        (
            "bugs",
            format!("{} open of {}", project.open_bugs, project.total_bugs),
        ),
        ("created", format_timestamp(project.created_at)),
        ("updated", format_timestamp(project.modified_at)),
    ];
    if let Some(link) = project.link.as_deref() {
        fields.push(("link", link.to_string()));
    }
    if !project.tags.is_empty() {
        fields.push(("tags", project.tags.join(", ")));
    }
    if let Some(description) = project.description.as_deref() {
        fields.push(("description", description.to_string()));
    }
    fields
}

pub fn print_bug_page(page: &Page<BugPreview>) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Bugs"));
    if page.items.is_empty() {
        println!("{}", palette.dim("no bugs matched"));
    }
    for bug in &page.items {
        println!("{}", format_bug_row(bug, &palette));
    }
    println!("{}", palette.dim(&page_footer(page, "bug")));
}

fn format_bug_row(bug: &BugPreview, palette: &Palette) -> String {
    format!(
        "{} {} {} {} {}",
        palette.id(&bug.id),
        palette.status(bug.status),
        palette.severity(bug.severity),
        bug.summary,
        palette.dim(&format!("by {}", bug.creator_name))
    )
}

pub fn print_bug(bug: &BugView) {
    let palette = Palette::auto();
    println!(
        "{} {} {}",
        palette.id(&bug.id),
        palette.status(bug.status),
        palette.heading(&bug.summary)
    );
    println!("  {} {}", palette.dim("severity    "), bug.severity_label);
    println!("  {} {}", palette.dim("reported by "), bug.creator.username);
    println!(
        "  {} {}",
        palette.dim("updated     "),
        format_timestamp(bug.modified_at)
    );
    if let Some(description) = bug.description.as_deref() {
        println!();
        println!("{description}");
    }
}

pub fn print_comment_page(page: &Page<CommentView>) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Comments"));
    for comment in &page.items {
        for line in format_comment(comment, &palette) {
            println!("{line}");
        }
    }
    println!("{}", palette.dim(&page_footer(page, "comment")));
}

fn format_comment(comment: &CommentView, palette: &Palette) -> Vec<String> {
    let mut header = format!(
        "{} {} {}",
        palette.id(&comment.id),
        comment.owner_name,
        palette.dim(&format_timestamp(comment.posted_at))
    );
    if comment.edited {
        header.push(' ');
        header.push_str(&palette.dim("(edited)"));
    }

    let mut lines = vec![header];
    if let Some(reply) = comment.reply.as_ref() {
        let quoted = match reply.preview.as_ref() {
            Some(preview) => format!("> {}: {}", preview.owner_name, preview.text),
            None => "> [deleted comment]".to_string(),
        };
        lines.push(format!("  {}", palette.dim(&quoted)));
    }
    if comment.is_status_update {
        lines.push(format!("  {}", palette.audit(&comment.text)));
    } else {
        lines.extend(comment.text.lines().map(|line| format!("  {line}")));
    }
    lines
}

pub fn print_permission_page(page: &Page<PermissionView>) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Permissions"));
    for permission in &page.items {
        println!(
            "{} {} {}",
            palette.id(&permission.id),
            permission.username,
            palette.dim(&format!("[{}]", permission.level_label))
        );
    }
    println!("{}", palette.dim(&page_footer(page, "permission")));
}

pub fn print_account_page(page: &Page<AccountView>) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Accounts"));
    for account in &page.items {
        let mut line = format!(
            "{} {} {}",
            palette.id(&account.id),
            account.username,
            palette.dim(&format!("[{}]", account.role_label))
        );
        if account.suspended {
            line.push(' ');
            line.push_str(&palette.warning("suspended"));
        }
        println!("{line}");
    }
    println!("{}", palette.dim(&page_footer(page, "account")));
}

fn page_footer<T>(page: &Page<T>, noun: &str) -> String {
    format!(
        "page {} of {}, {} {}(s)",
        page.page,
        page.page_count().max(1),
        page.total,
        noun
    )
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn tags(&self, text: &str) -> String {
        self.paint("90", text)
    }

    fn audit(&self, text: &str) -> String {
        self.paint("3;35", text)
    }

    fn warning(&self, text: &str) -> String {
        self.paint("31", text)
    }

    fn status(&self, status: Status) -> String {
        let code = match status {
            Status::Open => "33",
            Status::Closed => "32",
        };
        self.paint(code, &format!("[{}]", status.label().to_ascii_uppercase()))
    }

    fn severity(&self, severity: Severity) -> String {
        let code = match severity {
            Severity::Low => "37",
            Severity::Medium => "33",
            Severity::High => "31",
        };
        self.paint(code, &format!("({})", severity.label()))
    }
}
