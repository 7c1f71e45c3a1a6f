use std::cell::RefCell;
use std::rc::Rc;

use super::{
    App, AppError, BugPatch, NewBug, ProjectInput, Registration, PROTECTED_PROJECT_ID,
};
use crate::access::Viewer;
use crate::config::SeedConfig;
use crate::domain::account::AccountRole;
use crate::domain::bug::{Severity, Status};
use crate::domain::project::{OpenBugFilter, ProjectPermission, Visibility};
use crate::listing::{BugFilter, ListQuery, ProjectFilter};
use crate::notify::{Notifier, NotifyError, Recipient};
use tempfile::TempDir;

const PASSWORD: &str = "password123";

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Rc<RefCell<Vec<(String, String)>>>,
}

impl Notifier for RecordingNotifier {
    fn send(&self, recipient: &Recipient, subject: &str, _body: &str) -> Result<(), NotifyError> {
        self.sent
            .borrow_mut()
            .push((recipient.username.clone(), subject.to_string()));
        Ok(())
    }
}

struct Harness {
    _dir: TempDir,
    app: App,
    sent: Rc<RefCell<Vec<(String, String)>>>,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("temp dir should be creatable");
    let db_path = dir.path().join(".bugtrack/tracker.sqlite");
    let notifier = RecordingNotifier::default();
    let sent = notifier.sent.clone();
    let app = App::open(db_path.to_str().expect("utf8 path"), Box::new(notifier))
        .expect("app should open");
    Harness {
        _dir: dir,
        app,
        sent,
    }
}

fn sign_up(app: &App, username: &str) -> Viewer {
    app.register(&Registration {
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        password: PASSWORD.to_string(),
    })
    .expect("registration should succeed");
    app.authenticate(username, PASSWORD)
        .expect("login should succeed")
}

fn new_project(app: &App, owner: &Viewer, name: &str, visibility: Visibility) -> String {
    app.create_project(
        Some(owner),
        &ProjectInput {
            name: Some(name.to_string()),
            summary: Some(format!("{name} summary")),
            visibility: Some(visibility),
            tags: Some(vec!["core".to_string()]),
            ..ProjectInput::default()
        },
    )
    .expect("project should be created")
    .id
}

fn new_bug(app: &App, viewer: &Viewer, project_id: &str, summary: &str) -> String {
    app.create_bug(
        Some(viewer),
        project_id,
        &NewBug {
            summary: summary.to_string(),
            description: Some(format!("{summary} details")),
            severity: Severity::Low,
        },
    )
    .expect("bug should be created")
    .id
}

fn audit_texts(app: &App, viewer: &Viewer, bug_id: &str) -> Vec<String> {
    app.list_comments(Some(viewer), bug_id, 1)
        .expect("comments should list")
        .items
        .into_iter()
        .filter(|comment| comment.is_status_update)
        .map(|comment| comment.text)
        .collect()
}

#[test]
fn creating_a_project_grants_the_owner_record() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Restricted);

    let permissions = h
        .app
        .list_permissions(Some(&alice), &project_id, 1)
        .expect("owner can list permissions");
    assert_eq!(permissions.total, 1);
    assert_eq!(permissions.items[0].level, ProjectPermission::Owner);
    assert_eq!(permissions.items[0].username, "alice");
}

#[test]
fn creating_a_bug_records_opened_audit_and_touches_project() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let before = h
        .app
        .show_project(Some(&alice), &project_id)
        .expect("project visible")
        .modified_at;

    std::thread::sleep(std::time::Duration::from_millis(5));
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");

    let bug = h.app.show_bug(None, &bug_id).expect("public bug visible");
    assert_eq!(bug.status, Status::Open);
    assert_eq!(bug.creator.username, "alice");
    assert_eq!(audit_texts(&h.app, &alice, &bug_id), vec!["Opened the bug."]);

    let project = h
        .app
        .show_project(Some(&alice), &project_id)
        .expect("project visible");
    assert!(project.modified_at > before);
    assert_eq!(project.open_bugs, 1);
    assert_eq!(project.total_bugs, 1);
}

#[test]
fn severity_change_appends_one_audit_comment_and_advances_modified_at() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    let before = h.app.show_bug(None, &bug_id).expect("bug").modified_at;

    std::thread::sleep(std::time::Duration::from_millis(5));
    let updated = h
        .app
        .update_bug(
            Some(&alice),
            &bug_id,
            &BugPatch {
                severity: Some(Severity::High),
                ..BugPatch::default()
            },
        )
        .expect("update should succeed");

    assert_eq!(updated.severity, Severity::High);
    assert!(updated.modified_at > before);
    assert_eq!(
        audit_texts(&h.app, &alice, &bug_id),
        vec!["Opened the bug.", "Changed bug severity to High"]
    );
}

fn project_stamp(app: &App, project_id: &str) -> time::OffsetDateTime {
    app.show_project(None, project_id)
        .expect("public project visible")
        .modified_at
}

fn bug_stamp(app: &App, bug_id: &str) -> time::OffsetDateTime {
    app.show_bug(None, bug_id).expect("public bug visible").modified_at
}

fn tick() {
    std::thread::sleep(std::time::Duration::from_millis(5));
}

#[test]
fn updating_a_bug_touches_its_project() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    let before = project_stamp(&h.app, &project_id);

    tick();
    h.app
        .update_bug(
            Some(&alice),
            &bug_id,
            &BugPatch {
                summary: Some("Crash when saving".to_string()),
                ..BugPatch::default()
            },
        )
        .expect("update should succeed");
    assert!(project_stamp(&h.app, &project_id) > before);
}

#[test]
fn toggling_a_bug_touches_bug_and_project() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    let project_before = project_stamp(&h.app, &project_id);
    let bug_before = bug_stamp(&h.app, &bug_id);

    tick();
    h.app
        .toggle_bug_status(Some(&alice), &bug_id)
        .expect("toggle should succeed");
    assert!(bug_stamp(&h.app, &bug_id) > bug_before);
    assert!(project_stamp(&h.app, &project_id) > project_before);
}

#[test]
fn deleting_a_bug_touches_its_project() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    let before = project_stamp(&h.app, &project_id);

    tick();
    h.app.delete_bug(Some(&alice), &bug_id).expect("delete");
    assert!(project_stamp(&h.app, &project_id) > before);
}

#[test]
fn adding_a_comment_touches_bug_and_project() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    let project_before = project_stamp(&h.app, &project_id);
    let bug_before = bug_stamp(&h.app, &bug_id);

    tick();
    h.app
        .add_comment(Some(&alice), &bug_id, "Seen it too", None)
        .expect("comment");
    assert!(bug_stamp(&h.app, &bug_id) > bug_before);
    assert!(project_stamp(&h.app, &project_id) > project_before);
}

#[test]
fn editing_a_comment_touches_bug_and_project() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    let comment = h
        .app
        .add_comment(Some(&alice), &bug_id, "Typo here", None)
        .expect("comment");
    let project_before = project_stamp(&h.app, &project_id);
    let bug_before = bug_stamp(&h.app, &bug_id);

    tick();
    h.app
        .edit_comment(Some(&alice), &comment.id, "Typo fixed")
        .expect("edit");
    assert!(bug_stamp(&h.app, &bug_id) > bug_before);
    assert!(project_stamp(&h.app, &project_id) > project_before);
}

#[test]
fn deleting_a_comment_touches_bug_and_project() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    let comment = h
        .app
        .add_comment(Some(&alice), &bug_id, "Wrong bug", None)
        .expect("comment");
    let project_before = project_stamp(&h.app, &project_id);
    let bug_before = bug_stamp(&h.app, &bug_id);

    tick();
    h.app
        .delete_comment(Some(&alice), &comment.id)
        .expect("delete");
    assert!(bug_stamp(&h.app, &bug_id) > bug_before);
    assert!(project_stamp(&h.app, &project_id) > project_before);
}

#[test]
fn unchanged_severity_adds_no_audit_comment() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");

    h.app
        .update_bug(
            Some(&alice),
            &bug_id,
            &BugPatch {
                summary: Some("Crash when saving".to_string()),
                severity: Some(Severity::Low),
                ..BugPatch::default()
            },
        )
        .expect("update should succeed");
    assert_eq!(audit_texts(&h.app, &alice, &bug_id), vec!["Opened the bug."]);
}

#[test]
fn toggling_twice_restores_status_with_two_audit_comments() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");

    let closed = h
        .app
        .toggle_bug_status(Some(&alice), &bug_id)
        .expect("first toggle");
    assert_eq!(closed.status, Status::Closed);
    let reopened = h
        .app
        .toggle_bug_status(Some(&alice), &bug_id)
        .expect("second toggle");
    assert_eq!(reopened.status, Status::Open);

    assert_eq!(
        audit_texts(&h.app, &alice, &bug_id),
        vec!["Opened the bug.", "Closed the bug.", "Reopened the bug."]
    );
}

#[test]
fn status_change_through_update_is_audited() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");

    h.app
        .update_bug(
            Some(&alice),
            &bug_id,
            &BugPatch {
                status: Some(Status::Closed),
                ..BugPatch::default()
            },
        )
        .expect("update should succeed");
    assert_eq!(
        audit_texts(&h.app, &alice, &bug_id),
        vec!["Opened the bug.", "Closed the bug."]
    );
}

#[test]
fn bug_creator_and_project_owner_may_both_mutate() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let bob = sign_up(&h.app, "bob");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    h.app
        .grant_permission(Some(&alice), &project_id, "bob", ProjectPermission::Editor)
        .expect("grant should succeed");

    let bug_id = new_bug(&h.app, &bob, &project_id, "Bob's bug");
    h.app
        .toggle_bug_status(Some(&bob), &bug_id)
        .expect("creator may toggle");
    h.app
        .toggle_bug_status(Some(&alice), &bug_id)
        .expect("owner may toggle");

    let own_bug = new_bug(&h.app, &alice, &project_id, "Alice's bug");
    let denied = h.app.delete_bug(Some(&bob), &own_bug);
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
}

#[test]
fn toggle_by_someone_else_notifies_the_creator() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let bob = sign_up(&h.app, "bob");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    h.app
        .grant_permission(Some(&alice), &project_id, "bob", ProjectPermission::Editor)
        .expect("grant should succeed");
    let bug_id = new_bug(&h.app, &bob, &project_id, "Bob's bug");
    h.sent.borrow_mut().clear();

    h.app
        .toggle_bug_status(Some(&bob), &bug_id)
        .expect("creator toggle");
    assert!(h.sent.borrow().is_empty());

    h.app
        .toggle_bug_status(Some(&alice), &bug_id)
        .expect("owner toggle");
    assert_eq!(h.sent.borrow().len(), 1);
    assert_eq!(h.sent.borrow()[0].0, "bob");
}

#[test]
fn deleting_a_bug_removes_its_comments() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    h.app
        .add_comment(Some(&alice), &bug_id, "Seen it too", None)
        .expect("comment");

    h.app.delete_bug(Some(&alice), &bug_id).expect("delete");
    assert!(matches!(
        h.app.list_comments(Some(&alice), &bug_id, 1),
        Err(AppError::NotFound(_))
    ));
    assert_eq!(
        h.app.count_bugs(Some(&alice), &project_id).expect("count"),
        0
    );
}

#[test]
fn deleting_a_comment_tombstones_its_reply() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let bob = sign_up(&h.app, "bob");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    h.app
        .grant_permission(Some(&alice), &project_id, "bob", ProjectPermission::Editor)
        .expect("grant");
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");

    let original = h
        .app
        .add_comment(Some(&alice), &bug_id, "Happens on every save", None)
        .expect("original comment");
    let reply = h
        .app
        .add_comment(Some(&bob), &bug_id, "Only on large files", Some(&original.id))
        .expect("reply");
    let preview = reply
        .reply
        .as_ref()
        .and_then(|context| context.preview.as_ref())
        .expect("reply should embed preview");
    assert_eq!(preview.text, "Happens on every save");
    assert_eq!(preview.owner_name, "alice");

    let tombstoned = h
        .app
        .delete_comment(Some(&alice), &original.id)
        .expect("delete should succeed");
    assert_eq!(tombstoned, 1);

    let comments = h
        .app
        .list_comments(None, &bug_id, 1)
        .expect("comments should list");
    let reply_after = comments
        .items
        .iter()
        .find(|comment| comment.id == reply.id)
        .expect("reply survives");
    assert_eq!(reply_after.text, "Only on large files");
    assert_eq!(reply_after.owner_name, "bob");
    let context = reply_after.reply.as_ref().expect("reply id kept");
    assert_eq!(context.comment_id, original.id);
    assert!(context.preview.is_none());
}

#[test]
fn reply_target_must_belong_to_the_same_bug() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let first = new_bug(&h.app, &alice, &project_id, "First");
    let second = new_bug(&h.app, &alice, &project_id, "Second");
    let comment = h
        .app
        .add_comment(Some(&alice), &first, "On the first bug", None)
        .expect("comment");

    let result = h
        .app
        .add_comment(Some(&alice), &second, "Crossed wires", Some(&comment.id));
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));
}

#[test]
fn editing_a_comment_marks_it_edited() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    let comment = h
        .app
        .add_comment(Some(&alice), &bug_id, "Typo here", None)
        .expect("comment");

    let edited = h
        .app
        .edit_comment(Some(&alice), &comment.id, "Typo fixed")
        .expect("edit");
    assert!(edited.edited);
    assert_eq!(edited.text, "Typo fixed");
}

#[test]
fn comments_page_in_chronological_order() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let bug_id = new_bug(&h.app, &alice, &project_id, "Chatty bug");
    for index in 0..24 {
        h.app
            .add_comment(Some(&alice), &bug_id, &format!("comment {index:02}"), None)
            .expect("comment");
    }

    let first = h.app.list_comments(None, &bug_id, 1).expect("page 1");
    assert_eq!(first.total, 25);
    assert_eq!(first.items.len(), 20);
    assert_eq!(first.items[0].text, "Opened the bug.");
    assert_eq!(first.items[1].text, "comment 00");

    let second = h.app.list_comments(None, &bug_id, 2).expect("page 2");
    assert_eq!(second.items.len(), 5);
    assert_eq!(second.items[4].text, "comment 23");

    let past = h.app.list_comments(None, &bug_id, 3).expect("page 3");
    assert!(past.items.is_empty());
}

#[test]
fn viewer_grant_on_restricted_project_can_view_but_not_edit() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let carol = sign_up(&h.app, "carol");
    let project_id = new_project(&h.app, &alice, "Secret", Visibility::Restricted);

    assert!(matches!(
        h.app.can_view_project(Some(&carol), &project_id),
        Err(AppError::Forbidden(_))
    ));

    h.app
        .grant_permission(Some(&alice), &project_id, "carol", ProjectPermission::Viewer)
        .expect("grant");
    assert!(h
        .app
        .can_view_project(Some(&carol), &project_id)
        .expect("carol can view"));
    assert!(matches!(
        h.app.can_edit_project(Some(&carol), &project_id),
        Err(AppError::Forbidden(_))
    ));
    assert_eq!(h.sent.borrow().last().map(|(to, _)| to.as_str()), Some("carol"));
}

#[test]
fn project_search_narrows_by_visibility_text_and_bug_state() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let bob = sign_up(&h.app, "bob");
    let public = new_project(&h.app, &alice, "Public parser", Visibility::Public);
    new_project(&h.app, &alice, "Members renderer", Visibility::LoggedInOnly);
    new_project(&h.app, &alice, "Secret parser", Visibility::Restricted);
    new_bug(&h.app, &alice, &public, "Open issue");

    assert_eq!(h.app.count_projects(None).expect("anon count"), 1);
    assert_eq!(h.app.count_projects(Some(&bob)).expect("bob count"), 2);
    assert_eq!(h.app.count_projects(Some(&alice)).expect("alice count"), 3);

    let parsers = h
        .app
        .search_projects(
            Some(&alice),
            &ProjectFilter {
                query: ListQuery {
                    text: Some("PARSER".to_string()),
                    ..ListQuery::default()
                },
                ..ProjectFilter::default()
            },
        )
        .expect("search");
    assert_eq!(parsers.total, 2);

    let quiet = h
        .app
        .search_projects(
            Some(&alice),
            &ProjectFilter {
                bug_state: OpenBugFilter::NoOpenBugs,
                ..ProjectFilter::default()
            },
        )
        .expect("search");
    assert_eq!(quiet.total, 2);
    assert!(quiet.items.iter().all(|project| project.id != public));
}

#[test]
fn recent_projects_respect_visibility_and_mine() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let bob = sign_up(&h.app, "bob");
    for index in 0..6 {
        new_project(&h.app, &alice, &format!("Alice {index}"), Visibility::Public);
    }
    let bobs = new_project(&h.app, &bob, "Bob's", Visibility::Restricted);

    let recent = h.app.recent_projects(None, false).expect("recent");
    assert_eq!(recent.len(), 5);
    assert!(recent.iter().all(|project| project.id != bobs));

    let mine = h.app.recent_projects(Some(&bob), true).expect("mine");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, bobs);

    assert!(matches!(
        h.app.recent_projects(None, true),
        Err(AppError::NotAuthenticated(_))
    ));
}

#[test]
fn bug_search_combines_text_creator_and_status() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    let login = new_bug(&h.app, &alice, &project_id, "Login fails");
    let layout = new_bug(&h.app, &alice, &project_id, "Layout bug");
    new_bug(&h.app, &alice, &project_id, "Slow start");
    h.app
        .toggle_bug_status(Some(&alice), &layout)
        .expect("close layout bug");

    let matched = h
        .app
        .search_bugs(
            None,
            &project_id,
            &BugFilter {
                query: ListQuery {
                    text: Some("login bug".to_string()),
                    ..ListQuery::default()
                },
                creator_name: Some("ALI".to_string()),
                ..BugFilter::default()
            },
        )
        .expect("search");
    assert_eq!(matched.total, 2);

    let open_only = h
        .app
        .search_bugs(
            None,
            &project_id,
            &BugFilter {
                query: ListQuery {
                    text: Some("login bug".to_string()),
                    ..ListQuery::default()
                },
                statuses: vec![Status::Open],
                ..BugFilter::default()
            },
        )
        .expect("search");
    assert_eq!(open_only.total, 1);
    assert_eq!(open_only.items[0].id, login);
}

#[test]
fn init_seeds_superuser_and_protected_project_once() {
    let h = harness();
    let seed = SeedConfig::default();
    let first = h.app.init(&seed, Some("supersecret")).expect("first init");
    assert!(first.superuser_created);
    assert!(first.project_created);

    let second = h.app.init(&seed, None).expect("second init");
    assert!(!second.superuser_created);
    assert!(!second.project_created);
    assert_eq!(first.superuser_id, second.superuser_id);

    let root = h
        .app
        .authenticate("super user", "supersecret")
        .expect("super user can log in");
    assert_eq!(root.role, AccountRole::SuperUser);
    assert!(matches!(
        h.app.delete_project(Some(&root), PROTECTED_PROJECT_ID),
        Err(AppError::Forbidden(_))
    ));
}

#[test]
fn admins_manage_roles_and_suspension() {
    let h = harness();
    h.app
        .init(&SeedConfig::default(), Some("supersecret"))
        .expect("init");
    let root = h
        .app
        .authenticate("Super User", "supersecret")
        .expect("root login");
    let alice = sign_up(&h.app, "alice");

    let promoted = h
        .app
        .set_role(Some(&root), &alice.account_id, AccountRole::Admin)
        .expect("promote");
    assert_eq!(promoted.role, AccountRole::Admin);

    let suspended = h
        .app
        .toggle_suspension(Some(&root), &alice.account_id)
        .expect("suspend");
    assert!(suspended.suspended);
    assert!(matches!(
        h.app.authenticate("alice", PASSWORD),
        Err(AppError::NotAuthenticated(_))
    ));

    let restored = h
        .app
        .toggle_suspension(Some(&root), &alice.account_id)
        .expect("unsuspend");
    assert!(!restored.suspended);

    let accounts = h.app.list_accounts(Some(&root), 1).expect("list");
    let names: Vec<&str> = accounts
        .items
        .iter()
        .map(|account| account.username.as_str())
        .collect();
    assert_eq!(names, vec!["alice", "Super User"]);
}

#[test]
fn deleting_an_account_tombstones_replies_to_its_comments() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");
    let bob = sign_up(&h.app, "bob");
    let project_id = new_project(&h.app, &alice, "Tracker", Visibility::Public);
    h.app
        .grant_permission(Some(&alice), &project_id, "bob", ProjectPermission::Editor)
        .expect("grant");
    let bug_id = new_bug(&h.app, &alice, &project_id, "Crash on save");
    let bobs = h
        .app
        .add_comment(Some(&bob), &bug_id, "Repro attached", None)
        .expect("bob comment");
    let reply = h
        .app
        .add_comment(Some(&alice), &bug_id, "Thanks", Some(&bobs.id))
        .expect("reply");

    let tombstoned = h
        .app
        .delete_account(Some(&bob), &bob.account_id)
        .expect("bob deletes their own account");
    assert_eq!(tombstoned, 1);
    assert!(!h.app.verify_username("bob").expect("lookup"));

    let comments = h.app.list_comments(None, &bug_id, 1).expect("list");
    let reply_after = comments
        .items
        .iter()
        .find(|comment| comment.id == reply.id)
        .expect("reply survives");
    assert!(reply_after
        .reply
        .as_ref()
        .is_some_and(|context| context.preview.is_none()));
}

#[test]
fn registration_stores_an_argon2_phc_string() {
    let h = harness();
    sign_up(&h.app, "alice");

    let stored = crate::db::find_account_by_username(&h.app.conn, "alice")
        .expect("lookup")
        .expect("account exists")
        .password_hash;
    assert!(stored.starts_with("$argon2id$"), "unexpected hash {stored}");
    assert!(!stored.contains(PASSWORD));
    assert!(crate::auth::verify_password(PASSWORD, &stored));
}

#[test]
fn account_self_service_updates() {
    let h = harness();
    let alice = sign_up(&h.app, "alice");

    let renamed = h
        .app
        .rename_account(Some(&alice), "alicia")
        .expect("rename");
    assert_eq!(renamed.username, "alicia");
    assert!(h.app.verify_username("ALICIA").expect("lookup"));

    let updated = h
        .app
        .update_email(Some(&alice), Some("alicia@example.com"))
        .expect("email");
    assert_eq!(updated.email.as_deref(), Some("alicia@example.com"));

    h.app
        .change_password(Some(&alice), PASSWORD, "another-password")
        .expect("password change");
    assert!(h.app.authenticate("alicia", "another-password").is_ok());
    assert!(h.app.authenticate("alicia", PASSWORD).is_err());
}
