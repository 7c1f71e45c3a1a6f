use std::path::Path;

use super::{
    App, AppError, ErrorKind, NewBug, ProjectInput, Registration, PROTECTED_PROJECT_ID,
};
use crate::access::{Denial, Viewer};
use crate::config::SeedConfig;
use crate::domain::account::AccountRole;
use crate::domain::bug::Severity;
use crate::domain::project::{ProjectPermission, Visibility};
use crate::notify::{LogNotifier, OutboxNotifier};

const PASSWORD: &str = "password123";

fn open_app(root: &Path) -> App {
    let db_path = root.join("tracker.sqlite");
    App::open(db_path.to_str().expect("utf8 path"), Box::new(LogNotifier))
        .expect("app should open")
}

fn sign_up(app: &App, username: &str) -> Viewer {
    app.register(&Registration {
        username: username.to_string(),
        email: None,
        password: PASSWORD.to_string(),
    })
    .expect("registration should succeed");
    app.authenticate(username, PASSWORD)
        .expect("login should succeed")
}

fn project(app: &App, owner: &Viewer, visibility: Visibility) -> String {
    app.create_project(
        Some(owner),
        &ProjectInput {
            name: Some("Tracker".to_string()),
            summary: Some("Tracks things".to_string()),
            visibility: Some(visibility),
            ..ProjectInput::default()
        },
    )
    .expect("project should be created")
    .id
}

fn bug(app: &App, viewer: &Viewer, project_id: &str) -> String {
    app.create_bug(
        Some(viewer),
        project_id,
        &NewBug {
            summary: "Crash".to_string(),
            description: None,
            severity: Severity::Medium,
        },
    )
    .expect("bug should be created")
    .id
}

#[test]
fn error_kinds_map_to_distinct_exit_codes() {
    let cases = [
        (AppError::NotAuthenticated("x".into()), ErrorKind::NotAuthenticated, 3),
        (AppError::Forbidden("x".into()), ErrorKind::Forbidden, 4),
        (AppError::NotFound("x".into()), ErrorKind::NotFound, 5),
        (AppError::InvalidArgument("x".into()), ErrorKind::Validation, 6),
        (
            AppError::Io(std::io::Error::other("disk")),
            ErrorKind::Internal,
            1,
        ),
    ];
    for (error, kind, code) in cases {
        assert_eq!(error.kind(), kind);
        assert_eq!(error.kind().exit_code(), code);
    }

    let parse = "urgent"
        .parse::<Severity>()
        .map_err(AppError::from)
        .expect_err("unknown severity");
    assert_eq!(parse.kind(), ErrorKind::Validation);
    assert!(parse.to_string().contains("urgent"));
}

#[test]
fn denials_convert_to_matching_errors() {
    assert!(matches!(
        AppError::from(Denial::NotAuthenticated),
        AppError::NotAuthenticated(_)
    ));
    assert!(matches!(AppError::from(Denial::Forbidden), AppError::Forbidden(_)));
}

#[test]
fn anonymous_mutations_require_authentication() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = open_app(dir.path());
    let alice = sign_up(&app, "alice");
    let project_id = project(&app, &alice, Visibility::Public);
    let bug_id = bug(&app, &alice, &project_id);

    assert!(matches!(
        app.create_project(None, &ProjectInput::default()),
        Err(AppError::NotAuthenticated(_))
    ));
    assert!(matches!(
        app.toggle_bug_status(None, &bug_id),
        Err(AppError::NotAuthenticated(_))
    ));
    assert!(matches!(
        app.add_comment(None, &bug_id, "hi", None),
        Err(AppError::NotAuthenticated(_))
    ));
    assert!(matches!(
        app.list_accounts(None, 1),
        Err(AppError::NotAuthenticated(_))
    ));
}

#[test]
fn restricted_and_members_only_projects_hide_from_the_wrong_viewers() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = open_app(dir.path());
    let alice = sign_up(&app, "alice");
    let bob = sign_up(&app, "bob");
    let members = project(&app, &alice, Visibility::LoggedInOnly);
    let secret = project(&app, &alice, Visibility::Restricted);
    let secret_bug = bug(&app, &alice, &secret);

    assert!(matches!(
        app.show_project(None, &members),
        Err(AppError::NotAuthenticated(_))
    ));
    assert!(app.show_project(Some(&bob), &members).is_ok());
    assert!(matches!(
        app.show_project(Some(&bob), &secret),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        app.show_bug(Some(&bob), &secret_bug),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        app.list_comments(Some(&bob), &secret_bug, 1),
        Err(AppError::Forbidden(_))
    ));
}

#[test]
fn non_contributor_cannot_comment_and_nothing_is_written() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = open_app(dir.path());
    let alice = sign_up(&app, "alice");
    let carol = sign_up(&app, "carol");
    let project_id = project(&app, &alice, Visibility::Public);
    let bug_id = bug(&app, &alice, &project_id);
    let before = app.list_comments(None, &bug_id, 1).expect("list").total;

    assert!(matches!(
        app.can_add_comment(Some(&carol), &bug_id),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        app.add_comment(Some(&carol), &bug_id, "drive-by", None),
        Err(AppError::Forbidden(_))
    ));
    assert_eq!(
        app.list_comments(None, &bug_id, 1).expect("list").total,
        before
    );

    app.grant_permission(Some(&alice), &project_id, "carol", ProjectPermission::Viewer)
        .expect("grant viewer");
    assert!(matches!(
        app.create_bug(
            Some(&carol),
            &project_id,
            &NewBug {
                summary: "nope".to_string(),
                description: None,
                severity: Severity::Low,
            },
        ),
        Err(AppError::Forbidden(_))
    ));
}

#[test]
fn audit_comments_and_other_authors_comments_are_immutable() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = open_app(dir.path());
    let alice = sign_up(&app, "alice");
    let bob = sign_up(&app, "bob");
    let project_id = project(&app, &alice, Visibility::Public);
    app.grant_permission(Some(&alice), &project_id, "bob", ProjectPermission::Editor)
        .expect("grant editor");
    let bug_id = bug(&app, &alice, &project_id);

    let audit_id = app.list_comments(None, &bug_id, 1).expect("list").items[0]
        .id
        .clone();
    assert!(matches!(
        app.edit_comment(Some(&alice), &audit_id, "rewritten"),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        app.delete_comment(Some(&alice), &audit_id),
        Err(AppError::Forbidden(_))
    ));

    let bobs = app
        .add_comment(Some(&bob), &bug_id, "mine", None)
        .expect("bob comments");
    assert!(matches!(
        app.edit_comment(Some(&alice), &bobs.id, "project owner edit"),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        app.edit_comment(Some(&bob), &bobs.id, "   "),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.delete_comment(Some(&bob), "missing"),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn permission_grants_are_validated() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = open_app(dir.path());
    let alice = sign_up(&app, "alice");
    let bob = sign_up(&app, "bob");
    let project_id = project(&app, &alice, Visibility::Restricted);

    assert!(matches!(
        app.grant_permission(Some(&alice), &project_id, "ghost", ProjectPermission::Viewer),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        app.grant_permission(Some(&alice), &project_id, "ALICE", ProjectPermission::Viewer),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.grant_permission(Some(&alice), &project_id, "bob", ProjectPermission::Owner),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.grant_permission(Some(&bob), &project_id, "bob", ProjectPermission::Viewer),
        Err(AppError::Forbidden(_))
    ));

    let grant = app
        .grant_permission(Some(&alice), &project_id, "bob", ProjectPermission::Viewer)
        .expect("grant");
    assert!(matches!(
        app.grant_permission(Some(&alice), &project_id, "bob", ProjectPermission::Editor),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.check_grant_username(Some(&alice), &project_id, "bob"),
        Err(AppError::InvalidArgument(_))
    ));

    assert!(app
        .validate_permission(Some(&bob), &project_id, ProjectPermission::Viewer)
        .expect("bob holds viewer"));
    assert!(matches!(
        app.validate_permission(Some(&bob), &project_id, ProjectPermission::Editor),
        Err(AppError::Forbidden(_))
    ));
    assert!(app
        .validate_permission(Some(&alice), &project_id, ProjectPermission::Editor)
        .expect("owner passes every level"));

    let owner_record = app
        .list_permissions(Some(&alice), &project_id, 1)
        .expect("list")
        .items
        .into_iter()
        .find(|permission| permission.level == ProjectPermission::Owner)
        .expect("owner record");
    assert!(matches!(
        app.revoke_permission(Some(&alice), &project_id, &owner_record.id),
        Err(AppError::Forbidden(_))
    ));

    let updated = app
        .update_permission(Some(&alice), &project_id, &grant.id, ProjectPermission::Editor)
        .expect("update");
    assert_eq!(updated.level, ProjectPermission::Editor);
    app.revoke_permission(Some(&alice), &project_id, &grant.id)
        .expect("revoke");
    assert!(matches!(
        app.show_project(Some(&bob), &project_id),
        Err(AppError::Forbidden(_))
    ));
}

#[test]
fn registration_rejects_duplicates_and_short_passwords() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = open_app(dir.path());
    sign_up(&app, "alice");

    let duplicate = app.register(&Registration {
        username: "  Alice ".to_string(),
        email: None,
        password: PASSWORD.to_string(),
    });
    assert!(matches!(duplicate, Err(AppError::InvalidArgument(_))));

    let short = app.register(&Registration {
        username: "bob".to_string(),
        email: None,
        password: "short".to_string(),
    });
    assert!(matches!(short, Err(AppError::InvalidArgument(_))));

    let wrong = app.authenticate("alice", "not-the-password");
    assert!(matches!(wrong, Err(AppError::NotAuthenticated(_))));
    let unknown = app.authenticate("nobody", PASSWORD);
    assert!(matches!(unknown, Err(AppError::NotAuthenticated(_))));
}

#[test]
fn account_administration_guards() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = open_app(dir.path());
    let summary = app
        .init(&SeedConfig::default(), Some("supersecret"))
        .expect("init");
    let root = app
        .authenticate("Super User", "supersecret")
        .expect("root login");
    let alice = sign_up(&app, "alice");
    let bob = sign_up(&app, "bob");

    assert!(matches!(
        app.list_accounts(Some(&alice), 1),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        app.toggle_suspension(Some(&root), &summary.superuser_id),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        app.set_role(Some(&root), &alice.account_id, AccountRole::SuperUser),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.set_role(Some(&root), "missing", AccountRole::Admin),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        app.rename_account(Some(&alice), "BOB"),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.delete_account(Some(&alice), &bob.account_id),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        app.delete_account(Some(&root), &root.account_id),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        app.change_password(Some(&alice), "wrong-password", "new-password-1"),
        Err(AppError::NotAuthenticated(_))
    ));
}

#[test]
fn first_init_requires_a_superuser_password() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = open_app(dir.path());
    assert!(matches!(
        app.init(&SeedConfig::default(), None),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.delete_project(None, PROTECTED_PROJECT_ID),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn missing_records_report_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = open_app(dir.path());
    let alice = sign_up(&app, "alice");

    assert!(matches!(
        app.show_project(Some(&alice), "nope"),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        app.show_bug(Some(&alice), "nope"),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        app.list_bugs(Some(&alice), "nope", 1),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn outbox_notifier_receives_grant_notifications() {
    let dir = tempfile::tempdir().expect("temp dir");
    let outbox = dir.path().join("outbox");
    let db_path = dir.path().join("tracker.sqlite");
    let app = App::open(
        db_path.to_str().expect("utf8 path"),
        Box::new(OutboxNotifier::new(&outbox)),
    )
    .expect("app should open");
    let alice = sign_up(&app, "alice");
    sign_up(&app, "bob");
    let project_id = project(&app, &alice, Visibility::Public);

    app.grant_permission(Some(&alice), &project_id, "bob", ProjectPermission::Editor)
        .expect("grant");

    let messages: Vec<serde_json::Value> = std::fs::read_dir(&outbox)
        .expect("outbox should exist")
        .map(|entry| {
            let path = entry.expect("dir entry").path();
            let raw = std::fs::read_to_string(path).expect("message readable");
            serde_json::from_str(&raw).expect("message is json")
        })
        .collect();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["recipient"]["username"], "bob");
    assert_eq!(messages[0]["subject"], "Project access granted");
}
