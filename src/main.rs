mod access;
mod app;
mod auth;
mod cli;
mod cli_ops;
mod config;
mod db;
mod dispatch;
mod domain;
mod listing;
mod logging;
mod notify;
mod threading;
mod ui;

use std::path::Path;

use access::Viewer;
use app::{App, AppError};
use config::Config;
use notify::{LogNotifier, Notifier, OutboxNotifier};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(err.kind().exit_code());
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    let config = Config::load(&cli.config)?;
    logging::init(&config.logging.filter);

    let db_path = resolve_db_path(cli.db.as_deref(), &config);
    let app = App::open(&db_path, notifier_for(&config))?;

    if let Commands::Init(args) = &cli.command {
        let summary = app.init(&config.seed, args.superuser_password.as_deref())?;
        if cli.json {
            print_json(&summary);
        } else {
            println!("bugtrack init completed");
        }
        return Ok(());
    }

    let viewer = sign_in(&app, cli.as_user.as_deref(), cli.password.as_deref())?;
    let ctx = dispatch::Context {
        app: &app,
        viewer: viewer.as_ref(),
        password: cli.password.as_deref(),
        json: cli.json,
    };

    match cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Account(args) => dispatch::run_account(&ctx, args.command),
        Commands::Project(args) => dispatch::run_project(&ctx, args.command),
        Commands::Bug(args) => dispatch::run_bug(&ctx, args.command),
        Commands::Comment(args) => dispatch::run_comment(&ctx, args.command),
        Commands::Permission(args) => dispatch::run_permission(&ctx, args.command),
    }
}

/// `--db` wins over `[storage] db_path`.
fn resolve_db_path(flag: Option<&str>, config: &Config) -> String {
    flag.map(str::trim)
        .filter(|path| !path.is_empty())
        .unwrap_or(&config.storage.db_path)
        .to_string()
}

fn notifier_for(config: &Config) -> Box<dyn Notifier> {
    match config.notify.outbox_dir.as_deref() {
        Some(dir) if !dir.trim().is_empty() => Box::new(OutboxNotifier::new(Path::new(dir))),
        _ => Box::new(LogNotifier),
    }
}

fn sign_in(
    app: &App,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<Option<Viewer>, AppError> {
    let Some(username) = username.map(str::trim).filter(|name| !name.is_empty()) else {
        return Ok(None);
    };
    let password = password.ok_or_else(|| {
        AppError::NotAuthenticated(format!("--password is required to act as '{username}'"))
    })?;
    app.authenticate(username, password).map(Some)
}
