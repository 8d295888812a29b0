//! Command-line driver over the CannaLog application controller.
//!
//! Every command runs the same flows a UI would: resume session, navigate to
//! the editor, mutate the draft, save or delete, navigate back.

use cannalog_core::{
    init_logging_with, AppConfig, CannaLogApp, Entry, EntryId, LogLevel, Message, MessageKind,
    Screen, Stage,
};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use log::debug;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "cannalog", version, about = "Personal grow-log")]
struct Cli {
    /// SQLite file (overrides CANNALOG_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files (overrides CANNALOG_LOG_DIR).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error (overrides CANNALOG_LOG_LEVEL).
    #[arg(long, global = true, value_parser = parse_level)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core health and version.
    Ping,
    /// Sign in with an identity token.
    SignIn { token: String },
    /// Sign out of the current session.
    SignOut {
        /// Confirm the sign-out.
        #[arg(long)]
        yes: bool,
    },
    /// Show the signed-in identity.
    Whoami,
    /// List entries, newest first.
    List,
    /// List growth stages in selector order.
    Stages,
    /// Create an entry.
    Add(EntryFields),
    /// Edit an existing entry.
    Edit {
        id: EntryId,
        #[command(flatten)]
        fields: EntryFields,
    },
    /// Delete an entry.
    Delete { id: EntryId },
}

#[derive(Debug, Args)]
struct EntryFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_parser = parse_stage)]
    stage: Option<Stage>,
    /// RFC 3339 date-time, e.g. 2024-05-01T10:00:00Z.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

fn parse_level(raw: &str) -> Result<LogLevel, String> {
    LogLevel::parse(raw).ok_or_else(|| format!("unknown log level `{raw}`"))
}

fn parse_stage(raw: &str) -> Result<Stage, String> {
    Stage::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = Stage::ALL.iter().map(|stage| stage.as_str()).collect();
        format!("unknown stage `{raw}`; expected one of {}", known.join("|"))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, String> {
    let mut config = AppConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), String> {
    if matches!(cli.command, Command::Ping) {
        println!("cannalog_core ping={}", cannalog_core::ping());
        println!("cannalog_core version={}", cannalog_core::core_version());
        return Ok(());
    }
    if matches!(cli.command, Command::Stages) {
        for stage in Stage::ALL {
            println!("{}\t{}", stage.page(), stage);
        }
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging_with(config.log_level, log_dir).map_err(|err| err.to_string())?;
    }
    debug!("event=cli_start module=cli status=ok");

    let app = CannaLogApp::open_local(&config.db_path).map_err(|err| err.to_string())?;
    app.start().await;

    let result = dispatch(&app, cli.command).await;
    print_messages(&app.messages());
    result
}

async fn dispatch(app: &CannaLogApp, command: Command) -> Result<(), String> {
    match command {
        Command::Ping | Command::Stages => Ok(()),
        Command::SignIn { token } => {
            if app.screen() != Screen::Authentication {
                return Err("already signed in; sign out first".to_string());
            }
            let identity = app.sign_in(&token).await.map_err(|err| err.to_string())?;
            println!("signed in as {}", identity.user_id);
            Ok(())
        }
        Command::SignOut { yes } => {
            if !app.request_sign_out() {
                return Err("not signed in".to_string());
            }
            if !yes {
                app.cancel_sign_out();
                return Err("are you sure you want to sign out? pass --yes to confirm".to_string());
            }
            app.confirm_sign_out().await.map_err(|err| err.to_string())?;
            println!("signed out");
            Ok(())
        }
        Command::Whoami => {
            match app.current_identity() {
                Some(identity) => println!("{}", identity.user_id),
                None => println!("not signed in"),
            }
            Ok(())
        }
        Command::List => {
            require_list(app)?;
            let entries = app.entries();
            if entries.is_empty() {
                println!("no entries");
            }
            for entry in entries.iter() {
                print_entry(entry);
            }
            Ok(())
        }
        Command::Add(fields) => {
            require_list(app)?;
            app.create_entry().await;
            write_entry(app, fields).await
        }
        Command::Edit { id, fields } => {
            require_list(app)?;
            app.open_entry(id).await;
            if app.draft().and_then(|draft| draft.id) != Some(id) {
                app.back();
                return Err(format!("entry not found: {id}"));
            }
            write_entry(app, fields).await
        }
        Command::Delete { id } => {
            require_list(app)?;
            app.open_entry(id).await;
            if app.draft().and_then(|draft| draft.id) != Some(id) {
                app.back();
                println!("nothing to delete");
                return Ok(());
            }
            app.delete().await.map_err(|err| err.to_string())
        }
    }
}

fn require_list(app: &CannaLogApp) -> Result<(), String> {
    if app.screen() == Screen::List {
        Ok(())
    } else {
        Err("not signed in; run `cannalog sign-in <token>`".to_string())
    }
}

async fn write_entry(app: &CannaLogApp, fields: EntryFields) -> Result<(), String> {
    let editor = app
        .editor()
        .ok_or_else(|| "editor did not open".to_string())?;
    if let Some(title) = fields.title {
        editor.set_title(title);
    }
    if let Some(description) = fields.description {
        editor.set_description(description);
    }
    if let Some(stage) = fields.stage {
        editor.set_stage(stage);
    }
    if let Some(at) = fields.at {
        editor.set_timestamp(at);
    }

    let saved = app.save().await.map_err(|err| err.to_string())?;
    print_entry(&saved);
    Ok(())
}

fn print_entry(entry: &Entry) {
    let id = entry.id.map(|id| id.to_string()).unwrap_or_default();
    let at = entry
        .timestamp()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| entry.timestamp_ms.to_string());
    let title = if entry.title.is_empty() {
        "(untitled)"
    } else {
        entry.title.as_str()
    };
    println!("{id}\t{at}\t{:<10}\t{title}", entry.stage.as_str());
}

fn print_messages(messages: &[Message]) {
    for message in messages {
        if message.kind == MessageKind::Error {
            eprintln!("! {}", message.text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_stage, Cli, Command};
    use cannalog_core::Stage;
    use clap::Parser;

    #[test]
    fn add_parses_stage_and_timestamp() {
        let cli = Cli::try_parse_from([
            "cannalog",
            "add",
            "--title",
            "Day 1",
            "--stage",
            "seed",
            "--at",
            "2024-05-01T10:00:00Z",
        ])
        .unwrap();
        match cli.command {
            Command::Add(fields) => {
                assert_eq!(fields.title.as_deref(), Some("Day 1"));
                assert_eq!(fields.stage, Some(Stage::Seed));
                assert!(fields.at.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_stage_lists_choices() {
        let err = parse_stage("bloom").unwrap_err();
        assert!(err.contains("FLOWERING"));
    }

    #[test]
    fn sign_out_requires_explicit_flag_to_confirm() {
        let cli = Cli::try_parse_from(["cannalog", "sign-out"]).unwrap();
        assert!(matches!(cli.command, Command::SignOut { yes: false }));
    }
}
