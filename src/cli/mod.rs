mod access;
mod schema_cmd;
mod settings_cmd;
mod tasks;
mod templates;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use console::style;
use serde_json::Value;

use crate::core::config::{self, CONFIG_FILE, EngineConfig};
use crate::core::engine::JobEngine;
use crate::core::error::EngineError;
use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    GuideSection::new("Schemas")
        .command("schema <name>", "Describe template, template-update, periodic-task, playbook-args or module-args")
        .print();

    GuideSection::new("Jobs")
        .command("template <create|update|show|list|delete>", "Manage execution templates")
        .command("task <create|update|show|list|delete|run|history>", "Manage periodic tasks")
        .print();

    GuideSection::new("Access")
        .command("user add <name>", "Create a user")
        .command("group <add|member|members>", "Manage teams")
        .command("acl <grant|revoke|list>", "Manage object permissions")
        .command("settings <get|set|reset> <user>", "Read or write user settings")
        .print();

    eprintln!(
        "\n {} {} [--db PATH] [--config PATH] [--verbose] <command> [subcommand]\n",
        style("Usage:").bold(),
        style("runplan").green()
    );
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct GlobalArgs {
    pub db: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub command: Vec<String>,
}

/// Split global flags from the command words. Flags may appear anywhere
/// before the command's own arguments.
pub(crate) fn parse_global_args(args: &[String], start: usize) -> GlobalArgs {
    let mut parsed = GlobalArgs::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--db" => {
                if i + 1 < args.len() {
                    parsed.db = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    parsed.config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                parsed.verbose = true;
                i += 1;
            }
            _ => {
                parsed.command.push(args[i].clone());
                i += 1;
            }
        }
    }
    parsed
}

/// Value following `flag` (or its short alias) in `args[start..]`.
pub(crate) fn flag_value(args: &[String], start: usize, names: &[&str]) -> Option<String> {
    let mut i = start;
    while i < args.len() {
        if names.contains(&args[i].as_str()) {
            return args.get(i + 1).cloned();
        }
        i += 1;
    }
    None
}

/// Positional word at `index`, skipping `--flag value` pairs.
pub(crate) fn positional(args: &[String], start: usize, index: usize) -> Option<String> {
    let mut seen = 0;
    let mut i = start;
    while i < args.len() {
        if args[i].starts_with('-') {
            i += 2;
            continue;
        }
        if seen == index {
            return Some(args[i].clone());
        }
        seen += 1;
        i += 1;
    }
    None
}

pub(crate) fn parse_id(raw: Option<String>, what: &str) -> Result<i64> {
    let Some(raw) = raw else {
        bail!("missing {} id", what);
    };
    raw.parse()
        .with_context(|| format!("'{}' is not a valid {} id", raw, what))
}

/// JSON payload from `--data JSON` or `--file PATH`.
pub(crate) async fn read_payload(args: &[String], start: usize) -> Result<Value> {
    if let Some(data) = flag_value(args, start, &["--data", "-d"]) {
        return serde_json::from_str(&data).context("--data is not valid JSON");
    }
    if let Some(path) = flag_value(args, start, &["--file", "-f"]) {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("cannot read {}", path))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("{} is not valid JSON", path));
    }
    bail!("a payload is required: pass --data JSON or --file PATH")
}

pub(crate) async fn load_config(global: &GlobalArgs) -> Result<EngineConfig> {
    let config_path = global
        .config
        .clone()
        .unwrap_or_else(|| config::data_dir().join(CONFIG_FILE));
    EngineConfig::load(config_path).await
}

pub(crate) async fn open_engine(global: &GlobalArgs) -> Result<JobEngine> {
    let config = load_config(global).await?;
    let database = config.database_path(global.db.as_deref(), &config::data_dir());
    Ok(JobEngine::from_config(&config, &database).await?)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let global = parse_global_args(&args, 1);
    crate::logging::init(global.verbose);

    let result = dispatch(&global).await;
    if let Err(e) = &result
        && let Some(errors) = e.downcast_ref::<EngineError>().and_then(EngineError::validation)
    {
        eprintln!("{}", serde_json::to_string_pretty(errors)?);
    }
    result
}

async fn dispatch(global: &GlobalArgs) -> Result<()> {
    let words = &global.command;
    let Some(cmd) = words.first() else {
        print_help();
        return Ok(());
    };
    match cmd.as_str() {
        "schema" => schema_cmd::run_schema_command(global).await,
        "template" | "templates" => templates::run_template_command(global).await,
        "task" | "tasks" => tasks::run_task_command(global).await,
        "user" => access::run_user_command(global).await,
        "group" => access::run_group_command(global).await,
        "acl" => access::run_acl_command(global).await,
        "settings" => settings_cmd::run_settings_command(global).await,
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_error(&format!("Unknown command: {}", other));
            print_help();
            bail!("unknown command '{}'", other)
        }
    }
}

pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    terminal::print_json(value)?;
    Ok(())
}
