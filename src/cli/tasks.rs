use anyhow::{Result, bail};
use serde_json::json;

use super::{GlobalArgs, open_engine, parse_id, positional, print_json, read_payload};
use crate::core::error::EngineError;
use crate::core::terminal::{print_error, print_status, print_success};

pub async fn run_task_command(global: &GlobalArgs) -> Result<()> {
    let args = &global.command;
    let sub_cmd = args.get(1).map(String::as_str).unwrap_or("");
    let engine = open_engine(global).await?;

    match sub_cmd {
        "create" => {
            let payload = read_payload(args, 2).await?;
            print_json(&engine.create_periodic_task(&payload).await?)
        }
        "update" => {
            let id = parse_id(positional(args, 2, 0), "task")?;
            let payload = read_payload(args, 2).await?;
            print_json(&engine.update_periodic_task(id, &payload).await?)
        }
        "show" | "get" => {
            let id = parse_id(positional(args, 2, 0), "task")?;
            print_json(&engine.get_periodic_task(id).await?)
        }
        "list" | "ls" => print_json(&engine.list_periodic_tasks().await?),
        "delete" | "rm" => {
            let id = parse_id(positional(args, 2, 0), "task")?;
            engine.delete_periodic_task(id).await?;
            print_success(&format!("Periodic task {} deleted.", id));
            print_json(&json!({ "id": id, "deleted": true }))
        }
        "run" | "execute" => {
            let id = parse_id(positional(args, 2, 0), "task")?;
            let response = engine.execute_periodic_task(id).await?;
            print_status("History", &response.history_id.to_string());
            print_json(&response)
        }
        "history" => {
            let id = parse_id(positional(args, 2, 0), "history")?;
            match engine.store().get_history(id).await? {
                Some(entry) => print_json(&entry),
                None => Err(EngineError::not_found("History", id).into()),
            }
        }
        _ => {
            print_error(
                "Unknown or missing task command. Expected: create, update, show, list, delete, run, history",
            );
            bail!("unknown task command '{}'", sub_cmd)
        }
    }
}
