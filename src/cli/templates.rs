use anyhow::{Result, bail};
use serde_json::json;

use super::{GlobalArgs, open_engine, parse_id, positional, print_json, read_payload};
use crate::core::terminal::{print_error, print_success};

pub async fn run_template_command(global: &GlobalArgs) -> Result<()> {
    let args = &global.command;
    let sub_cmd = args.get(1).map(String::as_str).unwrap_or("");
    let engine = open_engine(global).await?;

    match sub_cmd {
        "create" => {
            let payload = read_payload(args, 2).await?;
            let record = engine.create_template(&payload).await?;
            print_json(&record)
        }
        "update" => {
            let id = parse_id(positional(args, 2, 0), "template")?;
            let payload = read_payload(args, 2).await?;
            let record = engine.update_template(id, &payload).await?;
            print_json(&record)
        }
        "show" | "get" => {
            let id = parse_id(positional(args, 2, 0), "template")?;
            print_json(&engine.get_template(id).await?)
        }
        "list" | "ls" => print_json(&engine.list_templates().await?),
        "delete" | "rm" => {
            let id = parse_id(positional(args, 2, 0), "template")?;
            engine.delete_template(id).await?;
            print_success(&format!("Template {} deleted.", id));
            print_json(&json!({ "id": id, "deleted": true }))
        }
        _ => {
            print_error("Unknown or missing template command. Expected: create, update, show, list, delete");
            bail!("unknown template command '{}'", sub_cmd)
        }
    }
}
