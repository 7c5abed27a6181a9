use anyhow::{Context, Result, bail};
use serde_json::Value;

use super::{GlobalArgs, open_engine, parse_id, print_json};
use crate::core::terminal::print_error;

/// `settings <get|set|reset> USER [JSON]`
pub async fn run_settings_command(global: &GlobalArgs) -> Result<()> {
    let args = &global.command;
    let sub_cmd = args.get(1).map(String::as_str).unwrap_or("");
    let user_id = || parse_id(args.get(2).cloned(), "user");

    match sub_cmd {
        "get" | "show" => {
            let user_id = user_id()?;
            let engine = open_engine(global).await?;
            print_json(&engine.user_settings(user_id).await?)
        }
        "set" => {
            let user_id = user_id()?;
            let Some(raw) = args.get(3) else {
                bail!("settings set needs a JSON value");
            };
            let value: Value = serde_json::from_str(raw).context("settings value is not valid JSON")?;
            let engine = open_engine(global).await?;
            print_json(&engine.set_user_settings(user_id, &value).await?)
        }
        "reset" | "clear" => {
            let user_id = user_id()?;
            let engine = open_engine(global).await?;
            print_json(&engine.reset_user_settings(user_id).await?)
        }
        _ => {
            print_error("Unknown or missing settings command. Expected: get, set, reset");
            bail!("unknown settings command '{}'", sub_cmd)
        }
    }
}
