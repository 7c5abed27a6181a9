use anyhow::{Result, bail};
use serde_json::{Value, json};

use super::{GlobalArgs, flag_value, open_engine, parse_id, print_json};
use crate::core::acl::{AclRole, AclTarget, Member};
use crate::core::terminal::{print_error, print_success};

pub async fn run_user_command(global: &GlobalArgs) -> Result<()> {
    let args = &global.command;
    match args.get(1).map(String::as_str) {
        Some("add") | Some("create") => {
            let Some(username) = args.get(2) else {
                bail!("user add needs a name");
            };
            let engine = open_engine(global).await?;
            let id = engine.store().create_user(username).await?;
            print_success(&format!("User '{}' created.", username));
            print_json(&json!({ "id": id, "username": username }))
        }
        _ => {
            print_error("Unknown or missing user command. Expected: add");
            bail!("unknown user command")
        }
    }
}

pub async fn run_group_command(global: &GlobalArgs) -> Result<()> {
    let args = &global.command;
    let sub_cmd = args.get(1).map(String::as_str).unwrap_or("");
    match sub_cmd {
        "add" | "create" => {
            let Some(name) = args.get(2) else {
                bail!("group add needs a name");
            };
            let engine = open_engine(global).await?;
            let id = engine.store().create_group(name).await?;
            print_success(&format!("Group '{}' created.", name));
            print_json(&json!({ "id": id, "name": name }))
        }
        "member" => {
            let group_id = parse_id(args.get(2).cloned(), "group")?;
            let user_id = parse_id(args.get(3).cloned(), "user")?;
            let engine = open_engine(global).await?;
            engine.store().add_group_member(group_id, user_id).await?;
            print_json(&engine.store().group_members(group_id).await?)
        }
        "members" => {
            let group_id = parse_id(args.get(2).cloned(), "group")?;
            let engine = open_engine(global).await?;
            print_json(&engine.store().group_members(group_id).await?)
        }
        _ => {
            print_error("Unknown or missing group command. Expected: add, member, members");
            bail!("unknown group command '{}'", sub_cmd)
        }
    }
}

/// `--template ID` or `--task ID`.
pub(crate) fn parse_target(args: &[String], start: usize) -> Result<AclTarget> {
    let template = flag_value(args, start, &["--template"]);
    let task = flag_value(args, start, &["--task"]);
    match (template, task) {
        (Some(id), None) => Ok(AclTarget::template(parse_id(Some(id), "template")?)),
        (None, Some(id)) => Ok(AclTarget::periodic_task(parse_id(Some(id), "task")?)),
        (Some(_), Some(_)) => bail!("pass only one of --template or --task"),
        (None, None) => bail!("a target is required: --template ID or --task ID"),
    }
}

/// `--user ID` or `--group ID`; a permission has exactly one owner.
pub(crate) fn parse_member(args: &[String], start: usize) -> Result<Member> {
    let user = flag_value(args, start, &["--user"]);
    let group = flag_value(args, start, &["--group", "--team"]);
    match (user, group) {
        (Some(id), None) => Ok(Member::User(parse_id(Some(id), "user")?)),
        (None, Some(id)) => Ok(Member::Group(parse_id(Some(id), "group")?)),
        (Some(_), Some(_)) => bail!("a permission belongs to a user or a group, not both"),
        (None, None) => bail!("an owner is required: --user ID or --group ID"),
    }
}

pub async fn run_acl_command(global: &GlobalArgs) -> Result<()> {
    let args = &global.command;
    let sub_cmd = args.get(1).map(String::as_str).unwrap_or("");
    match sub_cmd {
        "grant" | "add" => {
            let target = parse_target(args, 2)?;
            let member = parse_member(args, 2)?;
            let role = match flag_value(args, 2, &["--role"]) {
                Some(role) => AclRole::parse(&role)?,
                None => AclRole::Executor,
            };
            let engine = open_engine(global).await?;
            let permission = engine.grant(target, member, role).await?;
            print_json(&permission.to_json())
        }
        "revoke" | "rm" => {
            let id = parse_id(args.get(2).cloned(), "permission")?;
            let engine = open_engine(global).await?;
            engine.revoke(id).await?;
            print_success(&format!("Permission {} revoked.", id));
            print_json(&json!({ "id": id, "deleted": true }))
        }
        "list" | "ls" => {
            let target = parse_target(args, 2)?;
            let engine = open_engine(global).await?;
            let permissions: Vec<Value> = engine
                .permissions(target)
                .await?
                .iter()
                .map(|permission| permission.to_json())
                .collect();
            print_json(&permissions)
        }
        _ => {
            print_error("Unknown or missing acl command. Expected: grant, revoke, list");
            bail!("unknown acl command '{}'", sub_cmd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_member, parse_target};
    use crate::core::acl::{AclTarget, Member};

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn member_needs_exactly_one_owner() {
        let user = argv(&["acl", "grant", "--user", "3"]);
        assert_eq!(parse_member(&user, 2).unwrap(), Member::User(3));
        let team = argv(&["acl", "grant", "--team", "9"]);
        assert_eq!(parse_member(&team, 2).unwrap(), Member::Group(9));

        assert!(parse_member(&argv(&["acl", "grant", "--user", "1", "--group", "2"]), 2).is_err());
        assert!(parse_member(&argv(&["acl", "grant"]), 2).is_err());
    }

    #[test]
    fn target_is_a_template_or_a_task() {
        let args = argv(&["acl", "list", "--task", "5"]);
        assert_eq!(parse_target(&args, 2).unwrap(), AclTarget::periodic_task(5));
        let args = argv(&["acl", "list", "--template", "2"]);
        assert_eq!(parse_target(&args, 2).unwrap(), AclTarget::template(2));
        assert!(parse_target(&argv(&["acl", "list"]), 2).is_err());
    }
}
