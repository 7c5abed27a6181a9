//! Permission records owned by exactly one identity: a user or a group.

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::core::store::EntityKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AclError {
    #[error("permission {id} has both a user and a group owner")]
    BothOwners { id: i64 },
    #[error("permission {id} has no owner")]
    NoOwner { id: i64 },
    #[error("unknown role '{0}' (expected EXECUTOR, EDITOR, MASTER or OWNER)")]
    UnknownRole(String),
    #[error("unknown permission object type '{0}'")]
    UnknownObjectType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    User,
    Team,
}

impl MemberType {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberType::User => "user",
            MemberType::Team => "team",
        }
    }
}

/// The single identity a permission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    User(i64),
    Group(i64),
}

impl Member {
    pub fn id(self) -> i64 {
        match self {
            Member::User(id) | Member::Group(id) => id,
        }
    }

    pub fn member_type(self) -> MemberType {
        match self {
            Member::User(_) => MemberType::User,
            Member::Group(_) => MemberType::Team,
        }
    }

    /// `(user_id, group_id)` column pair; exactly one is set.
    pub fn columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            Member::User(id) => (Some(id), None),
            Member::Group(id) => (None, Some(id)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AclRole {
    Executor,
    Editor,
    Master,
    Owner,
}

impl AclRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AclRole::Executor => "EXECUTOR",
            AclRole::Editor => "EDITOR",
            AclRole::Master => "MASTER",
            AclRole::Owner => "OWNER",
        }
    }

    pub fn parse(role: &str) -> Result<Self, AclError> {
        match role.trim().to_ascii_uppercase().as_str() {
            "EXECUTOR" => Ok(AclRole::Executor),
            "EDITOR" => Ok(AclRole::Editor),
            "MASTER" => Ok(AclRole::Master),
            "OWNER" => Ok(AclRole::Owner),
            _ => Err(AclError::UnknownRole(role.to_string())),
        }
    }
}

/// Object a permission grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclTarget {
    pub entity: EntityKind,
    pub id: i64,
}

impl AclTarget {
    pub fn template(id: i64) -> Self {
        Self {
            entity: EntityKind::ExecutionTemplate,
            id,
        }
    }

    pub fn periodic_task(id: i64) -> Self {
        Self {
            entity: EntityKind::PeriodicTask,
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AclPermission {
    pub id: i64,
    pub role: AclRole,
    pub target: AclTarget,
    owner: Member,
}

impl AclPermission {
    pub fn new(id: i64, role: AclRole, owner: Member, target: AclTarget) -> Self {
        Self {
            id,
            role,
            target,
            owner,
        }
    }

    /// Rebuild from stored columns, rejecting rows that break the
    /// single-owner rule instead of guessing.
    pub fn from_columns(
        id: i64,
        role: &str,
        user_id: Option<i64>,
        group_id: Option<i64>,
        object_type: &str,
        object_id: i64,
    ) -> Result<Self, AclError> {
        let owner = match (user_id, group_id) {
            (Some(user), None) => Member::User(user),
            (None, Some(group)) => Member::Group(group),
            (Some(_), Some(_)) => return Err(AclError::BothOwners { id }),
            (None, None) => return Err(AclError::NoOwner { id }),
        };
        let entity = EntityKind::from_label(object_type)
            .ok_or_else(|| AclError::UnknownObjectType(object_type.to_string()))?;
        Ok(Self {
            id,
            role: AclRole::parse(role)?,
            target: AclTarget {
                entity,
                id: object_id,
            },
            owner,
        })
    }

    pub fn owner(&self) -> Member {
        self.owner
    }

    pub fn member(&self) -> i64 {
        self.owner.id()
    }

    pub fn member_type(&self) -> MemberType {
        self.owner.member_type()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "role": self.role,
            "member": self.member(),
            "member_type": self.member_type(),
            "object_type": self.target.entity.label(),
            "object_id": self.target.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_owner_reports_user_type() {
        let perm = AclPermission::new(1, AclRole::Editor, Member::User(7), AclTarget::template(3));
        assert_eq!(perm.member(), 7);
        assert_eq!(perm.member_type(), MemberType::User);
        assert_eq!(perm.owner().columns(), (Some(7), None));
    }

    #[test]
    fn group_owner_reports_team_type() {
        let perm = AclPermission::from_columns(2, "MASTER", None, Some(4), "PeriodicTask", 9).unwrap();
        assert_eq!(perm.member(), 4);
        assert_eq!(perm.member_type(), MemberType::Team);
        assert_eq!(perm.target, AclTarget::periodic_task(9));
    }

    #[test]
    fn rows_with_two_or_zero_owners_are_rejected() {
        assert_eq!(
            AclPermission::from_columns(5, "OWNER", Some(1), Some(2), "PeriodicTask", 1),
            Err(AclError::BothOwners { id: 5 })
        );
        assert_eq!(
            AclPermission::from_columns(6, "OWNER", None, None, "PeriodicTask", 1),
            Err(AclError::NoOwner { id: 6 })
        );
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(AclRole::parse("executor"), Ok(AclRole::Executor));
        assert!(matches!(AclRole::parse("ADMIN"), Err(AclError::UnknownRole(_))));
    }

    #[test]
    fn json_view_names_member_type() {
        let perm = AclPermission::new(3, AclRole::Owner, Member::Group(2), AclTarget::template(1));
        let view = perm.to_json();
        assert_eq!(view["member_type"], "team");
        assert_eq!(view["role"], "OWNER");
        assert_eq!(view["object_type"], "ExecutionTemplate");
    }
}
