use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Position of a user in the company hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    AdminMaster,
    Lider,
    Colaborador,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::AdminMaster => "admin_master",
            Role::Lider => "lider",
            Role::Colaborador => "colaborador",
        }
    }

    /// Higher rank sits higher in the hierarchy.
    pub fn rank(&self) -> u8 {
        match self {
            Role::AdminMaster => 3,
            Role::Lider => 2,
            Role::Colaborador => 1,
        }
    }

    /// Whether a user holding `self` may create or edit users holding `target`.
    pub fn can_manage(&self, target: Role) -> bool {
        match self {
            Role::AdminMaster => true,
            Role::Lider => target == Role::Colaborador,
            Role::Colaborador => false,
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::AdminMaster
    }

    /// Maps role names written by older schema versions onto the current hierarchy.
    pub fn from_legacy(value: &str) -> Option<Role> {
        match value.trim().to_lowercase().as_str() {
            "admin_master" | "admin" => Some(Role::AdminMaster),
            "lider" | "manager" | "coordenador" => Some(Role::Lider),
            "colaborador" | "team_member" => Some(Role::Colaborador),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin_master" => Ok(Role::AdminMaster),
            "lider" => Ok(Role::Lider),
            "colaborador" => Ok(Role::Colaborador),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}
