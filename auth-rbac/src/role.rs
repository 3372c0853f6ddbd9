use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RbacError;

/// Marketplace roles. One identity holds exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Guardian,
    Caregiver,
    Agency,
    Shop,
    Moderator,
    Admin,
    Patient,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Guardian,
        Role::Caregiver,
        Role::Agency,
        Role::Shop,
        Role::Moderator,
        Role::Admin,
        Role::Patient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guardian => "GUARDIAN",
            Role::Caregiver => "CAREGIVER",
            Role::Agency => "AGENCY",
            Role::Shop => "SHOP",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
            Role::Patient => "PATIENT",
        }
    }

    /// Name shown in the UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Guardian => "Guardian",
            Role::Caregiver => "Caregiver",
            Role::Agency => "Agency",
            Role::Shop => "Shop",
            Role::Moderator => "Moderator",
            Role::Admin => "Admin",
            Role::Patient => "Patient",
        }
    }

    /// One-line description used in onboarding and help screens
    pub fn description(&self) -> &'static str {
        match self {
            Role::Guardian => "Can manage patients, create jobs, and make payments",
            Role::Caregiver => "Can view assigned jobs, log care activities, and manage profile",
            Role::Agency => "Can manage caregivers, create packages, and handle jobs",
            Role::Shop => "Can list care products and fulfil orders",
            Role::Moderator => "Can verify agencies and caregivers and manage disputes",
            Role::Admin => "Full system access with platform management capabilities",
            Role::Patient => "Can view own profile and care logs",
        }
    }

    /// Operator roles, as opposed to consumer-facing ones
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GUARDIAN" => Ok(Role::Guardian),
            "CAREGIVER" => Ok(Role::Caregiver),
            // COMPANY and SUPER_ADMIN are the names stored by older records
            "AGENCY" | "COMPANY" => Ok(Role::Agency),
            "SHOP" => Ok(Role::Shop),
            "MODERATOR" => Ok(Role::Moderator),
            "ADMIN" | "SUPER_ADMIN" => Ok(Role::Admin),
            "PATIENT" => Ok(Role::Patient),
            other => Err(RbacError::UnknownRole(other.to_string())),
        }
    }
}
