//! Account kinds and their routes

use std::str::FromStr;

use serde::Serialize;

/// The four kinds of account the portal serves
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Patient,
    Lab,
    Pharmacy,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Doctor, Role::Patient, Role::Lab, Role::Pharmacy];

    /// Value stored as the role marker
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Patient => "patient",
            Role::Lab => "lab",
            Role::Pharmacy => "pharmacy",
        }
    }

    pub fn login_path(&self) -> String {
        format!("/auth/login/{}", self.as_str())
    }

    pub fn register_path(&self) -> String {
        format!("/auth/register/{}", self.as_str())
    }

    /// Heading shown on the landing page
    pub fn title(&self) -> &'static str {
        match self {
            Role::Doctor => "Doctor",
            Role::Patient => "Patient",
            Role::Lab => "Laboratory",
            Role::Pharmacy => "Pharmacy",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Doctor => "Medical professional account",
            Role::Patient => "Patient account for appointments",
            Role::Lab => "Lab testing facility account",
            Role::Pharmacy => "Pharmacy store account",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role marker does not name a known role
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            "lab" => Ok(Role::Lab),
            "pharmacy" => Ok(Role::Pharmacy),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// One card of the landing page account chooser
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AccountType {
    pub role: Role,
    pub href: String,
    pub title: &'static str,
    pub description: &'static str,
}

/// Landing page catalog, one entry per role, in display order
pub fn account_catalog() -> Vec<AccountType> {
    Role::ALL
        .iter()
        .map(|role| AccountType {
            role: *role,
            href: role.login_path(),
            title: role.title(),
            description: role.description(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_marker() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_routes() {
        assert_eq!(Role::Patient.login_path(), "/auth/login/patient");
        assert_eq!(Role::Lab.register_path(), "/auth/register/lab");
    }

    #[test]
    fn test_account_catalog() {
        let catalog = account_catalog();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog[0].title, "Doctor");
        assert_eq!(catalog[2].title, "Laboratory");
        assert_eq!(catalog[3].href, "/auth/login/pharmacy");
        assert_eq!(catalog[1].description, "Patient account for appointments");
    }
}
