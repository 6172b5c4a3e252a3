//! Application roles and the external role vocabulary they are mapped from.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The three access levels used throughout the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Top-level administrator, unrestricted.
    SuperAdmin,
    /// Scoped to one diocese.
    DioceseManager,
    /// Scoped to one testing center within a diocese.
    SchoolManager,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::SuperAdmin, Role::DioceseManager, Role::SchoolManager];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::DioceseManager => "diocese_manager",
            Role::SchoolManager => "school_manager",
        }
    }

    /// Dashboard a signed-in user of this role lands on.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "/admin",
            Role::DioceseManager => "/diocese-manager",
            Role::SchoolManager => "/school-manager",
        }
    }

    /// Check if this role has at least the privileges of `required`.
    pub fn has_at_least(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Whether this role may create or manage users holding `target`.
    pub fn can_manage(&self, target: Role) -> bool {
        match self {
            Role::SuperAdmin => true,
            Role::DioceseManager => target == Role::SchoolManager,
            Role::SchoolManager => false,
        }
    }

    /// Whether this role may open a dashboard path.
    ///
    /// Returns `true` for paths outside the role-gated sections.
    pub fn can_access_path(&self, path: &str) -> bool {
        match required_role_for_path(path) {
            Some(required) => self.has_at_least(required),
            None => true,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Role::SuperAdmin => 2,
            Role::DioceseManager => 1,
            Role::SchoolManager => 0,
        }
    }
}

/// Minimum role for a role-gated dashboard path, if the path is gated.
pub fn required_role_for_path(path: &str) -> Option<Role> {
    let under = |prefix: &str| path == prefix || path.starts_with(&format!("{}/", prefix));

    if under("/admin") {
        Some(Role::SuperAdmin)
    } else if under("/diocese-manager") {
        Some(Role::DioceseManager)
    } else if under("/school-manager") || under("/app") {
        Some(Role::SchoolManager)
    } else {
        None
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "super_admin" => Ok(Role::SuperAdmin),
            "diocese_manager" => Ok(Role::DioceseManager),
            "school_manager" => Ok(Role::SchoolManager),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role names used by the external parish/school management system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExternalRole {
    SuperAdmin,
    Bishop,
    DiocesanAdministrator,
    DirectorOfReligiousEducation,
    Principal,
    Teacher,
    Catechist,
    Student,
    CatechistCandidate,
    /// Anything outside the known vocabulary, kept verbatim.
    Other(String),
}

impl ExternalRole {
    pub const KNOWN: [ExternalRole; 9] = [
        ExternalRole::SuperAdmin,
        ExternalRole::Bishop,
        ExternalRole::DiocesanAdministrator,
        ExternalRole::DirectorOfReligiousEducation,
        ExternalRole::Principal,
        ExternalRole::Teacher,
        ExternalRole::Catechist,
        ExternalRole::Student,
        ExternalRole::CatechistCandidate,
    ];

    /// Parses an external role name, case- and whitespace-insensitively.
    pub fn parse(name: &str) -> Self {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_lowercase().as_str() {
            "super admin" => ExternalRole::SuperAdmin,
            "bishop" => ExternalRole::Bishop,
            "diocesan administrator" => ExternalRole::DiocesanAdministrator,
            "director of religious education" => ExternalRole::DirectorOfReligiousEducation,
            "principal" => ExternalRole::Principal,
            "teacher" => ExternalRole::Teacher,
            "catechist" => ExternalRole::Catechist,
            "student" => ExternalRole::Student,
            "catechist candidate" => ExternalRole::CatechistCandidate,
            _ => ExternalRole::Other(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ExternalRole::SuperAdmin => "Super Admin",
            ExternalRole::Bishop => "Bishop",
            ExternalRole::DiocesanAdministrator => "Diocesan Administrator",
            ExternalRole::DirectorOfReligiousEducation => "Director of Religious Education",
            ExternalRole::Principal => "Principal",
            ExternalRole::Teacher => "Teacher",
            ExternalRole::Catechist => "Catechist",
            ExternalRole::Student => "Student",
            ExternalRole::CatechistCandidate => "Catechist Candidate",
            ExternalRole::Other(name) => name,
        }
    }
}

impl std::fmt::Display for ExternalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps an external role onto the internal vocabulary.
///
/// Total: anything not explicitly elevated becomes [`Role::SchoolManager`].
pub fn map_external_role(external: &ExternalRole) -> Role {
    match external {
        ExternalRole::SuperAdmin => Role::SuperAdmin,
        ExternalRole::Bishop | ExternalRole::DiocesanAdministrator => Role::DioceseManager,
        ExternalRole::DirectorOfReligiousEducation
        | ExternalRole::Principal
        | ExternalRole::Teacher
        | ExternalRole::Catechist
        | ExternalRole::Student
        | ExternalRole::CatechistCandidate
        | ExternalRole::Other(_) => Role::SchoolManager,
    }
}

/// Whether holders of an external role get an account at all.
///
/// Students and catechist candidates are not user-facing.
pub fn role_should_have_access(external: &ExternalRole) -> bool {
    !matches!(
        external,
        ExternalRole::Student | ExternalRole::CatechistCandidate
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_should_have_access() {
        for role in ExternalRole::KNOWN.iter() {
            let expected = !matches!(role, ExternalRole::Student | ExternalRole::CatechistCandidate);
            assert_eq!(role_should_have_access(role), expected, "{}", role);
        }
        assert!(role_should_have_access(&ExternalRole::parse("Parish Secretary")));
    }

    #[test]
    fn test_exactly_two_roles_denied() {
        let denied = ExternalRole::KNOWN
            .iter()
            .filter(|r| !role_should_have_access(r))
            .count();
        assert_eq!(denied, 2);
    }

    #[test]
    fn test_map_external_role_is_total() {
        for role in ExternalRole::KNOWN.iter() {
            assert!(Role::ALL.contains(&map_external_role(role)));
        }
        assert_eq!(
            map_external_role(&ExternalRole::parse("Sacristan")),
            Role::SchoolManager
        );
        assert_eq!(map_external_role(&ExternalRole::parse("")), Role::SchoolManager);
    }

    #[test]
    fn test_map_external_role_values() {
        assert_eq!(map_external_role(&ExternalRole::SuperAdmin), Role::SuperAdmin);
        assert_eq!(map_external_role(&ExternalRole::Bishop), Role::DioceseManager);
        assert_eq!(
            map_external_role(&ExternalRole::DiocesanAdministrator),
            Role::DioceseManager
        );
        assert_eq!(map_external_role(&ExternalRole::Principal), Role::SchoolManager);
        assert_eq!(map_external_role(&ExternalRole::Student), Role::SchoolManager);
    }

    #[test]
    fn test_external_role_parse() {
        assert_eq!(ExternalRole::parse("super admin"), ExternalRole::SuperAdmin);
        assert_eq!(
            ExternalRole::parse("  Catechist   Candidate "),
            ExternalRole::CatechistCandidate
        );
        assert_eq!(
            ExternalRole::parse("DIRECTOR OF RELIGIOUS EDUCATION"),
            ExternalRole::DirectorOfReligiousEducation
        );
        assert_eq!(
            ExternalRole::parse("Usher"),
            ExternalRole::Other("Usher".to_string())
        );
    }

    #[test]
    fn test_external_role_name_roundtrip() {
        for role in ExternalRole::KNOWN.iter() {
            assert_eq!(&ExternalRole::parse(role.name()), role);
        }
    }

    #[test]
    fn test_role_from_str_and_display() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::DioceseManager).unwrap();
        assert_eq!(json, "\"diocese_manager\"");
        let role: Role = serde_json::from_str("\"school_manager\"").unwrap();
        assert_eq!(role, Role::SchoolManager);
    }

    #[test]
    fn test_has_at_least() {
        assert!(Role::SuperAdmin.has_at_least(Role::DioceseManager));
        assert!(Role::DioceseManager.has_at_least(Role::SchoolManager));
        assert!(!Role::SchoolManager.has_at_least(Role::DioceseManager));
        assert!(!Role::DioceseManager.has_at_least(Role::SuperAdmin));
    }

    #[test]
    fn test_can_manage() {
        assert!(Role::SuperAdmin.can_manage(Role::SuperAdmin));
        assert!(Role::DioceseManager.can_manage(Role::SchoolManager));
        assert!(!Role::DioceseManager.can_manage(Role::DioceseManager));
        assert!(!Role::SchoolManager.can_manage(Role::SchoolManager));
    }

    #[test]
    fn test_required_role_for_path() {
        assert_eq!(required_role_for_path("/admin"), Some(Role::SuperAdmin));
        assert_eq!(required_role_for_path("/admin/dioceses"), Some(Role::SuperAdmin));
        assert_eq!(required_role_for_path("/administrator"), None);
        assert_eq!(
            required_role_for_path("/diocese-manager/centers"),
            Some(Role::DioceseManager)
        );
        assert_eq!(required_role_for_path("/app"), Some(Role::SchoolManager));
        assert_eq!(required_role_for_path("/"), None);
    }

    #[test]
    fn test_can_access_path() {
        assert!(Role::SuperAdmin.can_access_path("/diocese-manager"));
        assert!(!Role::SchoolManager.can_access_path("/admin"));
        assert!(Role::SchoolManager.can_access_path("/school-manager"));
        assert!(Role::SchoolManager.can_access_path("/login"));
    }

    #[test]
    fn test_home_path() {
        assert_eq!(Role::SuperAdmin.home_path(), "/admin");
        assert_eq!(Role::DioceseManager.home_path(), "/diocese-manager");
        assert_eq!(Role::SchoolManager.home_path(), "/school-manager");
    }
}
