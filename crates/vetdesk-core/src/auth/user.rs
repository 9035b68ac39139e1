use serde::{Deserialize, Serialize};

/// Role that bypasses every role and permission check
const SUPERADMIN_ROLE: &str = "superadmin";

/// Role that holds every permission
const ADMIN_ROLE: &str = "admin";

/// Role assumed when the account carries no legacy role
const FALLBACK_ROLE: &str = "assistant";

/// Default permissions per role, used when the account has no explicit list.
const ROLE_DEFAULTS: &[(&str, &[&str])] = &[
    (
        "admin",
        &[
            "ventas", "inventory", "stock", "reception", "dispatch", "clients", "suppliers",
            "agenda", "tutors", "patients", "employees", "reports", "activity",
        ],
    ),
    (
        "seller",
        &[
            "ventas", "inventory", "stock", "reception", "dispatch", "clients", "agenda",
            "tutors", "patients",
        ],
    ),
    (
        "veterinarian",
        &["ventas", "inventory", "stock", "clients", "agenda", "tutors", "patients"],
    ),
    ("groomer", &["ventas", "inventory", "stock", "agenda"]),
    ("assistant", &[]),
];

/// The logged-in account as returned by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// Legacy single role
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub signature_file_id: Option<String>,
}

impl CurrentUser {
    fn holds(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role) || self.role.as_deref() == Some(role)
    }

    pub fn is_superadmin(&self) -> bool {
        self.holds(SUPERADMIN_ROLE)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.is_superadmin() || self.holds(role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.is_superadmin() || roles.iter().any(|r| self.holds(r))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        if self.is_superadmin() || self.holds(ADMIN_ROLE) {
            return true;
        }

        if !self.permissions.is_empty() {
            return self.permissions.iter().any(|p| p == permission);
        }

        let role = self.role.as_deref().unwrap_or(FALLBACK_ROLE);
        ROLE_DEFAULTS
            .iter()
            .find(|(name, _)| *name == role)
            .map(|(_, defaults)| defaults.contains(&permission))
            .unwrap_or(false)
    }

    /// Display label: "Name <email>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Option<&str>, roles: &[&str], permissions: &[&str]) -> CurrentUser {
        CurrentUser {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            role: role.map(str::to_string),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            signature_file_id: None,
        }
    }

    #[test]
    fn test_superadmin_passes_everything() {
        let u = user(None, &["superadmin"], &[]);
        assert!(u.has_role("groomer"));
        assert!(u.has_any_role(&["nope"]));
        assert!(u.has_permission("employees"));

        let legacy = user(Some("superadmin"), &[], &[]);
        assert!(legacy.has_permission("anything"));
    }

    #[test]
    fn test_admin_has_all_permissions_but_not_all_roles() {
        let u = user(Some("admin"), &[], &["agenda"]);
        assert!(u.has_permission("employees"));
        assert!(u.has_permission("made-up"));
        assert!(!u.has_role("seller"));
    }

    #[test]
    fn test_explicit_permissions_override_role_defaults() {
        let u = user(Some("seller"), &[], &["reports"]);
        assert!(u.has_permission("reports"));
        assert!(!u.has_permission("ventas"));
    }

    #[test]
    fn test_role_defaults() {
        let vet = user(Some("veterinarian"), &[], &[]);
        assert!(vet.has_permission("patients"));
        assert!(!vet.has_permission("suppliers"));

        let groomer = user(Some("groomer"), &[], &[]);
        assert!(groomer.has_permission("agenda"));
        assert!(!groomer.has_permission("tutors"));

        // No legacy role falls back to assistant, which has nothing
        let nobody = user(None, &["seller"], &[]);
        assert!(!nobody.has_permission("ventas"));

        let unknown = user(Some("intern"), &[], &[]);
        assert!(!unknown.has_permission("agenda"));
    }

    #[test]
    fn test_has_any_role() {
        let u = user(Some("groomer"), &["seller"], &[]);
        assert!(u.has_any_role(&["veterinarian", "seller"]));
        assert!(u.has_any_role(&["groomer"]));
        assert!(!u.has_any_role(&["admin", "veterinarian"]));
        assert!(!u.has_any_role(&[]));
    }

    #[test]
    fn test_parse_me_response() {
        let json = r#"{"id":"65f0","name":"Ana","email":"ana@example.com","role":"seller","signature_file_id":null}"#;
        let u: CurrentUser = serde_json::from_str(json).unwrap();
        assert_eq!(u.role.as_deref(), Some("seller"));
        assert!(u.roles.is_empty());
        assert!(u.has_permission("tutors"));
        assert_eq!(u.display_name(), "Ana <ana@example.com>");
    }
}
