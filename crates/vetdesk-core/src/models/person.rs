use serde::{Deserialize, Serialize};

/// A customer/guardian who owns patients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutor {
    #[serde(alias = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Imported records carry a single full name instead of split names
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub debt: f64,
    #[serde(default)]
    pub total_spent: f64,
}

impl Tutor {
    pub fn display_name(&self) -> String {
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !joined.is_empty() {
            joined
        } else {
            self.full_name.clone().unwrap_or_default()
        }
    }

    pub fn has_debt(&self) -> bool {
        self.debt > 0.0
    }
}

/// Account row from `/users/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserSummary {
    pub fn holds(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tutor_display_name() {
        let tutor: Tutor =
            serde_json::from_str(r#"{"_id":"t1","first_name":"Juan","last_name":"Pérez","phone":"+56 9 1234 5678"}"#)
                .unwrap();
        assert_eq!(tutor.display_name(), "Juan Pérez");
        assert!(!tutor.has_debt());

        let imported: Tutor = serde_json::from_str(r#"{"id":"t2","full_name":"María Soto","debt":5000}"#).unwrap();
        assert_eq!(imported.display_name(), "María Soto");
        assert!(imported.has_debt());
    }
}
