use serde::{Deserialize, Serialize};

use super::Sale;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOrder {
    #[serde(alias = "_id", default)]
    pub id: Option<String>,
    pub sale_id: String,
    pub branch_id: String,
    #[serde(default)]
    pub assigned_user_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub customer_snapshot: Option<serde_json::Value>,
    #[serde(default)]
    pub shipping_cost: Option<f64>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    pub created_at: String,
    /// Populated by the backend on the pending list
    #[serde(default)]
    pub sale_details: Option<Sale>,
}

impl DeliveryOrder {
    pub fn is_assigned(&self) -> bool {
        self.assigned_user_id.is_some()
    }
}
