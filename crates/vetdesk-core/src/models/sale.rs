use serde::{Deserialize, Serialize};

use super::ProductKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProductKind,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SaleChannel {
    Store,
    Delivery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(alias = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub branch_id: String,
    pub items: Vec<SaleItem>,
    pub subtotal: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub discount_amount: f64,
    pub total: f64,
    pub payment_method: String,
    pub status: String,
    pub created_at: String,
    #[serde(default)]
    pub voided_at: Option<String>,
    #[serde(default)]
    pub void_reason: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub channel: Option<SaleChannel>,
}

impl Sale {
    pub fn is_voided(&self) -> bool {
        self.voided_at.is_some() || self.status.eq_ignore_ascii_case("voided")
    }
}

/// Aggregate over a period of sales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesStats {
    pub total_sales: f64,
    pub count: usize,
    pub average: f64,
}

impl SalesStats {
    pub fn from_sales(sales: &[Sale]) -> Self {
        let total_sales: f64 = sales.iter().map(|s| s.total).sum();
        let count = sales.len();
        let average = if count == 0 { 0.0 } else { total_sales / count as f64 };
        Self {
            total_sales,
            count,
            average,
        }
    }
}
