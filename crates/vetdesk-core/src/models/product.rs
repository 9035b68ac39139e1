use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductKind {
    Product,
    Service,
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductKind::Product => write!(f, "PRODUCT"),
            ProductKind::Service => write!(f, "SERVICE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub kind: ProductKind,
    pub sale_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_alert_threshold: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Stock at the requested branch, when the list was filtered by branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Whether stock at the branch has fallen to the alert threshold
    pub fn is_low_stock(&self) -> bool {
        match (self.kind, self.stock, self.stock_alert_threshold) {
            (ProductKind::Product, Some(stock), Some(threshold)) => stock <= threshold,
            _ => false,
        }
    }
}

/// Query filters for listing products
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub kind: Option<ProductKind>,
    pub branch_id: Option<String>,
}
