//! Typed calls for each resource of the REST API.
//!
//! These are thin wrappers: one request, one JSON body back. Everything goes
//! through `ApiClient::execute`, so token refresh applies to all of them.

use std::path::Path;

use reqwest::header;
use tracing::{debug, warn};

use crate::models::{
    DeliveryOrder, DownloadedFile, Exam, ExamDraft, InventoryMovement, Product, ProductQuery,
    Sale, SalesStats, Stock, Tutor, UserSummary,
};

use super::request::PendingRequest;
use super::{ApiClient, ApiError};

/// Upper bound on sales fetched when aggregating a report client side
const REPORT_SALES_LIMIT: u32 = 10_000;

/// Download name used when the server sends no Content-Disposition
const DEFAULT_DOWNLOAD_NAME: &str = "archivo";

/// Extract the file name from a Content-Disposition header value.
/// Only the final path component is kept, so the name is always safe to
/// join onto a download directory.
fn file_name_from_disposition(value: &str) -> Option<String> {
    let start = value.find("filename=")? + "filename=".len();
    let raw = value[start..]
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('"');

    // `file_name` is None for "", "." and ".." and strips any directories
    let name = Path::new(raw).file_name()?.to_str()?;
    if name != raw {
        warn!(raw, name, "Stripped directories from download file name");
    }
    Some(name.to_string())
}

impl ApiClient {
    // ===== Products =====

    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let request = PendingRequest::get("/products/")
            .query_opt("search", query.search.as_deref())
            .query_opt("kind", query.kind)
            .query_opt("branch_id", query.branch_id.as_deref());
        self.execute_json(request).await
    }

    pub async fn create_product(&self, product: &Product) -> Result<Product, ApiError> {
        self.post("/products/", product).await
    }

    pub async fn update_product(&self, id: &str, changes: &serde_json::Value) -> Result<Product, ApiError> {
        self.put(&format!("/products/{}", id), changes).await
    }

    // ===== Inventory =====

    pub async fn fetch_stock(
        &self,
        branch_id: Option<&str>,
        product_id: Option<&str>,
    ) -> Result<Vec<Stock>, ApiError> {
        let request = PendingRequest::get("/inventory/stock")
            .query_opt("branch_id", branch_id)
            .query_opt("product_id", product_id);
        self.execute_json(request).await
    }

    pub async fn create_movement(&self, movement: &InventoryMovement) -> Result<InventoryMovement, ApiError> {
        self.post("/inventory/movements", movement).await
    }

    pub async fn list_movements(&self, limit: Option<u32>) -> Result<Vec<InventoryMovement>, ApiError> {
        self.execute_json(PendingRequest::get("/inventory/movements").query_opt("limit", limit))
            .await
    }

    // ===== Sales =====

    pub async fn create_sale(&self, sale: &serde_json::Value) -> Result<Sale, ApiError> {
        self.post("/sales/", sale).await
    }

    pub async fn void_sale(&self, id: &str, reason: &str) -> Result<Sale, ApiError> {
        self.execute_json(PendingRequest::post(format!("/sales/{}/void", id)).query("reason", reason))
            .await
    }

    pub async fn list_sales(&self, limit: Option<u32>) -> Result<Vec<Sale>, ApiError> {
        self.execute_json(PendingRequest::get("/sales/").query_opt("limit", limit))
            .await
    }

    /// Sales made by the logged-in user
    pub async fn my_sales(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<Sale>, ApiError> {
        let request = PendingRequest::get("/sales/my")
            .query_opt("start_date", start_date)
            .query_opt("end_date", end_date);
        self.execute_json(request).await
    }

    // ===== Deliveries =====

    pub async fn pending_deliveries(&self) -> Result<Vec<DeliveryOrder>, ApiError> {
        self.get("/deliveries/").await
    }

    pub async fn update_delivery_status(&self, id: &str, status: &str) -> Result<DeliveryOrder, ApiError> {
        self.execute_json(PendingRequest::put(format!("/deliveries/{}/status", id)).query("status", status))
            .await
    }

    pub async fn assign_delivery(&self, id: &str, user_id: &str) -> Result<DeliveryOrder, ApiError> {
        self.execute_json(PendingRequest::put(format!("/deliveries/{}/assign", id)).query("user_id", user_id))
            .await
    }

    pub async fn delete_delivery(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/deliveries/{}", id)).await
    }

    // ===== Users & tutors =====

    /// List staff accounts, optionally keeping only those holding `role`
    pub async fn list_users(&self, role: Option<&str>) -> Result<Vec<UserSummary>, ApiError> {
        let users: Vec<UserSummary> = self.get("/users/").await?;
        Ok(match role {
            Some(role) => users.into_iter().filter(|u| u.holds(role)).collect(),
            None => users,
        })
    }

    pub async fn list_tutors(&self, search: Option<&str>) -> Result<Vec<Tutor>, ApiError> {
        self.execute_json(PendingRequest::get("/tutors/").query_opt("search", search))
            .await
    }

    // ===== Reports =====

    /// Sales totals for a period, aggregated from the raw sales list
    pub async fn sales_stats(&self, start: &str, end: &str) -> Result<SalesStats, ApiError> {
        let request = PendingRequest::get("/sales/")
            .query("start", start)
            .query("end", end)
            .query("limit", REPORT_SALES_LIMIT);
        let sales: Vec<Sale> = self.execute_json(request).await?;
        debug!(count = sales.len(), start, end, "Aggregating sales stats");
        Ok(SalesStats::from_sales(&sales))
    }

    // ===== Exams & files =====

    pub async fn patient_exams(&self, patient_id: &str) -> Result<Vec<Exam>, ApiError> {
        self.get(&format!("/exams/patient/{}", patient_id)).await
    }

    pub async fn create_exam(&self, patient_id: &str, draft: &ExamDraft) -> Result<Exam, ApiError> {
        let mut body = serde_json::to_value(draft)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode exam: {}", e)))?;
        body["patient_id"] = serde_json::Value::String(patient_id.to_string());
        self.post("/exams", &body).await
    }

    pub async fn update_exam(&self, id: &str, draft: &ExamDraft) -> Result<Exam, ApiError> {
        self.put(&format!("/exams/{}", id), draft).await
    }

    pub async fn delete_exam(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/exams/{}", id)).await
    }

    pub async fn download_file(&self, file_id: &str) -> Result<DownloadedFile, ApiError> {
        let response = self
            .execute(PendingRequest::get(format!("/files/{}", file_id)))
            .await?;

        let file_name = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(file_name_from_disposition)
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string());

        let bytes = response.bytes().await?.to_vec();
        Ok(DownloadedFile { file_name, bytes })
    }
}
