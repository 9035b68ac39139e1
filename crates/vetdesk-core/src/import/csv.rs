use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, MultipartField, PendingRequest};

use super::{read_upload, ImportError};

/// Multipart field the import endpoints read the file from
const FILE_FIELD: &str = "file";

const CSV_MIME: &str = "text/csv";

/// Message used when the server gives no reason for rejecting an import
const GENERIC_IMPORT_ERROR: &str = "failed to import file";

/// A validated CSV file ready to upload
#[derive(Debug, Clone)]
pub struct CsvFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl CsvFile {
    pub fn is_csv_name(name: &str) -> bool {
        Path::new(name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    /// Validate the extension, then read the file
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let display = path.display().to_string();
        if !Self::is_csv_name(&display) {
            return Err(ImportError::NotCsv(display));
        }
        let (file_name, bytes) = read_upload(path)?;
        Ok(Self { file_name, bytes })
    }

    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ImportError> {
        let file_name = file_name.into();
        if !Self::is_csv_name(&file_name) {
            return Err(ImportError::NotCsv(file_name));
        }
        Ok(Self { file_name, bytes })
    }

    /// Data rows, not counting the header line or blank lines
    pub fn row_count(&self) -> usize {
        String::from_utf8_lossy(&self.bytes)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .count()
            .saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Ask the backend to wipe existing records before importing
    pub delete_existing: bool,
}

/// What the import endpoint reported back
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub message: Option<String>,
    pub imported: Option<u64>,
    pub updated: Option<u64>,
    pub errors: Vec<String>,
    pub raw: serde_json::Value,
}

impl ImportReport {
    pub fn from_value(raw: serde_json::Value) -> Self {
        let count = |key: &str| raw.get(key).and_then(|v| v.as_u64());
        let imported = count("imported");
        let updated = count("updated");
        let message = raw.get("message").and_then(|v| v.as_str()).map(str::to_string);
        let errors = match raw.get("errors") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| match item.as_str() {
                    Some(s) => s.to_string(),
                    None => item.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };
        Self {
            message,
            imported,
            updated,
            errors,
            raw,
        }
    }

    pub fn summary(&self) -> String {
        if let Some(ref message) = self.message {
            return message.clone();
        }
        match (self.imported, self.updated) {
            (Some(i), Some(u)) => format!("Imported {} records, updated {}", i, u),
            (Some(i), None) => format!("Imported {} records", i),
            _ => "Import finished".to_string(),
        }
    }
}

pub(crate) fn failure_message(error: &ApiError, fallback: &str) -> String {
    error.detail().unwrap_or(fallback).to_string()
}

/// Upload a CSV file to an import endpoint such as `/import/tutors`
pub async fn import_csv(
    client: &ApiClient,
    endpoint: &str,
    file: &CsvFile,
    options: ImportOptions,
) -> Result<ImportReport, ImportError> {
    let mut request = PendingRequest::post(endpoint).multipart(vec![MultipartField::file(
        FILE_FIELD,
        file.file_name.clone(),
        Some(CSV_MIME),
        file.bytes.clone(),
    )]);
    if options.delete_existing {
        request = request.query("delete_existing", true);
    }

    info!(endpoint, file = %file.file_name, rows = file.row_count(), "Importing CSV");

    match client.execute_json::<serde_json::Value>(request).await {
        Ok(value) => Ok(ImportReport::from_value(value)),
        Err(source) => {
            warn!(endpoint, error = %source, "CSV import failed");
            Err(ImportError::Failed {
                message: failure_message(&source, GENERIC_IMPORT_ERROR),
                source,
            })
        }
    }
}

/// Header-only CSV for the given columns, or None when there are no columns
pub fn template_csv(fields: &[&str]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    Some(format!("{}\n", fields.join(",")))
}

/// Download name for a template, derived from the import's title
pub fn template_file_name(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("template_{}.csv", slug)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{MemoryStorage, Session, TokenStorage};

    #[test]
    fn test_csv_validation() {
        assert!(CsvFile::is_csv_name("tutors.csv"));
        assert!(CsvFile::is_csv_name("EXPORT.CSV"));
        assert!(!CsvFile::is_csv_name("tutors.xlsx"));
        assert!(!CsvFile::is_csv_name("csv"));

        assert!(matches!(
            CsvFile::from_bytes("photo.png", vec![]),
            Err(ImportError::NotCsv(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvFile::load(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[test]
    fn test_load_and_count_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutors.csv");
        std::fs::write(&path, "Nombre,Apellidos,Email\nJuan,Pérez,j@x.cl\n\nAna,Soto,a@x.cl\n").unwrap();

        let file = CsvFile::load(&path).unwrap();
        assert_eq!(file.file_name, "tutors.csv");
        assert_eq!(file.row_count(), 2);
    }

    #[test]
    fn test_templates() {
        assert_eq!(
            template_csv(&["name", "sku", "sale_price"]).as_deref(),
            Some("name,sku,sale_price\n")
        );
        assert_eq!(template_csv(&[]), None);
        assert_eq!(template_file_name("Productos  de Tienda"), "template_productos_de_tienda.csv");
    }

    #[test]
    fn test_report_parsing() {
        let report = ImportReport::from_value(serde_json::json!({
            "message": "Se han importado 3 clientes exitosamente"
        }));
        assert_eq!(report.summary(), "Se han importado 3 clientes exitosamente");

        let report = ImportReport::from_value(serde_json::json!({
            "imported": 4, "updated": 1, "errors": ["row 3: missing name", {"row": 5}]
        }));
        assert_eq!(report.summary(), "Imported 4 records, updated 1");
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0], "row 3: missing name");
    }

    async fn client(server: &MockServer) -> ApiClient {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("token", "A1").unwrap();
        storage.set("refresh_token", "R1").unwrap();
        ApiClient::new(format!("{}/api/v1", server.uri()), Session::new(storage)).unwrap()
    }

    #[tokio::test]
    async fn test_import_survives_token_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/import/tutors"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "A2", "refresh_token": "R2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/import/tutors"))
            .and(header("authorization", "Bearer A2"))
            .and(query_param("delete_existing", "true"))
            .and(body_string_contains("Juan,Pérez"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"imported": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server).await;
        let file = CsvFile::from_bytes("tutors.csv", "Nombre,Apellidos\nJuan,Pérez\n".as_bytes().to_vec()).unwrap();
        let report = import_csv(&api, "/import/tutors", &file, ImportOptions { delete_existing: true })
            .await
            .unwrap();
        assert_eq!(report.imported, Some(1));
    }

    #[tokio::test]
    async fn test_import_failure_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/import/products"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "detail": "File must be a .txt or .csv file"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/import/suppliers"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = client(&server).await;
        let file = CsvFile::from_bytes("p.csv", b"name\nx\n".to_vec()).unwrap();

        let err = import_csv(&api, "/import/products", &file, ImportOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("File must be a .txt or .csv file"));

        let err = import_csv(&api, "/import/suppliers", &file, ImportOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to import file");
    }
}
