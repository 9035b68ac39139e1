//! File upload workflows built on the authenticated client.
//!
//! - `csv`: bulk CSV import to an import endpoint, plus header templates
//! - `attachments`: save an exam, then upload its pending files in order,
//!   deleting a newly created exam if any upload fails

pub mod attachments;
pub mod csv;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::api::ApiError;

pub use attachments::{save_exam_with_attachments, AttachmentError, AttachmentOutcome, ExamTarget, PendingAttachment};
pub use csv::{import_csv, template_csv, template_file_name, CsvFile, ImportOptions, ImportReport};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Not a CSV file: {0}")]
    NotCsv(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
}

/// Read a local file for upload, returning its bare file name and contents
pub(crate) fn read_upload(path: &Path) -> Result<(String, Vec<u8>), ImportError> {
    let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok((file_name, bytes))
}
