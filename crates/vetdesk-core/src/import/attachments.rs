use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, MultipartField, PendingRequest};
use crate::models::ExamDraft;

use super::{read_upload, ImportError};

/// A file queued for upload once its exam exists
#[derive(Debug, Clone)]
pub struct PendingAttachment {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
    pub comment: Option<String>,
}

impl PendingAttachment {
    pub fn from_path(path: &Path, comment: Option<String>) -> Result<Self, ImportError> {
        let (file_name, bytes) = read_upload(path)?;
        let mime = mime_guess::from_path(path).first().map(|m| m.to_string());
        Ok(Self {
            file_name,
            mime,
            bytes,
            comment: comment.filter(|c| !c.trim().is_empty()),
        })
    }

    fn fields(&self) -> Vec<MultipartField> {
        let mut fields = vec![MultipartField::file(
            "file",
            self.file_name.clone(),
            self.mime.as_deref(),
            self.bytes.clone(),
        )];
        if let Some(ref comment) = self.comment {
            fields.push(MultipartField::text("comment", comment.clone()));
        }
        fields
    }
}

/// Which exam the attachments belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamTarget {
    /// Create a new exam for this patient first
    New { patient_id: String },
    /// Update an existing exam first
    Existing { exam_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentOutcome {
    pub exam_id: String,
    pub created: bool,
    pub uploaded: usize,
}

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Failed to save exam: {0}")]
    Save(#[source] ApiError),

    #[error("Failed to upload {file_name} ({uploaded} of {total} uploaded)")]
    Upload {
        exam_id: String,
        file_name: String,
        uploaded: usize,
        total: usize,
        rolled_back: bool,
        #[source]
        source: ApiError,
    },
}

async fn upload(client: &ApiClient, exam_id: &str, attachment: &PendingAttachment) -> Result<(), ApiError> {
    let request = PendingRequest::post(format!("/exams/{}/files", exam_id)).multipart(attachment.fields());
    client.execute_empty(request).await
}

/// Save an exam, then upload each attachment in order.
///
/// Uploads stop at the first failure. If the exam was created by this call it
/// is deleted again, so a failed save never leaves a half-attached exam
/// behind. An existing exam keeps its update and any files already uploaded.
pub async fn save_exam_with_attachments(
    client: &ApiClient,
    target: &ExamTarget,
    draft: &ExamDraft,
    attachments: &[PendingAttachment],
) -> Result<AttachmentOutcome, AttachmentError> {
    let (exam_id, created) = match target {
        ExamTarget::New { patient_id } => {
            let exam = client
                .create_exam(patient_id, draft)
                .await
                .map_err(AttachmentError::Save)?;
            (exam.id, true)
        }
        ExamTarget::Existing { exam_id } => {
            client
                .update_exam(exam_id, draft)
                .await
                .map_err(AttachmentError::Save)?;
            (exam_id.clone(), false)
        }
    };

    for (uploaded, attachment) in attachments.iter().enumerate() {
        if let Err(source) = upload(client, &exam_id, attachment).await {
            warn!(exam_id = %exam_id, file = %attachment.file_name, error = %source, "Attachment upload failed");

            let rolled_back = if created {
                match client.delete_exam(&exam_id).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(exam_id = %exam_id, error = %e, "Failed to discard new exam after upload error");
                        false
                    }
                }
            } else {
                false
            };

            return Err(AttachmentError::Upload {
                exam_id,
                file_name: attachment.file_name.clone(),
                uploaded,
                total: attachments.len(),
                rolled_back,
                source,
            });
        }
    }

    info!(exam_id = %exam_id, created, files = attachments.len(), "Exam saved");
    Ok(AttachmentOutcome {
        exam_id,
        created,
        uploaded: attachments.len(),
    })
}
