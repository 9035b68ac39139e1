use serde::{Deserialize, Serialize};

/// Attachment metadata as listed under an exam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamFile {
    #[serde(alias = "_id")]
    pub id: String,
    pub original_name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    #[serde(alias = "_id")]
    pub id: String,
    pub patient_id: String,
    #[serde(default)]
    pub consultation_id: Option<String>,
    /// Exam kind, e.g. hemograma, rx
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub result_text: Option<String>,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub files: Vec<ExamFile>,
}

/// Fields sent when creating or editing an exam
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamDraft {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
}

/// A downloaded file body with its server-provided name
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exam_with_files() {
        let json = r#"{
            "_id": "e1", "patient_id": "pt1", "type": "hemograma",
            "date": "2026-02-01T09:00:00", "file_ids": ["f1"],
            "files": [{"id": "f1", "original_name": "hemo.pdf", "comment": null, "created_at": "2026-02-01T09:05:00"}]
        }"#;
        let exam: Exam = serde_json::from_str(json).unwrap();
        assert_eq!(exam.id, "e1");
        assert_eq!(exam.kind, "hemograma");
        assert_eq!(exam.files.len(), 1);
        assert_eq!(exam.files[0].original_name, "hemo.pdf");
    }

    #[test]
    fn test_draft_serializes_type() {
        let draft = ExamDraft {
            kind: "rx".to_string(),
            ..ExamDraft::default()
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value, serde_json::json!({"type": "rx"}));
    }
}
