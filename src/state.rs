use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One-way signing lifecycle of a stored document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSignState {
    Unsigned,
    Signed,
}

/// Result of baking fields into a document, recorded by `mark_signed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedArtifact {
    pub filename: String,
    pub hash: String,
    pub signed_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub original_name: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    pub original_hash: String,
    pub signed_hash: Option<String>,
    pub signed_filename: Option<String>,
    pub is_signed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub signed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl DocumentRecord {
    pub fn new(
        original_name: impl Into<String>,
        filename: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        original_hash: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            original_name: original_name.into(),
            filename: filename.into(),
            size,
            mime_type: mime_type.into(),
            original_hash: original_hash.into(),
            signed_hash: None,
            signed_filename: None,
            is_signed: false,
            signed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> DocumentSignState {
        if self.is_signed {
            DocumentSignState::Signed
        } else {
            DocumentSignState::Unsigned
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }

    /// Transition Unsigned -> Signed. Returns false, leaving the record
    /// untouched, when it is already signed.
    pub fn apply_signature(&mut self, artifact: &SignedArtifact) -> bool {
        if self.is_signed {
            return false;
        }
        self.is_signed = true;
        self.signed_filename = Some(artifact.filename.clone());
        self.signed_hash = Some(artifact.hash.clone());
        self.signed_at = Some(artifact.signed_at);
        self.touch();
        true
    }
}
