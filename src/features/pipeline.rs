//! Document lifecycle: upload, sign, verify.
//!
//! `SigningPipeline` owns no global state. The PDF engine, blob store and
//! metadata repository are injected, so one pipeline can be shared behind an
//! `Arc` and tests can swap any port.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::SignetConfig;
use crate::error::{SignError, SignResult};
use crate::features::documents::{DocumentRepository, MemoryRepository, SqliteRepository};
use crate::features::fields::{FieldKind, SigningRequest, WireField};
use crate::features::hashes::{hashes_match, sha256_hex};
use crate::features::pdf::{LopdfToolkit, PdfToolkit};
use crate::features::projection::project;
use crate::features::render::render_field;
use crate::features::storage::{BlobStore, FsBlobStore, MemoryBlobStore, StorageError};
use crate::state::{DocumentRecord, SignedArtifact};

pub const PDF_MIME: &str = "application/pdf";
const SIGNED_PREFIX: &str = "signed_";

/// A field that could not be painted; signing continued without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedField {
    pub index: usize,
    pub kind: FieldKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutcome {
    pub document_id: String,
    pub artifact_reference: String,
    pub content_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub signed_at: OffsetDateTime,
    pub rendered_fields: usize,
    pub skipped_fields: Vec<SkippedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub document_id: String,
    pub is_valid: bool,
    pub original_hash: String,
    pub provided_hash: String,
    pub is_signed: bool,
    pub signed_hash: Option<String>,
}

pub struct SigningPipeline {
    pdf: Arc<dyn PdfToolkit>,
    blobs: Arc<dyn BlobStore>,
    documents: Arc<dyn DocumentRepository>,
    max_upload_bytes: u64,
}

impl SigningPipeline {
    pub fn new(
        pdf: Arc<dyn PdfToolkit>,
        blobs: Arc<dyn BlobStore>,
        documents: Arc<dyn DocumentRepository>,
    ) -> Self {
        Self {
            pdf,
            blobs,
            documents,
            max_upload_bytes: crate::config::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Filesystem blobs and a SQLite catalogue, both under the configured paths.
    pub fn open(config: &SignetConfig) -> SignResult<Self> {
        let blobs = FsBlobStore::open(config.uploads_dir())?;
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::from)?;
        }
        let documents = SqliteRepository::open(&config.db_path)?;
        log::info!(
            "storage at {}, catalogue at {}",
            config.storage_dir.display(),
            config.db_path.display()
        );
        Ok(Self::new(Arc::new(LopdfToolkit), Arc::new(blobs), Arc::new(documents))
            .with_max_upload_bytes(config.max_upload_bytes))
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(LopdfToolkit),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryRepository::new()),
        )
    }

    pub fn upload(
        &self,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> SignResult<DocumentRecord> {
        if bytes.is_empty() {
            return Err(SignError::Validation("No file uploaded".into()));
        }
        if !mime_type.trim().eq_ignore_ascii_case(PDF_MIME) || !looks_like_pdf(bytes) {
            return Err(SignError::Validation("Only PDF files are allowed".into()));
        }
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(SignError::Validation(format!(
                "File exceeds the {} byte upload limit",
                self.max_upload_bytes
            )));
        }

        let filename = unique_filename();
        self.blobs
            .put(&filename, bytes)
            .map_err(|e| self.internal(e.into()))?;
        let name = match original_name.trim() {
            "" => "document.pdf",
            trimmed => trimmed,
        };
        let record = DocumentRecord::new(
            name,
            filename.clone(),
            bytes.len() as u64,
            PDF_MIME,
            sha256_hex(bytes),
        );
        let stored = match self.documents.insert(record) {
            Ok(stored) => stored,
            Err(e) => {
                self.discard_blob(&filename);
                return Err(self.internal(e.into()));
            }
        };
        log::info!(
            "uploaded {} as {} ({} bytes)",
            stored.original_name,
            stored.id,
            stored.size
        );
        Ok(stored)
    }

    pub fn document(&self, id: &str) -> SignResult<DocumentRecord> {
        self.documents
            .get(id)
            .map_err(|e| self.internal(e.into()))?
            .ok_or_else(|| SignError::NotFound("Document not found".into()))
    }

    pub fn documents(&self) -> SignResult<Vec<DocumentRecord>> {
        self.documents.list().map_err(|e| self.internal(e.into()))
    }

    /// Parses wire fields, then signs.
    pub fn sign_wire(&self, document_id: &str, fields: &[WireField]) -> SignResult<SignOutcome> {
        let request = SigningRequest::from_wire(fields)?;
        self.sign(document_id, &request)
    }

    pub fn sign(&self, document_id: &str, request: &SigningRequest) -> SignResult<SignOutcome> {
        if document_id.trim().is_empty() {
            return Err(SignError::Validation("Document id is required".into()));
        }
        if request.is_empty() {
            return Err(SignError::Validation("Fields array is required".into()));
        }
        let record = self.document(document_id)?;
        if record.is_signed {
            return Err(SignError::Conflict("Document is already signed".into()));
        }

        let original = self
            .blobs
            .get(&record.filename)
            .map_err(|e| self.internal(e.into()))?;
        let mut doc = self.pdf.load(&original).map_err(|e| self.internal(e.into()))?;
        let geometry = doc.page_geometry(0).map_err(|e| self.internal(e.into()))?;

        let mut rendered_fields = 0;
        let mut skipped_fields = Vec::new();
        {
            let mut canvas = doc.canvas(0).map_err(|e| self.internal(e.into()))?;
            for (index, field) in request.fields().iter().enumerate() {
                let bbox = project(&field.rect, geometry);
                log::debug!("field {index} ({:?}) projected to {bbox:?}", field.kind());
                match render_field(canvas.as_mut(), field, bbox) {
                    Ok(()) => rendered_fields += 1,
                    Err(e) => {
                        log::warn!(
                            "skipping {:?} field {index} on {}: {e}",
                            field.kind(),
                            record.id
                        );
                        skipped_fields.push(SkippedField {
                            index,
                            kind: field.kind(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        let signed_bytes = doc.serialize().map_err(|e| self.internal(e.into()))?;

        let artifact = SignedArtifact {
            filename: format!("{SIGNED_PREFIX}{}", record.filename),
            hash: sha256_hex(&signed_bytes),
            signed_at: OffsetDateTime::now_utc(),
        };
        match self.blobs.put(&artifact.filename, &signed_bytes) {
            Ok(()) => {}
            Err(StorageError::Exists(name)) => {
                log::warn!("signed artifact {name} already exists for {}", record.id);
                return Err(SignError::Conflict("Document is already signed".into()));
            }
            Err(e) => return Err(self.internal(e.into())),
        }

        match self.documents.mark_signed(&record.id, &artifact) {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("lost signing race for {}, discarding artifact", record.id);
                self.discard_blob(&artifact.filename);
                return Err(SignError::Conflict("Document is already signed".into()));
            }
            Err(e) => {
                self.discard_blob(&artifact.filename);
                return Err(self.internal(e.into()));
            }
        }

        log::info!(
            "signed {} with {rendered_fields} field(s), {} skipped",
            record.id,
            skipped_fields.len()
        );
        Ok(SignOutcome {
            document_id: record.id,
            artifact_reference: artifact.filename,
            content_hash: artifact.hash,
            signed_at: artifact.signed_at,
            rendered_fields,
            skipped_fields,
        })
    }

    pub fn verify(&self, document_id: &str, expected_hash: &str) -> SignResult<VerifyReport> {
        if document_id.trim().is_empty() || expected_hash.trim().is_empty() {
            return Err(SignError::Validation(
                "Document ID and expected hash are required".into(),
            ));
        }
        let record = self.document(document_id)?;
        let is_valid = hashes_match(expected_hash, &record.original_hash);
        log::info!("verified {}: valid={is_valid}", record.id);
        Ok(VerifyReport {
            document_id: record.id,
            is_valid,
            original_hash: record.original_hash,
            provided_hash: expected_hash.to_string(),
            is_signed: record.is_signed,
            signed_hash: record.signed_hash,
        })
    }

    pub fn signed_artifact(&self, document_id: &str) -> SignResult<Vec<u8>> {
        let record = self.document(document_id)?;
        let filename = record
            .signed_filename
            .filter(|_| record.is_signed)
            .ok_or_else(|| SignError::NotFound("Document has not been signed".into()))?;
        self.blobs.get(&filename).map_err(|e| self.internal(e.into()))
    }

    pub fn original(&self, document_id: &str) -> SignResult<Vec<u8>> {
        let record = self.document(document_id)?;
        self.blobs
            .get(&record.filename)
            .map_err(|e| self.internal(e.into()))
    }

    fn discard_blob(&self, key: &str) {
        if let Err(e) = self.blobs.remove(key) {
            log::error!("failed to discard blob {key}: {e}");
        }
    }

    /// Logs the full detail; callers only ever see the public message.
    fn internal(&self, err: SignError) -> SignError {
        log::error!("{err}");
        err
    }
}

fn looks_like_pdf(bytes: &[u8]) -> bool {
    infer::get(bytes)
        .map(|kind| kind.mime_type() == PDF_MIME)
        .unwrap_or(false)
}

fn unique_filename() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{millis}-{suffix}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::coordinates::NormalizedRect;
    use crate::features::fields::{FieldContent, FieldDescriptor, ImageFormat, ImagePayload};
    use crate::features::pdf::tests::{png_bytes, single_page_pdf};
    use crate::features::pdf::{obj_to_f64, PdfDocument};
    use crate::state::DocumentSignState;
    use serde_json::json;

    struct Harness {
        pipeline: SigningPipeline,
        blobs: Arc<MemoryBlobStore>,
        documents: Arc<MemoryRepository>,
    }

    fn harness() -> Harness {
        let blobs = Arc::new(MemoryBlobStore::new());
        let documents = Arc::new(MemoryRepository::new());
        let pipeline = SigningPipeline::new(
            Arc::new(LopdfToolkit),
            blobs.clone(),
            documents.clone(),
        );
        Harness {
            pipeline,
            blobs,
            documents,
        }
    }

    fn signature_field() -> FieldDescriptor {
        FieldDescriptor::new(
            FieldContent::Signature(ImagePayload::from_bytes(&png_bytes(40, 20), ImageFormat::Png)),
            NormalizedRect::new(0.1, 0.1, 0.2, 0.05),
        )
    }

    fn upload_a4(pipeline: &SigningPipeline) -> DocumentRecord {
        pipeline
            .upload("contract.pdf", PDF_MIME, &single_page_pdf(595, 842))
            .unwrap()
    }

    #[test]
    fn upload_stores_bytes_and_hash() {
        let h = harness();
        let bytes = single_page_pdf(595, 842);
        let record = h.pipeline.upload(" contract.pdf ", PDF_MIME, &bytes).unwrap();

        assert_eq!(record.original_name, "contract.pdf");
        assert_eq!(record.size, bytes.len() as u64);
        assert_eq!(record.original_hash, sha256_hex(&bytes));
        assert_eq!(record.state(), DocumentSignState::Unsigned);
        assert!(record.filename.ends_with(".pdf"));
        assert_eq!(h.blobs.get(&record.filename).unwrap(), bytes);
        assert_eq!(h.pipeline.document(&record.id).unwrap(), record);
    }

    #[test]
    fn upload_rejects_non_pdf_and_oversized_files() {
        let h = harness();
        let pdf = single_page_pdf(595, 842);
        let png = png_bytes(4, 4);

        let empty: &[u8] = &[];
        let cases = [
            ("image/png", png.as_slice()),
            (PDF_MIME, png.as_slice()),
            ("text/plain", pdf.as_slice()),
            (PDF_MIME, empty),
        ];
        for (mime, bytes) in cases {
            assert!(
                matches!(h.pipeline.upload("x", mime, bytes), Err(SignError::Validation(_))),
                "{mime} accepted"
            );
        }

        let small = SigningPipeline::in_memory().with_max_upload_bytes(16);
        assert!(matches!(
            small.upload("big.pdf", PDF_MIME, &pdf),
            Err(SignError::Validation(_))
        ));
        assert!(h.documents.list().unwrap().is_empty());
    }

    #[test]
    fn documents_are_listed_newest_first() {
        let h = harness();
        let first = upload_a4(&h.pipeline);
        let second = upload_a4(&h.pipeline);
        let ids: Vec<String> = h
            .pipeline
            .documents()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn signing_produces_new_artifact_and_keeps_original() {
        let h = harness();
        let record = upload_a4(&h.pipeline);
        let request = SigningRequest::new(vec![signature_field()]).unwrap();

        let outcome = h.pipeline.sign(&record.id, &request).unwrap();
        assert_eq!(outcome.document_id, record.id);
        assert_eq!(outcome.artifact_reference, format!("signed_{}", record.filename));
        assert_eq!(outcome.rendered_fields, 1);
        assert!(outcome.skipped_fields.is_empty());
        assert_ne!(outcome.content_hash, record.original_hash);

        let signed = h.pipeline.signed_artifact(&record.id).unwrap();
        assert_eq!(sha256_hex(&signed), outcome.content_hash);
        let reloaded = LopdfToolkit.load(&signed).unwrap();
        assert_eq!(reloaded.page_count(), 1);
        assert_eq!(
            sha256_hex(&h.pipeline.original(&record.id).unwrap()),
            record.original_hash
        );

        let stored = h.pipeline.document(&record.id).unwrap();
        assert_eq!(stored.state(), DocumentSignState::Signed);
        assert_eq!(stored.signed_hash.as_deref(), Some(outcome.content_hash.as_str()));
        assert_eq!(stored.signed_at, Some(outcome.signed_at));

        let report = h.pipeline.verify(&record.id, &record.original_hash).unwrap();
        assert!(report.is_valid);
        assert!(report.is_signed);
        assert_eq!(report.signed_hash, Some(outcome.content_hash));
    }

    #[test]
    fn second_sign_is_a_conflict() {
        let h = harness();
        let record = upload_a4(&h.pipeline);
        let request = SigningRequest::new(vec![signature_field()]).unwrap();
        let first = h.pipeline.sign(&record.id, &request).unwrap();

        let err = h.pipeline.sign(&record.id, &request).unwrap_err();
        assert!(matches!(err, SignError::Conflict(_)));
        assert_eq!(err.status(), 400);
        let stored = h.pipeline.document(&record.id).unwrap();
        assert_eq!(stored.signed_hash, Some(first.content_hash));
    }

    #[test]
    fn broken_fields_are_skipped_and_reported() {
        let h = harness();
        let record = upload_a4(&h.pipeline);
        let wire: Vec<WireField> = serde_json::from_value(json!([
            {
                "type": "signature",
                "content": ImagePayload::from_bytes(&png_bytes(10, 10), ImageFormat::Png).to_data_url(),
                "coordinates": {"x": 0.1, "y": 0.7, "width": 0.3, "height": 0.1}
            },
            {
                "type": "image",
                "content": "data:image/png;base64,!!!not-base64!!!",
                "coordinates": {"x": 0.5, "y": 0.5, "width": 0.2, "height": 0.2}
            },
            {
                "type": "text",
                "content": "Jane Roe",
                "coordinates": {"x": 0.1, "y": 0.2, "width": 0.4, "height": 0.04}
            }
        ]))
        .unwrap();

        let outcome = h.pipeline.sign_wire(&record.id, &wire).unwrap();
        assert_eq!(outcome.rendered_fields, 2);
        assert_eq!(outcome.skipped_fields.len(), 1);
        assert_eq!(outcome.skipped_fields[0].index, 1);
        assert_eq!(outcome.skipped_fields[0].kind, FieldKind::Image);
        assert!(h.pipeline.document(&record.id).unwrap().is_signed);
    }

    fn page_content(bytes: &[u8]) -> Vec<u8> {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_page_content(page_id).unwrap()
    }

    #[test]
    fn all_fields_skipped_still_signs_an_unchanged_page() {
        let h = harness();
        let record = upload_a4(&h.pipeline);
        let wire: Vec<WireField> = serde_json::from_value(json!([
            {
                "type": "signature",
                "content": "data:image/png;base64,AAAA",
                "coordinates": {"x": 0.1, "y": 0.1, "width": 0.2, "height": 0.05}
            }
        ]))
        .unwrap();

        let outcome = h.pipeline.sign_wire(&record.id, &wire).unwrap();
        assert_eq!(outcome.rendered_fields, 0);
        assert_eq!(outcome.skipped_fields.len(), 1);
        assert_eq!(outcome.skipped_fields[0].index, 0);
        assert_eq!(outcome.skipped_fields[0].kind, FieldKind::Signature);
        assert_eq!(
            h.pipeline.document(&record.id).unwrap().state(),
            DocumentSignState::Signed
        );

        let signed = h.pipeline.signed_artifact(&record.id).unwrap();
        assert_eq!(LopdfToolkit.load(&signed).unwrap().page_count(), 1);
        let original = h.pipeline.original(&record.id).unwrap();
        assert_eq!(page_content(&signed), page_content(&original));
    }

    #[test]
    fn top_left_quarter_width_box_lands_at_the_top_of_an_a4_page() {
        let h = harness();
        let record = upload_a4(&h.pipeline);
        let wire: Vec<WireField> = serde_json::from_value(json!([
            {
                "type": "signature",
                "content": ImagePayload::from_bytes(&png_bytes(40, 20), ImageFormat::Png).to_data_url(),
                "coordinates": {"x": 0, "y": 0, "width": 0.25, "height": 0.1}
            }
        ]))
        .unwrap();
        let outcome = h.pipeline.sign_wire(&record.id, &wire).unwrap();
        assert_eq!(outcome.rendered_fields, 1);

        // Box is (0, 757.8, 148.75, 84.2); the 2:1 image fits its width and
        // is centred vertically.
        let signed = h.pipeline.signed_artifact(&record.id).unwrap();
        let content = lopdf::content::Content::decode(&page_content(&signed)).unwrap();
        let placement: Vec<Vec<f64>> = content
            .operations
            .iter()
            .filter(|op| op.operator == "cm")
            .map(|op| op.operands.iter().filter_map(obj_to_f64).collect())
            .filter(|m: &Vec<f64>| m.len() == 6 && (m[0] - 148.75).abs() < 0.05)
            .collect();
        assert_eq!(placement.len(), 1, "{placement:?}");
        let expected = [148.75, 0.0, 0.0, 74.375, 0.0, 762.7125];
        for (got, want) in placement[0].iter().zip(expected) {
            assert!((got - want).abs() < 0.05, "{:?}", placement[0]);
        }
        let top = placement[0][5] + placement[0][3];
        assert!((top - (842.0 - 4.9125)).abs() < 0.05);
    }

    #[test]
    fn precondition_failures_do_not_mutate() {
        let h = harness();
        let record = upload_a4(&h.pipeline);
        let request = SigningRequest::new(vec![signature_field()]).unwrap();

        assert!(matches!(
            h.pipeline.sign("missing", &request),
            Err(SignError::NotFound(_))
        ));
        assert!(matches!(
            h.pipeline.sign(" ", &request),
            Err(SignError::Validation(_))
        ));
        assert!(matches!(
            h.pipeline.sign_wire(&record.id, &[]),
            Err(SignError::Validation(_))
        ));
        let unsupported: Vec<WireField> = serde_json::from_value(json!([
            {"type": "checkbox", "content": "", "coordinates": {"x": 0, "y": 0, "width": 0.1, "height": 0.1}}
        ]))
        .unwrap();
        assert!(matches!(
            h.pipeline.sign_wire(&record.id, &unsupported),
            Err(SignError::UnsupportedKind(_))
        ));

        let nan_rect = FieldDescriptor::new(
            signature_field().content,
            NormalizedRect::new(f64::NAN, 0.1, 0.2, f64::INFINITY),
        );
        assert!(matches!(
            SigningRequest::new(vec![nan_rect]),
            Err(SignError::Validation(_))
        ));
        let zero_height: Vec<WireField> = serde_json::from_value(json!([
            {"type": "signature", "content": "data:image/png;base64,AAAA", "coordinates": {"x": 0.1, "y": 0.1, "width": 0.2, "height": 0}}
        ]))
        .unwrap();
        assert!(matches!(
            h.pipeline.sign_wire(&record.id, &zero_height),
            Err(SignError::Validation(_))
        ));

        let stored = h.pipeline.document(&record.id).unwrap();
        assert_eq!(stored.state(), DocumentSignState::Unsigned);
        assert!(!stored.is_signed);
        assert!(!h.blobs.contains(&format!("signed_{}", record.filename)));
    }

    #[test]
    fn unparseable_original_is_internal_and_leaves_record_unsigned() {
        let h = harness();
        h.blobs.put("broken.pdf", b"%PDF-1.7 truncated").unwrap();
        let record = h
            .documents
            .insert(DocumentRecord::new("b.pdf", "broken.pdf", 18, PDF_MIME, "x"))
            .unwrap();
        let request = SigningRequest::new(vec![signature_field()]).unwrap();

        let err = h.pipeline.sign(&record.id, &request).unwrap_err();
        assert!(matches!(err, SignError::Internal(_)));
        assert_eq!(err.status(), 500);
        assert_eq!(err.public_message(), "Failed to process document");
        assert!(!h.pipeline.document(&record.id).unwrap().is_signed);
    }

    struct LosingRepository(MemoryRepository);

    impl DocumentRepository for LosingRepository {
        fn insert(&self, record: DocumentRecord) -> Result<DocumentRecord, StorageError> {
            self.0.insert(record)
        }
        fn get(&self, id: &str) -> Result<Option<DocumentRecord>, StorageError> {
            self.0.get(id)
        }
        fn list(&self) -> Result<Vec<DocumentRecord>, StorageError> {
            self.0.list()
        }
        fn mark_signed(&self, _: &str, _: &SignedArtifact) -> Result<bool, StorageError> {
            Ok(false)
        }
    }

    #[test]
    fn losing_the_signing_race_discards_the_artifact() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let pipeline = SigningPipeline::new(
            Arc::new(LopdfToolkit),
            blobs.clone(),
            Arc::new(LosingRepository(MemoryRepository::new())),
        );
        let record = upload_a4(&pipeline);
        let request = SigningRequest::new(vec![signature_field()]).unwrap();

        assert!(matches!(
            pipeline.sign(&record.id, &request),
            Err(SignError::Conflict(_))
        ));
        assert!(!blobs.contains(&format!("signed_{}", record.filename)));
        assert!(!pipeline.document(&record.id).unwrap().is_signed);
    }

    #[test]
    fn verify_requires_inputs_and_compares_case_insensitively() {
        let h = harness();
        let record = upload_a4(&h.pipeline);

        let report = h
            .pipeline
            .verify(&record.id, &record.original_hash.to_uppercase())
            .unwrap();
        assert!(report.is_valid);
        assert!(!report.is_signed);
        assert!(report.signed_hash.is_none());

        let padded = format!("  {}\n", record.original_hash);
        let report = h.pipeline.verify(&record.id, &padded).unwrap();
        assert!(report.is_valid);
        assert_eq!(report.provided_hash, padded);

        assert!(!h.pipeline.verify(&record.id, "deadbeef").unwrap().is_valid);
        assert!(matches!(
            h.pipeline.verify(&record.id, ""),
            Err(SignError::Validation(_))
        ));
        assert!(matches!(
            h.pipeline.verify("missing", "abc"),
            Err(SignError::NotFound(_))
        ));
        assert!(matches!(
            h.pipeline.signed_artifact(&record.id),
            Err(SignError::NotFound(_))
        ));
    }

    #[test]
    fn persistent_pipeline_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = SignetConfig::new(dir.path().join("store"));
        let id = {
            let pipeline = SigningPipeline::open(&config).unwrap();
            let record = upload_a4(&pipeline);
            let request = SigningRequest::new(vec![signature_field()]).unwrap();
            pipeline.sign(&record.id, &request).unwrap();
            record.id
        };

        let pipeline = SigningPipeline::open(&config).unwrap();
        let stored = pipeline.document(&id).unwrap();
        assert!(stored.is_signed);
        let signed = pipeline.signed_artifact(&id).unwrap();
        assert_eq!(Some(sha256_hex(&signed)), stored.signed_hash);
    }
}
