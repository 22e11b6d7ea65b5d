//! Overlay form fields onto PDF pages and bake them into signed, hashed
//! artifacts.
//!
//! Callers place fields in page-relative coordinates (`[0,1]` on both axes,
//! top-left origin). [`SigningPipeline::sign`] projects each field into PDF
//! points, paints it, stores the result as a new artifact and flips the
//! document to signed exactly once.

pub mod config;
pub mod error;
pub mod features;
pub mod router;
pub mod state;

pub use config::SignetConfig;
pub use error::{SignError, SignResult};
pub use features::coordinates::NormalizedRect;
pub use features::fields::{FieldContent, FieldDescriptor, FieldKind, SigningRequest, WireField};
pub use features::pipeline::{SignOutcome, SigningPipeline, SkippedField, VerifyReport};
pub use router::dispatch;
pub use state::{DocumentRecord, DocumentSignState};
