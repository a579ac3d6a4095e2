//! Form preview workflow with tamper-evident security hashes
//!
//! This crate implements a three-stage form confirmation flow for
//! Reinhardt-style applications:
//! - Stage 1 renders the form.
//! - Stage 2 validates the submission and shows a preview of the cleaned
//!   data together with a keyed fingerprint of it.
//! - Stage 3 re-validates, recomputes the fingerprint and invokes the
//!   completion action only when the two match.
//!
//! The flow is stateless across requests: the stage indicator and the
//! fingerprint travel in hidden form fields, and the fingerprint is an
//! HMAC-SHA256 keyed with a deployment secret, so it cannot be forged or
//! tampered with undetected. Canonicalization (whitespace stripping,
//! relation-order sorting, file content digests) guarantees that
//! functionally identical submissions fingerprint identically across the
//! render/submit cycle.

pub mod form;
pub mod hash;
pub mod preview;
pub mod render;
pub mod request;
pub mod response;
pub mod schema;
pub mod upload;

pub use form::Form;
pub use hash::{SecretKey, SecretKeyError, constant_time_compare, form_hmac, sha256_hex};
pub use preview::{FormPreview, PreviewHandler, Stage, State};
pub use request::{FormData, PreviewRequest};
pub use response::{Context, Response};
pub use schema::{FieldError, FieldKind, FieldResult, FieldSpec, FileInfo, FormSchema};
pub use upload::{UploadError, UploadedFile};
