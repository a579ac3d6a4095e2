//! Uploaded file representation
//!
//! Form submissions may carry file parts that the I/O layer holds either
//! fully in memory or spooled to temporary storage. Fingerprinting and
//! validation must see the same logical bytes in both cases, so the two
//! storage strategies live behind a single type with one read operation.

use bytes::Bytes;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Errors that can occur while reading uploaded file content
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
	#[error("IO error: {0}")]
	Io(#[from] io::Error),
}

/// An uploaded file part of a form submission.
///
/// The `Temporary` variant points at a spool file owned by the upload
/// layer; this type reads it but never deletes it.
#[derive(Debug, Clone)]
pub enum UploadedFile {
	/// File content held fully in memory
	Memory {
		filename: String,
		content: Bytes,
		content_type: Option<String>,
	},
	/// File content spooled to temporary storage
	Temporary {
		filename: String,
		path: PathBuf,
		content_type: Option<String>,
	},
}

impl UploadedFile {
	/// Create an in-memory upload
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::UploadedFile;
	///
	/// let upload = UploadedFile::memory("notes.txt", &b"hello"[..]);
	/// assert_eq!(upload.filename(), "notes.txt");
	/// ```
	pub fn memory(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
		Self::Memory {
			filename: filename.into(),
			content: content.into(),
			content_type: None,
		}
	}

	/// Create an upload backed by a temporary spool file
	///
	/// # Examples
	///
	/// ```no_run
	/// use reinhardt_formtools::UploadedFile;
	///
	/// let upload = UploadedFile::temporary("report.pdf", "/tmp/spool/upload_1");
	/// assert_eq!(upload.filename(), "report.pdf");
	/// ```
	pub fn temporary(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
		Self::Temporary {
			filename: filename.into(),
			path: path.into(),
			content_type: None,
		}
	}

	/// Set the content type reported by the client
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		match &mut self {
			Self::Memory { content_type: ct, .. } | Self::Temporary { content_type: ct, .. } => {
				*ct = Some(content_type.into());
			}
		}
		self
	}

	/// Get the original filename
	pub fn filename(&self) -> &str {
		match self {
			Self::Memory { filename, .. } | Self::Temporary { filename, .. } => filename,
		}
	}

	/// Get the content type, if the client reported one
	pub fn content_type(&self) -> Option<&str> {
		match self {
			Self::Memory { content_type, .. } | Self::Temporary { content_type, .. } => {
				content_type.as_deref()
			}
		}
	}

	/// Read the full logical content, regardless of storage strategy.
	///
	/// The temporary variant opens, reads and closes the spool file within
	/// this call, so no file handle outlives it.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::UploadedFile;
	///
	/// let upload = UploadedFile::memory("notes.txt", &b"hello"[..]);
	/// assert_eq!(upload.read_content().unwrap().as_ref(), b"hello");
	/// ```
	pub fn read_content(&self) -> Result<Bytes, UploadError> {
		match self {
			Self::Memory { content, .. } => Ok(content.clone()),
			Self::Temporary { path, .. } => Ok(Bytes::from(fs::read(path)?)),
		}
	}
}
