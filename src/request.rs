//! Inbound request surface
//!
//! The preview workflow is driven by a single route accepting GET and POST.
//! Routing, body decoding and session handling belong to the host
//! framework; this module only models what the workflow itself consumes:
//! the HTTP method, the decoded form body and auxiliary request metadata.

use crate::upload::UploadedFile;
use http::Method;
use std::collections::HashMap;

/// Decoded form submission: field name to one or more string values, plus
/// uploaded file parts.
///
/// Key order is irrelevant; multiplicity per key is preserved so that
/// multi-select fields keep all of their values. `get` returns the last
/// value for a key, `getlist` all of them.
#[derive(Debug, Clone, Default)]
pub struct FormData {
	values: HashMap<String, Vec<String>>,
	files: HashMap<String, UploadedFile>,
}

impl FormData {
	/// Create an empty submission
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::FormData;
	///
	/// let data = FormData::new();
	/// assert!(data.get("name").is_none());
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Set a field to a single value, replacing any previous values
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::FormData;
	///
	/// let mut data = FormData::new();
	/// data.insert("name", "joe");
	/// data.insert("name", "jane");
	/// assert_eq!(data.get("name"), Some("jane"));
	/// assert_eq!(data.getlist("name").len(), 1);
	/// ```
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.values.insert(name.into(), vec![value.into()]);
	}

	/// Add a value for a field, keeping previous values
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::FormData;
	///
	/// let mut data = FormData::new();
	/// data.append("tags", "1");
	/// data.append("tags", "2");
	/// assert_eq!(data.getlist("tags"), ["1", "2"]);
	/// ```
	pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.values.entry(name.into()).or_default().push(value.into());
	}

	/// Attach an uploaded file part
	pub fn insert_file(&mut self, name: impl Into<String>, file: UploadedFile) {
		self.files.insert(name.into(), file);
	}

	/// Remove a field and all of its values
	pub fn remove(&mut self, name: &str) {
		self.values.remove(name);
		self.files.remove(name);
	}

	/// Get the last value submitted for a field
	pub fn get(&self, name: &str) -> Option<&str> {
		self.values
			.get(name)
			.and_then(|values| values.last())
			.map(String::as_str)
	}

	/// Get all values submitted for a field, in submission order
	pub fn getlist(&self, name: &str) -> &[String] {
		self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Get the uploaded file for a field, if one was submitted
	pub fn file(&self, name: &str) -> Option<&UploadedFile> {
		self.files.get(name)
	}

	/// Check whether the field has any value or file part
	pub fn contains(&self, name: &str) -> bool {
		self.values.contains_key(name) || self.files.contains_key(name)
	}
}

/// A single request into the preview workflow.
///
/// `meta` carries host-framework metadata (authenticated user, remote
/// address, ...) that handler hooks may inspect.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
	method: Method,
	data: FormData,
	meta: HashMap<String, serde_json::Value>,
}

impl PreviewRequest {
	/// A GET request, rendering the initial form
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::PreviewRequest;
	/// use http::Method;
	///
	/// let request = PreviewRequest::get();
	/// assert_eq!(request.method(), &Method::GET);
	/// ```
	pub fn get() -> Self {
		Self {
			method: Method::GET,
			data: FormData::new(),
			meta: HashMap::new(),
		}
	}

	/// A POST request carrying a form submission
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::{FormData, PreviewRequest};
	///
	/// let mut data = FormData::new();
	/// data.insert("name", "joe");
	///
	/// let request = PreviewRequest::post(data);
	/// assert_eq!(request.data().get("name"), Some("joe"));
	/// ```
	pub fn post(data: FormData) -> Self {
		Self {
			method: Method::POST,
			data,
			meta: HashMap::new(),
		}
	}

	/// Attach a metadata entry
	pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.meta.insert(key.into(), value);
		self
	}

	pub fn method(&self) -> &Method {
		&self.method
	}

	pub fn data(&self) -> &FormData {
		&self.data
	}

	/// Get a metadata entry by key
	pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
		self.meta.get(key)
	}
}
