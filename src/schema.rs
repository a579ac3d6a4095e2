//! Explicit form schema
//!
//! A form is described by a fixed, ordered list of field specifications.
//! Each field carries a kind tag that selects both its validation and its
//! canonicalization rule, so the form layer and the fingerprint engine
//! always agree on what a field's value means.

use crate::hash::sha256_hex;
use crate::request::FormData;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Date input formats accepted by [`FieldKind::Date`], tried in order.
const DATE_INPUT_FORMATS: &[&str] = &[
	"%Y-%m-%d",  // 2006-10-25
	"%m/%d/%Y",  // 10/25/2006
	"%b %d %Y",  // Oct 25 2006
	"%b %d, %Y", // Oct 25, 2006
	"%d %b %Y",  // 25 Oct 2006
	"%B %d, %Y", // October 25, 2006
];

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
	#[error("This field is required.")]
	Required,
	#[error("{0}")]
	Validation(String),
}

pub type FieldResult<T> = Result<T, FieldError>;

/// Field kind, one per canonicalization rule.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
	/// Free text; leading/trailing whitespace is never significant
	Text,
	/// Checkbox; the unchecked state has many textual spellings, all of
	/// which canonicalize to `false`
	Boolean,
	/// Calendar date, canonicalized to ISO `%Y-%m-%d`
	Date,
	/// Uploaded file; the content bytes participate in the fingerprint,
	/// not just the filename
	File,
	/// Multi-select of related objects, identified by integer id.
	/// Selections canonicalize to the id-sorted set, so iteration order
	/// of the backing collection never matters.
	ManyRelation { choices: Vec<(i64, String)> },
}

/// Cleaned representation of an uploaded file.
///
/// The content itself is reduced to a SHA-256 digest; two files with the
/// same name but different bytes clean to different values.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
	pub filename: String,
	pub size: u64,
	pub sha256: String,
}

/// Specification of a single form field
#[derive(Debug, Clone)]
pub struct FieldSpec {
	pub name: String,
	pub kind: FieldKind,
	pub required: bool,
	pub label: Option<String>,
}

impl FieldSpec {
	fn new(name: impl Into<String>, kind: FieldKind) -> Self {
		Self {
			name: name.into(),
			kind,
			required: true,
			label: None,
		}
	}

	/// A text field
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::FieldSpec;
	///
	/// let field = FieldSpec::text("username");
	/// assert_eq!(field.name, "username");
	/// assert!(field.required);
	/// ```
	pub fn text(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Text)
	}

	/// A boolean (checkbox) field.
	///
	/// A required boolean must be affirmatively checked to validate.
	pub fn boolean(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Boolean)
	}

	/// A date field
	pub fn date(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Date)
	}

	/// A file upload field
	pub fn file(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::File)
	}

	/// A multi-select of related objects, given as `(id, label)` choices
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::FieldSpec;
	///
	/// let field = FieldSpec::many_relation(
	///     "tags",
	///     vec![(1, "rust".to_string()), (2, "web".to_string())],
	/// );
	/// assert_eq!(field.name, "tags");
	/// ```
	pub fn many_relation(name: impl Into<String>, choices: Vec<(i64, String)>) -> Self {
		Self::new(name, FieldKind::ManyRelation { choices })
	}

	/// Mark the field as optional
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::FieldSpec;
	///
	/// let field = FieldSpec::boolean("newsletter").optional();
	/// assert!(!field.required);
	/// ```
	pub fn optional(mut self) -> Self {
		self.required = false;
		self
	}

	/// Set a human-readable label
	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	/// Validate this field against a submission and produce its cleaned,
	/// canonical value.
	pub fn clean(&self, data: &FormData) -> FieldResult<serde_json::Value> {
		match &self.kind {
			FieldKind::Text => {
				let value = data.get(&self.name).map(str::trim).unwrap_or("");
				if value.is_empty() {
					if self.required {
						return Err(FieldError::Required);
					}
					return Ok(serde_json::Value::String(String::new()));
				}
				Ok(serde_json::Value::String(value.to_string()))
			}
			FieldKind::Boolean => {
				let checked = parse_boolean(data.get(&self.name));
				if self.required && !checked {
					return Err(FieldError::Required);
				}
				Ok(serde_json::Value::Bool(checked))
			}
			FieldKind::Date => {
				let raw = data.get(&self.name).map(str::trim).unwrap_or("");
				if raw.is_empty() {
					if self.required {
						return Err(FieldError::Required);
					}
					return Ok(serde_json::Value::Null);
				}
				let date = parse_date(raw).map_err(FieldError::Validation)?;
				Ok(serde_json::Value::String(
					date.format("%Y-%m-%d").to_string(),
				))
			}
			FieldKind::File => match data.file(&self.name) {
				None => {
					if self.required {
						return Err(FieldError::Required);
					}
					Ok(serde_json::Value::Null)
				}
				Some(upload) => {
					let content = upload.read_content().map_err(|e| {
						FieldError::Validation(format!("Could not read the uploaded file: {}", e))
					})?;
					let info = FileInfo {
						filename: upload.filename().to_string(),
						size: content.len() as u64,
						sha256: sha256_hex(&content),
					};
					serde_json::to_value(info)
						.map_err(|e| FieldError::Validation(e.to_string()))
				}
			},
			FieldKind::ManyRelation { choices } => {
				let mut ids: Vec<i64> = Vec::new();
				for raw in data.getlist(&self.name) {
					let raw = raw.trim();
					if raw.is_empty() {
						continue;
					}
					let id: i64 = raw.parse().map_err(|_| {
						FieldError::Validation(format!(
							"Select a valid choice. {} is not one of the available choices.",
							raw
						))
					})?;
					if !choices.iter().any(|(pk, _)| *pk == id) {
						return Err(FieldError::Validation(format!(
							"Select a valid choice. {} is not one of the available choices.",
							id
						)));
					}
					if !ids.contains(&id) {
						ids.push(id);
					}
				}
				if ids.is_empty() {
					if self.required {
						return Err(FieldError::Required);
					}
					return Ok(serde_json::Value::Array(Vec::new()));
				}
				// Sort by referenced id so that query ordering and
				// prefetch state never change the cleaned value.
				ids.sort_unstable();
				Ok(serde_json::Value::Array(
					ids.into_iter().map(serde_json::Value::from).collect(),
				))
			}
		}
	}
}

/// An ordered list of field specifications.
///
/// Declaration order is significant: validation errors, rendering and
/// fingerprinting all walk the schema in this order.
#[derive(Debug, Clone, Default)]
pub struct FormSchema {
	fields: Vec<FieldSpec>,
}

impl FormSchema {
	/// Create an empty schema
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a field, builder style
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::{FieldSpec, FormSchema};
	///
	/// let schema = FormSchema::new()
	///     .with_field(FieldSpec::text("name"))
	///     .with_field(FieldSpec::boolean("subscribed").optional());
	///
	/// assert_eq!(schema.len(), 2);
	/// assert!(schema.contains("name"));
	/// assert!(!schema.contains("email"));
	/// ```
	pub fn with_field(mut self, field: FieldSpec) -> Self {
		self.fields.push(field);
		self
	}

	/// Add a field in place
	pub fn add_field(&mut self, field: FieldSpec) {
		self.fields.push(field);
	}

	/// Look up a field by name
	pub fn get(&self, name: &str) -> Option<&FieldSpec> {
		self.fields.iter().find(|f| f.name == name)
	}

	/// Check whether a field with this name is declared
	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// All fields, in declaration order
	pub fn fields(&self) -> &[FieldSpec] {
		&self.fields
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

/// Canonical boolean reading of a submitted value.
///
/// A checkbox that was never checked may arrive as a missing key, an empty
/// string, or a rendered textual "false" from a hidden re-submission; all
/// of these must read the same.
pub(crate) fn parse_boolean(value: Option<&str>) -> bool {
	match value {
		None => false,
		Some(raw) => {
			let raw = raw.trim();
			!(raw.is_empty()
				|| raw.eq_ignore_ascii_case("false")
				|| raw == "0"
				|| raw.eq_ignore_ascii_case("off"))
		}
	}
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
	for format in DATE_INPUT_FORMATS {
		if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
			// Reject years outside the 4-digit range to avoid ambiguous
			// 2-digit year interpretations.
			if !(1000..=9999).contains(&date.year()) {
				continue;
			}
			return Ok(date);
		}
	}
	Err("Enter a valid date with a 4-digit year.".to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::upload::UploadedFile;
	use rstest::rstest;
	use serde_json::json;

	fn data_with(name: &str, value: &str) -> FormData {
		let mut data = FormData::new();
		data.insert(name, value);
		data
	}

	#[test]
	fn test_text_field_strips_whitespace() {
		let field = FieldSpec::text("name");
		let data = data_with("name", "  joe  ");

		assert_eq!(field.clean(&data).unwrap(), json!("joe"));
	}

	#[test]
	fn test_text_field_required() {
		let field = FieldSpec::text("name");

		assert!(matches!(
			field.clean(&FormData::new()),
			Err(FieldError::Required)
		));
		assert!(matches!(
			field.clean(&data_with("name", "   ")),
			Err(FieldError::Required)
		));
	}

	#[test]
	fn test_text_field_optional_cleans_to_empty_string() {
		let field = FieldSpec::text("bio").optional();

		assert_eq!(field.clean(&FormData::new()).unwrap(), json!(""));
	}

	#[rstest]
	#[case(None, false)]
	#[case(Some(""), false)]
	#[case(Some("false"), false)]
	#[case(Some("False"), false)]
	#[case(Some("0"), false)]
	#[case(Some("off"), false)]
	#[case(Some("on"), true)]
	#[case(Some("true"), true)]
	#[case(Some("True"), true)]
	#[case(Some("1"), true)]
	fn test_parse_boolean(#[case] value: Option<&str>, #[case] expected: bool) {
		assert_eq!(parse_boolean(value), expected);
	}

	#[test]
	fn test_boolean_field_required_must_be_checked() {
		let field = FieldSpec::boolean("accept_terms");

		assert!(matches!(
			field.clean(&data_with("accept_terms", "false")),
			Err(FieldError::Required)
		));
		assert_eq!(
			field.clean(&data_with("accept_terms", "on")).unwrap(),
			json!(true)
		);
	}

	#[rstest]
	#[case("2006-10-25")]
	#[case("10/25/2006")]
	#[case("Oct 25 2006")]
	#[case("Oct 25, 2006")]
	#[case("25 Oct 2006")]
	#[case("October 25, 2006")]
	fn test_date_field_accepts_known_formats(#[case] raw: &str) {
		let field = FieldSpec::date("date1");

		assert_eq!(field.clean(&data_with("date1", raw)).unwrap(), json!("2006-10-25"));
	}

	#[test]
	fn test_date_field_rejects_garbage() {
		let field = FieldSpec::date("date1");

		assert!(matches!(
			field.clean(&data_with("date1", "not a date")),
			Err(FieldError::Validation(_))
		));
	}

	#[test]
	fn test_date_field_optional_cleans_to_null() {
		let field = FieldSpec::date("date1").optional();

		assert_eq!(
			field.clean(&FormData::new()).unwrap(),
			serde_json::Value::Null
		);
	}

	#[test]
	fn test_file_field_cleans_to_content_digest() {
		let field = FieldSpec::file("attachment");
		let mut data = FormData::new();
		data.insert_file("attachment", UploadedFile::memory("a.txt", &b"1"[..]));

		let cleaned = field.clean(&data).unwrap();
		assert_eq!(cleaned["filename"], json!("a.txt"));
		assert_eq!(cleaned["size"], json!(1));
		assert_eq!(cleaned["sha256"].as_str().unwrap().len(), 64);
	}

	#[test]
	fn test_file_field_content_changes_digest() {
		let field = FieldSpec::file("attachment");

		let mut first = FormData::new();
		first.insert_file("attachment", UploadedFile::memory("a.txt", &b"1"[..]));
		let mut second = FormData::new();
		second.insert_file("attachment", UploadedFile::memory("a.txt", &b"2"[..]));

		assert_ne!(
			field.clean(&first).unwrap()["sha256"],
			field.clean(&second).unwrap()["sha256"]
		);
	}

	#[test]
	fn test_file_field_required() {
		let field = FieldSpec::file("attachment");

		assert!(matches!(
			field.clean(&FormData::new()),
			Err(FieldError::Required)
		));
	}

	#[test]
	fn test_many_relation_sorts_and_dedupes() {
		let field = FieldSpec::many_relation(
			"tags",
			vec![(1, "a".into()), (2, "b".into()), (3, "c".into())],
		);

		let mut data = FormData::new();
		data.append("tags", "3");
		data.append("tags", "1");
		data.append("tags", "3");

		assert_eq!(field.clean(&data).unwrap(), json!([1, 3]));
	}

	#[test]
	fn test_many_relation_rejects_unknown_choice() {
		let field = FieldSpec::many_relation("tags", vec![(1, "a".into())]);

		let mut data = FormData::new();
		data.append("tags", "99");

		assert!(matches!(
			field.clean(&data),
			Err(FieldError::Validation(_))
		));
	}

	#[test]
	fn test_many_relation_rejects_non_numeric_value() {
		let field = FieldSpec::many_relation("tags", vec![(1, "a".into())]);

		let mut data = FormData::new();
		data.append("tags", "abc");

		assert!(matches!(
			field.clean(&data),
			Err(FieldError::Validation(_))
		));
	}

	#[test]
	fn test_schema_lookup_and_order() {
		let schema = FormSchema::new()
			.with_field(FieldSpec::text("first"))
			.with_field(FieldSpec::text("second"));

		assert!(schema.contains("first"));
		assert!(schema.get("third").is_none());
		let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
		assert_eq!(names, ["first", "second"]);
	}
}
