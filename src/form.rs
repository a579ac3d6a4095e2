//! Schema-driven form binding and validation

use crate::request::FormData;
use crate::schema::{FieldSpec, FormSchema};
use std::collections::HashMap;

/// A form instance: a schema plus, once bound, a submission to validate.
///
/// The lifecycle mirrors the usual forms flow: construct, `bind` the
/// submitted data, call `is_valid`, then read `cleaned_data` or `errors`.
pub struct Form {
	schema: FormSchema,
	data: FormData,
	initial: HashMap<String, serde_json::Value>,
	cleaned: HashMap<String, serde_json::Value>,
	errors: HashMap<String, Vec<String>>,
	is_bound: bool,
}

impl Form {
	/// Create an unbound form
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::{FieldSpec, Form, FormSchema};
	///
	/// let schema = FormSchema::new().with_field(FieldSpec::text("name"));
	/// let form = Form::new(schema);
	/// assert!(!form.is_bound());
	/// ```
	pub fn new(schema: FormSchema) -> Self {
		Self {
			schema,
			data: FormData::new(),
			initial: HashMap::new(),
			cleaned: HashMap::new(),
			errors: HashMap::new(),
			is_bound: false,
		}
	}

	/// Create an unbound form with initial display values
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::{FieldSpec, Form, FormSchema};
	/// use std::collections::HashMap;
	/// use serde_json::json;
	///
	/// let schema = FormSchema::new().with_field(FieldSpec::text("field1"));
	/// let mut initial = HashMap::new();
	/// initial.insert("field1".to_string(), json!("Works!"));
	///
	/// let form = Form::with_initial(schema, initial);
	/// assert_eq!(form.initial().get("field1"), Some(&json!("Works!")));
	/// ```
	pub fn with_initial(schema: FormSchema, initial: HashMap<String, serde_json::Value>) -> Self {
		Self {
			initial,
			..Self::new(schema)
		}
	}

	/// Bind submitted data for validation
	pub fn bind(&mut self, data: FormData) {
		self.data = data;
		self.cleaned.clear();
		self.errors.clear();
		self.is_bound = true;
	}

	pub fn is_bound(&self) -> bool {
		self.is_bound
	}

	/// Validate the bound data against the schema.
	///
	/// Repopulates `cleaned_data` and `errors`; returns true when every
	/// field cleaned successfully. An unbound form is never valid.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::{FieldSpec, Form, FormData, FormSchema};
	///
	/// let schema = FormSchema::new().with_field(FieldSpec::text("name"));
	/// let mut form = Form::new(schema);
	///
	/// let mut data = FormData::new();
	/// data.insert("name", "joe");
	/// form.bind(data);
	///
	/// assert!(form.is_valid());
	/// assert_eq!(form.cleaned_data()["name"], serde_json::json!("joe"));
	/// ```
	pub fn is_valid(&mut self) -> bool {
		if !self.is_bound {
			return false;
		}

		self.errors.clear();
		self.cleaned.clear();

		for field in self.schema.fields() {
			match field.clean(&self.data) {
				Ok(value) => {
					self.cleaned.insert(field.name.clone(), value);
				}
				Err(e) => {
					self.errors
						.entry(field.name.clone())
						.or_default()
						.push(e.to_string());
				}
			}
		}

		self.errors.is_empty()
	}

	pub fn cleaned_data(&self) -> &HashMap<String, serde_json::Value> {
		&self.cleaned
	}

	pub fn errors(&self) -> &HashMap<String, Vec<String>> {
		&self.errors
	}

	pub fn schema(&self) -> &FormSchema {
		&self.schema
	}

	pub fn initial(&self) -> &HashMap<String, serde_json::Value> {
		&self.initial
	}

	pub fn data(&self) -> &FormData {
		&self.data
	}

	/// The canonical value of one field, used for fingerprinting and for
	/// hidden re-submission on the preview page.
	///
	/// Uses the cleaned value when validation has produced one; otherwise
	/// cleans on the fly, falling back to the whitespace-stripped raw text
	/// when cleaning fails. An unbound form canonicalizes as an empty
	/// submission, so two pristine forms over the same schema agree.
	pub(crate) fn canonical_value(&self, field: &FieldSpec) -> serde_json::Value {
		if let Some(value) = self.cleaned.get(&field.name) {
			return value.clone();
		}
		field.clean(&self.data).unwrap_or_else(|_| {
			serde_json::Value::String(
				self.data
					.get(&field.name)
					.map(str::trim)
					.unwrap_or("")
					.to_string(),
			)
		})
	}

	/// The value a widget should display: bound data when bound, initial
	/// data otherwise.
	pub(crate) fn display_value(&self, name: &str) -> Option<serde_json::Value> {
		if self.is_bound {
			self.data
				.get(name)
				.map(|v| serde_json::Value::String(v.to_string()))
		} else {
			self.initial.get(name).cloned()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::FieldSpec;
	use serde_json::json;

	fn schema() -> FormSchema {
		FormSchema::new()
			.with_field(FieldSpec::text("name"))
			.with_field(FieldSpec::boolean("subscribed").optional())
	}

	#[test]
	fn test_form_validation() {
		let mut form = Form::new(schema());

		let mut data = FormData::new();
		data.insert("name", "John Doe");
		form.bind(data);

		assert!(form.is_valid());
		assert!(form.errors().is_empty());
		assert_eq!(form.cleaned_data()["name"], json!("John Doe"));
		assert_eq!(form.cleaned_data()["subscribed"], json!(false));
	}

	#[test]
	fn test_form_validation_error() {
		let mut form = Form::new(schema());

		form.bind(FormData::new());

		assert!(!form.is_valid());
		assert!(form.errors().contains_key("name"));
		assert!(!form.errors().contains_key("subscribed"));
	}

	#[test]
	fn test_form_unbound_is_never_valid() {
		let mut form = Form::new(schema());

		assert!(!form.is_bound());
		assert!(!form.is_valid());
	}

	#[test]
	fn test_form_extra_data_is_ignored() {
		let mut form = Form::new(schema());

		let mut data = FormData::new();
		data.insert("name", "joe");
		data.insert("stage", "2");
		form.bind(data);

		assert!(form.is_valid());
		assert!(!form.cleaned_data().contains_key("stage"));
	}

	#[test]
	fn test_rebinding_clears_previous_state() {
		let mut form = Form::new(schema());

		form.bind(FormData::new());
		assert!(!form.is_valid());

		let mut data = FormData::new();
		data.insert("name", "joe");
		form.bind(data);

		assert!(form.is_valid());
		assert!(form.errors().is_empty());
	}

	#[test]
	fn test_canonical_value_falls_back_to_stripped_raw_text() {
		let field = FieldSpec::text("name");
		let mut form = Form::new(FormSchema::new().with_field(field.clone()));

		// Required field left blank: cleaning fails, the canonical value
		// degrades to the stripped raw text.
		let mut data = FormData::new();
		data.insert("name", "   ");
		form.bind(data);

		assert_eq!(form.canonical_value(&field), json!(""));
	}

	#[test]
	fn test_display_value_prefers_bound_data() {
		let mut initial = HashMap::new();
		initial.insert("name".to_string(), json!("Initial"));
		let mut form = Form::with_initial(schema(), initial);

		assert_eq!(form.display_value("name"), Some(json!("Initial")));

		let mut data = FormData::new();
		data.insert("name", "Submitted");
		form.bind(data);

		assert_eq!(form.display_value("name"), Some(json!("Submitted")));
	}
}
