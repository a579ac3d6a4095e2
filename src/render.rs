//! Default HTML rendering for the preview stages
//!
//! The host framework usually brings its own template layer; these
//! renderers produce a self-contained default so the workflow works out
//! of the box. Everything interpolated into markup goes through
//! [`escape_html`].

use crate::form::Form;
use crate::preview::Stage;
use crate::schema::{FieldKind, FieldSpec};

/// Escape a value for interpolation into HTML text or attributes
///
/// # Examples
///
/// ```
/// use reinhardt_formtools::render::escape_html;
///
/// assert_eq!(escape_html("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
/// ```
pub fn escape_html(value: &str) -> String {
	value
		.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
		.replace('\'', "&#x27;")
}

/// Render a hidden input field
///
/// # Examples
///
/// ```
/// use reinhardt_formtools::render::hidden_input;
///
/// assert_eq!(
///     hidden_input("stage", "2"),
///     r#"<input type="hidden" name="stage" value="2" />"#
/// );
/// ```
pub fn hidden_input(name: &str, value: &str) -> String {
	format!(
		r#"<input type="hidden" name="{}" value="{}" />"#,
		escape_html(name),
		escape_html(value)
	)
}

/// Render the editable form page.
///
/// The stage hidden field always embeds the preview stage: whatever the
/// user submits next is the stage-2 validation post.
pub(crate) fn form_page(form: &Form, stage_field: &str) -> String {
	let mut html = String::new();
	html.push_str("<form method=\"post\" enctype=\"multipart/form-data\">\n");

	for field in form.schema().fields() {
		if let Some(errors) = form.errors().get(&field.name) {
			html.push_str("<ul class=\"errorlist\">");
			for error in errors {
				html.push_str(&format!("<li>{}</li>", escape_html(error)));
			}
			html.push_str("</ul>\n");
		}
		html.push_str(&format!(
			"<p><label for=\"id_{}\">{}:</label> {}</p>\n",
			escape_html(&field.name),
			escape_html(field.label.as_deref().unwrap_or(&field.name)),
			widget_html(form, field)
		));
	}

	html.push_str(&hidden_input(
		stage_field,
		&Stage::Preview.number().to_string(),
	));
	html.push_str("\n<input type=\"submit\" value=\"Submit\" />\n</form>\n");
	html
}

/// Render the preview page: a read-only review of the cleaned values plus
/// the hidden re-submission that carries them, the confirmed-stage
/// indicator and the security hash, into the final post.
pub(crate) fn preview_page(
	form: &Form,
	stage_field: &str,
	hash_field: &str,
	hash_value: &str,
) -> String {
	let mut html = String::new();
	html.push_str("<h1>Please review your submission</h1>\n<table>\n");

	for field in form.schema().fields() {
		let value = form.canonical_value(field);
		html.push_str(&format!(
			"<tr><th>{}</th><td>{}</td></tr>\n",
			escape_html(field.label.as_deref().unwrap_or(&field.name)),
			escape_html(&review_text(field, &value))
		));
	}
	html.push_str("</table>\n<form method=\"post\">\n");

	for field in form.schema().fields() {
		let value = form.canonical_value(field);
		match &field.kind {
			FieldKind::Text | FieldKind::Date => {
				html.push_str(&hidden_input(
					&field.name,
					value.as_str().unwrap_or(""),
				));
				html.push('\n');
			}
			FieldKind::Boolean => {
				let rendered = if value.as_bool().unwrap_or(false) {
					"true"
				} else {
					"false"
				};
				html.push_str(&hidden_input(&field.name, rendered));
				html.push('\n');
			}
			FieldKind::ManyRelation { .. } => {
				for id in value.as_array().map(Vec::as_slice).unwrap_or(&[]) {
					if let Some(id) = id.as_i64() {
						html.push_str(&hidden_input(&field.name, &id.to_string()));
						html.push('\n');
					}
				}
			}
			// File content cannot travel through a hidden field; the hash
			// already covers it.
			FieldKind::File => {}
		}
	}

	html.push_str(&hidden_input(
		stage_field,
		&Stage::Confirmed.number().to_string(),
	));
	html.push('\n');
	html.push_str(&hidden_input(hash_field, hash_value));
	html.push_str("\n<input type=\"submit\" value=\"Confirm\" />\n</form>\n");
	html
}

fn widget_html(form: &Form, field: &FieldSpec) -> String {
	let name = escape_html(&field.name);
	match &field.kind {
		FieldKind::Text => format!(
			r#"<input type="text" name="{}" value="{}" id="id_{}" />"#,
			name,
			escape_html(&display_text(form, &field.name)),
			name
		),
		FieldKind::Boolean => format!(
			r#"<input type="checkbox" name="{}" id="id_{}"{} />"#,
			name,
			name,
			if display_bool(form, &field.name) {
				" checked"
			} else {
				""
			}
		),
		FieldKind::Date => format!(
			r#"<input type="date" name="{}" value="{}" id="id_{}" />"#,
			name,
			escape_html(&display_text(form, &field.name)),
			name
		),
		FieldKind::File => format!(
			r#"<input type="file" name="{}" id="id_{}" />"#,
			name, name
		),
		FieldKind::ManyRelation { choices } => {
			let selected = selected_ids(form, &field.name);
			let mut html = format!(
				r#"<select multiple name="{}" id="id_{}">"#,
				name, name
			);
			for (id, label) in choices {
				html.push_str(&format!(
					r#"<option value="{}"{}>{}</option>"#,
					id,
					if selected.contains(id) { " selected" } else { "" },
					escape_html(label)
				));
			}
			html.push_str("</select>");
			html
		}
	}
}

fn review_text(field: &FieldSpec, value: &serde_json::Value) -> String {
	match &field.kind {
		FieldKind::Text | FieldKind::Date => value.as_str().unwrap_or("").to_string(),
		FieldKind::Boolean => {
			if value.as_bool().unwrap_or(false) {
				"true".to_string()
			} else {
				"false".to_string()
			}
		}
		FieldKind::File => match value.as_object() {
			Some(info) => format!(
				"{} ({} bytes)",
				info.get("filename").and_then(|v| v.as_str()).unwrap_or(""),
				info.get("size").and_then(|v| v.as_u64()).unwrap_or(0)
			),
			None => "(none)".to_string(),
		},
		FieldKind::ManyRelation { choices } => {
			let labels: Vec<&str> = value
				.as_array()
				.map(Vec::as_slice)
				.unwrap_or(&[])
				.iter()
				.filter_map(|id| id.as_i64())
				.filter_map(|id| {
					choices
						.iter()
						.find(|(pk, _)| *pk == id)
						.map(|(_, label)| label.as_str())
				})
				.collect();
			labels.join(", ")
		}
	}
}

fn display_text(form: &Form, name: &str) -> String {
	match form.display_value(name) {
		Some(serde_json::Value::String(s)) => s,
		Some(value) => value.to_string(),
		None => String::new(),
	}
}

fn display_bool(form: &Form, name: &str) -> bool {
	if form.is_bound() {
		crate::schema::parse_boolean(form.data().get(name))
	} else {
		match form.initial().get(name) {
			Some(serde_json::Value::Bool(b)) => *b,
			Some(serde_json::Value::String(s)) => crate::schema::parse_boolean(Some(s)),
			_ => false,
		}
	}
}

fn selected_ids(form: &Form, name: &str) -> Vec<i64> {
	if form.is_bound() {
		form.data()
			.getlist(name)
			.iter()
			.filter_map(|raw| raw.trim().parse().ok())
			.collect()
	} else {
		form.initial()
			.get(name)
			.and_then(|v| v.as_array())
			.map(|ids| ids.iter().filter_map(|id| id.as_i64()).collect())
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::form::Form;
	use crate::request::FormData;
	use crate::schema::{FieldSpec, FormSchema};

	#[test]
	fn test_escape_html() {
		assert_eq!(escape_html("plain"), "plain");
		assert_eq!(
			escape_html(r#"<script>alert('&')</script>"#),
			"&lt;script&gt;alert(&#x27;&amp;&#x27;)&lt;/script&gt;"
		);
	}

	#[test]
	fn test_hidden_input_escapes_value() {
		assert_eq!(
			hidden_input("field", r#"a"b"#),
			r#"<input type="hidden" name="field" value="a&quot;b" />"#
		);
	}

	#[test]
	fn test_form_page_embeds_preview_stage() {
		let schema = FormSchema::new().with_field(FieldSpec::text("name"));
		let form = Form::new(schema);

		let html = form_page(&form, "stage");
		assert!(html.contains(r#"<input type="hidden" name="stage" value="2" />"#));
		assert!(html.contains(r#"<input type="text" name="name""#));
	}

	#[test]
	fn test_form_page_shows_field_errors() {
		let schema = FormSchema::new().with_field(FieldSpec::text("name"));
		let mut form = Form::new(schema);
		form.bind(FormData::new());
		assert!(!form.is_valid());

		let html = form_page(&form, "stage");
		assert!(html.contains("errorlist"));
		assert!(html.contains("This field is required."));
	}

	#[test]
	fn test_checkbox_reflects_bound_state() {
		let schema = FormSchema::new().with_field(FieldSpec::boolean("bool1").optional());

		let mut checked = Form::new(schema.clone());
		let mut data = FormData::new();
		data.insert("bool1", "on");
		checked.bind(data);
		assert!(form_page(&checked, "stage").contains(" checked"));

		let mut unchecked = Form::new(schema);
		unchecked.bind(FormData::new());
		assert!(!form_page(&unchecked, "stage").contains(" checked"));
	}

	#[test]
	fn test_preview_page_resubmits_canonical_values() {
		let schema = FormSchema::new()
			.with_field(FieldSpec::text("name"))
			.with_field(FieldSpec::boolean("bool1").optional())
			.with_field(FieldSpec::many_relation(
				"tags",
				vec![(1, "a".into()), (2, "b".into())],
			));

		let mut form = Form::new(schema);
		let mut data = FormData::new();
		data.insert("name", "  joe  ");
		data.append("tags", "2");
		data.append("tags", "1");
		form.bind(data);
		assert!(form.is_valid());

		let html = preview_page(&form, "stage", "hash", "abc123");
		assert!(html.contains(r#"<input type="hidden" name="name" value="joe" />"#));
		assert!(html.contains(r#"<input type="hidden" name="bool1" value="false" />"#));
		assert!(html.contains(r#"<input type="hidden" name="tags" value="1" />"#));
		assert!(html.contains(r#"<input type="hidden" name="tags" value="2" />"#));
		assert!(html.contains(r#"<input type="hidden" name="stage" value="3" />"#));
		assert!(html.contains(r#"<input type="hidden" name="hash" value="abc123" />"#));
	}

	#[test]
	fn test_select_marks_selected_options() {
		let schema = FormSchema::new().with_field(FieldSpec::many_relation(
			"tags",
			vec![(1, "rust".into()), (2, "web".into())],
		));

		let mut form = Form::new(schema);
		let mut data = FormData::new();
		data.append("tags", "2");
		form.bind(data);

		let html = form_page(&form, "stage");
		assert!(html.contains(r#"<option value="2" selected>web</option>"#));
		assert!(html.contains(r#"<option value="1">rust</option>"#));
	}
}
