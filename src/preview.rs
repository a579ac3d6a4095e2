//! Form preview workflow
//!
//! A three-stage confirmation flow carried entirely in hidden form fields:
//! show the form, show a preview of the submitted data, and only invoke
//! the completion action once the user re-confirms with a matching
//! security hash. No server-side state survives between requests; the
//! stage indicator and the hash travel with the submission itself.

use crate::form::Form;
use crate::hash::{SecretKey, constant_time_compare, form_hmac};
use crate::render;
use crate::request::PreviewRequest;
use crate::response::{Context, Response};
use crate::schema::FormSchema;
use std::collections::HashMap;

/// Per-request auxiliary state captured by [`PreviewHandler::parse_params`]
pub type State = HashMap<String, serde_json::Value>;

/// Position in the preview workflow.
///
/// The inbound hidden field names the stage the current request
/// represents; anything missing or out of range reads as [`Stage::Initial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Initial,
	Preview,
	Confirmed,
}

impl Stage {
	/// The wire value of this stage
	pub fn number(self) -> u8 {
		match self {
			Self::Initial => 1,
			Self::Preview => 2,
			Self::Confirmed => 3,
		}
	}

	/// Read a stage from a submitted hidden-field value
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::Stage;
	///
	/// assert_eq!(Stage::from_field(Some("2")), Stage::Preview);
	/// assert_eq!(Stage::from_field(Some("3")), Stage::Confirmed);
	/// assert_eq!(Stage::from_field(Some("7")), Stage::Initial);
	/// assert_eq!(Stage::from_field(None), Stage::Initial);
	/// ```
	pub fn from_field(value: Option<&str>) -> Self {
		match value.map(str::trim) {
			Some("2") => Self::Preview,
			Some("3") => Self::Confirmed,
			_ => Self::Initial,
		}
	}

	/// The stage to embed for the following submission
	pub fn next(self) -> Self {
		match self {
			Self::Initial => Self::Preview,
			Self::Preview | Self::Confirmed => Self::Confirmed,
		}
	}
}

/// Strategy object supplying the application-specific pieces of the
/// workflow.
///
/// `done` is the completion action and runs at most once per correctly
/// confirmed submission. The remaining hooks have no-op defaults:
/// `parse_params` runs before any stage logic and may capture per-request
/// state, `get_initial` seeds the stage-1 form, and `get_context` can add
/// entries to the template context of any rendered stage.
pub trait PreviewHandler: Send + Sync {
	/// Completion action; its return value is passed through unchanged.
	fn done(
		&self,
		request: &PreviewRequest,
		state: &State,
		cleaned_data: &HashMap<String, serde_json::Value>,
	) -> Response;

	/// Capture auxiliary per-request state before any stage logic runs
	fn parse_params(&self, _request: &PreviewRequest, _state: &mut State) {}

	/// Initial field values for the stage-1 form
	fn get_initial(&self, _request: &PreviewRequest) -> HashMap<String, serde_json::Value> {
		HashMap::new()
	}

	/// Inject extra data into the context of any rendered stage
	fn get_context(&self, _request: &PreviewRequest, _context: &mut Context) {}
}

/// The stage controller: one instance per form route.
///
/// Stateless across requests apart from the schema, the secret key and
/// the reserved control-field names, all fixed at construction.
pub struct FormPreview {
	schema: FormSchema,
	secret: SecretKey,
	handler: Box<dyn PreviewHandler>,
	stage_field: String,
	hash_field: String,
}

impl FormPreview {
	/// Create a preview controller for a form schema.
	///
	/// The two reserved control fields are named `stage` and `hash`,
	/// mangled with trailing underscores until they collide with no
	/// declared field.
	pub fn new(schema: FormSchema, secret: SecretKey, handler: Box<dyn PreviewHandler>) -> Self {
		let stage_field = unused_name(&schema, "stage");
		let hash_field = unused_name(&schema, "hash");
		Self {
			schema,
			secret,
			handler,
			stage_field,
			hash_field,
		}
	}

	/// A name guaranteed not to collide with any declared field
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::{FieldSpec, FormPreview, FormSchema, PreviewHandler, SecretKey};
	/// # use reinhardt_formtools::{PreviewRequest, Response, State};
	/// # use std::collections::HashMap;
	/// # struct Noop;
	/// # impl PreviewHandler for Noop {
	/// #     fn done(
	/// #         &self,
	/// #         _request: &PreviewRequest,
	/// #         _state: &State,
	/// #         _cleaned: &HashMap<String, serde_json::Value>,
	/// #     ) -> Response {
	/// #         Response::text("ok")
	/// #     }
	/// # }
	///
	/// let schema = FormSchema::new()
	///     .with_field(FieldSpec::text("field1"))
	///     .with_field(FieldSpec::text("field1_"));
	/// let preview = FormPreview::new(
	///     schema,
	///     SecretKey::new("secret").unwrap(),
	///     Box::new(Noop),
	/// );
	///
	/// assert_eq!(preview.unused_name("field1"), "field1__");
	/// assert_eq!(preview.unused_name("other"), "other");
	/// ```
	pub fn unused_name(&self, name: &str) -> String {
		unused_name(&self.schema, name)
	}

	/// Name of the hidden stage-indicator field
	pub fn stage_field(&self) -> &str {
		&self.stage_field
	}

	/// Name of the hidden security-hash field
	pub fn hash_field(&self) -> &str {
		&self.hash_field
	}

	/// The fingerprint of a form's submission under this controller's key
	pub fn security_hash(&self, form: &Form) -> String {
		form_hmac(&self.secret, form)
	}

	/// Handle one request: dispatch on the submitted stage indicator.
	pub fn handle(&self, request: &PreviewRequest) -> Response {
		let mut state = State::new();
		self.handler.parse_params(request, &mut state);

		// Stages 2 and 3 only exist for POST; anything else renders the form.
		let stage = if request.method() == &http::Method::POST {
			Stage::from_field(request.data().get(&self.stage_field))
		} else {
			Stage::Initial
		};
		tracing::debug!("dispatching preview request at stage {}", stage.number());
		match stage {
			Stage::Initial => self.preview_get(request, &state),
			Stage::Preview => self.preview_post(request, &state),
			Stage::Confirmed => self.post_post(request, &state),
		}
	}

	/// Stage 1: display the form, seeded with handler-supplied initial
	/// values. No validation happens here.
	fn preview_get(&self, request: &PreviewRequest, state: &State) -> Response {
		let form = Form::with_initial(self.schema.clone(), self.handler.get_initial(request));
		let context = self.base_context(request, &form, Stage::Initial, state);
		Response::html(render::form_page(&form, &self.stage_field)).with_context(context)
	}

	/// Stage 2: validate the submission. Valid data gets a preview page
	/// carrying the fingerprint; invalid data re-renders the form.
	fn preview_post(&self, request: &PreviewRequest, state: &State) -> Response {
		let mut form = Form::new(self.schema.clone());
		form.bind(request.data().clone());

		if !form.is_valid() {
			return self.failed_validation(request, form, state);
		}

		let hash_value = form_hmac(&self.secret, &form);
		let mut context = self.base_context(request, &form, Stage::Preview, state);
		context.insert(
			"hash_field".to_string(),
			serde_json::Value::String(self.hash_field.clone()),
		);
		context.insert(
			"hash_value".to_string(),
			serde_json::Value::String(hash_value.clone()),
		);
		Response::html(render::preview_page(
			&form,
			&self.stage_field,
			&self.hash_field,
			&hash_value,
		))
		.with_context(context)
	}

	/// Stage 3: re-validate, recompute the fingerprint over the current
	/// submission and compare it against the submitted one. Only a match
	/// invokes the completion action.
	fn post_post(&self, request: &PreviewRequest, state: &State) -> Response {
		let mut form = Form::new(self.schema.clone());
		form.bind(request.data().clone());

		if !form.is_valid() {
			return self.failed_validation(request, form, state);
		}

		let submitted = request.data().get(&self.hash_field).unwrap_or("");
		let expected = form_hmac(&self.secret, &form);
		if !constant_time_compare(submitted, &expected) {
			return self.failed_hash(request, state);
		}

		self.handler.done(request, state, form.cleaned_data())
	}

	/// Recoverable validation failure: re-render the form with errors so
	/// the user can correct and resubmit.
	fn failed_validation(&self, request: &PreviewRequest, form: Form, state: &State) -> Response {
		let context = self.base_context(request, &form, Stage::Initial, state);
		Response::html(render::form_page(&form, &self.stage_field)).with_context(context)
	}

	/// Security failure: the submitted hash is missing, malformed or does
	/// not match. Restart at stage 1 exactly as if the process were
	/// starting over, without revealing which check failed.
	fn failed_hash(&self, request: &PreviewRequest, state: &State) -> Response {
		tracing::warn!(
			"security hash check failed for field {}, restarting at stage 1",
			self.hash_field
		);
		self.preview_get(request, state)
	}

	fn base_context(
		&self,
		request: &PreviewRequest,
		form: &Form,
		stage: Stage,
		state: &State,
	) -> Context {
		let mut context = Context::new();
		context.insert(
			"stage_field".to_string(),
			serde_json::Value::String(self.stage_field.clone()),
		);
		context.insert(
			"stage".to_string(),
			serde_json::Value::from(stage.number()),
		);
		context.insert(
			"state".to_string(),
			serde_json::Value::Object(state.clone().into_iter().collect()),
		);
		context.insert(
			"errors".to_string(),
			serde_json::to_value(form.errors()).unwrap_or_default(),
		);
		self.handler.get_context(request, &mut context);
		context
	}
}

fn unused_name(schema: &FormSchema, name: &str) -> String {
	let mut candidate = name.to_string();
	while schema.contains(&candidate) {
		candidate.push('_');
	}
	candidate
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::FieldSpec;
	use rstest::rstest;

	#[rstest]
	#[case(None, Stage::Initial)]
	#[case(Some(""), Stage::Initial)]
	#[case(Some("1"), Stage::Initial)]
	#[case(Some("2"), Stage::Preview)]
	#[case(Some(" 2 "), Stage::Preview)]
	#[case(Some("3"), Stage::Confirmed)]
	#[case(Some("4"), Stage::Initial)]
	#[case(Some("banana"), Stage::Initial)]
	fn test_stage_from_field(#[case] value: Option<&str>, #[case] expected: Stage) {
		assert_eq!(Stage::from_field(value), expected);
	}

	#[test]
	fn test_stage_numbers_and_next() {
		assert_eq!(Stage::Initial.number(), 1);
		assert_eq!(Stage::Preview.number(), 2);
		assert_eq!(Stage::Confirmed.number(), 3);

		assert_eq!(Stage::Initial.next(), Stage::Preview);
		assert_eq!(Stage::Preview.next(), Stage::Confirmed);
		assert_eq!(Stage::Confirmed.next(), Stage::Confirmed);
	}

	#[test]
	fn test_unused_name_mangling() {
		let schema = FormSchema::new()
			.with_field(FieldSpec::text("field1"))
			.with_field(FieldSpec::text("field1_"));

		assert_eq!(unused_name(&schema, "field1"), "field1__");
		assert_eq!(unused_name(&schema, "stage"), "stage");
	}
}
