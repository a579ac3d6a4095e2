//! Outbound response surface
//!
//! Responses carry a rendered body plus the template context computed for
//! the stage, so a host template layer can re-render the same data with
//! its own templates instead of the built-in HTML.

use bytes::Bytes;
use http::StatusCode;
use std::borrow::Cow;
use std::collections::HashMap;

/// Template context attached to a rendered stage
pub type Context = HashMap<String, serde_json::Value>;

/// HTTP response produced by the preview workflow
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub content_type: String,
	pub body: Bytes,
	pub context: Context,
}

impl Response {
	/// An HTML response with HTTP 200 OK status
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::Response;
	/// use http::StatusCode;
	///
	/// let response = Response::html("<p>hello</p>");
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert_eq!(response.body_str(), "<p>hello</p>");
	/// ```
	pub fn html(body: impl Into<String>) -> Self {
		Self {
			status: StatusCode::OK,
			content_type: "text/html; charset=utf-8".to_string(),
			body: Bytes::from(body.into()),
			context: Context::new(),
		}
	}

	/// A plain-text response with HTTP 200 OK status
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::Response;
	///
	/// let response = Response::text("Done was called!");
	/// assert_eq!(response.content_type, "text/plain; charset=utf-8");
	/// ```
	pub fn text(body: impl Into<String>) -> Self {
		Self {
			status: StatusCode::OK,
			content_type: "text/plain; charset=utf-8".to_string(),
			body: Bytes::from(body.into()),
			context: Context::new(),
		}
	}

	/// Override the status code
	pub fn with_status(mut self, status: StatusCode) -> Self {
		self.status = status;
		self
	}

	/// Attach a template context
	pub fn with_context(mut self, context: Context) -> Self {
		self.context = context;
		self
	}

	/// The body as text, for inspection and tests
	pub fn body_str(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}
