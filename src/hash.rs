//! Security-hash fingerprinting
//!
//! A fingerprint binds the form state a user previewed to the submission
//! that later confirms it. It is an HMAC-SHA256 over the canonicalized
//! field values, keyed with a deployment secret, so it cannot be forged
//! without the key and it survives the render/submit round trip:
//! whitespace padding, relation iteration order and prefetch state never
//! change it, while any change to field values or uploaded file content
//! does.

use crate::form::Form;
use crate::schema::FieldKind;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum SecretKeyError {
	#[error("secret key must not be empty")]
	Empty,
	#[error("environment variable {0} is not set or empty")]
	MissingEnv(String),
}

/// Deployment-wide secret key for fingerprinting.
///
/// The key is configuration-supplied and validated at startup; an empty
/// key is a fatal configuration error, never a per-request condition.
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
	/// Create a key, rejecting empty input
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_formtools::SecretKey;
	///
	/// assert!(SecretKey::new("a-long-deployment-secret").is_ok());
	/// assert!(SecretKey::new("").is_err());
	/// ```
	pub fn new(key: impl Into<String>) -> Result<Self, SecretKeyError> {
		let key = key.into();
		if key.is_empty() {
			return Err(SecretKeyError::Empty);
		}
		Ok(Self(key))
	}

	/// Read the key from an environment variable
	pub fn from_env(var: &str) -> Result<Self, SecretKeyError> {
		match std::env::var(var) {
			Ok(value) if !value.is_empty() => Ok(Self(value)),
			_ => Err(SecretKeyError::MissingEnv(var.to_string())),
		}
	}

	fn as_bytes(&self) -> &[u8] {
		self.0.as_bytes()
	}
}

impl std::fmt::Debug for SecretKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		// Never print the key material.
		f.write_str("SecretKey(..)")
	}
}

/// Calculate the fingerprint of a form's submission.
///
/// Walks the schema in declaration order and feeds each field's name,
/// kind tag and canonical value into the keyed digest as length-prefixed
/// frames. Works on bound forms whether or not they have been validated;
/// an unbound form fingerprints as an empty submission.
///
/// # Examples
///
/// ```
/// use reinhardt_formtools::{FieldSpec, Form, FormData, FormSchema, SecretKey, form_hmac};
///
/// let key = SecretKey::new("secret").unwrap();
/// let schema = FormSchema::new().with_field(FieldSpec::text("name"));
///
/// let mut first = Form::new(schema.clone());
/// let mut data = FormData::new();
/// data.insert("name", "joe");
/// first.bind(data);
///
/// let mut second = Form::new(schema);
/// let mut data = FormData::new();
/// data.insert("name", "  joe  ");
/// second.bind(data);
///
/// assert_eq!(form_hmac(&key, &first), form_hmac(&key, &second));
/// ```
pub fn form_hmac(key: &SecretKey, form: &Form) -> String {
	let mut mac = HmacSha256::new_from_slice(key.as_bytes())
		.expect("HMAC accepts keys of any length");

	for field in form.schema().fields() {
		let value = form.canonical_value(field);
		update_frame(&mut mac, field.name.as_bytes());
		mac.update(&[kind_tag(&field.kind)]);
		update_frame(&mut mac, &canonical_bytes(&field.kind, &value));
	}

	let digest = mac.finalize().into_bytes();
	digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Constant-time string equality for fingerprint comparison
///
/// # Examples
///
/// ```
/// use reinhardt_formtools::constant_time_compare;
///
/// assert!(constant_time_compare("abc", "abc"));
/// assert!(!constant_time_compare("abc", "abd"));
/// assert!(!constant_time_compare("abc", "abcd"));
/// ```
pub fn constant_time_compare(a: &str, b: &str) -> bool {
	a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// SHA-256 checksum of a byte buffer as a 64-char hex string
///
/// # Examples
///
/// ```
/// use reinhardt_formtools::sha256_hex;
///
/// assert_eq!(sha256_hex(b"test data").len(), 64);
/// ```
pub fn sha256_hex(content: &[u8]) -> String {
	let mut hasher = Sha256::new();
	hasher.update(content);
	hasher
		.finalize()
		.iter()
		.map(|b| format!("{:02x}", b))
		.collect()
}

/// Write one length-prefixed frame so adjacent fields can never be
/// confused for one another.
fn update_frame(mac: &mut HmacSha256, bytes: &[u8]) {
	mac.update(&(bytes.len() as u64).to_le_bytes());
	mac.update(bytes);
}

fn kind_tag(kind: &FieldKind) -> u8 {
	match kind {
		FieldKind::Text => b't',
		FieldKind::Boolean => b'b',
		FieldKind::Date => b'd',
		FieldKind::File => b'f',
		FieldKind::ManyRelation { .. } => b'm',
	}
}

/// Reduce a canonical cleaned value to the bytes that enter the digest.
///
/// Values that failed cleaning arrive as raw strings and are hashed as
/// stripped text, so a fingerprint can always be computed.
fn canonical_bytes(kind: &FieldKind, value: &serde_json::Value) -> Vec<u8> {
	match kind {
		FieldKind::Text => value.as_str().unwrap_or("").trim().as_bytes().to_vec(),
		FieldKind::Boolean => match value.as_bool() {
			Some(true) => b"true".to_vec(),
			Some(false) => b"false".to_vec(),
			None => {
				if crate::schema::parse_boolean(value.as_str()) {
					b"true".to_vec()
				} else {
					b"false".to_vec()
				}
			}
		},
		FieldKind::Date => value.as_str().unwrap_or("").trim().as_bytes().to_vec(),
		FieldKind::File => match value.as_object() {
			Some(info) => format!(
				"{}:{}",
				info.get("filename").and_then(|v| v.as_str()).unwrap_or(""),
				info.get("sha256").and_then(|v| v.as_str()).unwrap_or(""),
			)
			.into_bytes(),
			None => Vec::new(),
		},
		FieldKind::ManyRelation { .. } => match value.as_array() {
			Some(ids) => ids
				.iter()
				.filter_map(|v| v.as_i64())
				.map(|id| id.to_string())
				.collect::<Vec<_>>()
				.join(",")
				.into_bytes(),
			None => value.as_str().unwrap_or("").trim().as_bytes().to_vec(),
		},
	}
}
