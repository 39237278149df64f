//! Strict decoding of untyped JSON into validated domain values.
//!
//! A [`Decodable`] type either produces a fully populated value or a
//! [`DecodeError`] naming the field that failed. There is no coercion and no
//! default substitution: a numeric string is not an integer, `null` is not a
//! string, and a broken nested object breaks its parent.

use serde_json::{Map, Value};
use std::fmt;

/// A raw JSON object as delivered by the API.
pub type JsonObject = Map<String, Value>;

/// Types that can be built from a JSON object.
pub trait Decodable: Sized {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError>;

  /// Decode from any JSON value, requiring it to be an object.
  fn decode_value(value: &Value) -> Result<Self, DecodeError> {
    match value {
      Value::Object(json) => Self::decode(json),
      other => Err(DecodeError::mistyped("object", other)),
    }
  }
}

/// Decode a JSON array of objects, preserving source order.
///
/// All-or-nothing: the first element that fails to decode fails the whole
/// list, so a decoded list is always fully validated.
pub fn decode_list<T: Decodable>(value: &Value) -> Result<Vec<T>, DecodeError> {
  let items = match value {
    Value::Array(items) => items,
    other => return Err(DecodeError::mistyped("array", other)),
  };

  items
    .iter()
    .enumerate()
    .map(|(index, item)| T::decode_value(item).map_err(|e| e.at_index(index)))
    .collect()
}

/// Parse a response body as JSON.
pub fn parse_json(body: &[u8]) -> Result<Value, DecodeError> {
  serde_json::from_slice(body)
    .map_err(|e| DecodeError::new(DecodeErrorKind::Malformed(e.to_string())))
}

/// Typed accessors over a JSON object, each failing with the field's path.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
  json: &'a JsonObject,
}

impl<'a> Fields<'a> {
  pub fn new(json: &'a JsonObject) -> Self {
    Self { json }
  }

  fn require(&self, key: &str) -> Result<&'a Value, DecodeError> {
    self
      .json
      .get(key)
      .ok_or_else(|| DecodeError::new(DecodeErrorKind::Missing).within(key))
  }

  /// A non-negative JSON integer.
  pub fn uint(&self, key: &str) -> Result<u64, DecodeError> {
    let value = self.require(key)?;
    value
      .as_u64()
      .ok_or_else(|| DecodeError::mistyped("unsigned integer", value).within(key))
  }

  pub fn string(&self, key: &str) -> Result<String, DecodeError> {
    match self.require(key)? {
      Value::String(s) => Ok(s.clone()),
      other => Err(DecodeError::mistyped("string", other).within(key)),
    }
  }

  pub fn bool(&self, key: &str) -> Result<bool, DecodeError> {
    match self.require(key)? {
      Value::Bool(b) => Ok(*b),
      other => Err(DecodeError::mistyped("boolean", other).within(key)),
    }
  }

  /// A nested object decoded through its own contract.
  pub fn object<T: Decodable>(&self, key: &str) -> Result<T, DecodeError> {
    T::decode_value(self.require(key)?).map_err(|e| e.within(key))
  }
}

/// Name of a JSON value's type, as used in error messages.
fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(n) if n.is_u64() => "unsigned integer",
    Value::Number(n) if n.is_i64() => "integer",
    Value::Number(_) => "float",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// One step in the path to a failing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
  Field(String),
  Index(usize),
}

/// Location of a decode failure, outermost segment first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodePath(Vec<PathSegment>);

impl DecodePath {
  pub fn segments(&self) -> &[PathSegment] {
    &self.0
  }

  pub fn is_root(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Display for DecodePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.0.is_empty() {
      return f.write_str("<root>");
    }
    for (i, segment) in self.0.iter().enumerate() {
      match segment {
        PathSegment::Field(name) if i == 0 => write!(f, "{}", name)?,
        PathSegment::Field(name) => write!(f, ".{}", name)?,
        PathSegment::Index(index) => write!(f, "[{}]", index)?,
      }
    }
    Ok(())
  }
}

/// What went wrong at the failing path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeErrorKind {
  #[error("missing required field")]
  Missing,
  #[error("expected {expected}, found {found}")]
  Mistyped {
    expected: &'static str,
    found: &'static str,
  },
  #[error("malformed JSON: {0}")]
  Malformed(String),
  #[error("payload is not a recognised image format")]
  UnknownImageFormat,
}

/// A payload that did not satisfy the decode contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("decode failed at `{path}`: {kind}")]
pub struct DecodeError {
  path: DecodePath,
  kind: DecodeErrorKind,
}

impl DecodeError {
  pub fn new(kind: DecodeErrorKind) -> Self {
    Self {
      path: DecodePath::default(),
      kind,
    }
  }

  pub fn mistyped(expected: &'static str, found: &Value) -> Self {
    Self::new(DecodeErrorKind::Mistyped {
      expected,
      found: json_kind(found),
    })
  }

  /// Prefix the path with the field this error occurred under.
  pub fn within(mut self, field: &str) -> Self {
    self.path.0.insert(0, PathSegment::Field(field.to_string()));
    self
  }

  /// Prefix the path with the array index this error occurred at.
  pub fn at_index(mut self, index: usize) -> Self {
    self.path.0.insert(0, PathSegment::Index(index));
    self
  }

  pub fn path(&self) -> &DecodePath {
    &self.path
  }

  pub fn kind(&self) -> &DecodeErrorKind {
    &self.kind
  }
}
