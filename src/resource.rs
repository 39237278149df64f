//! Declarative descriptions of "fetch this address, decode it as `T`".

use bytes::Bytes;
use image::ImageFormat;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::decode::{decode_list, parse_json, Decodable, DecodeError, DecodeErrorKind};
use crate::route::Route;

type DecodeFn<T> = dyn Fn(&Bytes) -> Result<T, DecodeError> + Send + Sync;

/// A route bound to a decode strategy.
///
/// Resources are pure descriptions: building one performs no I/O. Cloning is
/// cheap. Two resources with the same route and the same target type share a
/// cache entry in [`Webservice`](crate::Webservice).
pub struct Resource<T> {
  route: Route,
  decode: Arc<DecodeFn<T>>,
}

impl<T: 'static> Resource<T> {
  /// Bind a route to a decoder over the raw response body.
  ///
  /// Results are cached by method, address and `T`. Two resources on one
  /// route that decode to the same `T` share a cache entry and an in-flight
  /// fetch, whatever their decoders do.
  pub fn new<F>(route: Route, decode: F) -> Self
  where
    F: Fn(&Bytes) -> Result<T, DecodeError> + Send + Sync + 'static,
  {
    Self {
      route,
      decode: Arc::new(decode),
    }
  }

  /// Bind a route to a decoder over the parsed JSON body.
  pub fn from_json<F>(route: Route, decode: F) -> Self
  where
    F: Fn(&Value) -> Result<T, DecodeError> + Send + Sync + 'static,
  {
    Self::new(route, move |body| decode(&parse_json(body)?))
  }

  pub fn route(&self) -> &Route {
    &self.route
  }

  /// Run the decode strategy over a response body.
  pub fn decode(&self, body: &Bytes) -> Result<T, DecodeError> {
    (self.decode)(body)
  }

  /// Derive a resource that transforms the decoded value.
  ///
  /// The derived resource keeps the route, so it is cached under `U`. Two
  /// different projections of one route to the same `U` are the same cache
  /// entry; wrap the output in a distinct type to keep them apart.
  pub fn map<U, F>(self, f: F) -> Resource<U>
  where
    U: 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
  {
    let decode = self.decode;
    Resource::new(self.route, move |body| decode(body).map(&f))
  }
}

impl<T: Decodable + 'static> Resource<T> {
  /// A single JSON object decoded as `T`.
  pub fn object(route: Route) -> Self {
    Self::from_json(route, T::decode_value)
  }
}

impl<T: Decodable + 'static> Resource<Vec<T>> {
  /// A JSON array decoded element by element, in source order.
  ///
  /// Any element failing to decode fails the whole resource; malformed
  /// elements are never silently dropped.
  pub fn list(route: Route) -> Self {
    Self::from_json(route, decode_list::<T>)
  }
}

impl Resource<Image> {
  /// A binary image payload, validated by its magic bytes only.
  pub fn image(route: Route) -> Self {
    Self::new(route, |body| Image::from_bytes(body.clone()))
  }
}

impl<T> Clone for Resource<T> {
  fn clone(&self) -> Self {
    Self {
      route: self.route.clone(),
      decode: Arc::clone(&self.decode),
    }
  }
}

impl<T> fmt::Debug for Resource<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Resource")
      .field("route", &self.route)
      .field("target", &std::any::type_name::<T>())
      .finish_non_exhaustive()
  }
}

/// Raw image bytes whose format has been recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
  bytes: Bytes,
  format: ImageFormat,
}

impl Image {
  pub fn from_bytes(bytes: Bytes) -> Result<Self, DecodeError> {
    let format = image::guess_format(&bytes)
      .map_err(|_| DecodeError::new(DecodeErrorKind::UnknownImageFormat))?;
    Ok(Self { bytes, format })
  }

  pub fn bytes(&self) -> &Bytes {
    &self.bytes
  }

  pub fn format(&self) -> ImageFormat {
    self.format
  }

  /// Conventional file extension for the detected format.
  pub fn extension(&self) -> &'static str {
    self.format.extensions_str().first().copied().unwrap_or("bin")
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decode::{Fields, JsonObject};

  #[derive(Debug, Clone, PartialEq)]
  struct Tag {
    id: u64,
    name: String,
  }

  impl Decodable for Tag {
    fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
      let f = Fields::new(json);
      Ok(Tag {
        id: f.uint("id")?,
        name: f.string("name")?,
      })
    }
  }

  const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

  #[test]
  fn test_object_resource() {
    let resource: Resource<Tag> = Resource::object(Route::item("tags", 1));
    let tag = resource
      .decode(&Bytes::from_static(br#"{"id": 1, "name": "x"}"#))
      .unwrap();
    assert_eq!(tag.name, "x");
  }

  #[test]
  fn test_list_resource_keeps_order() {
    let resource: Resource<Vec<Tag>> = Resource::list(Route::collection("tags"));
    let tags = resource
      .decode(&Bytes::from_static(
        br#"[{"id": 9, "name": "z"}, {"id": 3, "name": "c"}]"#,
      ))
      .unwrap();
    let ids: Vec<u64> = tags.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![9, 3]);
  }

  #[test]
  fn test_list_resource_fails_whole() {
    let resource: Resource<Vec<Tag>> = Resource::list(Route::collection("tags"));
    let err = resource
      .decode(&Bytes::from_static(br#"[{"id": 9, "name": "z"}, {"id": "3", "name": "c"}]"#))
      .unwrap_err();
    assert_eq!(err.path().to_string(), "[1].id");
  }

  #[test]
  fn test_malformed_json_is_decode_error() {
    let resource: Resource<Tag> = Resource::object(Route::item("tags", 1));
    let err = resource.decode(&Bytes::from_static(b"<html>")).unwrap_err();
    assert!(matches!(err.kind(), DecodeErrorKind::Malformed(_)));
  }

  #[test]
  fn test_map_composes_decode() {
    let names = Resource::<Vec<Tag>>::list(Route::collection("tags"))
      .map(|tags| tags.into_iter().map(|t| t.name).collect::<Vec<_>>());
    let decoded = names
      .decode(&Bytes::from_static(br#"[{"id": 1, "name": "a"}]"#))
      .unwrap();
    assert_eq!(decoded, vec!["a".to_string()]);
  }

  #[test]
  fn test_image_resource_validates_format() {
    let resource = Resource::image(Route::absolute("https://example.com/a.png"));

    let image = resource.decode(&Bytes::from_static(PNG_HEADER)).unwrap();
    assert_eq!(image.format(), ImageFormat::Png);
    assert_eq!(image.extension(), "png");
    assert_eq!(image.len(), PNG_HEADER.len());

    let err = resource
      .decode(&Bytes::from_static(b"definitely not an image"))
      .unwrap_err();
    assert_eq!(err.kind(), &DecodeErrorKind::UnknownImageFormat);
  }
}
