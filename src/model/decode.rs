//! Decode contracts for the API's records.

use crate::decode::{Decodable, DecodeError, Fields, JsonObject};

use super::types::{Address, Album, Comment, Company, Geo, Photo, Post, Todo, User};

// ============================================================================
// User and its nested values
// ============================================================================

impl Decodable for User {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
    let f = Fields::new(json);
    Ok(User {
      id: f.uint("id")?,
      name: f.string("name")?,
      username: f.string("username")?,
      email: f.string("email")?,
      address: f.object("address")?,
      phone: f.string("phone")?,
      website: f.string("website")?,
      company: f.object("company")?,
    })
  }
}

impl Decodable for Address {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
    let f = Fields::new(json);
    Ok(Address {
      street: f.string("street")?,
      suite: f.string("suite")?,
      city: f.string("city")?,
      zipcode: f.string("zipcode")?,
      geo: f.object("geo")?,
    })
  }
}

impl Decodable for Geo {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
    let f = Fields::new(json);
    Ok(Geo {
      lat: f.string("lat")?,
      lng: f.string("lng")?,
    })
  }
}

impl Decodable for Company {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
    let f = Fields::new(json);
    Ok(Company {
      name: f.string("name")?,
      catch_phrase: f.string("catchPhrase")?,
      bs: f.string("bs")?,
    })
  }
}

// ============================================================================
// Flat records
// ============================================================================

impl Decodable for Album {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
    let f = Fields::new(json);
    Ok(Album {
      id: f.uint("id")?,
      user_id: f.uint("userId")?,
      title: f.string("title")?,
    })
  }
}

impl Decodable for Photo {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
    let f = Fields::new(json);
    Ok(Photo {
      id: f.uint("id")?,
      album_id: f.uint("albumId")?,
      title: f.string("title")?,
      url: f.string("url")?,
      thumbnail_url: f.string("thumbnailUrl")?,
    })
  }
}

impl Decodable for Post {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
    let f = Fields::new(json);
    Ok(Post {
      id: f.uint("id")?,
      user_id: f.uint("userId")?,
      title: f.string("title")?,
      body: f.string("body")?,
    })
  }
}

impl Decodable for Comment {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
    let f = Fields::new(json);
    Ok(Comment {
      id: f.uint("id")?,
      post_id: f.uint("postId")?,
      name: f.string("name")?,
      email: f.string("email")?,
      body: f.string("body")?,
    })
  }
}

impl Decodable for Todo {
  fn decode(json: &JsonObject) -> Result<Self, DecodeError> {
    let f = Fields::new(json);
    Ok(Todo {
      id: f.uint("id")?,
      user_id: f.uint("userId")?,
      title: f.string("title")?,
      is_completed: f.bool("completed")?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decode::DecodeErrorKind;
  use serde_json::{json, Value};

  fn user_json() -> Value {
    json!({
      "id": 1,
      "name": "Leanne Graham",
      "username": "Bret",
      "email": "Sincere@april.biz",
      "address": {
        "street": "Kulas Light",
        "suite": "Apt. 556",
        "city": "Gwenborough",
        "zipcode": "92998-3874",
        "geo": { "lat": "-37.3159", "lng": "81.1496" }
      },
      "phone": "1-770-736-8031 x56442",
      "website": "hildegard.org",
      "company": {
        "name": "Romaguera-Crona",
        "catchPhrase": "Multi-layered client-server neural-net",
        "bs": "harness real-time e-markets"
      }
    })
  }

  /// Every top-level key, removed one at a time, must fail decoding at that key.
  fn assert_each_field_required<T: Decodable + std::fmt::Debug>(valid: Value) {
    let object = valid.as_object().unwrap();
    assert!(T::decode(object).is_ok(), "fixture should decode");

    for key in object.keys() {
      let mut partial = object.clone();
      partial.remove(key);
      let err = T::decode(&partial).expect_err(&format!("decoded without `{}`", key));
      assert_eq!(err.path().to_string(), *key);
      assert_eq!(err.kind(), &DecodeErrorKind::Missing);
    }
  }

  #[test]
  fn test_user_decodes_all_fields() {
    let user = User::decode_value(&user_json()).unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.username, "Bret");
    assert_eq!(user.address.city, "Gwenborough");
    assert_eq!(user.address.geo.lng, "81.1496");
    assert_eq!(user.company.catch_phrase, "Multi-layered client-server neural-net");
  }

  #[test]
  fn test_user_requires_every_field() {
    assert_each_field_required::<User>(user_json());
  }

  #[test]
  fn test_nested_values_require_every_field() {
    assert_each_field_required::<Address>(user_json()["address"].clone());
    assert_each_field_required::<Geo>(user_json()["address"]["geo"].clone());
    assert_each_field_required::<Company>(user_json()["company"].clone());
  }

  #[test]
  fn test_user_with_broken_geo_fails_whole() {
    let mut json = user_json();
    json["address"]["geo"]
      .as_object_mut()
      .unwrap()
      .remove("lat");

    let err = User::decode_value(&json).unwrap_err();
    assert_eq!(err.path().to_string(), "address.geo.lat");
    assert_eq!(err.kind(), &DecodeErrorKind::Missing);
  }

  #[test]
  fn test_user_with_non_object_company_fails() {
    let mut json = user_json();
    json["company"] = json!("Romaguera-Crona");

    let err = User::decode_value(&json).unwrap_err();
    assert_eq!(err.path().to_string(), "company");
  }

  #[test]
  fn test_album() {
    let json = json!({"userId": 1, "id": 2, "title": "quidem molestiae enim"});
    let album = Album::decode_value(&json).unwrap();
    assert_eq!(
      album,
      Album {
        id: 2,
        user_id: 1,
        title: "quidem molestiae enim".to_string()
      }
    );
    assert_each_field_required::<Album>(json);
  }

  #[test]
  fn test_photo() {
    let json = json!({
      "albumId": 1,
      "id": 1,
      "title": "accusamus beatae ad facilis cum similique qui sunt",
      "url": "https://via.placeholder.com/600/92c952",
      "thumbnailUrl": "https://via.placeholder.com/150/92c952"
    });
    let photo = Photo::decode_value(&json).unwrap();
    assert_eq!(photo.album_id, 1);
    assert_eq!(photo.thumbnail_url, "https://via.placeholder.com/150/92c952");
    assert_each_field_required::<Photo>(json);
  }

  #[test]
  fn test_post() {
    let json = json!({"userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit"});
    let post = Post::decode_value(&json).unwrap();
    assert_eq!(post.body, "quia et suscipit");
    assert_each_field_required::<Post>(json);
  }

  #[test]
  fn test_comment() {
    let json = json!({
      "postId": 1,
      "id": 1,
      "name": "id labore ex et quam laborum",
      "email": "Eliseo@gardner.biz",
      "body": "laudantium enim quasi est"
    });
    let comment = Comment::decode_value(&json).unwrap();
    assert_eq!(comment.post_id, 1);
    assert_eq!(comment.email, "Eliseo@gardner.biz");
    assert_each_field_required::<Comment>(json);
  }

  #[test]
  fn test_todo() {
    let json = json!({"userId": 1, "id": 1, "title": "delectus aut autem", "completed": false});
    let todo = Todo::decode_value(&json).unwrap();
    assert!(!todo.is_completed);
    assert_each_field_required::<Todo>(json);
  }

  #[test]
  fn test_todo_completed_must_be_boolean() {
    let json = json!({"userId": 1, "id": 1, "title": "delectus aut autem", "completed": "false"});
    let err = Todo::decode_value(&json).unwrap_err();
    assert_eq!(err.path().to_string(), "completed");
  }

  #[test]
  fn test_album_id_must_be_integer() {
    let json = json!({"userId": "1", "id": 2, "title": "x"});
    let err = Album::decode_value(&json).unwrap_err();
    assert_eq!(err.path().to_string(), "userId");
  }

  #[test]
  fn test_serializes_with_api_field_names() {
    let todo = Todo {
      id: 3,
      user_id: 1,
      title: "fugiat veniam minus".to_string(),
      is_completed: true,
    };
    let value = serde_json::to_value(&todo).unwrap();
    assert_eq!(value["userId"], 1);
    assert_eq!(value["completed"], true);
    // Serialized form decodes back to the same record.
    assert_eq!(Todo::decode_value(&value).unwrap(), todo);
  }
}
