use serde::Serialize;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: u64,
  pub name: String,
  pub username: String,
  pub email: String,
  pub address: Address,
  pub phone: String,
  pub website: String,
  pub company: Company,
}

/// Postal address, owned by its user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub street: String,
  pub suite: String,
  pub city: String,
  pub zipcode: String,
  pub geo: Geo,
}

/// Coordinates as the API reports them (decimal strings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Geo {
  pub lat: String,
  pub lng: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
  pub name: String,
  pub catch_phrase: String,
  pub bs: String,
}

/// Photo album
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
  pub id: u64,
  pub user_id: u64, // -> User.id
  pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
  pub id: u64,
  pub album_id: u64, // -> Album.id
  pub title: String,
  pub url: String,
  pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub id: u64,
  pub user_id: u64,
  pub title: String,
  pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: u64,
  pub post_id: u64, // -> Post.id
  pub name: String,
  pub email: String,
  pub body: String,
}

/// Todo item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
  pub id: u64,
  pub user_id: u64,
  pub title: String,
  #[serde(rename = "completed")]
  pub is_completed: bool,
}
