//! Resource constructors for each record type.
//!
//! Each constructor is a pure description; nothing is fetched until the
//! resource is handed to [`Webservice::load`](crate::Webservice::load).

use crate::resource::{Image, Resource};
use crate::route::Route;

use super::types::{Album, Comment, Photo, Post, Todo, User};

const USERS: &str = "users";
const ALBUMS: &str = "albums";
const PHOTOS: &str = "photos";
const POSTS: &str = "posts";
const COMMENTS: &str = "comments";
const TODOS: &str = "todos";

/// Albums whose `userId` is `user_id`.
pub fn albums_of(user_id: u64) -> Resource<Vec<Album>> {
  Resource::list(Route::collection(ALBUMS).filter("userId", user_id))
}

/// Photos whose `albumId` is `album_id`.
pub fn photos_in(album_id: u64) -> Resource<Vec<Photo>> {
  Resource::list(Route::collection(PHOTOS).filter("albumId", album_id))
}

pub fn posts_by(user_id: u64) -> Resource<Vec<Post>> {
  Resource::list(Route::collection(POSTS).filter("userId", user_id))
}

pub fn comments_on(post_id: u64) -> Resource<Vec<Comment>> {
  Resource::list(Route::collection(COMMENTS).filter("postId", post_id))
}

pub fn todos_of(user_id: u64) -> Resource<Vec<Todo>> {
  Resource::list(Route::collection(TODOS).filter("userId", user_id))
}

impl User {
  pub fn all() -> Resource<Vec<User>> {
    Resource::list(Route::collection(USERS))
  }

  pub fn with_id(id: u64) -> Resource<User> {
    Resource::object(Route::item(USERS, id))
  }

  pub fn albums(&self) -> Resource<Vec<Album>> {
    albums_of(self.id)
  }

  pub fn posts(&self) -> Resource<Vec<Post>> {
    posts_by(self.id)
  }

  pub fn todos(&self) -> Resource<Vec<Todo>> {
    todos_of(self.id)
  }
}

impl Album {
  pub fn all() -> Resource<Vec<Album>> {
    Resource::list(Route::collection(ALBUMS))
  }

  pub fn with_id(id: u64) -> Resource<Album> {
    Resource::object(Route::item(ALBUMS, id))
  }

  pub fn photos(&self) -> Resource<Vec<Photo>> {
    photos_in(self.id)
  }
}

impl Photo {
  pub fn with_id(id: u64) -> Resource<Photo> {
    Resource::object(Route::item(PHOTOS, id))
  }

  /// Full size image. The URL comes from the payload, not the provider.
  pub fn image(&self) -> Resource<Image> {
    Resource::image(Route::absolute(self.url.clone()))
  }

  pub fn thumbnail(&self) -> Resource<Image> {
    Resource::image(Route::absolute(self.thumbnail_url.clone()))
  }
}

impl Post {
  pub fn all() -> Resource<Vec<Post>> {
    Resource::list(Route::collection(POSTS))
  }

  pub fn with_id(id: u64) -> Resource<Post> {
    Resource::object(Route::item(POSTS, id))
  }

  pub fn comments(&self) -> Resource<Vec<Comment>> {
    comments_on(self.id)
  }
}

impl Todo {
  pub fn all() -> Resource<Vec<Todo>> {
    Resource::list(Route::collection(TODOS))
  }
}
