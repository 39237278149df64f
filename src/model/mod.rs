//! Records served by the JSON placeholder API.

mod decode;
mod resources;
mod types;

pub use resources::{albums_of, comments_on, photos_in, posts_by, todos_of};
pub use types::{Address, Album, Comment, Company, Geo, Photo, Post, Todo, User};
