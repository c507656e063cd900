//! Services module
//!
//! Business logic services that coordinate between the function handlers
//! and the repository.

pub mod auth;
pub mod images;
pub mod posts;

pub use auth::AuthService;
pub use images::ImagesService;
pub use posts::PostsService;
