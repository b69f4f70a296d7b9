//! Data models for the catalog

pub mod book;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookFilter, BookInput, BookPage, BookQuery, NewBook, PageRequest};
pub use user::{Role, UserClaims};
