//! Identity credentials: password hashing, opaque tokens and sessions

pub mod password;
pub mod service;
pub mod token;

pub use service::{AuthService, AuthSettings, Session};
