// src/models/mod.rs

pub mod comment;
pub mod post;
pub mod session;
pub mod user;
pub mod user_request;
