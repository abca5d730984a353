// src/handlers/mod.rs

pub mod ai_meta;
pub mod auth;
pub mod comment;
pub mod member;
pub mod post;
pub mod request;
pub mod session;
