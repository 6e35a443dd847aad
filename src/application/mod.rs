//! Application services layer.

pub mod auth;
pub mod error;
pub mod items;
pub mod repos;
