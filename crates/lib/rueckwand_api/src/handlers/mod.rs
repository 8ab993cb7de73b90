//! Request handlers.

pub mod auth;
mod entries;
pub mod items;
pub mod materials;
pub mod product_types;
pub mod sessions;
pub mod users;
