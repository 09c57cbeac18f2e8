// Library entry point for the wedding site backend
// Exposes modules for testing

pub mod api;
pub mod models;
pub mod photos;
pub mod slug;
pub mod store;
