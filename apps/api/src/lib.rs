pub mod auth;
pub mod config;
pub mod cv;
pub mod errors;
pub mod models;
pub mod profile;
pub mod routes;
pub mod state;
pub mod sync;

#[cfg(test)]
mod test_support;
