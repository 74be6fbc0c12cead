//! Curio Kernel Library
//!
//! Museum artifact catalogue: schema-driven catalogue queries, faceted
//! search, user albums and the admin console. The `curio` binary runs the
//! HTTP server; everything is exposed here for integration testing.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod favorites;
pub mod image_path;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod schema;
pub mod search;
pub mod services;
pub mod session;
pub mod state;
pub mod theme;
