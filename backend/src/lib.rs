//! Geofenced attendance backend.
//!
//! Teachers issue short-lived session codes; students check in by presenting
//! a code from inside the department geofence and check out after leaving
//! it. Anonymizing networks are rejected through an external IP
//! intelligence lookup.

pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;
