//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - `POST /upload`: store a file in the configured repository folder
//! - `GET /files`: list the files in that folder
//!
//! Documentation is served at `/api-docs`; `/` redirects there.

pub mod handlers;
pub mod models;
