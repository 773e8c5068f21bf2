//! API request and response data models.
//!
//! These types define the wire contract of the inbound HTTP surface and are annotated with
//! `utoipa` so they appear in the generated documentation. Field names are camelCase on the
//! wire.

pub mod files;
