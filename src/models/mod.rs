//! Core data models for the image generation gateway.
//!
//! These types describe a request as it moves through ingestion: raw form
//! fields, validated and stored images, the canonical ingested request, and
//! the JSON bodies sent back to clients.

pub mod asset;
pub mod field;
pub mod request;
pub mod response;
