//! Core library: photo preprocessing, expiry date extraction and resolution, inventory.

pub mod config;
pub mod extractor;
pub mod inventory;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod resolver;
