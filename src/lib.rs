// Library exports for mapeval
pub mod aggregate;
pub mod category;
pub mod classify;
pub mod config;
pub mod dataset;
pub mod error;
pub mod manifest;
pub mod metric;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod report;
