//! AWS-oriented adapters and handlers for the CloudFormation file uploader.
//!
//! This crate owns runtime integration details (the lifecycle handler,
//! payload resolution, archive staging, and collaborator traits) and exposes
//! a single runtime module boundary for the contract primitives.

pub mod adapters;
pub mod archive;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod resolver;
pub mod runtime;
