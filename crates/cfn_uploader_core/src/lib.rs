//! Domain primitives for the CloudFormation file uploader.
//!
//! This crate owns the lifecycle event contract, file and payload spec
//! parsing, and deterministic archive naming. It intentionally excludes AWS
//! SDK and Lambda runtime concerns.

pub mod archive_name;
pub mod contract;
pub mod file_spec;
