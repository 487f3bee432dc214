//! Filesystem abstraction layer for the deployment core.
//!
//! This crate defines [`Filesystem`] — the single trait through which every
//! other deploy-* crate touches disk. No collaborator should call
//! `std::fs` directly; instead it depends on `deploy-fs` and programs
//! against the trait. [`StdFilesystem`] is the real implementation;
//! [`fake::FakeFilesystem`] (behind the `test-support` feature) is an
//! in-memory double for tests.

pub mod error;
pub mod fs;
pub mod std_fs;

#[cfg(feature = "test-support")]
pub mod fake;

pub use error::FsError;
pub use fs::{FileMetadata, Filesystem};
pub use std_fs::StdFilesystem;

#[cfg(feature = "test-support")]
pub use fake::FakeFilesystem;
