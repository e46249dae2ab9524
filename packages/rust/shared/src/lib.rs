//! Shared types, error model, and configuration for courseforge.
//!
//! This crate is the foundation depended on by all other courseforge crates.
//! It provides:
//! - [`CourseForgeError`] — the unified error type
//! - Domain types ([`CourseSpec`], [`Syllabus`], [`CourseManifest`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, OpenRouterConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_api_key,
};
pub use error::{CourseForgeError, Result};
pub use types::{
    CourseManifest, CourseSpec, CuratedResource, LessonSpec, LicenseTag, QaReport, RunId,
    Syllabus, Week,
};
