//! Markdown batch translator
//!
//! This library splits Markdown documents into translatable prose and
//! protected structure, sends the prose to a translation API, and writes
//! documents whose code, frontmatter and markup are left byte-for-byte intact.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod processors;

// Re-export key types for convenience
pub use crate::core::{
    cache::ChangeCache,
    client::DeepLClient,
    config::{ClientConfig, TranslateConfig},
    errors::{Result, TranslationError},
    models::{Job, Task},
    port::TranslationPort,
    report::ResultReport,
    retry::RetryPolicy,
    scheduler::JobScheduler,
};

pub use crate::processors::markdown::{reconstruct, MarkdownProcessor, MarkdownSegmenter, Segment};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
