//! Domain core for the locker storage gateway.
//!
//! - [`sandbox`] -- lexical path canonicalization and per-user containment.
//! - [`storage`] -- filesystem operations over sandboxed paths.
//! - [`content_type`] -- MIME type inference for downloads.

pub mod content_type;
pub mod error;
pub mod sandbox;
pub mod storage;
pub mod types;
