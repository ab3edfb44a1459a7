//! Module system for Tern.
//!
//! This module provides:
//! - Import resolution (prefixing and `core` flattening)
//! - Module sources: search paths on disk, or in memory

mod rename;
mod resolver;
mod source;

pub use resolver::{ModuleResolver, CORE_MODULE};
pub use source::{FileSource, MemorySource, ModuleSource, EXTENSION};
