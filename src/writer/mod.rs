//! Writing compiled bundles to disk.
pub mod scripts;
