//! Resource access and recursive loading.
//!
//! A [`ResourceHandler`] knows how to find and read scripts; the
//! [`ResourceManager`] walks every directive reachable from the entry file
//! and fills the chunk cache and the injection cache before any graph work
//! starts.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info};

use super::ast::{Chunk, Directive};
use super::chunk_cache::ChunkCache;
use crate::error::BuildError;

/// Where scripts come from.
pub trait ResourceHandler {
    fn has(&self, target: &str) -> bool;
    fn get(&self, target: &str) -> Result<String, BuildError>;
    /// Canonical form of a path given by the user.
    fn resolve(&self, target: &str) -> String;
    /// Canonical form of `target` as written inside `source`.
    fn get_target_relative_to(&self, source: &str, target: &str) -> String;
}

/// Lexically clean a `/`-separated path: drop `.` and empty segments and
/// fold `..` into its parent.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

fn parent(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => ".",
    }
}

/// Shared resolution rule: relative to the directory of `source`, with a
/// `.src` fallback for extension-less targets that do not exist.
fn relative_target(source: &str, target: &str, has: impl Fn(&str) -> bool) -> String {
    let candidate = if target.starts_with('/') {
        normalize(target)
    } else {
        normalize(&format!("{}/{}", parent(source), target))
    };

    if !has(&candidate) && Path::new(&candidate).extension().is_none() {
        let with_ext = format!("{candidate}.src");
        if has(&with_ext) {
            return with_ext;
        }
    }
    candidate
}

/// Reads scripts from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsResourceHandler;

impl ResourceHandler for FsResourceHandler {
    fn has(&self, target: &str) -> bool {
        Path::new(target).is_file()
    }

    fn get(&self, target: &str) -> Result<String, BuildError> {
        std::fs::read_to_string(target)
            .map_err(|e| BuildError::io(format!("cannot read {target}: {e}")).in_target(target))
    }

    fn resolve(&self, target: &str) -> String {
        let absolute = std::path::absolute(target)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| target.to_string());
        let resolved = normalize(&absolute);
        relative_target("/", &resolved, |p| self.has(p))
    }

    fn get_target_relative_to(&self, source: &str, target: &str) -> String {
        relative_target(source, target, |p| self.has(p))
    }
}

/// Scripts held in memory, keyed by absolute `/`-separated path.
#[derive(Debug, Default, Clone)]
pub struct MemoryResourceHandler {
    files: HashMap<String, String>,
}

impl MemoryResourceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: &str, content: &str) {
        self.files.insert(self.resolve(path), content.to_string());
    }
}

impl ResourceHandler for MemoryResourceHandler {
    fn has(&self, target: &str) -> bool {
        self.files.contains_key(target)
    }

    fn get(&self, target: &str) -> Result<String, BuildError> {
        self.files
            .get(target)
            .cloned()
            .ok_or_else(|| BuildError::io(format!("no such file {target}")).in_target(target))
    }

    fn resolve(&self, target: &str) -> String {
        relative_target("/", target, |p| self.files.contains_key(p))
    }

    fn get_target_relative_to(&self, source: &str, target: &str) -> String {
        relative_target(source, target, |p| self.files.contains_key(p))
    }
}

/// Loads every file reachable from an entry point.
pub struct ResourceManager<'a> {
    handler: &'a dyn ResourceHandler,
    chunks: ChunkCache,
    /// Raw text of `#inject` targets, keyed by resolved path.
    injections: HashMap<String, String>,
    entry: Option<String>,
}

impl<'a> ResourceManager<'a> {
    pub fn new(handler: &'a dyn ResourceHandler) -> Self {
        Self {
            handler,
            chunks: ChunkCache::new(),
            injections: HashMap::new(),
            entry: None,
        }
    }

    pub fn handler(&self) -> &'a dyn ResourceHandler {
        self.handler
    }

    /// Resolve `entry` and load it plus everything it pulls in.
    pub fn load(&mut self, entry: &str) -> Result<(), BuildError> {
        let target = self.handler.resolve(entry);
        if !self.handler.has(&target) {
            return Err(BuildError::resolution(format!("Target {target} does not exist...")));
        }

        info!(entry = %target, "loading resources");
        self.entry = Some(target.clone());
        self.load_target(&target)?;
        info!(
            files = self.chunks.len(),
            injections = self.injections.len(),
            "resources loaded"
        );
        Ok(())
    }

    fn load_target(&mut self, target: &str) -> Result<(), BuildError> {
        if self.chunks.contains(target) {
            return Ok(());
        }

        debug!(target, "loading resource");
        let content = self.handler.get(target)?;
        let chunk = self.chunks.parse(target, &content)?;

        let linked = chunk
            .imports
            .iter()
            .chain(&chunk.includes)
            .chain(&chunk.native_imports);
        for directive in linked {
            let sub = self.existing_target(target, directive, "Dependency")?;
            self.load_target(&sub)?;
        }

        for directive in &chunk.injects {
            let sub = self.existing_target(target, directive, "Injection")?;
            if !self.injections.contains_key(&sub) {
                let content = self.handler.get(&sub)?;
                debug!(target = %sub, bytes = content.len(), "loaded injection");
                self.injections.insert(sub, content);
            }
        }
        Ok(())
    }

    fn existing_target(
        &self,
        source: &str,
        directive: &Directive,
        what: &str,
    ) -> Result<String, BuildError> {
        let sub = self.handler.get_target_relative_to(source, &directive.path);
        if self.handler.has(&sub) {
            Ok(sub)
        } else {
            Err(BuildError::resolution(format!("{what} {sub} does not exist..."))
                .at(directive.range)
                .in_target(source))
        }
    }

    /// The resolved entry path and its chunk, once `load` succeeded.
    pub fn entry(&self) -> Option<(&str, Rc<Chunk>)> {
        let target = self.entry.as_deref()?;
        Some((target, self.chunks.get(target)?))
    }

    pub fn chunk(&self, target: &str) -> Option<Rc<Chunk>> {
        self.chunks.get(target)
    }

    pub fn injection(&self, target: &str) -> Option<&str> {
        self.injections.get(target).map(String::as_str)
    }
}
