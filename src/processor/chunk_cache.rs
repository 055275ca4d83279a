use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::ast::Chunk;
use super::script_parser;
use crate::error::BuildError;

/// Parsed chunks of one compilation run, keyed by resolved path.
///
/// Entries are only ever added, so a returned `Rc<Chunk>` stays valid and
/// identical for the rest of the run.
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: HashMap<String, Rc<Chunk>>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `content` as `target`, unless that path was parsed before.
    pub fn parse(&mut self, target: &str, content: &str) -> Result<Rc<Chunk>, BuildError> {
        if let Some(chunk) = self.chunks.get(target) {
            return Ok(Rc::clone(chunk));
        }

        let chunk = Rc::new(script_parser::parse(content, target)?);
        debug!(target, statements = chunk.body.len(), "parsed chunk");
        self.chunks.insert(target.to_string(), Rc::clone(&chunk));
        Ok(chunk)
    }

    pub fn get(&self, target: &str) -> Option<Rc<Chunk>> {
        self.chunks.get(target).cloned()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.chunks.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_each_path_once() {
        let mut cache = ChunkCache::new();
        let first = cache.parse("/a.src", "x = 1").expect("parses");
        // Different text under the same path is ignored: the first parse wins.
        let second = cache.parse("/a.src", "y = 2").expect("cached");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("/a.src"));
    }

    #[test]
    fn test_parse_errors_name_the_file() {
        let mut cache = ChunkCache::new();
        let err = cache.parse("/bad.src", "x = (").unwrap_err();
        assert_eq!(err.target.as_deref(), Some("/bad.src"));
        assert!(cache.is_empty());
    }
}
