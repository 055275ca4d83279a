//! Run-wide symbol tables: module namespaces, identifier renames and
//! shared literals.
//!
//! The context is filled while the dependency graph is aggregated and
//! sealed before rendering starts; renderers only read from it.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::ast::{Literal, LiteralKind};
use super::builtins::default_exclusions;
use super::lexer::is_keyword;

pub const MODULE_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const VARIABLE_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
pub const OBFUSCATED_CHARSET: &str =
    "ĀāĂăĄąĆćĈĉĊċČčĎďĐđĒēĔĕĖėĘęĚěĜĝĞğĠġĢģĤĥĦħĨĩĪīĬĭĮįİıĲĳĴĵĶķĸĹĺĻļĽľĿŀŁł";

/// Produces `a, b, ..., z, aa, ab, ...` over a charset, skipping keywords
/// and excluded names.
#[derive(Debug, Clone)]
pub struct NamespaceGenerator {
    charset: Vec<char>,
    counter: usize,
    excluded: HashSet<String>,
}

impl NamespaceGenerator {
    pub fn new(charset: &str) -> Self {
        Self {
            charset: charset.chars().collect(),
            counter: 0,
            excluded: HashSet::new(),
        }
    }

    pub fn exclude(&mut self, name: &str) {
        self.excluded.insert(name.to_string());
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    /// Bijective base-k rendering of `index`.
    fn encode(&self, index: usize) -> String {
        let base = self.charset.len().max(1);
        let mut n = index + 1;
        let mut chars = Vec::new();
        while n > 0 {
            n -= 1;
            chars.push(self.charset.get(n % base).copied().unwrap_or('_'));
            n /= base;
        }
        chars.iter().rev().collect()
    }

    pub fn next_name(&mut self) -> String {
        loop {
            let name = self.encode(self.counter);
            self.counter += 1;
            if !is_keyword(&name) && !self.excluded.contains(&name) {
                return name;
            }
        }
    }
}

/// How the context should behave for one run.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Draw variable names from a non-ASCII charset.
    pub obfuscation: bool,
    /// Rename declared identifiers.
    pub rename: bool,
    /// Replace repeated literals by shared variables.
    pub share_literals: bool,
    /// Caller exclusions, on top of the built-in ones.
    pub excluded: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SymbolContext {
    modules: NamespaceGenerator,
    module_names: HashMap<String, String>,
    variables: NamespaceGenerator,
    renames: HashMap<String, String>,
    literal_counts: IndexMap<String, usize>,
    shared_literals: IndexMap<String, String>,
    options: ContextOptions,
}

impl SymbolContext {
    pub fn new(options: ContextOptions) -> Self {
        let charset = if options.obfuscation {
            OBFUSCATED_CHARSET
        } else {
            VARIABLE_CHARSET
        };
        let mut variables = NamespaceGenerator::new(charset);
        for name in default_exclusions() {
            variables.exclude(name);
        }
        for name in &options.excluded {
            variables.exclude(name);
        }

        Self {
            modules: NamespaceGenerator::new(MODULE_CHARSET),
            module_names: HashMap::new(),
            variables,
            renames: HashMap::new(),
            literal_counts: IndexMap::new(),
            shared_literals: IndexMap::new(),
            options,
        }
    }

    /// Namespace of a module id, allocated on first request.
    pub fn module_namespace(&mut self, id: &str) -> String {
        if let Some(namespace) = self.module_names.get(id) {
            return namespace.clone();
        }
        let namespace = self.modules.next_name();
        self.module_names.insert(id.to_string(), namespace.clone());
        namespace
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.variables.is_excluded(name)
    }

    /// Register a declared identifier.
    ///
    /// With renaming off the name is reserved instead, so generated
    /// literal names never shadow it.
    pub fn create_namespace(&mut self, name: &str) {
        if self.renames.contains_key(name) || self.variables.is_excluded(name) {
            return;
        }
        if self.options.rename {
            let short = self.variables.next_name();
            self.renames.insert(name.to_string(), short);
        } else {
            self.variables.exclude(name);
        }
    }

    pub fn rename(&self, name: &str) -> Option<&str> {
        self.renames.get(name).map(String::as_str)
    }

    pub fn add_literal(&mut self, literal: &Literal) {
        if literal.kind == LiteralKind::Null {
            return;
        }
        *self.literal_counts.entry(literal.raw.clone()).or_insert(0) += 1;
    }

    /// Close the aggregation phase: every literal seen more than once and
    /// longer than a single character gets a shared variable.
    pub fn seal(&mut self) {
        if !self.options.share_literals {
            return;
        }
        let repeated: Vec<String> = self
            .literal_counts
            .iter()
            .filter(|(raw, count)| **count > 1 && raw.chars().count() > 1)
            .map(|(raw, _)| raw.clone())
            .filter(|raw| !self.shared_literals.contains_key(raw))
            .collect();
        for raw in repeated {
            let name = self.variables.next_name();
            self.shared_literals.insert(raw, name);
        }
    }

    pub fn shared_literal(&self, raw: &str) -> Option<&str> {
        self.shared_literals.get(raw).map(String::as_str)
    }

    /// `(name, raw literal)` pairs, in first-seen order.
    pub fn literal_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.shared_literals
            .iter()
            .map(|(raw, name)| (name.as_str(), raw.as_str()))
    }

    pub fn literal_count(&self, raw: &str) -> usize {
        self.literal_counts.get(raw).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ast::LiteralKind;

    fn number(raw: &str) -> Literal {
        Literal {
            kind: LiteralKind::Number,
            raw: raw.into(),
        }
    }

    fn uglify_context(excluded: &[&str]) -> SymbolContext {
        SymbolContext::new(ContextOptions {
            obfuscation: false,
            rename: true,
            share_literals: true,
            excluded: excluded.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_generator_is_bijective_and_skips_keywords() {
        let mut generator = NamespaceGenerator::new("abcdefghijklmnopqrstuvwxyz");
        let names: Vec<_> = (0..28).map(|_| generator.next_name()).collect();
        assert_eq!(names[0], "a");
        assert_eq!(names[25], "z");
        assert_eq!(names[26], "aa");

        let mut generator = NamespaceGenerator::new("fin");
        let names: Vec<_> = (0..12).map(|_| generator.next_name()).collect();
        assert!(!names.contains(&"in".to_string()));
        assert!(!names.contains(&"if".to_string()));
    }

    #[test]
    fn test_renames_are_unique_and_respect_exclusions() {
        let mut context = uglify_context(&["keepMe"]);
        let declared = ["alpha", "beta", "keepMe", "print", "self", "gamma"];
        for name in declared {
            context.create_namespace(name);
        }
        assert_eq!(context.rename("keepMe"), None);
        assert_eq!(context.rename("print"), None);
        assert_eq!(context.rename("self"), None);

        let renamed: Vec<&str> = ["alpha", "beta", "gamma"]
            .iter()
            .filter_map(|n| context.rename(n))
            .collect();
        assert_eq!(renamed.len(), 3);
        let unique: HashSet<_> = renamed.iter().collect();
        assert_eq!(unique.len(), 3);
        for short in renamed {
            assert!(!context.is_excluded(short));
        }
    }

    #[test]
    fn test_literals_shared_when_repeated_and_long_enough() {
        let mut context = uglify_context(&[]);
        for raw in ["42", "42", "42", "7", "7", "\"x\"", "100"] {
            context.add_literal(&number(raw));
        }
        context.seal();
        assert!(context.shared_literal("42").is_some());
        assert_eq!(context.shared_literal("7"), None, "single character");
        assert!(context.shared_literal("\"x\"").is_none(), "seen once");
        assert_eq!(context.shared_literal("100"), None);
        assert_eq!(context.literal_declarations().count(), 1);
        assert_eq!(context.literal_count("42"), 3);
    }

    #[test]
    fn test_reserved_names_are_not_reused_without_renaming() {
        let mut context = SymbolContext::new(ContextOptions {
            share_literals: true,
            ..ContextOptions::default()
        });
        context.create_namespace("a");
        context.add_literal(&number("42"));
        context.add_literal(&number("42"));
        context.seal();
        assert_eq!(context.rename("a"), None);
        assert_eq!(context.shared_literal("42"), Some("b"));
    }

    #[test]
    fn test_module_namespaces_are_stable() {
        let mut context = uglify_context(&[]);
        let first = context.module_namespace("id-1");
        let second = context.module_namespace("id-2");
        assert_eq!(first, "A");
        assert_eq!(second, "B");
        assert_eq!(context.module_namespace("id-1"), first);
    }
}
