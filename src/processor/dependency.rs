//! Dependency graph of one compilation run.
//!
//! Nodes live in an arena owned by [`DependencyGraph`]; edges are plain
//! [`DependencyId`]s. A node is identified by its resolved path *and* the
//! kind of edge that reached it, so a file imported once as a module and
//! once through `import_code` yields two nodes.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::ast::{Chunk, Directive, Literal};
use super::context::SymbolContext;
use super::namespaces::fetch_namespaces;
use super::resource::ResourceManager;
use crate::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyType {
    Main,
    Import,
    Include,
    NativeImport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyId(usize);

#[derive(Debug, Clone)]
pub struct Dependency {
    pub target: String,
    /// Hex sha256 of `target`.
    pub id: String,
    pub namespace: String,
    pub kind: DependencyType,
    pub chunk: Rc<Chunk>,
    /// Direct children plus native imports re-exported from import chains.
    pub dependencies: Vec<DependencyId>,
    /// `#inject` path as written → raw file content.
    pub injections: HashMap<String, String>,
}

/// Aggregate returned by [`DependencyGraph::find_dependencies`].
#[derive(Debug, Clone, Default)]
pub struct FindResult {
    pub dependencies: Vec<DependencyId>,
    pub namespaces: IndexSet<String>,
    /// Literals per contributing file, so a file reached twice counts once.
    literals: IndexMap<String, Vec<Literal>>,
}

impl FindResult {
    pub fn literals(&self) -> impl Iterator<Item = &Literal> {
        self.literals.values().flatten()
    }

    fn merge(&mut self, other: &FindResult) {
        self.namespaces.extend(other.namespaces.iter().cloned());
        for (target, literals) in &other.literals {
            self.literals
                .entry(target.clone())
                .or_insert_with(|| literals.clone());
        }
    }
}

/// A resolved `import_code` directive: its target plus the native imports
/// that target pulls in itself, deepest first.
#[derive(Debug, Clone)]
pub struct NativeEntry {
    pub main: DependencyId,
    pub imports: Vec<DependencyId>,
}

pub fn module_id(target: &str) -> String {
    let digest = Sha256::digest(target.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug)]
pub struct DependencyGraph {
    nodes: Vec<Dependency>,
    registry: HashMap<(String, DependencyType), DependencyId>,
    /// `(owner, directive path, type)` → child, consulted when rendering.
    edges: HashMap<(DependencyId, String, DependencyType), DependencyId>,
    results: HashMap<DependencyId, FindResult>,
    call_stack: Vec<String>,
    root: DependencyId,
}

impl std::ops::Index<DependencyId> for DependencyGraph {
    type Output = Dependency;

    fn index(&self, id: DependencyId) -> &Dependency {
        &self.nodes[id.0]
    }
}

impl DependencyGraph {
    /// Build the graph below the entry file `resources` was loaded with.
    pub fn build(
        resources: &ResourceManager<'_>,
        context: &mut SymbolContext,
    ) -> Result<(Self, FindResult), BuildError> {
        let (target, chunk) = resources
            .entry()
            .ok_or_else(|| BuildError::internal("no entry point loaded"))?;

        let mut graph = Self {
            nodes: Vec::new(),
            registry: HashMap::new(),
            edges: HashMap::new(),
            results: HashMap::new(),
            call_stack: Vec::new(),
            root: DependencyId(0),
        };
        graph.root = graph.insert(target.to_string(), DependencyType::Main, chunk, context);
        let result = graph.find_dependencies(graph.root, resources, context)?;
        Ok((graph, result))
    }

    pub fn root(&self) -> DependencyId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DependencyId> + '_ {
        (0..self.nodes.len()).map(DependencyId)
    }

    fn insert(
        &mut self,
        target: String,
        kind: DependencyType,
        chunk: Rc<Chunk>,
        context: &mut SymbolContext,
    ) -> DependencyId {
        let id = module_id(&target);
        let namespace = context.module_namespace(&id);
        let dep_id = DependencyId(self.nodes.len());
        debug!(target = %target, ?kind, namespace = %namespace, "new dependency");
        self.registry.insert((target.clone(), kind), dep_id);
        self.nodes.push(Dependency {
            target,
            id,
            namespace,
            kind,
            chunk,
            dependencies: Vec::new(),
            injections: HashMap::new(),
        });
        dep_id
    }

    fn resolve(
        &mut self,
        owner: DependencyId,
        directive: &Directive,
        kind: DependencyType,
        resources: &ResourceManager<'_>,
        context: &mut SymbolContext,
    ) -> Result<DependencyId, BuildError> {
        let source = self[owner].target.clone();
        let sub = resources
            .handler()
            .get_target_relative_to(&source, &directive.path);

        if let Some(&existing) = self.registry.get(&(sub.clone(), kind)) {
            return Ok(existing);
        }

        let chunk = resources.chunk(&sub).ok_or_else(|| {
            BuildError::resolution(format!("Dependency {sub} does not exist..."))
                .at(directive.range)
                .in_target(source.as_str())
        })?;
        Ok(self.insert(sub, kind, chunk, context))
    }

    fn check_cycle(&self, owner: DependencyId, child: DependencyId) -> Result<(), BuildError> {
        if self.call_stack.contains(&self[child].namespace) {
            return Err(BuildError::circular(format!(
                "Circular dependency from {} to {} detected.",
                self[owner].target, self[child].target
            ))
            .in_target(self[owner].target.as_str()));
        }
        Ok(())
    }

    /// Resolve every directive of `id` recursively and return the merged
    /// children, declared names and literals.
    pub fn find_dependencies(
        &mut self,
        id: DependencyId,
        resources: &ResourceManager<'_>,
        context: &mut SymbolContext,
    ) -> Result<FindResult, BuildError> {
        if let Some(done) = self.results.get(&id) {
            return Ok(done.clone());
        }

        let chunk = Rc::clone(&self[id].chunk);
        let target = self[id].target.clone();
        let mut result = FindResult {
            namespaces: fetch_namespaces(&chunk),
            ..FindResult::default()
        };
        result
            .literals
            .insert(target.clone(), chunk.literals.clone());
        let mut children: IndexSet<DependencyId> = IndexSet::new();

        self.call_stack.push(self[id].namespace.clone());

        for directive in &chunk.native_imports {
            let child = self.resolve(id, directive, DependencyType::NativeImport, resources, context)?;
            self.check_cycle(id, child)?;
            self.edges
                .insert((id, directive.path.clone(), DependencyType::NativeImport), child);
            let related = self.find_dependencies(child, resources, context)?;
            result.merge(&related);
            children.insert(child);
        }

        let linked = chunk
            .imports
            .iter()
            .map(|d| (d, DependencyType::Import))
            .chain(chunk.includes.iter().map(|d| (d, DependencyType::Include)));
        for (directive, kind) in linked {
            let child = self.resolve(id, directive, kind, resources, context)?;
            self.check_cycle(id, child)?;
            self.edges.insert((id, directive.path.clone(), kind), child);
            let related = self.find_dependencies(child, resources, context)?;
            // native imports always surface at the top level
            children.extend(self.fetch_native_imports(child));
            result.merge(&related);
            children.insert(child);
        }

        let mut injections = HashMap::new();
        for directive in &chunk.injects {
            let sub = resources
                .handler()
                .get_target_relative_to(&target, &directive.path);
            let content = resources.injection(&sub).ok_or_else(|| {
                BuildError::resolution(format!("Injection {sub} does not exist..."))
                    .at(directive.range)
                    .in_target(target.as_str())
            })?;
            injections.insert(directive.path.clone(), content.to_string());
        }

        self.call_stack.pop();

        let node = &mut self.nodes[id.0];
        node.dependencies = children.into_iter().collect();
        node.injections = injections;
        result.dependencies = node.dependencies.clone();
        self.results.insert(id, result.clone());
        Ok(result)
    }

    /// Native imports below `id`, each preceded by its own native imports.
    pub fn fetch_native_imports(&self, id: DependencyId) -> Vec<DependencyId> {
        let mut found = IndexSet::new();
        for &child in &self[id].dependencies {
            if self[child].kind == DependencyType::NativeImport {
                found.extend(self.fetch_native_imports(child));
                found.insert(child);
            }
        }
        found.into_iter().collect()
    }

    pub fn edge(&self, owner: DependencyId, path: &str, kind: DependencyType) -> Option<DependencyId> {
        self.edges.get(&(owner, path.to_string(), kind)).copied()
    }

    /// Lookup for an `import_code` directive written in `owner`.
    pub fn native_entry(&self, owner: DependencyId, path: &str) -> Option<NativeEntry> {
        let main = self.edge(owner, path, DependencyType::NativeImport)?;
        Some(NativeEntry {
            main,
            imports: self.fetch_native_imports(main),
        })
    }

    /// Every native import that becomes its own output, in emission order.
    pub fn native_bundles(&self) -> Vec<DependencyId> {
        let mut bundles: IndexMap<String, DependencyId> = IndexMap::new();
        for &child in &self[self.root].dependencies {
            if self[child].kind != DependencyType::NativeImport {
                continue;
            }
            for item in self.fetch_native_imports(child).into_iter().chain([child]) {
                bundles.entry(self[item].target.clone()).or_insert(item);
            }
        }
        bundles.into_values().collect()
    }
}
