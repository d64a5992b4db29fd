// Resolved module graph handed to the chunker by the resolver/compiler stages
use crate::core::models::{Dependency, Module, ModuleId, ModuleKind};
use crate::utils::GraphError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Immutable module arena. Module ids follow the sort order of module paths.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    index: HashMap<String, ModuleId>,
}

impl ModuleGraph {
    pub fn builder() -> ModuleGraphBuilder {
        ModuleGraphBuilder::default()
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn lookup(&self, path: &str) -> Option<ModuleId> {
        self.index.get(path).copied()
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Code entry modules in canonical order
    pub fn entries(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|m| m.is_entry && m.is_code())
            .map(|m| m.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[derive(Debug, Clone)]
struct PendingModule {
    path: String,
    size: u64,
    is_entry: bool,
    kind: ModuleKind,
}

#[derive(Debug, Clone)]
struct PendingEdge {
    from: String,
    to: String,
    dynamic: bool,
}

/// Collects modules and edges by path, then validates them into a [`ModuleGraph`]
#[derive(Debug, Clone, Default)]
pub struct ModuleGraphBuilder {
    modules: Vec<PendingModule>,
    edges: Vec<PendingEdge>,
}

impl ModuleGraphBuilder {
    pub fn add_module(mut self, path: &str, size: u64, is_entry: bool, kind: ModuleKind) -> Self {
        self.modules.push(PendingModule {
            path: path.to_string(),
            size,
            is_entry,
            kind,
        });
        self
    }

    pub fn entry(self, path: &str, size: u64) -> Self {
        self.add_module(path, size, true, ModuleKind::Code)
    }

    pub fn module(self, path: &str, size: u64) -> Self {
        self.add_module(path, size, false, ModuleKind::Code)
    }

    pub fn add_edge(mut self, from: &str, to: &str, dynamic: bool) -> Self {
        self.edges.push(PendingEdge {
            from: from.to_string(),
            to: to.to_string(),
            dynamic,
        });
        self
    }

    pub fn edge(self, from: &str, to: &str) -> Self {
        self.add_edge(from, to, false)
    }

    pub fn dynamic_edge(self, from: &str, to: &str) -> Self {
        self.add_edge(from, to, true)
    }

    pub fn build(self) -> Result<ModuleGraph, GraphError> {
        let mut seen = HashSet::new();
        for pending in &self.modules {
            if !seen.insert(pending.path.as_str()) {
                return Err(GraphError::DuplicateModule(pending.path.clone()));
            }
        }

        let mut pending_modules = self.modules;
        pending_modules.sort_by(|a, b| a.path.cmp(&b.path));

        let mut index = HashMap::with_capacity(pending_modules.len());
        let mut modules: Vec<Module> = pending_modules
            .into_iter()
            .enumerate()
            .map(|(i, pending)| {
                let id = ModuleId(i as u32);
                index.insert(pending.path.clone(), id);
                Module {
                    id,
                    path: pending.path,
                    size: pending.size,
                    is_entry: pending.is_entry,
                    kind: pending.kind,
                    dependencies: Vec::new(),
                }
            })
            .collect();

        for edge in self.edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) else {
                return Err(GraphError::DanglingEdge {
                    from: edge.from,
                    to: edge.to,
                });
            };
            modules[from.index()].dependencies.push(Dependency {
                target: to,
                dynamic: edge.dynamic,
            });
        }

        Ok(ModuleGraph { modules, index })
    }
}

/// On-disk form of a resolved graph (`graph.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphManifest {
    pub modules: Vec<ManifestModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestModule {
    pub id: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub is_entry: bool,
    /// Inferred from the file extension when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModuleKind>,
    #[serde(default)]
    pub dependencies: Vec<ManifestDependency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDependency {
    pub target: String,
    #[serde(default)]
    pub dynamic: bool,
}

impl GraphManifest {
    pub fn into_graph(self) -> Result<ModuleGraph, GraphError> {
        let mut builder = ModuleGraph::builder();

        for module in self.modules {
            let kind = module.kind.unwrap_or_else(|| {
                Path::new(&module.id)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(ModuleKind::from_extension)
                    .unwrap_or(ModuleKind::Code)
            });

            for dep in &module.dependencies {
                builder = builder.add_edge(&module.id, &dep.target, dep.dynamic);
            }
            builder = builder.add_module(&module.id, module.size, module.is_entry, kind);
        }

        builder.build()
    }
}
