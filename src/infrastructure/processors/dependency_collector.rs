// Dependency info collection - static, dynamic and entry closures per module
use crate::core::graph::ModuleGraph;
use crate::core::models::{Dependency, ModuleId, ModuleInfo};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::rc::Rc;

/// How a single edge contributes to its source module's info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Entry,
    Dynamic,
    Static,
}

/// Memoized, cycle-safe computation of [`ModuleInfo`].
///
/// Non-entry code modules connected by static edges are condensed into
/// strongly connected components first, so modules on a static cycle share one
/// closure regardless of which of them is asked for first.
pub struct DependencyInfoCollector<'g> {
    graph: &'g ModuleGraph,
    component_of: HashMap<ModuleId, usize>,
    /// Per component: members plus everything statically reachable from them
    closures: Vec<ModuleInfo>,
    cache: HashMap<ModuleId, Rc<ModuleInfo>>,
}

impl<'g> DependencyInfoCollector<'g> {
    pub fn new(graph: &'g ModuleGraph) -> Self {
        let mut collector = Self {
            graph,
            component_of: HashMap::new(),
            closures: Vec::new(),
            cache: HashMap::new(),
        };
        collector.condense();
        collector
    }

    /// Derived info for `module`. Non-code modules yield empty sets.
    pub fn info(&mut self, module: ModuleId) -> Rc<ModuleInfo> {
        if let Some(info) = self.cache.get(&module) {
            return Rc::clone(info);
        }

        let info = Rc::new(self.compute(module));
        self.cache.insert(module, Rc::clone(&info));
        info
    }

    fn edge_kind(&self, source: ModuleId, dep: &Dependency) -> Option<EdgeKind> {
        if dep.target == source {
            return None;
        }
        let target = self.graph.module(dep.target);
        if !target.is_code() {
            return None;
        }

        Some(if dep.dynamic {
            EdgeKind::Dynamic
        } else if target.is_entry {
            EdgeKind::Entry
        } else {
            EdgeKind::Static
        })
    }

    fn compute(&self, module: ModuleId) -> ModuleInfo {
        let mut info = ModuleInfo::default();
        let source = self.graph.module(module);
        if !source.is_code() {
            return info;
        }

        for dep in &source.dependencies {
            match self.edge_kind(module, dep) {
                Some(EdgeKind::Entry) => {
                    info.entry_deps.insert(dep.target);
                }
                Some(EdgeKind::Dynamic) => {
                    info.dynamic_deps.insert(dep.target);
                }
                Some(EdgeKind::Static) => {
                    info.static_deps.insert(dep.target);
                    let closure = &self.closures[self.component_of[&dep.target]];
                    merge_into(&mut info, closure);
                }
                None => {}
            }
        }

        info.entry_deps.remove(&module);
        info.static_deps.remove(&module);
        info.dynamic_deps.remove(&module);
        info
    }

    fn condense(&mut self) {
        let mut static_graph: DiGraph<ModuleId, ()> = DiGraph::new();
        let mut node_of: HashMap<ModuleId, NodeIndex> = HashMap::new();

        for module in self.graph.modules() {
            if module.is_code() && !module.is_entry {
                node_of.insert(module.id, static_graph.add_node(module.id));
            }
        }

        for module in self.graph.modules() {
            let Some(&from) = node_of.get(&module.id) else {
                continue;
            };
            for dep in &module.dependencies {
                if self.edge_kind(module.id, dep) == Some(EdgeKind::Static) {
                    static_graph.add_edge(from, node_of[&dep.target], ());
                }
            }
        }

        // tarjan_scc yields components in reverse topological order:
        // every component comes after the components it depends on.
        let components = tarjan_scc(&static_graph);
        for (index, component) in components.iter().enumerate() {
            for node in component {
                self.component_of.insert(static_graph[*node], index);
            }
        }

        for (index, component) in components.iter().enumerate() {
            let mut closure = ModuleInfo::default();

            for node in component {
                let member = static_graph[*node];
                closure.static_deps.insert(member);

                for dep in &self.graph.module(member).dependencies {
                    match self.edge_kind(member, dep) {
                        Some(EdgeKind::Entry) => {
                            closure.entry_deps.insert(dep.target);
                        }
                        Some(EdgeKind::Dynamic) => {
                            closure.dynamic_deps.insert(dep.target);
                        }
                        Some(EdgeKind::Static) => {
                            let other = self.component_of[&dep.target];
                            if other != index {
                                merge_into(&mut closure, &self.closures[other]);
                            }
                        }
                        None => {}
                    }
                }
            }

            self.closures.push(closure);
        }
    }
}

fn merge_into(info: &mut ModuleInfo, other: &ModuleInfo) {
    info.entry_deps.extend(other.entry_deps.iter().copied());
    info.static_deps.extend(other.static_deps.iter().copied());
    info.dynamic_deps.extend(other.dynamic_deps.iter().copied());
}
