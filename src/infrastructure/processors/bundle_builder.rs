// Bundle construction - one bundle per entry and per distinct dynamic-import target
use crate::core::graph::ModuleGraph;
use crate::core::models::{Bundle, BundleId, BundleType, ModuleId};
use crate::infrastructure::processors::DependencyInfoCollector;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Construction state of a bundle during the static pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    NotStarted,
    InProgress,
    Done,
}

/// A dynamic import waiting for the second pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicImport {
    pub origin: BundleId,
    pub target: ModuleId,
}

/// Builds the initial bundle set in two explicit stages:
/// [`build_entries`](Self::build_entries) creates entry bundles and queues
/// dynamic imports, [`resolve_dynamic_imports`](Self::resolve_dynamic_imports)
/// drains the queue.
pub struct BundleBuilder<'a, 'g> {
    graph: &'g ModuleGraph,
    collector: &'a mut DependencyInfoCollector<'g>,
    bundles: Vec<Bundle>,
    states: Vec<BuildState>,
    bundle_by_module: HashMap<ModuleId, BundleId>,
    dynamic_queue: VecDeque<DynamicImport>,
}

impl<'a, 'g> BundleBuilder<'a, 'g> {
    pub fn new(graph: &'g ModuleGraph, collector: &'a mut DependencyInfoCollector<'g>) -> Self {
        Self {
            graph,
            collector,
            bundles: Vec::new(),
            states: Vec::new(),
            bundle_by_module: HashMap::new(),
            dynamic_queue: VecDeque::new(),
        }
    }

    /// Runs both stages and returns bundles ordered by id
    pub fn build(mut self, entries: &[ModuleId]) -> Vec<Bundle> {
        self.build_entries(entries);
        self.resolve_dynamic_imports();
        self.finish()
    }

    /// Static pass. Entries are visited in reverse canonical order so that
    /// entries sorting first keep their outgoing edges when a cycle is broken.
    pub fn build_entries(&mut self, entries: &[ModuleId]) {
        let mut ordered: Vec<ModuleId> = entries.to_vec();
        ordered.sort();
        ordered.dedup();

        for entry in ordered.into_iter().rev() {
            self.create_bundle(entry);
        }
    }

    pub fn pending_dynamic_imports(&self) -> impl Iterator<Item = &DynamicImport> {
        self.dynamic_queue.iter()
    }

    /// Dynamic pass, run only once every entry bundle exists
    pub fn resolve_dynamic_imports(&mut self) {
        let graph = self.graph;
        while let Some(import) = self.dynamic_queue.pop_front() {
            let target = graph.module(import.target);

            if target.is_entry {
                let bundle = self.create_bundle(import.target);
                let bundle = &mut self.bundles[bundle.index()];
                if bundle.bundle_type == BundleType::Static {
                    debug!("Entry {} is also loaded dynamically", target.path);
                    bundle.bundle_type = BundleType::StaticOrDynamic;
                }
                continue;
            }

            if let Some(existing) = self.bundle_by_module.get(&import.target) {
                debug!("Reusing async bundle {} for {}", existing, target.path);
                continue;
            }

            self.create_dynamic_bundle(import);
        }
    }

    pub fn state_of(&self, module: ModuleId) -> BuildState {
        match self.bundle_by_module.get(&module) {
            Some(bundle) => self.states[bundle.index()],
            None => BuildState::NotStarted,
        }
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    /// Seeds each bundle's request counter with the parent links it already needs
    pub fn finish(mut self) -> Vec<Bundle> {
        for bundle in &mut self.bundles {
            bundle.requests_used = bundle.parents.len();
        }
        self.bundles
    }

    fn allocate(&mut self, main_module: ModuleId, bundle_type: BundleType) -> BundleId {
        let id = BundleId(self.bundles.len());
        self.bundles.push(Bundle::new(id, Some(main_module), bundle_type));
        self.states.push(BuildState::InProgress);
        self.bundle_by_module.insert(main_module, id);
        id
    }

    fn create_bundle(&mut self, module: ModuleId) -> BundleId {
        if let Some(existing) = self.bundle_by_module.get(&module) {
            return *existing;
        }

        let id = self.allocate(module, BundleType::Static);
        let info = self.collector.info(module);

        for entry in &info.entry_deps {
            if self.state_of(*entry) == BuildState::InProgress {
                debug!(
                    "Breaking entry cycle: {} -> {}",
                    self.graph.module(module).path,
                    self.graph.module(*entry).path
                );
                continue;
            }
            let parent = self.create_bundle(*entry);
            self.bundles[id.index()].add_parent(parent);
        }

        self.populate(id, info.static_deps.iter().copied());

        for target in &info.dynamic_deps {
            self.dynamic_queue.push_back(DynamicImport {
                origin: id,
                target: *target,
            });
        }

        self.states[id.index()] = BuildState::Done;
        id
    }

    fn create_dynamic_bundle(&mut self, import: DynamicImport) -> BundleId {
        let id = self.allocate(import.target, BundleType::Dynamic);
        let info = self.collector.info(import.target);

        // Behaves like a synthetic module importing both the origin's main module
        // and the target: the origin only drives exclusion, it is not a real
        // load-order dependency and is unlinked again below.
        self.bundles[id.index()].add_parent(import.origin);
        for entry in &info.entry_deps {
            let parent = self.create_bundle(*entry);
            self.bundles[id.index()].add_parent(parent);
        }

        let candidates = std::iter::once(import.target).chain(info.static_deps.iter().copied());
        self.populate(id, candidates);

        self.bundles[id.index()].parents.retain(|p| *p != import.origin);

        debug!(
            "Async bundle {} for {} ({} modules)",
            id,
            self.graph.module(import.target).path,
            self.bundles[id.index()].members.len()
        );

        for target in &info.dynamic_deps {
            self.dynamic_queue.push_back(DynamicImport {
                origin: id,
                target: *target,
            });
        }

        self.states[id.index()] = BuildState::Done;
        id
    }

    fn populate(&mut self, id: BundleId, candidates: impl Iterator<Item = ModuleId>) {
        let available = self.available_from_ancestors(id);
        let bundle = &mut self.bundles[id.index()];
        for module in candidates {
            if !available.contains(&module) {
                bundle.members.insert(module);
            }
        }
    }

    /// Static closures of every ancestor's main module
    fn available_from_ancestors(&mut self, id: BundleId) -> BTreeSet<ModuleId> {
        let mut available = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<BundleId> = self.bundles[id.index()].parents.clone();

        while let Some(ancestor) = stack.pop() {
            if !visited.insert(ancestor) {
                continue;
            }
            let bundle = &self.bundles[ancestor.index()];
            stack.extend(bundle.parents.iter().copied());

            if let Some(main) = bundle.main_module {
                available.insert(main);
                available.extend(self.collector.info(main).static_deps.iter().copied());
            }
        }

        available
    }
}
