use crate::core::{graph::ModuleGraph, interfaces::BundlePlanner, models::*};
use crate::infrastructure::{BundleBuilder, CommonModuleExtractor, DependencyInfoCollector};
use crate::utils::{Logger, Timer};

/// Main chunking service: entry and async bundles first, then shared-bundle rules.
///
/// Every run starts from fresh memo tables and request counters, so one
/// service can plan any number of graphs.
#[derive(Debug, Clone, Default)]
pub struct ChunkingService {
    rules: Vec<ExtractionRule>,
}

impl ChunkingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    pub fn run(&self, graph: &ModuleGraph) -> BundlePlan {
        let timer = Timer::start("Chunk planning");
        let entries = graph.entries();
        Logger::plan_start(graph.len(), entries.len(), self.rules.len());

        let mut collector = DependencyInfoCollector::new(graph);

        let bundles = {
            let _timer = Timer::start("Bundle construction");
            BundleBuilder::new(graph, &mut collector).build(&entries)
        };

        let async_bundles = bundles
            .iter()
            .filter(|b| b.bundle_type == BundleType::Dynamic)
            .count();
        Logger::bundles_built(bundles.len() - async_bundles, async_bundles);

        let bundles = {
            let _timer = Timer::start("Shared bundle extraction");
            CommonModuleExtractor::new(graph, &mut collector).extract(bundles, &self.rules)
        };

        let plan = BundlePlan::new(bundles);

        let violations = plan.check_invariants();
        if !violations.is_empty() {
            Logger::warn(&format!("Plan invariant violations: {:?}", violations));
        }

        Logger::plan_complete(plan.len(), &plan.fingerprint(), timer.elapsed());
        plan
    }
}

impl BundlePlanner for ChunkingService {
    fn plan(&self, graph: &ModuleGraph) -> BundlePlan {
        self.run(graph)
    }
}
