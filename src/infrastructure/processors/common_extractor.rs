// Shared bundle extraction - moves modules that several bundles contain into common bundles
use crate::core::graph::ModuleGraph;
use crate::core::models::{Bundle, BundleId, BundleType, ExtractionRule, ModuleId};
use crate::infrastructure::processors::DependencyInfoCollector;
use crate::utils::Logger;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Modules currently contained by exactly the same set of bundles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    /// Sorted ids of the contributing bundles; doubles as the combination id
    pub bundles: Vec<BundleId>,
    pub modules: Vec<ModuleId>,
    pub size: u64,
}

impl Combination {
    pub fn use_count(&self) -> usize {
        self.bundles.len()
    }
}

/// Extraction priority: more bundles, more bytes, more modules, then smaller id
pub fn compare_priority(a: &Combination, b: &Combination) -> Ordering {
    b.use_count()
        .cmp(&a.use_count())
        .then_with(|| b.size.cmp(&a.size))
        .then_with(|| b.modules.len().cmp(&a.modules.len()))
        .then_with(|| a.bundles.cmp(&b.bundles))
}

#[derive(Debug, Default)]
struct CandidateSet {
    /// `None` admits every module
    include: Option<BTreeSet<ModuleId>>,
    exclude: BTreeSet<ModuleId>,
}

impl CandidateSet {
    fn contains(&self, module: ModuleId) -> bool {
        if self.exclude.contains(&module) {
            return false;
        }
        self.include.as_ref().map_or(true, |set| set.contains(&module))
    }
}

/// Requests each bundle may still spend under one rule. Every accepted
/// combination costs one request per contributing bundle.
#[derive(Debug)]
struct RequestBudget {
    remaining: Vec<usize>,
}

impl RequestBudget {
    fn new(bundles: &[Bundle], rule: &ExtractionRule) -> Self {
        let remaining = bundles
            .iter()
            .map(|b| rule.request_limit(b).saturating_sub(b.requests_used))
            .collect();
        Self { remaining }
    }

    fn try_reserve(&mut self, combination: &Combination) -> bool {
        if combination.bundles.iter().any(|b| self.remaining[b.index()] == 0) {
            return false;
        }
        for bundle in &combination.bundles {
            self.remaining[bundle.index()] -= 1;
        }
        true
    }
}

pub struct CommonModuleExtractor<'a, 'g> {
    graph: &'g ModuleGraph,
    collector: &'a mut DependencyInfoCollector<'g>,
}

impl<'a, 'g> CommonModuleExtractor<'a, 'g> {
    pub fn new(graph: &'g ModuleGraph, collector: &'a mut DependencyInfoCollector<'g>) -> Self {
        Self { graph, collector }
    }

    /// Applies `rules` in order; request counters carry over from one rule to the next.
    /// `bundles` must be indexed by id.
    pub fn extract(&mut self, mut bundles: Vec<Bundle>, rules: &[ExtractionRule]) -> Vec<Bundle> {
        for (index, rule) in rules.iter().enumerate() {
            self.apply_rule(index, rule, &mut bundles);
        }
        bundles
    }

    fn apply_rule(&mut self, index: usize, rule: &ExtractionRule, bundles: &mut Vec<Bundle>) {
        let candidates = self.select_candidates(rule);
        let combinations = self.cluster(bundles, &candidates, rule);

        if combinations.is_empty() {
            Logger::rule_skipped(index, "no candidate modules");
            return;
        }

        let total: u64 = combinations.iter().map(|c| c.size).sum();
        if rule.min_size > 0 && total < rule.min_size {
            Logger::rule_skipped(
                index,
                &format!("{} candidate bytes below minSize {}", total, rule.min_size),
            );
            return;
        }

        let mut budget = RequestBudget::new(bundles, rule);
        let accepted = match rule.max_size {
            Some(max_size) => self.accept_bounded(combinations, max_size, &mut budget),
            None => accept_unbounded(combinations, rule.min_use_count, &mut budget),
        };

        let mut created = 0;
        let mut moved_bytes = 0;
        for combination in accepted {
            if combination.modules.is_empty() {
                continue;
            }
            moved_bytes += combination.size;
            created += 1;
            migrate(bundles, combination, rule);
        }

        if created == 0 {
            Logger::rule_skipped(index, "no combination accepted");
        } else {
            Logger::rule_applied(index, created, moved_bytes);
        }
    }

    fn select_candidates(&mut self, rule: &ExtractionRule) -> CandidateSet {
        let graph = self.graph;
        let mut candidates = CandidateSet::default();

        if let Some(filter) = &rule.match_filter {
            let mut include = BTreeSet::new();
            for module in graph.modules().filter(|m| m.is_code() && filter.matches(m)) {
                include.insert(module.id);
                include.extend(self.collector.info(module.id).static_deps.iter().copied());
            }
            candidates.include = Some(include);
        }

        if let Some(filter) = &rule.exclude_filter {
            candidates.exclude = graph
                .modules()
                .filter(|m| filter.matches(m))
                .map(|m| m.id)
                .collect();
        }

        candidates
    }

    /// Groups candidate members by the exact set of in-budget bundles containing them.
    /// Shared bundles made by earlier rules are final and never regrouped.
    fn cluster(
        &self,
        bundles: &[Bundle],
        candidates: &CandidateSet,
        rule: &ExtractionRule,
    ) -> Vec<Combination> {
        let mut owners: BTreeMap<ModuleId, Vec<BundleId>> = BTreeMap::new();

        for bundle in bundles {
            if bundle.is_extracted() {
                continue;
            }
            if bundle.requests_used >= rule.request_limit(bundle) {
                debug!("Bundle {} is out of request budget", bundle.id);
                continue;
            }
            for module in &bundle.members {
                if candidates.contains(*module) {
                    owners.entry(*module).or_default().push(bundle.id);
                }
            }
        }

        let mut combinations: BTreeMap<Vec<BundleId>, Combination> = BTreeMap::new();
        for (module, owner_ids) in owners {
            let size = self.graph.module(module).size;
            let combination = combinations
                .entry(owner_ids.clone())
                .or_insert_with(|| Combination {
                    bundles: owner_ids,
                    modules: Vec::new(),
                    size: 0,
                });
            combination.modules.push(module);
            combination.size += size;
        }

        combinations.into_values().collect()
    }

    /// Greedy walk over ranked combinations under a byte ceiling. The first
    /// combination that does not fit contributes its largest modules that
    /// still fit, and the walk ends there.
    fn accept_bounded(
        &self,
        mut combinations: Vec<Combination>,
        max_size: u64,
        budget: &mut RequestBudget,
    ) -> Vec<Combination> {
        combinations.sort_by(compare_priority);

        let mut total: u64 = 0;
        let mut accepted = Vec::new();

        for combination in combinations {
            if !budget.try_reserve(&combination) {
                debug!("Combination {:?} is out of request budget", combination.bundles);
                continue;
            }

            if total.saturating_add(combination.size) <= max_size {
                total += combination.size;
                accepted.push(combination);
                continue;
            }

            let mut modules = combination.modules.clone();
            modules.sort_by(|a, b| {
                let (size_a, size_b) = (self.graph.module(*a).size, self.graph.module(*b).size);
                size_b.cmp(&size_a).then_with(|| a.cmp(b))
            });

            let mut partial = Combination {
                bundles: combination.bundles,
                modules: Vec::new(),
                size: 0,
            };
            for module in modules {
                let size = self.graph.module(module).size;
                if total.saturating_add(size) > max_size {
                    break;
                }
                total += size;
                partial.size += size;
                partial.modules.push(module);
            }
            partial.modules.sort();
            accepted.push(partial);
            break;
        }

        accepted
    }
}

/// Weakly shared combinations move; combinations used at least `min_use_count`
/// times stay where they are.
fn accept_unbounded(
    combinations: Vec<Combination>,
    min_use_count: usize,
    budget: &mut RequestBudget,
) -> Vec<Combination> {
    combinations
        .into_iter()
        .filter(|c| c.use_count() < min_use_count)
        .filter(|c| budget.try_reserve(c))
        .collect()
}

fn migrate(bundles: &mut Vec<Bundle>, combination: Combination, rule: &ExtractionRule) {
    let id = BundleId(bundles.len());
    let bundle_type = combination
        .bundles
        .iter()
        .map(|owner| bundles[owner.index()].bundle_type)
        .reduce(BundleType::merge)
        .unwrap_or(BundleType::Static);

    for owner in &combination.bundles {
        let bundle = &mut bundles[owner.index()];
        for module in &combination.modules {
            bundle.members.remove(module);
        }
        if bundle.add_parent(id) {
            bundle.requests_used += 1;
        }
    }

    debug!(
        "Shared bundle {} takes {} modules ({} bytes) from {:?}",
        id,
        combination.modules.len(),
        combination.size,
        combination.bundles
    );

    let mut shared = Bundle::new(id, None, bundle_type);
    shared.members.extend(combination.modules);
    shared.output_path = Some(rule.output_path.clone());
    bundles.push(shared);
}
