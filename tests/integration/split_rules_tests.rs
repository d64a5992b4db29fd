mod common;

use common::{bundle_of, members, shared_members};
use soku_chunker::{
    Bundle, ChunkingService, ExtractionRule, ModuleFilter, ModuleGraph, OutputPath,
};
use std::sync::Arc;

/// Three pages over a small vendor tree. `react` is used by every page,
/// `lodash` by two of them.
fn app() -> ModuleGraph {
    ModuleGraph::builder()
        .entry("src/cart.js", 2)
        .entry("src/home.js", 2)
        .entry("src/search.js", 2)
        .module("node_modules/react/index.js", 100)
        .module("node_modules/react/jsx.js", 20)
        .module("node_modules/lodash/debounce.js", 30)
        .module("src/utils/price.js", 10)
        .module("src/utils/query.js", 8)
        .edge("src/cart.js", "node_modules/react/index.js")
        .edge("src/home.js", "node_modules/react/index.js")
        .edge("src/search.js", "node_modules/react/index.js")
        .edge("node_modules/react/index.js", "node_modules/react/jsx.js")
        .edge("src/home.js", "node_modules/lodash/debounce.js")
        .edge("src/search.js", "node_modules/lodash/debounce.js")
        .edge("src/cart.js", "src/utils/price.js")
        .edge("src/home.js", "src/utils/price.js")
        .edge("src/search.js", "src/utils/query.js")
        .build()
        .unwrap()
}

fn vendor_rule() -> ExtractionRule {
    ExtractionRule::new()
        .with_match(ModuleFilter::pattern("node_modules/").unwrap())
        .with_max_size(1_000)
        .with_output_path(OutputPath::Template("vendor.[id].js".to_string()))
}

#[test]
fn test_match_filter_limits_extraction() {
    let graph = app();
    let plan = ChunkingService::new().with_rule(vendor_rule()).run(&graph);

    assert_eq!(
        shared_members(&graph, &plan),
        vec![
            vec!["node_modules/react/index.js", "node_modules/react/jsx.js"],
            vec!["node_modules/lodash/debounce.js"],
        ]
    );

    // src/utils/price.js is shared too but outside the filter.
    let price = graph.lookup("src/utils/price.js").unwrap();
    assert_eq!(plan.bundles_containing(price).len(), 2);
}

#[test]
fn test_match_filter_pulls_in_static_closure() {
    let graph = app();
    let rule = ExtractionRule::new()
        .with_match(ModuleFilter::pattern("react/index").unwrap())
        .with_max_size(1_000);
    let plan = ChunkingService::new().with_rule(rule).run(&graph);

    assert_eq!(
        shared_members(&graph, &plan),
        vec![vec!["node_modules/react/index.js", "node_modules/react/jsx.js"]]
    );
}

#[test]
fn test_exclude_filter_wins_over_match() {
    let graph = app();
    let rule = vendor_rule().with_exclude(ModuleFilter::pattern("lodash").unwrap());
    let plan = ChunkingService::new().with_rule(rule).run(&graph);

    let shared = shared_members(&graph, &plan);
    assert_eq!(shared.len(), 1);
    assert!(!shared[0].iter().any(|p| p.contains("lodash")));
}

#[test]
fn test_predicate_filter() {
    let graph = app();
    let rule = ExtractionRule::new()
        .with_match(ModuleFilter::predicate("large modules", |m| m.size >= 30))
        .with_max_size(1_000);
    let plan = ChunkingService::new().with_rule(rule).run(&graph);

    let moved: Vec<String> = shared_members(&graph, &plan).into_iter().flatten().collect();
    assert!(moved.contains(&"node_modules/react/index.js".to_string()));
    assert!(moved.contains(&"node_modules/lodash/debounce.js".to_string()));
    assert!(!moved.contains(&"src/utils/price.js".to_string()));
}

#[test]
fn test_unbounded_rule_is_noop_for_well_shared_combinations() {
    let graph = app();
    let before = ChunkingService::new().run(&graph);
    let after = ChunkingService::new()
        .with_rule(ExtractionRule::new().with_min_use_count(1))
        .run(&graph);

    // No combination is used by fewer than one bundle.
    assert_eq!(after.extracted().count(), 0);
    assert_eq!(before.fingerprint(), after.fingerprint());

    let default_rule = ChunkingService::new().with_rule(ExtractionRule::new()).run(&graph);
    assert_eq!(before.fingerprint(), default_rule.fingerprint());
}

#[test]
fn test_unbounded_rule_moves_weakly_shared_combinations() {
    let graph = app();
    let plan = ChunkingService::new()
        .with_rule(ExtractionRule::new().with_min_use_count(3))
        .run(&graph);

    let moved: Vec<String> = shared_members(&graph, &plan).into_iter().flatten().collect();
    assert!(moved.contains(&"node_modules/lodash/debounce.js".to_string()));
    assert!(moved.contains(&"src/utils/price.js".to_string()));
    assert!(moved.contains(&"src/utils/query.js".to_string()));

    // react is in all three pages and stays duplicated in place.
    let react = graph.lookup("node_modules/react/index.js").unwrap();
    assert_eq!(plan.bundles_containing(react).len(), 3);
}

#[test]
fn test_bounded_rule_ignores_min_use_count() {
    let graph = app();
    let plan = ChunkingService::new()
        .with_rule(vendor_rule().with_min_use_count(10))
        .run(&graph);

    assert_eq!(plan.extracted().count(), 2);
}

#[test]
fn test_request_budget_carries_over_between_rules() {
    let graph = app();
    let rules = vec![
        vendor_rule().with_max_initial_requests(2),
        ExtractionRule::new()
            .with_match(ModuleFilter::pattern("src/utils").unwrap())
            .with_max_size(1_000)
            .with_max_initial_requests(2),
    ];
    let plan = ChunkingService::with_rules(rules).run(&graph);

    // home.js and search.js spent both requests on react and lodash; only
    // cart.js can still take a shared bundle.
    let home = bundle_of(&graph, &plan, "src/home.js");
    let search = bundle_of(&graph, &plan, "src/search.js");
    let cart = bundle_of(&graph, &plan, "src/cart.js");
    assert_eq!(home.requests_used, 2);
    assert_eq!(search.requests_used, 2);
    assert_eq!(members(&graph, home), vec!["src/utils/price.js"]);
    assert_eq!(cart.parents.len(), 2);

    let shared = shared_members(&graph, &plan);
    assert_eq!(shared.len(), 3);
    assert_eq!(shared[2], vec!["src/utils/price.js"]);
}

#[test]
fn test_budgets_reset_between_runs() {
    let graph = app();
    let service = ChunkingService::with_rules(vec![vendor_rule().with_max_initial_requests(1)]);

    let first = service.run(&graph);
    let second = service.run(&graph);

    assert_eq!(first.extracted().count(), 1);
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn test_rule_without_candidates_produces_no_bundle() {
    let graph = app();
    let rule = ExtractionRule::new()
        .with_match(ModuleFilter::pattern("does-not-exist").unwrap())
        .with_max_size(1_000);
    let plan = ChunkingService::new().with_rule(rule).run(&graph);

    assert_eq!(plan.extracted().count(), 0);
    assert_eq!(plan.len(), 3);
}

#[test]
fn test_output_path_reaches_shared_bundles_only() {
    let graph = app();
    let namer =
        OutputPath::Function(Arc::new(|bundle: &Bundle| format!("common-{}.js", bundle.id.0)));
    let rules = vec![
        vendor_rule(),
        ExtractionRule::new()
            .with_max_size(1_000)
            .with_output_path(namer),
    ];
    let plan = ChunkingService::with_rules(rules).run(&graph);

    for bundle in plan.bundles() {
        assert_eq!(bundle.output_path.is_some(), bundle.is_extracted());
    }

    let names: Vec<String> = plan
        .extracted()
        .map(|b| b.output_path.as_ref().unwrap().describe(b))
        .collect();
    assert_eq!(names[0], "vendor.[id].js");
    assert!(names[2..].iter().all(|n| n.starts_with("common-")));
}
