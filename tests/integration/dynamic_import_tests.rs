mod common;

use common::{bundle_of, members};
use soku_chunker::{BundleType, ChunkingService, ExtractionRule, ModuleGraph};

#[test]
fn test_dynamic_boundary() {
    let graph = ModuleGraph::builder()
        .entry("E.js", 10)
        .module("e.js", 5)
        .module("f.js", 5)
        .module("g.js", 5)
        .edge("E.js", "e.js")
        .dynamic_edge("E.js", "g.js")
        .edge("g.js", "f.js")
        .edge("g.js", "E.js")
        .build()
        .unwrap();

    let plan = ChunkingService::new().run(&graph);
    let entry = bundle_of(&graph, &plan, "E.js");
    let lazy = bundle_of(&graph, &plan, "g.js");

    assert_eq!(members(&graph, entry), vec!["e.js"]);
    assert_eq!(members(&graph, lazy), vec!["f.js", "g.js"]);
    assert!(lazy.members.is_disjoint(&entry.members));
    assert!(lazy.parents.is_empty());
    assert!(entry.parents.is_empty());
    assert_eq!(lazy.bundle_type, BundleType::Dynamic);
    assert!(plan.check_invariants().is_empty());
}

#[test]
fn test_dynamic_edges_do_not_affect_static_dedup() {
    // lib.js reaches shared.js only through a dynamic import, so app.js keeps
    // its own copy even though lib.js is its parent.
    let graph = ModuleGraph::builder()
        .entry("app.js", 1)
        .entry("lib.js", 1)
        .module("lazy.js", 1)
        .module("shared.js", 10)
        .edge("app.js", "lib.js")
        .edge("app.js", "shared.js")
        .dynamic_edge("lib.js", "lazy.js")
        .edge("lazy.js", "shared.js")
        .build()
        .unwrap();

    let plan = ChunkingService::new().run(&graph);
    let app = bundle_of(&graph, &plan, "app.js");
    let lazy = bundle_of(&graph, &plan, "lazy.js");

    assert_eq!(members(&graph, app), vec!["shared.js"]);
    assert_eq!(members(&graph, lazy), vec!["lazy.js", "shared.js"]);
}

#[test]
fn test_diamond_dynamic_target_reuses_one_bundle() {
    let graph = ModuleGraph::builder()
        .entry("admin.js", 1)
        .entry("shop.js", 1)
        .module("chart.js", 50)
        .module("d3.js", 200)
        .dynamic_edge("admin.js", "chart.js")
        .dynamic_edge("shop.js", "chart.js")
        .edge("chart.js", "d3.js")
        .build()
        .unwrap();

    let plan = ChunkingService::new().run(&graph);
    let chart = graph.lookup("chart.js").unwrap();

    assert_eq!(plan.len(), 3);
    assert_eq!(plan.bundles_containing(chart).len(), 1);
    assert_eq!(
        members(&graph, bundle_of(&graph, &plan, "chart.js")),
        vec!["chart.js", "d3.js"]
    );
}

#[test]
fn test_dynamically_imported_entry_keeps_its_bundle() {
    let graph = ModuleGraph::builder()
        .entry("main.js", 1)
        .entry("settings.js", 1)
        .module("form.js", 10)
        .dynamic_edge("main.js", "settings.js")
        .edge("settings.js", "form.js")
        .build()
        .unwrap();

    let plan = ChunkingService::new().run(&graph);
    let settings = bundle_of(&graph, &plan, "settings.js");

    assert_eq!(plan.len(), 2);
    assert_eq!(settings.bundle_type, BundleType::StaticOrDynamic);
    assert_eq!(members(&graph, settings), vec!["form.js"]);
}

#[test]
fn test_nested_dynamic_imports_are_resolved_in_queue_order() {
    let graph = ModuleGraph::builder()
        .entry("main.js", 1)
        .module("a.js", 1)
        .module("b.js", 1)
        .module("c.js", 1)
        .dynamic_edge("main.js", "b.js")
        .dynamic_edge("main.js", "a.js")
        .dynamic_edge("a.js", "c.js")
        .dynamic_edge("c.js", "a.js")
        .build()
        .unwrap();

    let plan = ChunkingService::new().run(&graph);
    let order: Vec<String> = plan
        .bundles()
        .iter()
        .map(|b| graph.module(b.main_module.unwrap()).path.clone())
        .collect();

    // Queue entries from main.js come out in canonical order, then a.js's import.
    assert_eq!(order, vec!["main.js", "a.js", "b.js", "c.js"]);
}

#[test]
fn test_async_request_budget_limits_dynamic_bundles() {
    let graph = ModuleGraph::builder()
        .entry("main.js", 1)
        .module("page-a.js", 1)
        .module("page-b.js", 1)
        .module("icons.js", 80)
        .module("table.js", 40)
        .dynamic_edge("main.js", "page-a.js")
        .dynamic_edge("main.js", "page-b.js")
        .edge("page-a.js", "icons.js")
        .edge("page-b.js", "icons.js")
        .edge("page-a.js", "table.js")
        .edge("page-b.js", "table.js")
        .build()
        .unwrap();

    let rules = vec![
        ExtractionRule::new()
            .with_match(soku_chunker::ModuleFilter::pattern("^icons").unwrap())
            .with_max_size(1_000)
            .with_max_async_requests(1),
        ExtractionRule::new()
            .with_match(soku_chunker::ModuleFilter::pattern("^table").unwrap())
            .with_max_size(1_000)
            .with_max_async_requests(1),
    ];
    let plan = ChunkingService::with_rules(rules).run(&graph);

    // The first rule spends each page's single async request on icons.js.
    let extracted: Vec<Vec<String>> = plan.extracted().map(|b| members(&graph, b)).collect();
    assert_eq!(extracted, vec![vec!["icons.js"]]);

    let page_a = bundle_of(&graph, &plan, "page-a.js");
    assert_eq!(page_a.requests_used, 1);
    assert_eq!(members(&graph, page_a), vec!["page-a.js", "table.js"]);

    // Initial bundles draw from a separate budget.
    let relaxed = ChunkingService::with_rules(vec![ExtractionRule::new()
        .with_max_size(1_000)
        .with_max_initial_requests(0)
        .with_max_async_requests(5)])
    .run(&graph);
    assert!(relaxed.extracted().all(|b| b.bundle_type == BundleType::Dynamic));
}
