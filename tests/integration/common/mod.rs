#![allow(dead_code)]

use soku_chunker::{Bundle, BundlePlan, ModuleGraph};

pub fn bundle_of<'p>(graph: &ModuleGraph, plan: &'p BundlePlan, main: &str) -> &'p Bundle {
    let id = graph.lookup(main).expect("unknown module");
    plan.bundle_for_main(id).expect("no bundle for module")
}

pub fn members(graph: &ModuleGraph, bundle: &Bundle) -> Vec<String> {
    bundle
        .members
        .iter()
        .map(|m| graph.module(*m).path.clone())
        .collect()
}

pub fn shared_members(graph: &ModuleGraph, plan: &BundlePlan) -> Vec<Vec<String>> {
    plan.extracted().map(|b| members(graph, b)).collect()
}

/// Entries A..D with the B -> C -> D -> B entry cycle
pub fn canonical_graph() -> ModuleGraph {
    ModuleGraph::builder()
        .entry("A.js", 10)
        .entry("B.js", 10)
        .entry("C.js", 10)
        .entry("D.js", 10)
        .module("a.js", 1)
        .module("b.js", 2)
        .module("c.js", 1)
        .module("d.js", 1)
        .edge("A.js", "a.js")
        .edge("A.js", "b.js")
        .edge("A.js", "c.js")
        .edge("A.js", "d.js")
        .edge("B.js", "a.js")
        .edge("B.js", "b.js")
        .edge("B.js", "C.js")
        .edge("C.js", "b.js")
        .edge("C.js", "D.js")
        .edge("D.js", "c.js")
        .edge("D.js", "d.js")
        .edge("D.js", "B.js")
        .build()
        .expect("valid graph")
}
