use crate::core::graph::ModuleGraph;
use crate::core::models::{BundlePlan, Module};
use crate::utils::Result;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;

/// Predicate over modules used by split rule filters
pub trait ModuleMatcher: Send + Sync {
    fn matches(&self, module: &Module) -> bool;
}

impl ModuleMatcher for Regex {
    fn matches(&self, module: &Module) -> bool {
        self.is_match(&module.path)
    }
}

/// Adapts a closure into a [`ModuleMatcher`]
pub struct FnMatcher<F>(pub F);

impl<F> ModuleMatcher for FnMatcher<F>
where
    F: Fn(&Module) -> bool + Send + Sync,
{
    fn matches(&self, module: &Module) -> bool {
        (self.0)(module)
    }
}

/// Source of resolved module graphs
#[async_trait]
pub trait GraphSource: Send + Sync {
    async fn load_graph(&self, path: &Path) -> Result<ModuleGraph>;
}

/// Turns a resolved module graph into a bundle plan
pub trait BundlePlanner {
    fn plan(&self, graph: &ModuleGraph) -> BundlePlan;
}
