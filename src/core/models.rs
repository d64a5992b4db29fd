use crate::core::graph::ModuleGraph;
use crate::core::interfaces::ModuleMatcher;
use crate::utils::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// Arena index of a module. Ordering follows the module id string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Script code; the only kind the chunker places into bundles
    #[default]
    Code,
    Style,
    Markup,
    Asset,
}

impl ModuleKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => ModuleKind::Code,
            "css" | "scss" | "sass" | "less" => ModuleKind::Style,
            "html" | "htm" => ModuleKind::Markup,
            _ => ModuleKind::Asset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub target: ModuleId,
    pub dynamic: bool,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    /// Stable identity, also the canonical sort key
    pub path: String,
    pub size: u64,
    pub is_entry: bool,
    pub kind: ModuleKind,
    pub dependencies: Vec<Dependency>,
}

impl Module {
    pub fn is_code(&self) -> bool {
        self.kind == ModuleKind::Code
    }
}

/// Derived dependency sets for one module, computed once per build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Entry modules reachable through static edges only
    pub entry_deps: BTreeSet<ModuleId>,
    /// Non-entry modules reachable through static edges only
    pub static_deps: BTreeSet<ModuleId>,
    /// Targets of dynamic edges leaving the static closure
    pub dynamic_deps: BTreeSet<ModuleId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BundleId(pub usize);

impl BundleId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BundleType {
    Static,
    Dynamic,
    StaticOrDynamic,
}

impl BundleType {
    /// Dynamically reached bundles draw from the async request budget
    pub fn is_async(self) -> bool {
        self == BundleType::Dynamic
    }

    pub fn merge(self, other: BundleType) -> BundleType {
        if self == other {
            self
        } else {
            BundleType::StaticOrDynamic
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BundleType::Static => "static",
            BundleType::Dynamic => "dynamic",
            BundleType::StaticOrDynamic => "staticOrDynamic",
        }
    }
}

/// Naming scheme handed to the emitter for extracted bundles
#[derive(Clone)]
pub enum OutputPath {
    Template(String),
    Function(Arc<dyn Fn(&Bundle) -> String + Send + Sync>),
}

impl OutputPath {
    pub fn describe(&self, bundle: &Bundle) -> String {
        match self {
            OutputPath::Template(template) => template.clone(),
            OutputPath::Function(f) => f(bundle),
        }
    }
}

impl Default for OutputPath {
    fn default() -> Self {
        OutputPath::Template("[name].[id].js".to_string())
    }
}

impl fmt::Debug for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputPath::Template(template) => f.debug_tuple("Template").field(template).finish(),
            OutputPath::Function(_) => f.write_str("Function(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bundle {
    pub id: BundleId,
    /// Entry or dynamic-import target that created the bundle; `None` for extracted bundles
    pub main_module: Option<ModuleId>,
    pub members: BTreeSet<ModuleId>,
    pub parents: Vec<BundleId>,
    pub bundle_type: BundleType,
    /// Parent links already consumed against the request budget
    pub requests_used: usize,
    pub output_path: Option<OutputPath>,
}

impl Bundle {
    pub fn new(id: BundleId, main_module: Option<ModuleId>, bundle_type: BundleType) -> Self {
        Self {
            id,
            main_module,
            members: BTreeSet::new(),
            parents: Vec::new(),
            bundle_type,
            requests_used: 0,
            output_path: None,
        }
    }

    /// Returns false when the link already exists
    pub fn add_parent(&mut self, parent: BundleId) -> bool {
        if parent == self.id || self.parents.contains(&parent) {
            return false;
        }
        self.parents.push(parent);
        true
    }

    pub fn size(&self, graph: &ModuleGraph) -> u64 {
        self.members.iter().map(|m| graph.module(*m).size).sum()
    }

    pub fn is_extracted(&self) -> bool {
        self.main_module.is_none()
    }
}

/// Module predicate used by split rules
#[derive(Clone)]
pub struct ModuleFilter {
    label: String,
    matcher: Arc<dyn ModuleMatcher>,
}

impl ModuleFilter {
    /// Regular expression matched against the module id
    pub fn pattern(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            label: pattern.to_string(),
            matcher: Arc::new(regex),
        })
    }

    pub fn predicate<F>(label: &str, f: F) -> Self
    where
        F: Fn(&Module) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.to_string(),
            matcher: Arc::new(crate::core::interfaces::FnMatcher(f)),
        }
    }

    pub fn matches(&self, module: &Module) -> bool {
        self.matcher.matches(module)
    }
}

impl fmt::Debug for ModuleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleFilter").field(&self.label).finish()
    }
}

/// One shared-bundle extraction rule. Absent limits mean "no constraint".
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub match_filter: Option<ModuleFilter>,
    pub exclude_filter: Option<ModuleFilter>,
    pub min_use_count: usize,
    pub min_size: u64,
    /// `None` selects the unbounded policy
    pub max_size: Option<u64>,
    pub max_initial_requests: usize,
    pub max_async_requests: usize,
    pub output_path: OutputPath,
}

impl Default for ExtractionRule {
    fn default() -> Self {
        Self {
            match_filter: None,
            exclude_filter: None,
            min_use_count: 0,
            min_size: 0,
            max_size: None,
            max_initial_requests: usize::MAX,
            max_async_requests: usize::MAX,
            output_path: OutputPath::default(),
        }
    }
}

impl ExtractionRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match(mut self, filter: ModuleFilter) -> Self {
        self.match_filter = Some(filter);
        self
    }

    pub fn with_exclude(mut self, filter: ModuleFilter) -> Self {
        self.exclude_filter = Some(filter);
        self
    }

    pub fn with_min_use_count(mut self, count: usize) -> Self {
        self.min_use_count = count;
        self
    }

    pub fn with_min_size(mut self, bytes: u64) -> Self {
        self.min_size = bytes;
        self
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn with_max_initial_requests(mut self, requests: usize) -> Self {
        self.max_initial_requests = requests;
        self
    }

    pub fn with_max_async_requests(mut self, requests: usize) -> Self {
        self.max_async_requests = requests;
        self
    }

    pub fn with_output_path(mut self, output_path: OutputPath) -> Self {
        self.output_path = output_path;
        self
    }

    /// Request ceiling that applies to `bundle` under this rule
    pub fn request_limit(&self, bundle: &Bundle) -> usize {
        if bundle.bundle_type.is_async() {
            self.max_async_requests
        } else {
            self.max_initial_requests
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanViolation {
    AncestorDuplication {
        bundle: BundleId,
        parent: BundleId,
        module: ModuleId,
    },
    ParentCycle {
        bundle: BundleId,
    },
    EmptySharedBundle {
        bundle: BundleId,
    },
}

/// Final, immutable bundle set
#[derive(Debug, Clone)]
pub struct BundlePlan {
    bundles: Vec<Bundle>,
}

impl BundlePlan {
    pub fn new(mut bundles: Vec<Bundle>) -> Self {
        bundles.sort_by_key(|b| b.id);
        Self { bundles }
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    pub fn get(&self, id: BundleId) -> Option<&Bundle> {
        self.bundles.get(id.index()).filter(|b| b.id == id)
    }

    pub fn bundle_for_main(&self, module: ModuleId) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.main_module == Some(module))
    }

    pub fn bundles_containing(&self, module: ModuleId) -> Vec<BundleId> {
        self.bundles
            .iter()
            .filter(|b| b.members.contains(&module))
            .map(|b| b.id)
            .collect()
    }

    pub fn extracted(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.iter().filter(|b| b.is_extracted())
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// blake3 digest over ids, types, parents and membership
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for bundle in &self.bundles {
            hasher.update(&(bundle.id.0 as u64).to_le_bytes());
            hasher.update(bundle.bundle_type.as_str().as_bytes());
            match bundle.main_module {
                Some(main) => hasher.update(&u64::from(main.0).to_le_bytes()),
                None => hasher.update(b"-"),
            };
            hasher.update(b"p");
            for parent in &bundle.parents {
                hasher.update(&(parent.0 as u64).to_le_bytes());
            }
            hasher.update(b"m");
            for member in &bundle.members {
                hasher.update(&u64::from(member.0).to_le_bytes());
            }
            hasher.update(b";");
        }
        hasher.finalize().to_hex().to_string()
    }

    pub fn check_invariants(&self) -> Vec<PlanViolation> {
        let mut violations = Vec::new();

        for bundle in &self.bundles {
            if bundle.is_extracted() && bundle.members.is_empty() {
                violations.push(PlanViolation::EmptySharedBundle { bundle: bundle.id });
            }
            for parent_id in &bundle.parents {
                let Some(parent) = self.get(*parent_id) else {
                    continue;
                };
                for module in bundle.members.intersection(&parent.members) {
                    violations.push(PlanViolation::AncestorDuplication {
                        bundle: bundle.id,
                        parent: parent.id,
                        module: *module,
                    });
                }
            }
        }

        // Walk parent chains; revisiting a bundle on the active path is a cycle.
        let mut finished: HashSet<BundleId> = HashSet::new();
        for bundle in &self.bundles {
            let mut on_path = HashSet::new();
            if self.reaches_cycle(bundle.id, &mut on_path, &mut finished) {
                violations.push(PlanViolation::ParentCycle { bundle: bundle.id });
            }
        }

        violations
    }

    fn reaches_cycle(
        &self,
        id: BundleId,
        on_path: &mut HashSet<BundleId>,
        finished: &mut HashSet<BundleId>,
    ) -> bool {
        if finished.contains(&id) {
            return false;
        }
        if !on_path.insert(id) {
            return true;
        }
        if let Some(bundle) = self.get(id) {
            for parent in &bundle.parents {
                if self.reaches_cycle(*parent, on_path, finished) {
                    return true;
                }
            }
        }
        on_path.remove(&id);
        finished.insert(id);
        false
    }
}
