// Bundle plan analysis for Soku chunker
// Size and sharing statistics for a finished bundle plan

use crate::core::graph::ModuleGraph;
use crate::core::models::{BundlePlan, ModuleId};
use crate::utils::{Result, SokuError};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Statistics for a single bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStats {
    pub id: usize,
    /// `static`, `dynamic` or `staticOrDynamic`
    pub bundle_type: String,
    /// Entry or dynamic-import target; absent for shared bundles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_module: Option<String>,
    pub modules: usize,
    pub size: u64,
    pub parents: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub percentage: f64,
}

/// Complete plan analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleAnalysis {
    pub fingerprint: String,
    pub total_bundles: usize,
    pub shared_bundles: usize,
    pub total_size: u64,
    /// Bytes emitted more than once: module size times extra copies
    pub duplicated_bytes: u64,
    pub bundles: Vec<BundleStats>,
}

impl BundleAnalysis {
    pub fn analyze(plan: &BundlePlan, graph: &ModuleGraph) -> Self {
        let mut copies: BTreeMap<ModuleId, u64> = BTreeMap::new();
        for bundle in plan.bundles() {
            for module in &bundle.members {
                *copies.entry(*module).or_insert(0) += 1;
            }
        }

        let duplicated_bytes = copies
            .iter()
            .map(|(module, count)| graph.module(*module).size * count.saturating_sub(1))
            .sum();

        let mut bundles: Vec<BundleStats> = plan
            .bundles()
            .iter()
            .map(|bundle| BundleStats {
                id: bundle.id.0,
                bundle_type: bundle.bundle_type.as_str().to_string(),
                main_module: bundle.main_module.map(|m| graph.module(m).path.clone()),
                modules: bundle.members.len(),
                size: bundle.size(graph),
                parents: bundle.parents.iter().map(|p| p.0).collect(),
                output_path: bundle.output_path.as_ref().map(|o| o.describe(bundle)),
                percentage: 0.0,
            })
            .collect();

        let total_size: u64 = bundles.iter().map(|b| b.size).sum();
        for stats in &mut bundles {
            stats.percentage = if total_size > 0 {
                (stats.size as f64 / total_size as f64) * 100.0
            } else {
                0.0
            };
        }

        Self {
            fingerprint: plan.fingerprint(),
            total_bundles: plan.len(),
            shared_bundles: plan.extracted().count(),
            total_size,
            duplicated_bytes,
            bundles,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SokuError::Other(format!("Failed to serialize analysis: {}", e)))
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?).map_err(SokuError::Io)
    }

    /// Human-readable report; colors are dropped when stdout is not a terminal
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push('\n');
        report.push_str(&format!("{}\n", "📊 CHUNK PLAN".bold()));
        report.push_str("─────────────────────────────────────────────────────────────\n");
        report.push_str(&format!(
            "  Bundles:         {} ({} shared)\n",
            self.total_bundles, self.shared_bundles
        ));
        report.push_str(&format!("  Total Size:      {}\n", Self::format_size(self.total_size)));
        report.push_str(&format!(
            "  Duplicated:      {}\n",
            if self.duplicated_bytes > 0 {
                Self::format_size(self.duplicated_bytes).yellow().to_string()
            } else {
                Self::format_size(0).green().to_string()
            }
        ));
        report.push_str(&format!("  Fingerprint:     {}\n", self.fingerprint.dimmed()));
        report.push('\n');

        report.push_str(&format!("{}\n", "📦 BUNDLES".bold()));
        report.push_str("─────────────────────────────────────────────────────────────\n");
        for stats in &self.bundles {
            let name = stats
                .main_module
                .clone()
                .or_else(|| stats.output_path.clone())
                .unwrap_or_else(|| "shared".to_string());
            let kind = match stats.bundle_type.as_str() {
                "dynamic" => stats.bundle_type.cyan(),
                "staticOrDynamic" => stats.bundle_type.magenta(),
                _ => stats.bundle_type.normal(),
            };
            let parents = if stats.parents.is_empty() {
                "-".to_string()
            } else {
                stats
                    .parents
                    .iter()
                    .map(|p| format!("#{}", p))
                    .collect::<Vec<_>>()
                    .join(",")
            };

            report.push_str(&format!(
                "  #{:<3} {:30} {:16} {:>4} mods {:>10} {:>5.1}% {} <- {}\n",
                stats.id,
                Self::truncate(&name, 30),
                kind,
                stats.modules,
                Self::format_size(stats.size),
                stats.percentage,
                Self::create_bar(stats.percentage, 20),
                parents
            ));
        }
        report.push('\n');

        report
    }

    pub fn print_table(&self) {
        println!("{}", self.generate_report());
    }

    /// Format bytes as human-readable size
    fn format_size(bytes: u64) -> String {
        const KB: f64 = 1024.0;
        const MB: f64 = KB * 1024.0;

        if bytes == 0 {
            "0 B".to_string()
        } else if bytes < KB as u64 {
            format!("{} B", bytes)
        } else if bytes < MB as u64 {
            format!("{:.2} KB", bytes as f64 / KB)
        } else {
            format!("{:.2} MB", bytes as f64 / MB)
        }
    }

    fn create_bar(percentage: f64, width: usize) -> String {
        let filled = (((percentage / 100.0) * width as f64) as usize).min(width);
        let empty = width - filled;
        format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
    }

    fn truncate(s: &str, max_len: usize) -> String {
        let count = s.chars().count();
        if count <= max_len {
            format!("{:width$}", s, width = max_len)
        } else {
            // Keep the tail: module ids differ mostly in their file names
            let tail: String = s.chars().skip(count - (max_len - 3)).collect();
            format!("...{}", tail)
        }
    }
}
