use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use std::time::Instant;

pub struct Logger;

impl Logger {
    /// Install the global subscriber. `RUST_LOG` wins over the default filter.
    pub fn init() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("soku_chunker=info"));

        // A second init (tests, embedding) keeps the first subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }

    pub fn plan_start(modules: usize, entries: usize, rules: usize) {
        info!(
            "🧩 Planning chunks: {} modules, {} entries, {} split rules",
            modules, entries, rules
        );
    }

    pub fn bundles_built(entry_bundles: usize, async_bundles: usize) {
        info!("📦 Built {} entry bundles, {} async bundles", entry_bundles, async_bundles);
    }

    pub fn rule_skipped(rule: usize, reason: &str) {
        debug!("⏭️  Split rule #{} produced no bundle: {}", rule, reason);
    }

    pub fn rule_applied(rule: usize, shared_bundles: usize, moved_bytes: u64) {
        info!(
            "✂️  Split rule #{}: {} shared bundles, {} bytes moved",
            rule, shared_bundles, moved_bytes
        );
    }

    pub fn plan_complete(bundles: usize, fingerprint: &str, elapsed: std::time::Duration) {
        info!("✅ Chunk plan ready: {} bundles in {:.2?} ({})", bundles, elapsed, fingerprint);
    }

    pub fn info(msg: &str) {
        info!("{}", msg);
    }

    pub fn debug(msg: &str) {
        debug!("{}", msg);
    }

    pub fn warn(msg: &str) {
        warn!("⚠️  {}", msg);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
