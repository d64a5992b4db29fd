use crate::core::{interfaces::GraphSource, services::ChunkingService};
use crate::infrastructure::TokioGraphSource;
use crate::utils::{BundleAnalysis, ConfigLoader, Logger, Result, SokuError, CONFIG_FILE_NAME};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "soku-chunker")]
#[command(about = "Soku chunker - entry, async and shared bundles for a resolved module graph")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan bundles for a module graph manifest
    Split {
        /// Project root, used to locate soku.config.json
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Module graph manifest (overrides `graph` in the config file)
        #[arg(short, long)]
        graph: Option<PathBuf>,
        /// Config file (default: <root>/soku.config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write an example soku.config.json
    Init {
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Show chunker information
    Info,
}

pub struct CliHandler {
    source: Arc<dyn GraphSource>,
}

impl CliHandler {
    pub fn new() -> Self {
        Self {
            source: Arc::new(TokioGraphSource),
        }
    }

    pub fn with_source(source: Arc<dyn GraphSource>) -> Self {
        Self { source }
    }

    pub async fn run(&self) -> Result<()> {
        // Initialize logging
        Logger::init();

        let cli = Cli::parse();
        self.execute(cli.command).await
    }

    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Split { root, graph, config, format, output } => {
                let analysis = self
                    .handle_split_command(Path::new(&root), graph.as_deref(), config.as_deref())
                    .await?;
                self.report(&analysis, format, output.as_deref())
            }
            Commands::Init { root, force } => {
                self.handle_init_command(Path::new(&root), force).await
            }
            Commands::Info => {
                self.handle_info_command().await
            }
        }
    }

    pub async fn handle_split_command(
        &self,
        root: &Path,
        graph: Option<&Path>,
        config: Option<&Path>,
    ) -> Result<BundleAnalysis> {
        let file_config = match config {
            Some(path) => Some(ConfigLoader::load_from_path(path)?),
            None => ConfigLoader::load_from_file(root)?,
        };
        let settings = ConfigLoader::merge_with_cli(file_config, root, graph)?;

        let module_graph = self.source.load_graph(&settings.graph_path).await?;
        let plan = ChunkingService::with_rules(settings.rules).run(&module_graph);

        Ok(BundleAnalysis::analyze(&plan, &module_graph))
    }

    fn report(
        &self,
        analysis: &BundleAnalysis,
        format: OutputFormat,
        output: Option<&Path>,
    ) -> Result<()> {
        match format {
            OutputFormat::Text => analysis.print_table(),
            OutputFormat::Json => println!("{}", analysis.to_json()?),
        }

        if let Some(path) = output {
            analysis.save_json(path)?;
            Logger::info(&format!("📝 Report written to {}", path.display()));
        }

        Ok(())
    }

    async fn handle_init_command(&self, root: &Path, force: bool) -> Result<()> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.exists() && !force {
            return Err(SokuError::config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }

        tokio::fs::write(&path, ConfigLoader::generate_example()).await
            .map_err(SokuError::Io)?;

        Logger::info(&format!("✅ Wrote {}", path.display()));
        Ok(())
    }

    async fn handle_info_command(&self) -> Result<()> {
        tracing::info!("🦀 Soku chunker v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("══════════════════════════════════════");
        tracing::info!("🧩 Bundle planning for resolved module graphs");
        tracing::info!("");
        tracing::info!("🏗️  Pipeline:");
        tracing::info!("  • Dependency closures per module (cycle safe)");
        tracing::info!("  • One bundle per entry, one per dynamic-import target");
        tracing::info!("  • Shared bundles from ordered splitChunks rules");
        tracing::info!("");
        tracing::info!("⚙️  Rule options:");
        tracing::info!("  • test / exclude (regex on module ids)");
        tracing::info!("  • minUseCount, minSize, maxSize");
        tracing::info!("  • maxInitialRequests, maxAsyncRequests");
        tracing::info!("  • outputPath");

        Ok(())
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}
