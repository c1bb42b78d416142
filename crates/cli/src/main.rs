use std::{
    io::Write,
    path::{Path, PathBuf},
};

use arcana_assets::{
    Asset, AssetPipeline, AssetRoots, AssetsConfig, DependenciesStage, LoadStage, Loader,
    LoaderContext, LoaderRegistry,
};
use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Lists configured asset roots.
    Roots,

    /// Loads raw bytes of a single asset.
    Fetch {
        /// Asset path in `<root>/<sub-path>` form.
        #[arg(value_name = "path")]
        path: String,

        /// Content type hint.
        #[arg(long = "mime-type", value_name = "mime-type")]
        mime_type: Option<String>,

        /// Write data to the file instead of stdout.
        #[arg(long = "output", short = 'o', value_name = "file")]
        output: Option<PathBuf>,
    },

    /// Runs asset document through the pipeline and prints resolved tree.
    Resolve {
        /// JSON file with asset document.
        #[arg(value_name = "asset")]
        asset: PathBuf,
    },
}

#[derive(Debug, Parser)]
#[command(name = "arcn-assets")]
#[command(about = "Arcana asset roots and pipeline tool")]
#[command(rename_all = "kebab-case")]
struct Cli {
    /// Path to assets configuration.
    #[arg(
        long = "config",
        short = 'c',
        value_name = "file",
        default_value = AssetsConfig::FILE_NAME
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

fn main() -> miette::Result<()> {
    install_tracing_subscriber()?;

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    runtime.block_on(run(cli))
}

fn install_tracing_subscriber() -> miette::Result<()> {
    use tracing_subscriber::layer::SubscriberExt as _;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .finish()
            .with(tracing_error::ErrorLayer::default()),
    )
    .into_diagnostic()
}

async fn run(cli: Cli) -> miette::Result<()> {
    let roots = open_roots(&cli.config)?;

    match cli.command {
        Command::Roots => {
            let mut names = roots.root_names().collect::<Vec<_>>();
            names.sort_unstable();
            for name in names {
                println!("{name}");
            }
        }
        Command::Fetch {
            path,
            mime_type,
            output,
        } => {
            let data = roots
                .load(&path, mime_type.as_deref())
                .await
                .into_diagnostic()?;

            tracing::info!("Loaded {} bytes from '{}'", data.bytes.len(), data.source);

            match output {
                Some(output) => std::fs::write(&output, &data.bytes).into_diagnostic()?,
                None => std::io::stdout().write_all(&data.bytes).into_diagnostic()?,
            }
        }
        Command::Resolve { asset } => {
            let document = std::fs::read_to_string(&asset).into_diagnostic()?;
            let value: serde_json::Value = serde_json::from_str(&document).into_diagnostic()?;

            let pipeline = AssetPipeline::builder()
                .with_stage(LoadStage::new(roots))
                .with_stage(DependenciesStage)
                .build();

            let asset = pipeline.process_value(value).await.into_diagnostic()?;
            print_asset("<root>", &asset, 0);
        }
    }

    Ok(())
}

fn open_roots(config: &Path) -> miette::Result<AssetRoots> {
    let config = AssetsConfig::read(config).into_diagnostic()?;
    let cx = LoaderContext::from_current_dir().into_diagnostic()?;
    let roots =
        AssetRoots::from_config(&config, &LoaderRegistry::with_builtin(), &cx).into_diagnostic()?;
    Ok(roots)
}

fn print_asset(key: &str, asset: &Asset, depth: usize) {
    let indent = "  ".repeat(depth);
    let path = asset.path().ok().flatten().unwrap_or("-");

    match asset.data() {
        Some(data) => println!("{indent}{key}: {path} ({} bytes)", data.bytes.len()),
        None => println!("{indent}{key}: {path}"),
    }

    for (key, dependency) in asset.dependencies() {
        print_asset(key, dependency, depth + 1);
    }
}
