//! Assets are loaded from pluggable sources and processed by a pipeline.
//!
//! - Loaders turn paths into raw bytes.
//!   They are composed into fallback chains and named roots,
//!   usually from declarative [`AssetsConfig`].
//!
//! - Pipeline runs assets through ordered processors.
//!   [`LoadStage`] attaches loaded bytes to assets,
//!   [`DependenciesStage`] resolves named sub-assets
//!   by running them through the same pipeline.
//!
//! Decoding loaded bytes into textures, meshes and other
//! domain types is left to user-defined processors.
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use arcana_assets::{
//!     AssetPipeline, AssetRoots, AssetsConfig, DependenciesStage, LoadStage, LoaderContext,
//!     LoaderRegistry,
//! };
//!
//! let config = AssetsConfig::read("Assets.toml".as_ref())?;
//! let roots = AssetRoots::from_config(
//!     &config,
//!     &LoaderRegistry::with_builtin(),
//!     &LoaderContext::from_current_dir()?,
//! )?;
//!
//! let pipeline = AssetPipeline::builder()
//!     .with_stage(LoadStage::new(roots))
//!     .with_stage(DependenciesStage)
//!     .build();
//!
//! let asset = pipeline
//!     .process_value(serde_json::json!({
//!         "path": "data/models/chair.json",
//!         "dependencies": {
//!             "diffuse": { "path": "data/textures/chair.png", "mimeType": "image/png" },
//!         },
//!     }))
//!     .await?;
//!
//! let diffuse = asset.dependency("diffuse").and_then(|d| d.data());
//! # Ok(())
//! # }
//! ```

mod asset;
mod dependencies;
mod error;
mod load;
pub mod loader;
mod pipeline;
mod roots;
pub mod source;

pub use self::{
    asset::{Asset, DEPENDENCIES, MIME_TYPE, PATH},
    dependencies::{parse_dependencies, DependenciesStage},
    error::{ConfigError, LoadError, PipelineError},
    load::LoadStage,
    loader::{
        chained_loader, AssetData, FallbackLoader, Loader, LoaderContext, LoaderRegistry,
        LoaderSpec, MemoryLoader, SharedLoader, UrlLoader,
    },
    pipeline::{
        processor_fn, AssetPipeline, AssetPipelineBuilder, AssetPipelineStage, AssetProcessor,
        ProcessorFn,
    },
    roots::{AssetRootSpec, AssetRoots, AssetsConfig},
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
