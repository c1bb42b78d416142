//! Asset processing pipeline.
//!
//! Pipeline is an ordered chain of asynchronous processors.
//! Each processor receives asset produced by the previous one
//! and returns (possibly replaced) asset for the next one.
//!
//! Processors are attached by stages during setup.
//! Once built, pipeline is immutable and cheap to clone.

use std::{future::Future, sync::Arc};

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::Instrument;

use crate::{asset::Asset, error::PipelineError};

/// Single processor in the [`AssetPipeline`].
pub trait AssetProcessor: Send + Sync + 'static {
    /// Processes the asset.
    ///
    /// `pipeline` is the pipeline this processor is part of.
    /// Processors may use it to process other assets, e.g. sub-assets.
    fn process<'a>(
        &'a self,
        asset: Asset,
        pipeline: &'a AssetPipeline,
    ) -> BoxFuture<'a, Result<Asset, PipelineError>>;
}

/// Extends pipeline with new capabilities.
pub trait AssetPipelineStage {
    fn attach(self, builder: &mut AssetPipelineBuilder);
}

impl<F> AssetPipelineStage for F
where
    F: FnOnce(&mut AssetPipelineBuilder),
{
    fn attach(self, builder: &mut AssetPipelineBuilder) {
        self(builder)
    }
}

/// Processor made from an async function.
pub struct ProcessorFn<F>(F);

/// Wraps async function into [`AssetProcessor`].
pub fn processor_fn<F, Fut>(f: F) -> ProcessorFn<F>
where
    F: Fn(Asset) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Asset, PipelineError>> + Send + 'static,
{
    ProcessorFn(f)
}

impl<F, Fut> AssetProcessor for ProcessorFn<F>
where
    F: Fn(Asset) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Asset, PipelineError>> + Send + 'static,
{
    fn process<'a>(
        &'a self,
        asset: Asset,
        _pipeline: &'a AssetPipeline,
    ) -> BoxFuture<'a, Result<Asset, PipelineError>> {
        Box::pin((self.0)(asset))
    }
}

/// Builder for [`AssetPipeline`].
#[derive(Default)]
pub struct AssetPipelineBuilder {
    processors: Vec<Box<dyn AssetProcessor>>,
}

impl AssetPipelineBuilder {
    pub fn new() -> Self {
        AssetPipelineBuilder::default()
    }

    /// Places processor at the end of chain.
    pub fn add_processor(&mut self, processor: impl AssetProcessor) -> &mut Self {
        self.processors.push(Box::new(processor));
        self
    }

    pub fn add_stage(&mut self, stage: impl AssetPipelineStage) -> &mut Self {
        stage.attach(self);
        self
    }

    pub fn with_processor(mut self, processor: impl AssetProcessor) -> Self {
        self.add_processor(processor);
        self
    }

    pub fn with_stage(mut self, stage: impl AssetPipelineStage) -> Self {
        self.add_stage(stage);
        self
    }

    pub fn build(self) -> AssetPipeline {
        AssetPipeline {
            processors: self.processors.into(),
        }
    }
}

/// Ordered chain of asset processors.
///
/// Processors run strictly sequentially for a single asset,
/// in the order they were added.
/// Independent assets may be processed concurrently.
#[derive(Clone)]
pub struct AssetPipeline {
    processors: Arc<[Box<dyn AssetProcessor>]>,
}

impl Default for AssetPipeline {
    fn default() -> Self {
        AssetPipelineBuilder::new().build()
    }
}

impl AssetPipeline {
    pub fn builder() -> AssetPipelineBuilder {
        AssetPipelineBuilder::new()
    }

    /// Returns number of processors in the pipeline.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Runs asset through all processors.
    ///
    /// Empty pipeline returns the asset as is.
    pub fn process(&self, asset: Asset) -> BoxFuture<'_, Result<Asset, PipelineError>> {
        let span = tracing::debug_span!("process_asset", path = asset.path().ok().flatten());

        Box::pin(
            async move {
                let mut asset = asset;
                for (stage, processor) in self.processors.iter().enumerate() {
                    tracing::trace!(stage, "Running processor");
                    asset = processor.process(asset, self).await?;
                }
                Ok(asset)
            }
            .instrument(span),
        )
    }

    /// Creates asset from JSON value and runs it through the pipeline.
    pub async fn process_value(&self, value: Value) -> Result<Asset, PipelineError> {
        let asset = Asset::from_value(value)?;
        self.process(asset).await
    }
}
