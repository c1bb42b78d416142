use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{
    asset::Asset,
    error::PipelineError,
    loader::{Loader, SharedLoader},
    pipeline::{AssetPipeline, AssetPipelineBuilder, AssetPipelineStage, AssetProcessor},
};

/// Extends pipeline with loading of asset data.
///
/// Assets with `path` field get their data loaded by the loader
/// and attached to them. `mimeType` field is passed as content type hint.
/// Assets without `path` or with data already attached pass through.
#[derive(Clone)]
pub struct LoadStage {
    loader: SharedLoader,
}

impl LoadStage {
    pub fn new(loader: impl Loader) -> Self {
        LoadStage {
            loader: Arc::new(loader),
        }
    }

    pub fn shared(loader: SharedLoader) -> Self {
        LoadStage { loader }
    }
}

impl AssetPipelineStage for LoadStage {
    fn attach(self, builder: &mut AssetPipelineBuilder) {
        builder.add_processor(LoadProcessor {
            loader: self.loader,
        });
    }
}

struct LoadProcessor {
    loader: SharedLoader,
}

impl AssetProcessor for LoadProcessor {
    fn process<'a>(
        &'a self,
        mut asset: Asset,
        _pipeline: &'a AssetPipeline,
    ) -> BoxFuture<'a, Result<Asset, PipelineError>> {
        Box::pin(async move {
            if asset.data().is_some() {
                return Ok(asset);
            }

            let Some(path) = asset.path()?.map(str::to_owned) else {
                return Ok(asset);
            };
            let mime_type = asset.mime_type()?.map(str::to_owned);

            let data = self.loader.load(&path, mime_type.as_deref()).await?;
            tracing::debug!("Loaded {} bytes for '{}'", data.bytes.len(), path);

            asset.set_data(data);
            Ok(asset)
        })
    }
}
