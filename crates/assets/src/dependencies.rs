//! Resolution of named asset dependencies.

use futures::future::{try_join_all, BoxFuture};
use serde_json::Value;

use crate::{
    asset::Asset,
    error::PipelineError,
    pipeline::{AssetPipeline, AssetPipelineBuilder, AssetPipelineStage, AssetProcessor},
};

/// Extends pipeline with the capacity to load an asset's named dependencies.
///
/// Every dependency is processed by the same pipeline,
/// including this stage, so dependencies of dependencies are resolved too.
/// Siblings are processed concurrently and the parent asset is yielded
/// only after all of them are resolved.
/// The first failure fails the parent.
///
/// Shared dependencies are not deduplicated,
/// each occurrence is processed independently.
#[derive(Clone, Copy, Debug, Default)]
pub struct DependenciesStage;

impl AssetPipelineStage for DependenciesStage {
    fn attach(self, builder: &mut AssetPipelineBuilder) {
        builder.add_processor(DependenciesProcessor);
    }
}

struct DependenciesProcessor;

impl AssetProcessor for DependenciesProcessor {
    fn process<'a>(
        &'a self,
        mut asset: Asset,
        pipeline: &'a AssetPipeline,
    ) -> BoxFuture<'a, Result<Asset, PipelineError>> {
        Box::pin(async move {
            let Some(raw) = asset.take_raw_dependencies() else {
                return Ok(asset);
            };

            let dependencies = parse_dependencies(Some(raw))?;
            asset.init_dependencies();
            if dependencies.is_empty() {
                return Ok(asset);
            }

            tracing::debug!("Resolving {} dependencies", dependencies.len());

            let resolved = dependencies
                .into_iter()
                .map(|(key, dependency)| async move {
                    match pipeline.process(dependency).await {
                        Ok(dependency) => Ok((key, dependency)),
                        Err(error) => Err(PipelineError::Dependency {
                            key,
                            source: Box::new(error),
                        }),
                    }
                });
            let resolved = try_join_all(resolved).await?;

            for (key, dependency) in resolved {
                asset.set_dependency(key, dependency);
            }

            Ok(asset)
        })
    }
}

/// Validates raw `dependencies` field and splits it into keyed assets.
///
/// `null` entries are treated as absent.
pub fn parse_dependencies(raw: Option<Value>) -> Result<Vec<(String, Asset)>, PipelineError> {
    let map = match raw {
        None => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(PipelineError::MalformedDependencies),
    };

    let mut dependencies = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Object(fields) => dependencies.push((key, Asset::from_fields(fields))),
            _ => return Err(PipelineError::MalformedDependency { key }),
        }
    }
    Ok(dependencies)
}
