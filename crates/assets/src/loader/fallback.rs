use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{ConfigError, LoadError};

use super::{AssetData, Loader, SharedLoader};

/// Tries to load an asset with the main loader and, if that fails,
/// tries it using the fallback loader, if provided.
///
/// Only one attempt is made per loader.
pub struct FallbackLoader {
    loader: SharedLoader,
    fallback: Option<SharedLoader>,
}

impl FallbackLoader {
    pub fn new(loader: SharedLoader, fallback: Option<SharedLoader>) -> Self {
        FallbackLoader { loader, fallback }
    }
}

impl Loader for FallbackLoader {
    fn load<'a>(
        &'a self,
        path: &'a str,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<AssetData, LoadError>> {
        Box::pin(async move {
            match self.loader.load(path, content_type).await {
                Ok(data) => Ok(data),
                Err(error) => match &self.fallback {
                    Some(fallback) if error.is_recoverable() => {
                        tracing::warn!("Failed to load '{}': {}. Trying fallback", path, error);
                        fallback.load(path, content_type).await
                    }
                    _ => Err(error),
                },
            }
        })
    }
}

/// Creates a chain of [`FallbackLoader`]s, with the first loader being the innermost
/// and the last being the outermost.
///
/// Loads start at the last loader and go down sequentially
/// until one succeeds.
pub fn chained_loader<I>(loaders: I) -> Result<SharedLoader, ConfigError>
where
    I: IntoIterator<Item = SharedLoader>,
{
    let mut chain: Option<SharedLoader> = None;
    for loader in loaders {
        chain = Some(Arc::new(FallbackLoader::new(loader, chain.take())));
    }
    chain.ok_or(ConfigError::EmptyChain)
}
