//! Loaders turn asset paths into raw bytes.
//!
//! Loaders are composable.
//! [`UrlLoader`] fetches from a root URL, [`FallbackLoader`] tries another
//! loader when the first one fails, and [`chained_loader`] builds a whole
//! fallback chain from a list.
//! Named loader classes in [`LoaderRegistry`] build loaders from
//! declarative configuration.

use std::{fmt, sync::Arc};

use futures::future::BoxFuture;
use url::Url;

use crate::error::LoadError;

mod fallback;
mod memory;
mod registry;
mod url_loader;

pub use self::{
    fallback::{chained_loader, FallbackLoader},
    memory::{MemoryLoader, MemoryLoaderConfig},
    registry::{LoaderRegistry, LoaderSpec},
    url_loader::{RelativeUrlLoaderConfig, UrlLoader, UrlLoaderConfig},
};

/// Asset data loaded by [`Loader`].
#[derive(Clone)]
pub struct AssetData {
    /// Raw asset bytes.
    /// Loaders never interpret them.
    pub bytes: Box<[u8]>,

    /// Content type hint passed to the loader
    /// or reported by the storage.
    pub content_type: Option<String>,

    /// Where the data came from.
    pub source: String,
}

impl fmt::Debug for AssetData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetData")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .field("source", &self.source)
            .finish()
    }
}

/// Abstract loader for asset raw data.
pub trait Loader: Send + Sync + 'static {
    /// Load asset data from this loader.
    ///
    /// `content_type` is an optional hint for the storage.
    fn load<'a>(
        &'a self,
        path: &'a str,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<AssetData, LoadError>>;
}

/// Loader shared between chains and roots.
pub type SharedLoader = Arc<dyn Loader>;

impl<L> Loader for Arc<L>
where
    L: Loader + ?Sized,
{
    fn load<'a>(
        &'a self,
        path: &'a str,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<AssetData, LoadError>> {
        (**self).load(path, content_type)
    }
}

/// Environment loader classes are built in.
#[derive(Clone, Debug)]
pub struct LoaderContext {
    /// Base location of the application.
    /// Relative roots are resolved against it.
    pub base_url: Url,
}

impl LoaderContext {
    pub fn new(base_url: Url) -> Self {
        LoaderContext { base_url }
    }

    /// Uses current working directory as base location.
    pub fn from_current_dir() -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        let base_url = Url::from_directory_path(&cwd).map_err(|()| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{}' can't be converted to URL", cwd.display()),
            )
        })?;
        Ok(LoaderContext { base_url })
    }
}
