use futures::future::BoxFuture;
use url::Url;

use crate::{
    error::{ConfigError, LoadError},
    source::{fetch_url, FetchOptions},
};

use super::{AssetData, Loader, LoaderContext};

/// Configuration of [`UrlLoader`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct UrlLoaderConfig {
    /// Root URL asset paths are resolved against.
    #[serde(alias = "rootURL")]
    pub root_url: Url,

    /// Bypass any cache layer.
    #[serde(default, alias = "disableCache")]
    pub disable_cache: bool,
}

/// Configuration of a [`UrlLoader`] rooted relative to the application base location.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RelativeUrlLoaderConfig {
    /// Path relative to [`LoaderContext::base_url`].
    #[serde(alias = "relPath")]
    pub rel_path: String,

    /// Bypass any cache layer.
    #[serde(default, alias = "disableCache")]
    pub disable_cache: bool,
}

/// Generic loader that takes a root URL and loads assets relative to this root.
/// This loader will generally be the final loader in a chain.
#[derive(Clone, Debug)]
pub struct UrlLoader {
    root_url: Url,
    disable_cache: bool,
    http_client: Option<reqwest::Client>,
}

impl UrlLoader {
    pub fn new(root_url: Url, disable_cache: bool) -> Self {
        UrlLoader {
            root_url,
            disable_cache,
            http_client: None,
        }
    }

    /// Uses the client for `http` and `https` roots
    /// instead of the shared one.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn from_config(config: UrlLoaderConfig) -> Self {
        UrlLoader::new(config.root_url, config.disable_cache)
    }

    /// Creates loader with root URL being a path relative to the application base location.
    pub fn relative(
        config: RelativeUrlLoaderConfig,
        cx: &LoaderContext,
    ) -> Result<Self, ConfigError> {
        let root_url = cx
            .base_url
            .join(&config.rel_path)
            .map_err(|error| ConfigError::InvalidRootUrl {
                base: cx.base_url.clone(),
                path: config.rel_path.clone(),
                error,
            })?;

        Ok(UrlLoader::new(root_url, config.disable_cache))
    }

    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    /// Returns URL for the asset path.
    ///
    /// Paths are not sandboxed, `..` may escape the root.
    pub fn resolve(&self, path: &str) -> Result<Url, LoadError> {
        self.root_url
            .join(path)
            .map_err(|error| LoadError::InvalidAssetPath {
                root: self.root_url.clone(),
                path: path.to_owned(),
                error,
            })
    }
}

impl Loader for UrlLoader {
    fn load<'a>(
        &'a self,
        path: &'a str,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<AssetData, LoadError>> {
        Box::pin(async move {
            let url = self.resolve(path)?;
            fetch_url(
                &url,
                FetchOptions {
                    content_type,
                    bypass_cache: self.disable_cache,
                    http_client: self.http_client.as_ref(),
                },
            )
            .await
        })
    }
}
