//! Named asset roots.
//!
//! ```toml
//! [[roots]]
//! name = "data"
//! loaders = [
//!     { type = "URLLoader", root_url = "https://cdn.example.com/data/" },
//!     { type = "RelativeURLLoader", rel_path = "data/" },
//! ]
//! ```

use std::{fmt, path::Path};

use futures::future::BoxFuture;
use hashbrown::HashMap;

use crate::{
    error::{ConfigError, LoadError},
    loader::{
        chained_loader, AssetData, Loader, LoaderContext, LoaderRegistry, LoaderSpec, SharedLoader,
    },
};

/// Specification of a single named root.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AssetRootSpec {
    /// Unique, case-sensitive root name.
    pub name: String,

    /// Loaders of the root.
    /// Loading starts from the last one and falls back toward the first.
    pub loaders: Vec<LoaderSpec>,
}

impl AssetRootSpec {
    pub fn new(name: impl Into<String>) -> Self {
        AssetRootSpec {
            name: name.into(),
            loaders: Vec::new(),
        }
    }

    pub fn with_loader(mut self, loader: LoaderSpec) -> Self {
        self.loaders.push(loader);
        self
    }
}

/// Assets configuration file.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AssetsConfig {
    #[serde(default)]
    pub roots: Vec<AssetRootSpec>,
}

impl AssetsConfig {
    pub const FILE_NAME: &'static str = "Assets.toml";

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str(s)?;
        Ok(config)
    }

    /// Reads configuration from the file.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|error| ConfigError::InvalidConfig {
            reason: format!("Failed to read '{}'. {}", path.display(), error),
        })?;
        AssetsConfig::from_toml(&s)
    }
}

struct AssetRoot {
    loader: SharedLoader,
    loaders: usize,
}

/// Loader that uses the first segment of the path
/// to select one of pre-configured named roots.
///
/// Path format is `<root>/<sub-path>`.
/// The root name must be at least 1 character long.
/// The sub-path may be empty.
/// Roots are not sandboxes, `..` in the sub-path may escape the root.
pub struct AssetRoots {
    roots: HashMap<String, AssetRoot>,
}

impl fmt::Debug for AssetRoots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.roots.iter().map(|(name, root)| (name, root.loaders)))
            .finish()
    }
}

impl AssetRoots {
    /// Builds roots from specifications.
    pub fn new<'a, I>(
        specs: I,
        registry: &LoaderRegistry,
        cx: &LoaderContext,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a AssetRootSpec>,
    {
        let mut roots = HashMap::new();

        for spec in specs {
            if roots.contains_key(&spec.name) {
                return Err(ConfigError::DuplicateRoot {
                    name: spec.name.clone(),
                });
            }

            // Resolve all classes before instantiating any loader.
            if let Some(unknown) = spec.loaders.iter().find(|l| !registry.contains(&l.class)) {
                return Err(ConfigError::UnknownLoaderClass {
                    name: unknown.class.clone(),
                });
            }

            let loaders = spec
                .loaders
                .iter()
                .map(|l| registry.build(l, cx))
                .collect::<Result<Vec<_>, _>>()?;

            tracing::debug!(
                "Asset root '{}' with {} loader(s)",
                spec.name,
                loaders.len()
            );

            let root = AssetRoot {
                loaders: loaders.len(),
                loader: chained_loader(loaders)?,
            };
            roots.insert(spec.name.clone(), root);
        }

        if roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }

        Ok(AssetRoots { roots })
    }

    pub fn from_config(
        config: &AssetsConfig,
        registry: &LoaderRegistry,
        cx: &LoaderContext,
    ) -> Result<Self, ConfigError> {
        AssetRoots::new(&config.roots, registry, cx)
    }

    pub fn root_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.roots.keys().map(String::as_str)
    }

    pub fn has_root(&self, name: &str) -> bool {
        self.roots.contains_key(name)
    }

    /// Splits path into root name and sub-path.
    pub fn split_path(path: &str) -> Result<(&str, &str), ConfigError> {
        match path.split_once('/') {
            Some((root, sub_path)) if !root.is_empty() => Ok((root, sub_path)),
            _ => Err(ConfigError::MissingRoot {
                path: path.to_owned(),
            }),
        }
    }
}

impl Loader for AssetRoots {
    fn load<'a>(
        &'a self,
        path: &'a str,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<AssetData, LoadError>> {
        Box::pin(async move {
            let (name, sub_path) = AssetRoots::split_path(path)?;
            let root = self
                .roots
                .get(name)
                .ok_or_else(|| ConfigError::UnknownRoot {
                    name: name.to_owned(),
                })?;

            tracing::debug!("Loading '{}' from root '{}'", sub_path, name);
            root.loader.load(sub_path, content_type).await
        })
    }
}
