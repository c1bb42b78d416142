use std::{fmt, sync::Arc};

use hashbrown::HashMap;
use serde::de::DeserializeOwned;

use crate::error::ConfigError;

use super::{
    memory::{MemoryLoader, MemoryLoaderConfig},
    url_loader::{UrlLoader, UrlLoaderConfig},
    Loader, LoaderContext, SharedLoader,
};

/// Declarative loader configuration.
///
/// `type` names loader class in [`LoaderRegistry`],
/// all other fields are class-specific.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoaderSpec {
    #[serde(rename = "type")]
    pub class: String,

    #[serde(flatten)]
    pub params: toml::Table,
}

impl LoaderSpec {
    pub fn new(class: impl Into<String>) -> Self {
        LoaderSpec {
            class: class.into(),
            params: toml::Table::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

type LoaderFactory =
    Box<dyn Fn(&toml::Table, &LoaderContext) -> Result<SharedLoader, ConfigError> + Send + Sync>;

/// Named loader classes.
///
/// Classes are registered during setup.
/// The registry is only read afterwards.
pub struct LoaderRegistry {
    classes: HashMap<String, LoaderFactory>,
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.classes.keys()).finish()
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        LoaderRegistry::with_builtin()
    }
}

impl LoaderRegistry {
    pub const URL_LOADER: &'static str = "URLLoader";
    pub const RELATIVE_URL_LOADER: &'static str = "RelativeURLLoader";
    pub const MEMORY_LOADER: &'static str = "MemoryLoader";

    /// Returns registry without any loader classes.
    pub fn new() -> Self {
        LoaderRegistry {
            classes: HashMap::new(),
        }
    }

    /// Returns registry with all loader classes provided by this crate.
    pub fn with_builtin() -> Self {
        let mut registry = LoaderRegistry::new();
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.classes.insert(
            Self::URL_LOADER.to_owned(),
            factory(Self::URL_LOADER, |config: UrlLoaderConfig, _| {
                Ok(UrlLoader::from_config(config))
            }),
        );
        self.classes.insert(
            Self::RELATIVE_URL_LOADER.to_owned(),
            factory(Self::RELATIVE_URL_LOADER, UrlLoader::relative),
        );
        self.classes.insert(
            Self::MEMORY_LOADER.to_owned(),
            factory(Self::MEMORY_LOADER, |config: MemoryLoaderConfig, _| {
                Ok(MemoryLoader::from_config(config))
            }),
        );
    }

    /// Registers new loader class.
    ///
    /// `factory` receives class-specific configuration deserialized
    /// from [`LoaderSpec::params`].
    pub fn register<C, L, F>(&mut self, name: &str, factory_fn: F) -> Result<(), ConfigError>
    where
        C: DeserializeOwned + 'static,
        L: Loader,
        F: Fn(C, &LoaderContext) -> Result<L, ConfigError> + Send + Sync + 'static,
    {
        if self.classes.contains_key(name) {
            return Err(ConfigError::DuplicateLoaderClass {
                name: name.to_owned(),
            });
        }

        tracing::debug!("Registering loader class '{}'", name);
        self.classes.insert(name.to_owned(), factory(name, factory_fn));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.classes.keys().map(String::as_str)
    }

    /// Builds loader from its declarative configuration.
    pub fn build(
        &self,
        spec: &LoaderSpec,
        cx: &LoaderContext,
    ) -> Result<SharedLoader, ConfigError> {
        let factory = self
            .classes
            .get(&spec.class)
            .ok_or_else(|| ConfigError::UnknownLoaderClass {
                name: spec.class.clone(),
            })?;

        factory(&spec.params, cx)
    }
}

fn factory<C, L, F>(name: &str, f: F) -> LoaderFactory
where
    C: DeserializeOwned + 'static,
    L: Loader,
    F: Fn(C, &LoaderContext) -> Result<L, ConfigError> + Send + Sync + 'static,
{
    let class = name.to_owned();
    Box::new(move |params: &toml::Table, cx: &LoaderContext| {
        let config = toml::Value::Table(params.clone())
            .try_into::<C>()
            .map_err(|error| ConfigError::InvalidLoaderConfig {
                class: class.clone(),
                reason: error.to_string(),
            })?;

        let loader = f(config, cx)?;
        Ok(Arc::new(loader) as SharedLoader)
    })
}
