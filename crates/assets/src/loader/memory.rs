use futures::future::BoxFuture;
use hashbrown::HashMap;

use crate::error::LoadError;

use super::{AssetData, Loader};

/// Configuration of [`MemoryLoader`].
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct MemoryLoaderConfig {
    /// Inline text files keyed by path.
    #[serde(default)]
    pub files: HashMap<String, String>,
}

/// Loader that serves assets embedded in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    files: HashMap<String, Box<[u8]>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        MemoryLoader::default()
    }

    pub fn from_config(config: MemoryLoaderConfig) -> Self {
        MemoryLoader {
            files: config
                .files
                .into_iter()
                .map(|(path, text)| (path, text.into_bytes().into_boxed_slice()))
                .collect(),
        }
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Box<[u8]>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Box<[u8]>>) {
        self.files.insert(path.into(), bytes.into());
    }
}

impl Loader for MemoryLoader {
    fn load<'a>(
        &'a self,
        path: &'a str,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<AssetData, LoadError>> {
        let result = match self.files.get(path) {
            Some(bytes) => Ok(AssetData {
                bytes: bytes.clone(),
                content_type: content_type.map(str::to_owned),
                source: format!("memory:{path}"),
            }),
            None => Err(LoadError::Unavailable {
                path: path.to_owned(),
                reason: "Not embedded".to_owned(),
            }),
        };
        Box::pin(futures::future::ready(result))
    }
}
