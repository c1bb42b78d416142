use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{error::PipelineError, loader::AssetData};

/// Field with named dependencies of an asset.
pub const DEPENDENCIES: &str = "dependencies";

/// Field with path to load asset data from.
pub const PATH: &str = "path";

/// Field with content type hint for the loader.
pub const MIME_TYPE: &str = "mimeType";

/// Asset flowing through the [`AssetPipeline`](crate::AssetPipeline).
///
/// Asset is a JSON object with arbitrary fields.
/// The only field recognized by the pipeline itself is `dependencies`,
/// a map from arbitrary keys to nested assets or `null`.
///
/// Pipeline stages may attach loaded data to the asset,
/// and the dependencies stage replaces raw `dependencies` field
/// with resolved sub-assets.
#[derive(Clone, Debug, Default)]
pub struct Asset {
    fields: Map<String, Value>,
    data: Option<AssetData>,
    dependencies: Option<BTreeMap<String, Asset>>,
}

impl Asset {
    pub fn new() -> Self {
        Asset::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Asset {
            fields,
            data: None,
            dependencies: None,
        }
    }

    /// Creates asset from JSON value.
    /// The value must be an object.
    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        match value {
            Value::Object(fields) => Ok(Asset::from_fields(fields)),
            _ => Err(PipelineError::NotAnObject),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Returns optional string field.
    ///
    /// Fails if field is present but is not a string.
    pub fn str_field(&self, field: &'static str) -> Result<Option<&str>, PipelineError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(PipelineError::InvalidField { field }),
        }
    }

    /// Returns path to load asset data from.
    pub fn path(&self) -> Result<Option<&str>, PipelineError> {
        self.str_field(PATH)
    }

    /// Returns content type hint.
    pub fn mime_type(&self) -> Result<Option<&str>, PipelineError> {
        self.str_field(MIME_TYPE)
    }

    /// Returns loaded data attached to the asset.
    pub fn data(&self) -> Option<&AssetData> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: AssetData) {
        self.data = Some(data);
    }

    pub fn take_data(&mut self) -> Option<AssetData> {
        self.data.take()
    }

    /// Returns resolved dependency.
    pub fn dependency(&self, key: &str) -> Option<&Asset> {
        self.dependencies.as_ref()?.get(key)
    }

    pub fn dependency_mut(&mut self, key: &str) -> Option<&mut Asset> {
        self.dependencies.as_mut()?.get_mut(key)
    }

    /// Returns all resolved dependencies.
    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &Asset)> + '_ {
        self.dependencies
            .iter()
            .flatten()
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Takes raw, unresolved `dependencies` field out of the asset.
    pub(crate) fn take_raw_dependencies(&mut self) -> Option<Value> {
        self.fields.remove(DEPENDENCIES)
    }

    /// Marks dependencies as resolved, even if none are left.
    pub(crate) fn init_dependencies(&mut self) {
        self.dependencies.get_or_insert_with(BTreeMap::new);
    }

    pub(crate) fn set_dependency(&mut self, key: String, asset: Asset) {
        self.dependencies
            .get_or_insert_with(BTreeMap::new)
            .insert(key, asset);
    }

    /// Converts asset back to JSON value.
    ///
    /// Resolved dependencies are nested under `dependencies` field.
    /// Resolved but empty dependencies produce an empty map.
    /// Attached data is not included.
    pub fn to_value(&self) -> Value {
        let mut fields = self.fields.clone();
        if let Some(resolved) = &self.dependencies {
            let mut dependencies = match fields.remove(DEPENDENCIES) {
                Some(Value::Object(raw)) => raw,
                _ => Map::new(),
            };
            for (key, dependency) in resolved {
                dependencies.insert(key.clone(), dependency.to_value());
            }
            fields.insert(DEPENDENCIES.to_owned(), Value::Object(dependencies));
        }
        Value::Object(fields)
    }
}

impl TryFrom<Value> for Asset {
    type Error = PipelineError;

    fn try_from(value: Value) -> Result<Self, PipelineError> {
        Asset::from_value(value)
    }
}
