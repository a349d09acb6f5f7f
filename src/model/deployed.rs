//! Deployed model artifacts and the loaders that turn them into callable models.
//!
//! An artifact is a JSON document with the metadata record and a model description
//! (`kind` plus free-form `parameters`). The `kind` selects a [`ModelLoader`]; what the loaded
//! model does with its input record is opaque to the rest of the crate.
use std::{collections::BTreeMap, collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    device::Device,
    errors::{NequipError, Result},
    model::{
        metadata::{ModelMetadata, Precision},
        record::{ModelInput, ModelOutput},
    },
    potentials::lennard_jones::LennardJonesLoader,
};

/// A pre-trained potential: given an input record, returns energy and forces.
pub trait DeployedModel: Send + Sync {
    fn forward(&self, input: &ModelInput) -> Result<ModelOutput>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: BTreeMap<String, String>,
    pub model: ModelSpec,
}

impl ModelArtifact {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| NequipError::ArtifactReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn metadata(&self) -> Result<ModelMetadata> {
        ModelMetadata::from_map(&self.metadata)
    }
}

/// Knows how to instantiate one `kind` of model.
pub trait ModelLoader: Send + Sync {
    fn kind(&self) -> &str;

    /// Devices this backend can execute on.
    fn available_devices(&self) -> Vec<Device>;

    fn load(
        &self,
        spec: &ModelSpec,
        device: Device,
        precision: Precision,
    ) -> Result<Box<dyn DeployedModel>>;
}

/// Loaders keyed by model kind.
#[derive(Default)]
pub struct ModelLoaders {
    loaders: HashMap<String, Box<dyn ModelLoader>>,
}

impl ModelLoaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// The loaders shipped with the crate.
    pub fn with_defaults() -> Self {
        let mut loaders = Self::new();
        loaders.register(LennardJonesLoader);
        loaders
    }

    pub fn register<L>(&mut self, loader: L)
    where
        L: ModelLoader + 'static,
    {
        self.loaders
            .insert(loader.kind().to_string(), Box::new(loader));
    }

    pub fn get(&self, kind: &str) -> Result<&dyn ModelLoader> {
        self.loaders
            .get(kind)
            .map(|b| b.as_ref())
            .ok_or_else(|| NequipError::UnknownModelKind {
                kind: kind.to_string(),
            })
    }
}

/// A model ready to be invoked, with the metadata and device it was loaded with.
pub struct LoadedModel {
    pub model: Box<dyn DeployedModel>,
    pub metadata: ModelMetadata,
    pub device: Device,
}

/// Parses the metadata, picks the device and instantiates the model of `artifact`.
pub fn load_deployed_model(
    artifact: &ModelArtifact,
    device: Option<&str>,
    loaders: &ModelLoaders,
) -> Result<LoadedModel> {
    let metadata = artifact.metadata()?;
    let loader = loaders.get(&artifact.model.kind)?;
    let device = Device::resolve(device, &loader.available_devices())?;
    let model = loader.load(&artifact.model, device, metadata.model_dtype)?;

    info!(
        kind = %artifact.model.kind,
        %device,
        dtype = %metadata.model_dtype,
        r_max = metadata.r_max,
        species = metadata.n_species(),
        "loaded deployed model"
    );

    Ok(LoadedModel {
        model,
        metadata,
        device,
    })
}
