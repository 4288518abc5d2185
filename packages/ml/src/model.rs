//! The trained model artifact.
//!
//! The forest is serialized to MessagePack, then wrapped with Fory so the
//! envelope can evolve without breaking older readers. Files use the
//! `.flmodel` extension.

use crate::forest::RandomForest;
use crate::grades::FEATURE_COLUMNS;
use fory::{Fory, ForyObject};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const MODEL_FILE_EXTENSION: &str = "flmodel";
pub const DEFAULT_MODEL_PATH: &str = "recommender_model.flmodel";

const FORMAT_VERSION: u8 = 1;
const MODEL_TYPE: &str = "RandomForest";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("model artifact not found: {0}")]
    NotFound(String),
    #[error("failed to access model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode model artifact: {0}")]
    Encode(String),
    #[error("failed to decode model artifact: {0}")]
    Decode(String),
    #[error("unsupported model artifact version {0}")]
    UnsupportedVersion(u8),
    #[error("artifact holds a {0} model, expected {MODEL_TYPE}")]
    WrongModelType(String),
    #[error("inconsistent model: {0}")]
    Inconsistent(String),
}

/// Outer framing of a model file. The payload is the MessagePack-encoded
/// [`TrainedModel`]; the version and type tags are checked before decoding it.
#[derive(ForyObject)]
struct ModelEnvelope {
    version: u8,
    model_type: String,
    msgpack_payload: Vec<u8>,
}

impl ModelEnvelope {
    fn codec() -> Result<Fory, String> {
        let mut fory = Fory::default().compatible(true);
        fory.register::<ModelEnvelope>(1)
            .map_err(|e| format!("Failed to register envelope: {e}"))?;
        Ok(fory)
    }

    fn encode(&self) -> Result<Vec<u8>, ArtifactError> {
        Self::codec()
            .map_err(ArtifactError::Encode)?
            .serialize(self)
            .map_err(|e| ArtifactError::Encode(format!("Fory serialization failed: {e}")))
    }

    fn decode(bytes: &[u8]) -> Result<Self, ArtifactError> {
        Self::codec()
            .map_err(ArtifactError::Decode)?
            .deserialize(bytes)
            .map_err(|e| ArtifactError::Decode(format!("Fory deserialization failed: {e}")))
    }
}

/// A fitted classifier with the metadata needed to score raw inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    forest: RandomForest,
    /// Class labels in the classifier's internal (sorted) order.
    classes: Vec<String>,
    /// Column order the forest was fit on, when known.
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

impl TrainedModel {
    pub fn new(
        forest: RandomForest,
        classes: Vec<String>,
        feature_names: Option<Vec<String>>,
    ) -> Result<Self, ArtifactError> {
        let model = TrainedModel {
            forest,
            classes,
            feature_names,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        self.forest
            .check()
            .map_err(|err| ArtifactError::Inconsistent(err.to_string()))?;
        if self.classes.len() != self.forest.n_classes() {
            return Err(ArtifactError::Inconsistent(format!(
                "{} class labels for a forest over {} classes",
                self.classes.len(),
                self.forest.n_classes()
            )));
        }
        let n_features = self
            .feature_names
            .as_ref()
            .map_or(FEATURE_COLUMNS.len(), Vec::len);
        if n_features != self.forest.n_features() {
            return Err(ArtifactError::Inconsistent(format!(
                "{} feature names for a forest over {} features",
                n_features,
                self.forest.n_features()
            )));
        }
        Ok(())
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Serialize the model to Fory binary format.
    pub fn to_fory_vec(&self) -> Result<Vec<u8>, ArtifactError> {
        let msgpack_payload = rmp_serde::to_vec_named(self)
            .map_err(|e| ArtifactError::Encode(format!("MessagePack serialization failed: {e}")))?;

        ModelEnvelope {
            version: FORMAT_VERSION,
            model_type: MODEL_TYPE.to_string(),
            msgpack_payload,
        }
        .encode()
    }

    /// Deserialize a model from Fory binary format.
    pub fn from_fory_slice(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let envelope = ModelEnvelope::decode(bytes)?;

        if envelope.version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(envelope.version));
        }
        if envelope.model_type != MODEL_TYPE {
            return Err(ArtifactError::WrongModelType(envelope.model_type));
        }

        let model: TrainedModel = rmp_serde::from_slice(&envelope.msgpack_payload)
            .map_err(|e| ArtifactError::Decode(format!("MessagePack deserialization failed: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let bytes = self.to_fory_vec()?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ArtifactError::NotFound(path.display().to_string()),
            _ => ArtifactError::Io(err),
        })?;
        Self::from_fory_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::RandomForestParams;
    use ndarray::{Array1, Array2};

    fn small_model() -> TrainedModel {
        let mut flat = Vec::new();
        let mut targets = Vec::new();
        for i in 0..12 {
            let high = i % 2 == 0;
            let v = if high { 90.0 } else { 40.0 } + i as f64;
            flat.extend([v, 50.0, 50.0, 50.0, 50.0, 50.0]);
            targets.push(usize::from(!high));
        }
        let records = Array2::from_shape_vec((12, 6), flat).unwrap();
        let forest = RandomForestParams::default()
            .n_trees(8)
            .fit(&records, &Array1::from(targets), 2)
            .unwrap();
        TrainedModel::new(
            forest,
            vec!["Languages".to_string(), "Sports".to_string()],
            Some(FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()),
        )
        .unwrap()
    }

    #[test]
    fn test_save_and_load_preserves_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_MODEL_PATH);
        let model = small_model();
        model.save(&path).unwrap();

        let loaded = TrainedModel::load(&path).unwrap();
        assert_eq!(loaded.classes(), model.classes());
        assert_eq!(loaded.feature_names(), model.feature_names());

        let x = [95.0, 50.0, 50.0, 50.0, 50.0, 50.0];
        assert_eq!(
            loaded.forest().predict_proba_one(&x).unwrap(),
            model.forest().predict_proba_one(&x).unwrap()
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrainedModel::load(dir.path().join("absent.flmodel")).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn test_load_garbage() {
        let err = TrainedModel::from_fory_slice(b"not a model").unwrap_err();
        assert!(matches!(err, ArtifactError::Decode(_)));
    }

    fn envelope_bytes(version: u8, model_type: &str) -> Vec<u8> {
        ModelEnvelope {
            version,
            model_type: model_type.to_string(),
            msgpack_payload: rmp_serde::to_vec_named(&small_model()).unwrap(),
        }
        .encode()
        .unwrap()
    }

    #[test]
    fn test_envelope_round_trip_accepts_current_format() {
        let bytes = envelope_bytes(FORMAT_VERSION, MODEL_TYPE);
        let model = TrainedModel::from_fory_slice(&bytes).unwrap();
        assert_eq!(model.classes(), small_model().classes());
    }

    #[test]
    fn test_load_rejects_newer_format_version() {
        let err = TrainedModel::from_fory_slice(&envelope_bytes(2, MODEL_TYPE)).unwrap_err();
        assert!(matches!(err, ArtifactError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_load_rejects_other_model_type() {
        let err = TrainedModel::from_fory_slice(&envelope_bytes(FORMAT_VERSION, "KMeans"))
            .unwrap_err();
        match err {
            ArtifactError::WrongModelType(found) => assert_eq!(found, "KMeans"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_label_mismatch() {
        let model = small_model();
        let err = TrainedModel::new(model.forest().clone(), vec!["Only".to_string()], None)
            .unwrap_err();
        assert!(matches!(err, ArtifactError::Inconsistent(_)));
    }
}
