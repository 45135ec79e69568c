// ============================================================
// Layer 2 — PublishUseCase
// ============================================================
// Sends an exported adapter directory to a registry:
//
//   registry_dir given → LocalRegistry (directory tree + index)
//   otherwise          → HubPublisher  (Hugging Face Hub)
//
// Base model and accuracy for the model card come from the
// adapter's own manifest.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::domain::traits::{AdapterPublisher, PublishRequest};
use crate::infra::{
    checkpoint::CheckpointManager,
    registry::{split_repo_id, HubPublisher, LocalRegistry},
};

pub struct PublishUseCase {
    adapter_dir:  PathBuf,
    repo_id:      String,
    dataset_tag:  String,
    registry_dir: Option<PathBuf>,
}

impl PublishUseCase {
    pub fn new(
        adapter_dir:  impl AsRef<Path>,
        repo_id:      String,
        dataset_tag:  String,
        registry_dir: Option<PathBuf>,
    ) -> Self {
        Self { adapter_dir: adapter_dir.as_ref().to_path_buf(), repo_id, dataset_tag, registry_dir }
    }

    /// Returns where the adapter was published.
    pub fn execute(&self) -> Result<String> {
        split_repo_id(&self.repo_id)?;
        let manifest = CheckpointManager::new(&self.adapter_dir).load_manifest()?;

        let request = PublishRequest {
            repo_id:     self.repo_id.clone(),
            dataset_tag: self.dataset_tag.clone(),
            base_model:  manifest.base_model,
            accuracy:    manifest.accuracy,
        };

        let publisher: Box<dyn AdapterPublisher> = match &self.registry_dir {
            Some(root) => Box::new(LocalRegistry::new(root)),
            None       => Box::new(HubPublisher::new(None)?),
        };
        publisher.publish(&self.adapter_dir, &request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::NliLabel;
    use crate::infra::checkpoint::AdapterManifest;
    use crate::ml::model::ReftConfig;
    use crate::test_support::{self, TestBackend};

    #[test]
    fn test_publish_to_local_registry_uses_manifest_metadata() {
        let export   = tempfile::tempdir().unwrap();
        let registry = tempfile::tempdir().unwrap();
        let device   = Default::default();
        let adapter  = ReftConfig::default()
            .init_adapter::<TestBackend>(&test_support::encoder_config(), &device);
        let manifest = AdapterManifest {
            base_model: "org/encoder".to_string(),
            reft:       ReftConfig::default(),
            max_length: 32,
            labels:     NliLabel::names(),
            epochs:     2,
            accuracy:   Some(0.7),
        };
        CheckpointManager::new(export.path()).save_adapter(&adapter, &manifest).unwrap();

        let location = PublishUseCase::new(
            export.path(),
            "me/adapter".to_string(),
            "glue/mnli".to_string(),
            Some(registry.path().to_path_buf()),
        )
        .execute()
        .unwrap();

        assert!(location.ends_with("adapter"));
        let index = LocalRegistry::new(registry.path()).index().unwrap();
        assert_eq!(index["me/adapter"].base_model, "org/encoder");
        assert_eq!(index["me/adapter"].accuracy, Some(0.7));
    }

    #[test]
    fn test_bad_repo_id_fails_before_touching_files() {
        let export = tempfile::tempdir().unwrap();
        let result = PublishUseCase::new(export.path(), "noslash".to_string(), "t".to_string(), None).execute();
        assert!(result.unwrap_err().to_string().contains("owner/name"));
    }
}
