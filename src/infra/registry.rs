// ============================================================
// Layer 6 — Adapter Registries
// ============================================================
// Two AdapterPublisher implementations:
//
//   LocalRegistry — a directory tree standing in for a model hub
//       <root>/index.json              ← repo id → entry
//       <root>/<owner>/<name>/
//           adapter.mpk.gz
//           adapter_config.json
//           README.md                  ← model card
//
//   HubPublisher  — Hugging Face Hub REST API
//       POST {API}/repos/create                      (409 = exists)
//       PUT  {API}/models/<repo>/upload/main/<path>  per file
//
// Publishing overwrites; there is no versioning.
//
// Reference: Hugging Face Hub HTTP API

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::domain::traits::{AdapterPublisher, PublishRequest};
use crate::infra::base_model::resolve_token;
use crate::infra::checkpoint::{CheckpointManager, MANIFEST_FILE};

const HF_API_BASE: &str = "https://huggingface.co/api";
const MODEL_CARD:  &str = "README.md";
const INDEX_FILE:  &str = "index.json";

/// Split `owner/name`, rejecting anything that could escape a registry root.
pub fn split_repo_id(repo_id: &str) -> Result<(&str, &str)> {
    let valid = |part: &str| {
        !part.is_empty()
            && part != "."
            && part != ".."
            && part.chars().all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c))
    };
    match repo_id.split_once('/') {
        Some((owner, name)) if valid(owner) && valid(name) => Ok((owner, name)),
        _ => bail!("repository id must look like 'owner/name', got '{repo_id}'"),
    }
}

/// Files of an export directory, as (local path, name in repository).
fn export_files(export_dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let ckpt = CheckpointManager::new(export_dir);
    if !ckpt.exists() {
        bail!(
            "'{}' is not an exported adapter (expected adapter weights and {})",
            export_dir.display(),
            MANIFEST_FILE
        );
    }
    [ckpt.weights_path(), ckpt.manifest_path()]
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| anyhow!("Bad export file name '{}'", path.display()))?;
            Ok((path, name))
        })
        .collect()
}

// ─── Model card ───────────────────────────────────────────────────────────────
pub fn model_card(request: &PublishRequest) -> String {
    let accuracy = request
        .accuracy
        .map(|a| format!("{a:.4}"))
        .unwrap_or_else(|| "not evaluated".to_string());

    format!(
        "---\n\
         base_model: {base}\n\
         datasets:\n\
         - {dataset}\n\
         tags:\n\
         - reft\n\
         - loreft\n\
         - text-classification\n\
         - natural-language-inference\n\
         ---\n\n\
         # {repo}\n\n\
         LoReFT adapter with a 3-way classification head (entailment, neutral,\n\
         contradiction) trained on top of the frozen encoder `{base}`.\n\n\
         | Metric | Value |\n\
         |--------|-------|\n\
         | validation accuracy | {accuracy} |\n\n\
         Files: `adapter.mpk.gz` (Burn named MessagePack record) and\n\
         `{manifest}` (adapter hyperparameters and label order).\n",
        base     = request.base_model,
        dataset  = request.dataset_tag,
        repo     = request.repo_id,
        manifest = MANIFEST_FILE,
    )
}

// ─── LocalRegistry ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub base_model:  String,
    pub dataset_tag: String,
    pub accuracy:    Option<f64>,
    pub path:        PathBuf,
}

pub struct LocalRegistry {
    root: PathBuf,
}

impl LocalRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn index(&self) -> Result<BTreeMap<String, IndexEntry>> {
        let path = self.root.join(INDEX_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed registry index '{}'", path.display()))
    }

    fn write_index(&self, index: &BTreeMap<String, IndexEntry>) -> Result<()> {
        let path = self.root.join(INDEX_FILE);
        fs::write(&path, serde_json::to_string_pretty(index)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

impl AdapterPublisher for LocalRegistry {
    fn publish(&self, export_dir: &Path, request: &PublishRequest) -> Result<String> {
        let (owner, name) = split_repo_id(&request.repo_id)?;
        let files  = export_files(export_dir)?;
        let target = self.root.join(owner).join(name);
        fs::create_dir_all(&target)
            .with_context(|| format!("Cannot create '{}'", target.display()))?;

        for (source, file_name) in &files {
            fs::copy(source, target.join(file_name))
                .with_context(|| format!("Cannot copy '{}'", source.display()))?;
        }
        fs::write(target.join(MODEL_CARD), model_card(request))?;

        let mut index = self.index()?;
        index.insert(
            request.repo_id.clone(),
            IndexEntry {
                base_model:  request.base_model.clone(),
                dataset_tag: request.dataset_tag.clone(),
                accuracy:    request.accuracy,
                path:        target.clone(),
            },
        );
        self.write_index(&index)?;

        tracing::info!("Published {} to '{}'", request.repo_id, target.display());
        Ok(target.display().to_string())
    }
}

// ─── HubPublisher ─────────────────────────────────────────────────────────────
pub struct HubPublisher {
    client: reqwest::blocking::Client,
    token:  String,
}

impl HubPublisher {
    /// Uses `token`, else `HF_TOKEN` / `~/.huggingface/token`.
    pub fn new(token: Option<String>) -> Result<Self> {
        let token = token
            .or_else(resolve_token)
            .ok_or_else(|| anyhow!("Hub publishing needs a token: set HF_TOKEN or ~/.huggingface/token"))?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("reft-nli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, token })
    }

    fn create_repo(&self, owner: &str, name: &str) -> Result<()> {
        let body = serde_json::json!({
            "name":         name,
            "organization": owner,
            "type":         "model",
            "private":      false,
        });

        let response = self
            .client
            .post(format!("{HF_API_BASE}/repos/create"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .context("Create repo request failed")?;

        // 409: repository already exists
        let status = response.status();
        if status.is_success() || status.as_u16() == 409 {
            Ok(())
        } else {
            let text = response.text().unwrap_or_default();
            bail!("Cannot create repository {owner}/{name}: HTTP {status}: {text}")
        }
    }

    fn upload(&self, repo_id: &str, path_in_repo: &str, content: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .put(format!("{HF_API_BASE}/models/{repo_id}/upload/main/{path_in_repo}"))
            .bearer_auth(&self.token)
            .header("Content-Type", "application/octet-stream")
            .body(content)
            .send()
            .with_context(|| format!("Upload of '{path_in_repo}' failed"))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Uploaded {} to {}", path_in_repo, repo_id);
            Ok(())
        } else {
            let text = response.text().unwrap_or_default();
            bail!("Upload of '{path_in_repo}' failed: HTTP {status}: {text}")
        }
    }
}

impl AdapterPublisher for HubPublisher {
    fn publish(&self, export_dir: &Path, request: &PublishRequest) -> Result<String> {
        let (owner, name) = split_repo_id(&request.repo_id)?;
        let files = export_files(export_dir)?;

        self.create_repo(owner, name)?;
        for (source, file_name) in &files {
            let content = fs::read(source).with_context(|| format!("Cannot read '{}'", source.display()))?;
            self.upload(&request.repo_id, file_name, content)?;
        }
        self.upload(&request.repo_id, MODEL_CARD, model_card(request).into_bytes())?;

        let url = format!("https://huggingface.co/{}", request.repo_id);
        tracing::info!("Published {} files to {}", files.len() + 1, url);
        Ok(url)
    }
}

impl std::fmt::Debug for HubPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubPublisher").field("token", &"***").finish()
    }
}
