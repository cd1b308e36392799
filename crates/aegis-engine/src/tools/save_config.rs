//! `save_config` tool — deep-merge a JSON patch into `aegis.toml`, validate
//! it parses back as a well-formed `AegisConfig`, and write it atomically
//! with backup rotation (write-tmp-then-rename, keeping the last 4 backups).

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{Tool, ToolResult};

const MAX_BACKUPS: usize = 4;

pub struct SaveConfigTool {
    config_path: PathBuf,
}

impl SaveConfigTool {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }
}

#[async_trait]
impl Tool for SaveConfigTool {
    fn name(&self) -> &str {
        "save_config"
    }

    fn description(&self) -> &str {
        "Apply a partial update to the agent's TOML configuration file. The \
         patch is deep-merged into the existing config, validated, and written \
         atomically with automatic backup rotation. Only use this when the user \
         explicitly asks to change a setting."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "patch": {
                    "type": "object",
                    "description": "Partial config object to deep-merge into the existing config (e.g. {\"agent\": {\"model\": \"...\"}})."
                }
            },
            "required": ["patch"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let patch = match input.get("patch") {
            Some(p) if p.is_object() => p.clone(),
            _ => return ToolResult::error("missing required parameter: patch (must be an object)"),
        };

        match apply_patch(&self.config_path, &patch) {
            Ok(()) => ToolResult::success(format!(
                "Config updated: {}",
                self.config_path.display()
            )),
            Err(e) => ToolResult::error(e),
        }
    }
}

fn apply_patch(config_path: &Path, patch: &serde_json::Value) -> Result<(), String> {
    let existing_toml = fs::read_to_string(config_path).map_err(|e| e.to_string())?;
    let existing: serde_json::Value = toml::from_str(&existing_toml)
        .map_err(|e| format!("existing config failed to parse: {e}"))?;

    let mut merged = existing;
    deep_merge(&mut merged, patch);

    // Validate: the merged value must round-trip through AegisConfig.
    let merged_toml = toml::to_string_pretty(&merged).map_err(|e| e.to_string())?;
    let _: aegis_core::config::AegisConfig =
        toml::from_str(&merged_toml).map_err(|e| format!("merged config is invalid: {e}"))?;

    rotate_backups(config_path)?;
    write_atomic(config_path, &merged_toml)
}

/// Recursively merge `patch` into `target`, overwriting scalar/array leaves
/// and merging nested objects key by key.
fn deep_merge(target: &mut serde_json::Value, patch: &serde_json::Value) {
    match (target, patch) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                deep_merge(
                    target_map.entry(key.clone()).or_insert(serde_json::Value::Null),
                    value,
                );
            }
        }
        (target_slot, patch_value) => {
            *target_slot = patch_value.clone();
        }
    }
}

/// Rotate `config.toml.bak.1..4`, oldest dropped, before overwriting.
fn rotate_backups(config_path: &Path) -> Result<(), String> {
    if !config_path.exists() {
        return Ok(());
    }
    for i in (1..MAX_BACKUPS).rev() {
        let from = backup_path(config_path, i);
        let to = backup_path(config_path, i + 1);
        if from.exists() {
            let _ = fs::rename(&from, &to);
        }
    }
    let first_backup = backup_path(config_path, 1);
    fs::copy(config_path, &first_backup).map_err(|e| e.to_string())?;
    Ok(())
}

fn backup_path(config_path: &Path, n: usize) -> PathBuf {
    let file_name = config_path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "aegis.toml".to_string());
    config_path.with_file_name(format!("{file_name}.bak.{n}"))
}

fn write_atomic(path: &Path, body: &str) -> Result<(), String> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, body).map_err(|e| e.to_string())?;
    fs::rename(&tmp, path).map_err(|e| e.to_string())?;
    Ok(())
}
