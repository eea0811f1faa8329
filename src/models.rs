//! Model lifecycle on the platform.
//!
//! [`ModelInfo`] is the platform's bookkeeping record for one stored model:
//! ids, validity, sample count and threshold. The model content itself is
//! fetched as JSON and parsed into a [`Model`], edited locally, then saved
//! back; the platform re-validates asynchronously, so saves poll until the
//! validity verdict lands.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::client::Client;
use crate::errors::{ApiError, ModelError, Result};
use crate::model::Model;
use crate::parsers::ParserFile;
use crate::projects::Project;

/// Platform record for a stored model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub pid: String,
    pub mid: String,
    pub name: String,
    pub description: String,
    pub threshold: u64,
    pub samples: u64,
    pub meta_data: Value,
    /// `None` while the platform is still validating.
    pub is_valid: Option<bool>,
    pub validation_issues: String,
}

/// The platform encodes validity as 0 (pending), 1 (valid), 2 (invalid).
fn validity_from_int(valid: u64) -> std::result::Result<Option<bool>, ApiError> {
    match valid {
        0 => Ok(None),
        1 => Ok(Some(true)),
        2 => Ok(Some(false)),
        other => Err(ApiError::Parse(format!("Invalid model validity {other}"))),
    }
}

impl Client {
    async fn list_model_records(&self, pid: &str) -> Result<Vec<Value>> {
        let response = self.post("models", Some(json!({"pid": pid}))).await?;
        response
            .as_array()
            .cloned()
            .ok_or_else(|| ApiError::Parse("model list is not an array".to_string()).into())
    }

    async fn model_info_from_record(&self, record: &Value) -> Result<ModelInfo> {
        let field = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::Parse(format!("model record missing '{key}'")))
        };
        let pid = field("pid")?;
        let mid = field("mid")?;
        let valid = record
            .get("valid")
            .and_then(Value::as_u64)
            .ok_or_else(|| ApiError::Parse("model record missing 'valid'".to_string()))?;

        let data = self
            .post("modeldata", Some(json!({"pid": pid, "mid": mid})))
            .await?;
        let threshold = data.get("threshold").and_then(Value::as_u64).unwrap_or(100);
        let samples = data.get("samples").and_then(Value::as_u64).unwrap_or(1000);
        let meta_data = data.get("metadata").cloned().unwrap_or(Value::Null);

        Ok(ModelInfo {
            pid,
            mid,
            name: field("name")?,
            description: field("description")?,
            threshold,
            samples,
            meta_data,
            is_valid: validity_from_int(valid)?,
            validation_issues: record
                .get("validation_issues")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// Polls until the platform has validated the model.
    async fn wait_for_model_validation(&self, pid: &str, mid: &str) -> Result<ModelInfo> {
        loop {
            for record in self.list_model_records(pid).await? {
                if record.get("mid").and_then(Value::as_str) != Some(mid) {
                    continue;
                }
                let valid = record.get("valid").and_then(Value::as_u64).unwrap_or(0);
                if validity_from_int(valid)?.is_some() {
                    return self.model_info_from_record(&record).await;
                }
                break;
            }
            debug!("model {} still validating", mid);
            sleep(Duration::from_secs(1)).await;
        }
    }

    pub async fn list_models(&self, project: &Project) -> Result<Vec<ModelInfo>> {
        let records = self.list_model_records(&project.pid).await?;
        let mut models = Vec::with_capacity(records.len());
        for record in &records {
            models.push(self.model_info_from_record(record).await?);
        }
        Ok(models)
    }

    pub async fn get_model_by_mid(&self, project: &Project, mid: &str) -> Result<ModelInfo> {
        for record in self.list_model_records(&project.pid).await? {
            if record.get("mid").and_then(Value::as_str) == Some(mid) {
                return self.model_info_from_record(&record).await;
            }
        }
        Err(ModelError::not_found("model", mid).into())
    }

    /// Exact-name lookup with a case-insensitive fallback.
    pub async fn get_model_by_name(&self, project: &Project, name: &str) -> Result<ModelInfo> {
        let models = self.list_models(project).await?;
        if let Some(info) = models.iter().find(|m| m.name == name) {
            return Ok(info.clone());
        }
        let lowered = name.to_lowercase();
        models
            .into_iter()
            .find(|m| m.name.to_lowercase() == lowered)
            .ok_or_else(|| ModelError::not_found("model", name).into())
    }

    /// Fetches the model document and parses it into the local object graph.
    pub async fn get_model(&self, info: &ModelInfo) -> Result<Model> {
        let document = self.get_model_json(info).await?;
        Ok(Model::from_json(document)?)
    }

    /// Fetches the raw model document.
    pub async fn get_model_json(&self, info: &ModelInfo) -> Result<Value> {
        self.post(
            "model/json",
            Some(json!({"pid": info.pid, "mids": [info.mid]})),
        )
        .await
    }

    /// Downloads the model as a `.scad` archive.
    pub async fn get_scad(&self, info: &ModelInfo) -> Result<Vec<u8>> {
        let response = self
            .post(
                "model/file",
                Some(json!({"pid": info.pid, "mids": [info.mid]})),
            )
            .await?;
        let encoded = response
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("model file response missing 'data'".to_string()))?;
        Ok(BASE64
            .decode(encoded)
            .map_err(|e| ApiError::Parse(format!("invalid base64 model file: {e}")))?)
    }

    /// Uploads a `.scad` archive as a new model in the project.
    pub async fn upload_scad_model(
        &self,
        project: &Project,
        filename: &str,
        content: &[u8],
        description: Option<&str>,
    ) -> Result<ModelInfo> {
        let mut file = json!({
            "filename": filename,
            "file": BASE64.encode(content),
            "type": "scad",
        });
        if let Some(description) = description {
            file["description"] = json!(description);
        }
        let data = json!({"pid": project.pid, "files": [[file]]});
        let response = self.put("models", Some(data)).await?;
        let mid = response
            .get(0)
            .and_then(|m| m.get("mid"))
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("upload response missing 'mid'".to_string()))?;
        self.wait_for_model_validation(&project.pid, mid).await
    }

    /// Saves local model changes over the stored model, then waits for
    /// re-validation. The stored name and mid win over the local ones.
    pub async fn save_model(&self, info: &ModelInfo, model: &Model) -> Result<ModelInfo> {
        let mut document = model.to_json()?;
        document["mid"] = json!(info.mid);
        document["name"] = json!(info.name);
        let data = json!({"pid": info.pid, "model": document});
        self.post("savemodel", Some(data)).await?;
        self.wait_for_model_validation(&info.pid, &info.mid).await
    }

    /// Saves the model as a new entry in the project.
    pub async fn save_model_as(
        &self,
        project: &Project,
        model: &Model,
        name: &str,
    ) -> Result<ModelInfo> {
        let mut document = model.to_json()?;
        document["name"] = json!(format!("{name}.sCAD"));
        let data = json!({"pid": project.pid, "model": document});
        let response = self.post("savemodelas", Some(data)).await?;
        let mid = response
            .get("mid")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("savemodelas response missing 'mid'".to_string()))?;
        self.wait_for_model_validation(&project.pid, mid).await
    }

    pub async fn delete_models(&self, infos: &[ModelInfo]) -> Result<()> {
        let Some(first) = infos.first() else {
            return Ok(());
        };
        let mids: Vec<&str> = infos.iter().map(|m| m.mid.as_str()).collect();
        self.delete("models", Some(json!({"pid": first.pid, "mids": mids})))
            .await?;
        Ok(())
    }

    pub async fn lock_model(&self, info: &ModelInfo) -> Result<()> {
        self.post("model/lock", Some(json!({"mid": info.mid}))).await?;
        Ok(())
    }

    pub async fn release_model(&self, info: &ModelInfo) -> Result<()> {
        self.post("model/release", Some(json!({"mid": info.mid})))
            .await?;
        Ok(())
    }

    /// Generates a model by running parser input files through the
    /// platform's multi-parser.
    pub async fn generate_model(
        &self,
        project: &Project,
        parser: &str,
        name: &str,
        files: &[ParserFile],
    ) -> Result<ModelInfo> {
        let file_entries: Vec<Value> = files
            .iter()
            .map(|file| {
                json!({
                    "sub_parser": file.sub_parser,
                    "name": file.name,
                    "content": BASE64.encode(&file.content),
                })
            })
            .collect();
        let data = json!({"parser": parser, "name": name, "files": file_entries});
        let response = self
            .post(&format!("projects/{}/multiparser", project.pid), Some(data))
            .await?;
        let mid = response
            .get("mid")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("multiparser response missing 'mid'".to_string()))?;
        self.wait_for_model_validation(&project.pid, mid).await
    }
}
