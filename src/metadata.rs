//! The platform metadata catalog.
//!
//! The catalog enumerates every asset type the platform knows, with its
//! attack steps and their risk classification. Asset types form an open
//! vocabulary that evolves server-side, so the client treats them as
//! validated strings and checks names against this catalog at the point of
//! use (high-value-asset resolution in particular).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::errors::{ApiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskType {
    Availability,
    Confidentiality,
    Integrity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackStepMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub risk_types: Vec<RiskType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attack_steps: Vec<AttackStepMeta>,
}

/// Asset catalog indexed by asset type name.
#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    assets: Vec<AssetMeta>,
    index: HashMap<String, usize>,
}

impl MetadataCatalog {
    /// Builds a catalog; assets are kept sorted by name.
    pub fn new(mut assets: Vec<AssetMeta>) -> Self {
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        let index = assets
            .iter()
            .enumerate()
            .map(|(i, asset)| (asset.name.clone(), i))
            .collect();
        Self { assets, index }
    }

    pub fn assets(&self) -> &[AssetMeta] {
        &self.assets
    }

    pub fn asset(&self, name: &str) -> Option<&AssetMeta> {
        self.index.get(name).map(|&i| &self.assets[i])
    }

    pub fn defines_attack_step(&self, asset_type: &str, step_name: &str) -> bool {
        self.asset(asset_type)
            .map(|asset| asset.attack_steps.iter().any(|s| s.name == step_name))
            .unwrap_or(false)
    }

    /// Parses the `metadata` endpoint response:
    /// `{"assets": {"<name>": {"description": ..., "attacksteps": [...]}}}`.
    pub fn from_response(value: &Value) -> std::result::Result<Self, ApiError> {
        let assets_obj = value
            .get("assets")
            .and_then(Value::as_object)
            .ok_or_else(|| ApiError::Parse("metadata response missing 'assets'".to_string()))?;

        let mut assets = Vec::with_capacity(assets_obj.len());
        for (name, data) in assets_obj {
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let mut attack_steps = Vec::new();
            for step in data
                .get("attacksteps")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let step_name = step
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ApiError::Parse(format!("attack step without name on asset '{name}'"))
                    })?
                    .to_string();
                attack_steps.push(AttackStepMeta {
                    name: step_name,
                    description: step
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    risk_types: parse_risk_types(step.get("riskType")),
                });
            }
            assets.push(AssetMeta {
                name: name.clone(),
                description,
                attack_steps,
            });
        }
        Ok(Self::new(assets))
    }
}

fn parse_risk_types(value: Option<&Value>) -> Vec<RiskType> {
    let mut risk_types = Vec::new();
    if let Some(entries) = value.and_then(Value::as_array) {
        for entry in entries.iter().filter_map(Value::as_str) {
            match entry {
                "Availability" => risk_types.push(RiskType::Availability),
                "Confidentiality" => risk_types.push(RiskType::Confidentiality),
                "Integrity" => risk_types.push(RiskType::Integrity),
                _ => {}
            }
        }
    }
    risk_types
}

impl Client {
    /// Fetches the platform metadata catalog.
    pub async fn get_metadata(&self) -> Result<MetadataCatalog> {
        let response = self.get("metadata", None).await?;
        Ok(MetadataCatalog::from_response(&response)?)
    }
}
