//! High-value-asset resolution.
//!
//! A [`HighValueAsset`] descriptor names an asset type and attack step,
//! optionally narrowed to specific objects by name or tag, and resolves
//! against a [`Model`] to the `(object, attack step)` pairs whose
//! consequence it sets. Descriptors apply in the order given; where they
//! overlap, the last applied wins.

use serde::{Deserialize, Serialize};

use crate::errors::{AegisError, ModelError, ValidationError};
use crate::metadata::MetadataCatalog;
use crate::model::{AttackStep, Model, Object};

/// Narrows a descriptor to specific objects of its asset type.
///
/// Wire shape: `{"type": "name", "value": ...}`, `{"type": "tag", "key":
/// ..., "value": ...}` or `{"type": "arn", "value": ...}`. An ARN matcher
/// compares against the object's `arn` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IdMatcher {
    Name { value: String },
    Tag { key: String, value: String },
    Arn { value: String },
}

impl IdMatcher {
    fn matches(&self, object: &Object) -> bool {
        match self {
            IdMatcher::Name { value } => object.name() == value,
            IdMatcher::Tag { key, value } => object.has_tag(key, value),
            IdMatcher::Arn { value } => object.has_tag("arn", value),
        }
    }
}

/// Declarative high-value-asset descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighValueAsset {
    pub metaconcept: String,
    pub attackstep: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<IdMatcher>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consequence: Option<u8>,
}

impl HighValueAsset {
    pub fn new(metaconcept: impl Into<String>, attackstep: impl Into<String>) -> Self {
        Self {
            metaconcept: metaconcept.into(),
            attackstep: attackstep.into(),
            id: None,
            consequence: None,
        }
    }

    pub fn with_id(mut self, id: IdMatcher) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_consequence(mut self, consequence: u8) -> Self {
        self.consequence = Some(consequence);
        self
    }

    fn matches(&self, object: &Object) -> bool {
        object.metaconcept() == self.metaconcept
            && self.id.as_ref().map_or(true, |id| id.matches(object))
    }
}

impl Model {
    /// Applies high-value-asset descriptors to this model.
    ///
    /// Every descriptor is validated up front against the metadata catalog
    /// (the attack step must exist for the asset type, the consequence must
    /// be in range) before any object is touched; validation failure leaves
    /// the model unchanged. Objects that match a descriptor but carry no
    /// local entry for the attack step get one appended with the default
    /// TTC. An absent consequence means 10.
    pub fn set_high_value_assets(
        &mut self,
        catalog: &MetadataCatalog,
        assets: &[HighValueAsset],
    ) -> Result<(), AegisError> {
        for hva in assets {
            if catalog.asset(&hva.metaconcept).is_none() {
                return Err(ModelError::not_found("asset type", hva.metaconcept.as_str()).into());
            }
            if !catalog.defines_attack_step(&hva.metaconcept, &hva.attackstep) {
                return Err(ModelError::not_found("attack step", hva.attackstep.as_str()).into());
            }
            if let Some(consequence) = hva.consequence {
                if !(1..=10).contains(&consequence) {
                    return Err(ValidationError::OutOfRange {
                        field: "consequence",
                        value: consequence.to_string(),
                        expected: "1..=10",
                    }
                    .into());
                }
            }
        }

        for hva in assets {
            let mut target_ids: Vec<String> = self
                .all_objects()
                .filter(|obj| hva.matches(obj))
                .map(|obj| obj.id().to_string())
                .collect();
            target_ids.sort();

            let consequence = hva.consequence.unwrap_or(10);
            for id in target_ids {
                let object = self
                    .object_by_id_mut(&id)
                    .ok_or_else(|| ModelError::not_found("object", id.as_str()))?;
                match object.attack_step_mut(&hva.attackstep) {
                    Ok(step) => step.set_consequence(consequence)?,
                    Err(_) => {
                        let mut step = AttackStep::new(hva.attackstep.clone());
                        step.set_consequence(consequence)?;
                        object.add_attack_step(step)?;
                    }
                }
            }
        }
        Ok(())
    }
}
