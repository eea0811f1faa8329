//! The query/filter engine.
//!
//! Resolves a declarative [`TuningFilter`] to the concrete target set inside
//! a [`Model`]: first objects (by metaconcept, display name and tags), then
//! down to attack steps or defenses depending on the tuning kind. Used by
//! tuning construction and by filter-based attack-step disabling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{AegisError, ModelError, ValidationError};
use crate::model::{AttackStep, Defense, Model, Object};

/// Declarative object/step selector, serialized as the `filter` member of a
/// tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TuningFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metaconcept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attackstep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defense: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

impl TuningFilter {
    pub fn metaconcept(metaconcept: impl Into<String>) -> Self {
        Self {
            metaconcept: Some(metaconcept.into()),
            ..Self::default()
        }
    }

    pub fn object_name(name: impl Into<String>) -> Self {
        Self {
            object_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_attackstep(mut self, name: impl Into<String>) -> Self {
        self.attackstep = Some(name.into());
        self
    }

    pub fn with_defense(mut self, name: impl Into<String>) -> Self {
        self.defense = Some(name.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// At most one tag pair is supported per filter; more must fail fast
    /// instead of silently using one of them.
    pub(crate) fn check_tags(&self) -> Result<(), ValidationError> {
        if let Some(tags) = &self.tags {
            if tags.len() > 1 {
                return Err(ValidationError::TooManyFilterTags(tags.len()));
            }
        }
        Ok(())
    }
}

/// Narrows the model's object set by metaconcept, object name and tags.
///
/// A name that matches more than one object without a metaconcept to
/// disambiguate is rejected as under-specified; two objects can share a
/// name only if distinguished by type.
pub fn resolve_objects<'a>(
    model: &'a Model,
    filter: &TuningFilter,
) -> Result<Vec<&'a Object>, AegisError> {
    filter.check_tags()?;

    let mut matches: Vec<&Object> = model.all_objects().collect();

    if let Some(metaconcept) = &filter.metaconcept {
        matches.retain(|obj| obj.metaconcept() == metaconcept);
    }

    if let Some(name) = &filter.object_name {
        matches.retain(|obj| obj.name() == name.as_str());
        if matches.len() > 1 && filter.metaconcept.is_none() {
            return Err(ModelError::Ambiguous {
                kind: "object",
                name: name.clone(),
                count: matches.len(),
            }
            .into());
        }
    }

    if let Some(tags) = &filter.tags {
        for (key, value) in tags {
            matches.retain(|obj| obj.has_tag(key, value));
        }
    }

    matches.sort_by(|a, b| a.id().cmp(b.id()));
    Ok(matches)
}

/// Resolves a filter to `(object, attack step)` pairs, for the attacker,
/// ttc and consequence tuning kinds. An absent or empty `attackstep` name
/// selects every attack step of each surviving object. An empty result is
/// legal.
pub fn resolve_attack_steps<'a>(
    model: &'a Model,
    filter: &TuningFilter,
) -> Result<Vec<(&'a Object, &'a AttackStep)>, AegisError> {
    let objects = resolve_objects(model, filter)?;
    let step_name = filter.attackstep.as_deref().filter(|s| !s.is_empty());
    let mut targets = Vec::new();
    for object in objects {
        for step in object.attack_steps() {
            if step_name.map_or(true, |name| step.name() == name) {
                targets.push((object, step));
            }
        }
    }
    Ok(targets)
}

/// Resolves a filter to `(object, defense)` pairs, for the probability
/// tuning kind. An absent or empty `defense` name selects every defense of
/// each surviving object.
pub fn resolve_defenses<'a>(
    model: &'a Model,
    filter: &TuningFilter,
) -> Result<Vec<(&'a Object, &'a Defense)>, AegisError> {
    let objects = resolve_objects(model, filter)?;
    let defense_name = filter.defense.as_deref().filter(|s| !s.is_empty());
    let mut targets = Vec::new();
    for object in objects {
        for defense in object.defenses() {
            if defense_name.map_or(true, |name| defense.name() == name) {
                targets.push((object, defense));
            }
        }
    }
    Ok(targets)
}

impl Model {
    /// Disables every attack step the filter resolves to, by setting its TTC
    /// to the `Infinity` sentinel. Returns how many steps were touched; the
    /// change takes effect remotely only when the model is saved.
    pub fn disable_attack_steps(&mut self, filter: &TuningFilter) -> Result<usize, AegisError> {
        let targets: Vec<(String, String)> = resolve_attack_steps(self, filter)?
            .into_iter()
            .map(|(obj, step)| (obj.id().to_string(), step.name().to_string()))
            .collect();
        for (object_id, step_name) in &targets {
            self.attack_step_mut(object_id, step_name)?.disable();
        }
        Ok(targets.len())
    }
}
