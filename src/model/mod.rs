//! The local model object graph.
//!
//! A [`Model`] is the in-memory form of a platform model document: assets
//! ([`Object`]) with their attack steps and defenses, the associations
//! linking them, and the groups/views used by the UI. The graph is built
//! from a server-issued JSON document and serializes back to the same
//! schema; parsing and serialization are pure and perform no I/O.
//!
//! Representation is arena + index: the model owns its objects in a map
//! keyed by object id, with a display-name index built at parse time so
//! lookups never rescan the object set. Objects own their attack-step and
//! defense vectors; nothing holds a back-reference to its owner.
//!
//! A model instance assumes single-writer access. Concurrent readers are
//! fine as long as no writer is active.

pub mod hva;
pub mod query;
pub mod ttc;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ModelError, ValidationError};

pub use hva::{HighValueAsset, IdMatcher};
pub use query::TuningFilter;
pub use ttc::Ttc;

const DEFAULT_SAMPLES: u64 = 1000;
const DEFAULT_THRESHOLD: u64 = 100;
const DEFAULT_CONSEQUENCE: u8 = 10;

/// A modeled asset instance.
///
/// The asset type (`metaconcept`) is an open vocabulary defined by the
/// platform's metadata catalog, so it is a validated string rather than a
/// closed enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(skip)]
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eid: Option<i64>,
    name: String,
    metaconcept: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(rename = "attacksteps", default, skip_serializing_if = "Vec::is_empty")]
    attack_steps: Vec<AttackStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    defenses: Vec<Defense>,
}

impl Object {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        metaconcept: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            eid: None,
            name: name.into(),
            metaconcept: metaconcept.into(),
            tags: BTreeMap::new(),
            attack_steps: Vec::new(),
            defenses: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metaconcept(&self) -> &str {
        &self.metaconcept
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tags.get(key).map(String::as_str) == Some(value)
    }

    pub fn attack_steps(&self) -> &[AttackStep] {
        &self.attack_steps
    }

    pub fn defenses(&self) -> &[Defense] {
        &self.defenses
    }

    /// Adds an attack step, rejecting a name already present on this object.
    pub fn add_attack_step(&mut self, step: AttackStep) -> Result<(), ModelError> {
        if self.attack_steps.iter().any(|s| s.name == step.name) {
            return Err(ModelError::malformed(format!(
                "Duplicate attack step '{}' on object '{}'",
                step.name, self.name
            )));
        }
        self.attack_steps.push(step);
        Ok(())
    }

    /// Adds a defense, rejecting a name already present on this object.
    pub fn add_defense(&mut self, defense: Defense) -> Result<(), ModelError> {
        if self.defenses.iter().any(|d| d.name == defense.name) {
            return Err(ModelError::malformed(format!(
                "Duplicate defense '{}' on object '{}'",
                defense.name, self.name
            )));
        }
        self.defenses.push(defense);
        Ok(())
    }

    pub fn attack_step(&self, name: &str) -> Result<&AttackStep, ModelError> {
        self.attack_steps
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ModelError::not_found("attack step", name))
    }

    pub fn attack_step_mut(&mut self, name: &str) -> Result<&mut AttackStep, ModelError> {
        self.attack_steps
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| ModelError::not_found("attack step", name))
    }

    pub fn defense(&self, name: &str) -> Result<&Defense, ModelError> {
        self.defenses
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ModelError::not_found("defense", name))
    }

    pub fn defense_mut(&mut self, name: &str) -> Result<&mut Defense, ModelError> {
        self.defenses
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| ModelError::not_found("defense", name))
    }
}

/// An attack step on an object.
///
/// `reachable` is computed by the server and read-only from the client's
/// perspective; it round-trips but has no local setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackStep {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttc: Option<Ttc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    consequence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reachable: Option<bool>,
}

impl AttackStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttc: None,
            consequence: None,
            reachable: None,
        }
    }

    pub fn with_ttc(mut self, ttc: Ttc) -> Self {
        self.ttc = Some(ttc);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consequence in `[1, 10]`; defaults to 10 when unset.
    pub fn consequence(&self) -> u8 {
        self.consequence.unwrap_or(DEFAULT_CONSEQUENCE)
    }

    pub fn raw_consequence(&self) -> Option<u8> {
        self.consequence
    }

    pub fn set_consequence(&mut self, consequence: u8) -> Result<(), ValidationError> {
        if !(1..=10).contains(&consequence) {
            return Err(ValidationError::OutOfRange {
                field: "consequence",
                value: consequence.to_string(),
                expected: "1..=10",
            });
        }
        self.consequence = Some(consequence);
        Ok(())
    }

    pub fn reachable(&self) -> bool {
        self.reachable.unwrap_or(false)
    }

    /// Sets the TTC to the `Infinity` sentinel. Idempotent.
    pub fn disable(&mut self) {
        self.ttc = Some(Ttc::disabled());
    }

    pub fn is_disabled(&self) -> bool {
        self.ttc.as_ref().is_some_and(Ttc::is_disabled)
    }
}

/// A defense on an object, with the probability that it is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defense {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    probability: Option<f64>,
}

impl Defense {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probability: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn probability(&self) -> Option<f64> {
        self.probability
    }

    pub fn set_probability(&mut self, probability: f64) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ValidationError::OutOfRange {
                field: "probability",
                value: probability.to_string(),
                expected: "0.0..=1.0",
            });
        }
        self.probability = Some(probability);
        Ok(())
    }
}

/// A link between two objects. Both endpoints must resolve inside the same
/// model at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub id1: String,
    pub id2: String,
    pub link: String,
    pub type1: String,
    pub type2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<String>,
}

/// Wire form of a model document. Private mirror used by parse/serialize;
/// object ids live as map keys here and are copied onto the objects after
/// deserialization.
#[derive(Serialize, Deserialize)]
struct ModelDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    mid: Option<String>,
    name: String,
    #[serde(default = "default_samples")]
    samples: u64,
    #[serde(default = "default_threshold")]
    threshold: u64,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    metadata: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
    objects: BTreeMap<String, Object>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    associations: Vec<Association>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    groups: BTreeMap<String, Group>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    views: Vec<View>,
}

fn default_samples() -> u64 {
    DEFAULT_SAMPLES
}

fn default_threshold() -> u64 {
    DEFAULT_THRESHOLD
}

/// The root aggregate: owns all objects, associations, groups and views of
/// one platform model.
#[derive(Debug, Clone)]
pub struct Model {
    pub mid: Option<String>,
    pub name: String,
    pub samples: u64,
    pub threshold: u64,
    pub metadata: serde_json::Map<String, Value>,
    pub tags: BTreeMap<String, String>,
    objects: HashMap<String, Object>,
    associations: Vec<Association>,
    groups: BTreeMap<String, Group>,
    views: Vec<View>,
    /// Display name -> object ids, maintained on every mutation.
    name_index: HashMap<String, Vec<String>>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            mid: None,
            name: name.into(),
            samples: DEFAULT_SAMPLES,
            threshold: DEFAULT_THRESHOLD,
            metadata: serde_json::Map::new(),
            tags: BTreeMap::new(),
            objects: HashMap::new(),
            associations: Vec::new(),
            groups: BTreeMap::new(),
            views: Vec::new(),
            name_index: HashMap::new(),
        }
    }

    /// Parses a server-issued model document.
    ///
    /// Fails without returning a partial model if required keys are absent,
    /// an association references an unknown object id, an attack step or
    /// defense name collides within one object, or a group/view member does
    /// not resolve.
    pub fn from_json(value: Value) -> Result<Self, ModelError> {
        let doc: ModelDoc = serde_json::from_value(value)
            .map_err(|e| ModelError::malformed(e.to_string()))?;

        let mut model = Model {
            mid: doc.mid,
            name: doc.name,
            samples: doc.samples,
            threshold: doc.threshold,
            metadata: doc.metadata,
            tags: doc.tags,
            objects: HashMap::new(),
            associations: Vec::new(),
            groups: BTreeMap::new(),
            views: Vec::new(),
            name_index: HashMap::new(),
        };

        for (id, mut object) in doc.objects {
            object.id = id;
            check_member_names(&object)?;
            model.index_object(&object);
            model.objects.insert(object.id.clone(), object);
        }

        for association in doc.associations {
            model.check_association(&association)?;
            model.associations.push(association);
        }

        for (gid, group) in doc.groups {
            for oid in &group.objects {
                if !model.objects.contains_key(oid) {
                    return Err(ModelError::malformed(format!(
                        "Group '{}' references unknown object id '{}'",
                        group.name, oid
                    )));
                }
            }
            model.groups.insert(gid, group);
        }

        for view in doc.views {
            for oid in &view.objects {
                if !model.objects.contains_key(oid) {
                    return Err(ModelError::malformed(format!(
                        "View '{}' references unknown object id '{}'",
                        view.name, oid
                    )));
                }
            }
            model.views.push(view);
        }

        Ok(model)
    }

    /// Serializes back to the wire schema. Left-inverse of [`Model::from_json`]
    /// under normalization: field order is not significant, only content.
    pub fn to_json(&self) -> Result<Value, ModelError> {
        let doc = ModelDoc {
            mid: self.mid.clone(),
            name: self.name.clone(),
            samples: self.samples,
            threshold: self.threshold,
            metadata: self.metadata.clone(),
            tags: self.tags.clone(),
            objects: self
                .objects
                .iter()
                .map(|(id, obj)| (id.clone(), obj.clone()))
                .collect(),
            associations: self.associations.clone(),
            groups: self.groups.clone(),
            views: self.views.clone(),
        };
        serde_json::to_value(&doc).map_err(|e| ModelError::malformed(e.to_string()))
    }

    fn index_object(&mut self, object: &Object) {
        self.name_index
            .entry(object.name.clone())
            .or_default()
            .push(object.id.clone());
    }

    fn unindex_object(&mut self, object: &Object) {
        if let Some(ids) = self.name_index.get_mut(&object.name) {
            ids.retain(|id| id != &object.id);
            if ids.is_empty() {
                self.name_index.remove(&object.name);
            }
        }
    }

    fn check_association(&self, association: &Association) -> Result<(), ModelError> {
        for id in [&association.id1, &association.id2] {
            if !self.objects.contains_key(id) {
                return Err(ModelError::malformed(format!(
                    "Association '{}' references unknown object id '{}'",
                    association.link, id
                )));
            }
        }
        Ok(())
    }

    /// All objects matching the given name and/or asset type, sorted by id.
    /// Zero matches is not an error.
    pub fn objects(&self, name: Option<&str>, asset_type: Option<&str>) -> Vec<&Object> {
        let mut matches: Vec<&Object> = match name {
            // Name given: start from the index instead of scanning.
            Some(name) => self
                .name_index
                .get(name)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| self.objects.get(id))
                        .collect()
                })
                .unwrap_or_default(),
            None => self.objects.values().collect(),
        };
        if let Some(asset_type) = asset_type {
            matches.retain(|obj| obj.metaconcept == asset_type);
        }
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    /// Exactly-one lookup by name, optionally disambiguated by asset type.
    ///
    /// Objects sharing a name and type cannot be distinguished by name-based
    /// lookup; that ambiguity is a platform limitation and surfaces as
    /// [`ModelError::Ambiguous`] rather than being resolved by picking one.
    pub fn object(&self, name: Option<&str>, asset_type: Option<&str>) -> Result<&Object, ModelError> {
        let matches = self.objects(name, asset_type);
        let described = name.or(asset_type).unwrap_or("<any>");
        match matches.len() {
            0 => Err(ModelError::not_found("object", described)),
            1 => Ok(matches[0]),
            count => Err(ModelError::Ambiguous {
                kind: "object",
                name: described.to_string(),
                count,
            }),
        }
    }

    pub fn object_by_id(&self, id: &str) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn object_by_id_mut(&mut self, id: &str) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    /// Named attack step of the object with the given id.
    pub fn attack_step(&self, object_id: &str, name: &str) -> Result<&AttackStep, ModelError> {
        self.objects
            .get(object_id)
            .ok_or_else(|| ModelError::not_found("object", object_id))?
            .attack_step(name)
    }

    pub fn attack_step_mut(
        &mut self,
        object_id: &str,
        name: &str,
    ) -> Result<&mut AttackStep, ModelError> {
        self.objects
            .get_mut(object_id)
            .ok_or_else(|| ModelError::not_found("object", object_id))?
            .attack_step_mut(name)
    }

    pub fn defense(&self, object_id: &str, name: &str) -> Result<&Defense, ModelError> {
        self.objects
            .get(object_id)
            .ok_or_else(|| ModelError::not_found("object", object_id))?
            .defense(name)
    }

    pub fn defense_mut(&mut self, object_id: &str, name: &str) -> Result<&mut Defense, ModelError> {
        self.objects
            .get_mut(object_id)
            .ok_or_else(|| ModelError::not_found("object", object_id))?
            .defense_mut(name)
    }

    /// Adds an object; its id must be unique within the model.
    pub fn add_object(&mut self, object: Object) -> Result<(), ModelError> {
        if self.objects.contains_key(&object.id) {
            return Err(ModelError::malformed(format!(
                "Duplicate object id '{}'",
                object.id
            )));
        }
        check_member_names(&object)?;
        self.index_object(&object);
        self.objects.insert(object.id.clone(), object);
        Ok(())
    }

    /// Removes an object, cleaning up every association, group and view
    /// member that referenced it. Dangling references are never left behind.
    pub fn remove_object(&mut self, id: &str) -> Result<Object, ModelError> {
        let object = self
            .objects
            .remove(id)
            .ok_or_else(|| ModelError::not_found("object", id))?;
        self.unindex_object(&object);
        self.associations
            .retain(|a| a.id1 != object.id && a.id2 != object.id);
        for group in self.groups.values_mut() {
            group.objects.retain(|oid| oid != &object.id);
        }
        for view in &mut self.views {
            view.objects.retain(|oid| oid != &object.id);
        }
        Ok(object)
    }

    /// Renames an object through the model so the name index stays current.
    pub fn rename_object(&mut self, id: &str, new_name: impl Into<String>) -> Result<(), ModelError> {
        let new_name = new_name.into();
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| ModelError::not_found("object", id))?;
        let old_name = std::mem::replace(&mut object.name, new_name.clone());
        let oid = object.id.clone();
        if let Some(ids) = self.name_index.get_mut(&old_name) {
            ids.retain(|x| x != &oid);
            if ids.is_empty() {
                self.name_index.remove(&old_name);
            }
        }
        self.name_index.entry(new_name).or_default().push(oid);
        Ok(())
    }

    /// Adds an association; both endpoints must already exist in the model.
    pub fn add_association(&mut self, association: Association) -> Result<(), ModelError> {
        self.check_association(&association)?;
        self.associations.push(association);
        Ok(())
    }

    pub fn remove_association(&mut self, association: &Association) -> Result<(), ModelError> {
        let before = self.associations.len();
        self.associations.retain(|a| a != association);
        if self.associations.len() == before {
            return Err(ModelError::not_found("association", association.link.as_str()));
        }
        Ok(())
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn groups(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn all_objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }
}

impl PartialEq for Model {
    /// Logical-content equality: the derived name index is excluded.
    fn eq(&self, other: &Self) -> bool {
        self.mid == other.mid
            && self.name == other.name
            && self.samples == other.samples
            && self.threshold == other.threshold
            && self.metadata == other.metadata
            && self.tags == other.tags
            && self.objects == other.objects
            && self.associations == other.associations
            && self.groups == other.groups
            && self.views == other.views
    }
}

fn check_member_names(object: &Object) -> Result<(), ModelError> {
    let mut seen = std::collections::HashSet::new();
    for step in &object.attack_steps {
        if !seen.insert(step.name.as_str()) {
            return Err(ModelError::malformed(format!(
                "Duplicate attack step '{}' on object '{}'",
                step.name, object.name
            )));
        }
    }
    let mut seen = std::collections::HashSet::new();
    for defense in &object.defenses {
        if !seen.insert(defense.name.as_str()) {
            return Err(ModelError::malformed(format!(
                "Duplicate defense '{}' on object '{}'",
                defense.name, object.name
            )));
        }
    }
    Ok(())
}
