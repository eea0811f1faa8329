//! Tunings: declarative mutations applied server-side to a scenario's model.
//!
//! A tuning couples a [`TuningFilter`] with an action: `apply` carries
//! exactly one payload, dictated by the tuning type, while `clear` names
//! the type alone. The payload shapes are mutually exclusive by
//! construction: [`TuningKind`] has one variant per type, each holding only
//! its legal payload, so illegal combinations are unrepresentable. The
//! wire-level parser enforces the same exclusion on documents coming from
//! the platform.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::client::Client;
use crate::errors::{ApiError, Result, ValidationError};
use crate::model::query::TuningFilter;
use crate::model::ttc::Ttc;
use crate::projects::Project;

/// The five tuning types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningType {
    Attacker,
    Ttc,
    Probability,
    Consequence,
    Tag,
}

impl TuningType {
    pub fn name(&self) -> &'static str {
        match self {
            TuningType::Attacker => "attacker",
            TuningType::Ttc => "ttc",
            TuningType::Probability => "probability",
            TuningType::Consequence => "consequence",
            TuningType::Tag => "tag",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "attacker" => Some(TuningType::Attacker),
            "ttc" => Some(TuningType::Ttc),
            "probability" => Some(TuningType::Probability),
            "consequence" => Some(TuningType::Consequence),
            "tag" => Some(TuningType::Tag),
            _ => None,
        }
    }

    /// The wire key of this type's payload; attacker tunings have none.
    fn payload_key(&self) -> Option<&'static str> {
        match self {
            TuningType::Attacker => None,
            TuningType::Ttc => Some("ttc"),
            TuningType::Probability => Some("probability"),
            TuningType::Consequence => Some("consequence"),
            TuningType::Tag => Some("tags"),
        }
    }
}

/// An applied tuning's payload, one variant per tuning type.
#[derive(Debug, Clone, PartialEq)]
pub enum TuningKind {
    /// Marks the filtered attack steps as attacker entry points. No payload.
    Attacker,
    /// Overrides time-to-compromise on the filtered attack steps.
    Ttc { ttc: String },
    /// Overrides the active-probability of the filtered defenses.
    Probability { probability: f64 },
    /// Overrides consequence on the filtered attack steps.
    Consequence { consequence: u8 },
    /// Merges tags onto the filtered objects.
    Tag { tags: BTreeMap<String, String> },
}

impl TuningKind {
    pub fn tuning_type(&self) -> TuningType {
        match self {
            TuningKind::Attacker => TuningType::Attacker,
            TuningKind::Ttc { .. } => TuningType::Ttc,
            TuningKind::Probability { .. } => TuningType::Probability,
            TuningKind::Consequence { .. } => TuningType::Consequence,
            TuningKind::Tag { .. } => TuningType::Tag,
        }
    }
}

/// What a tuning does: apply a payload or clear previous applications.
#[derive(Debug, Clone, PartialEq)]
pub enum TuningAction {
    Apply(TuningKind),
    Clear(TuningType),
}

impl TuningAction {
    pub fn tuning_type(&self) -> TuningType {
        match self {
            TuningAction::Apply(kind) => kind.tuning_type(),
            TuningAction::Clear(tuning_type) => *tuning_type,
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            TuningAction::Apply(_) => "apply",
            TuningAction::Clear(_) => "clear",
        }
    }
}

/// A validated tuning descriptor. Construction is all-or-nothing: an
/// invalid filter/payload combination never yields a partially built value,
/// and the fields stay private so no unvalidated value can be assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    filter: TuningFilter,
    action: TuningAction,
}

impl Tuning {
    pub fn new(action: TuningAction, filter: TuningFilter) -> Result<Self, ValidationError> {
        validate(&action, &filter)?;
        Ok(Self { filter, action })
    }

    pub fn apply(kind: TuningKind, filter: TuningFilter) -> Result<Self, ValidationError> {
        Self::new(TuningAction::Apply(kind), filter)
    }

    pub fn clear(tuning_type: TuningType, filter: TuningFilter) -> Result<Self, ValidationError> {
        Self::new(TuningAction::Clear(tuning_type), filter)
    }

    pub fn filter(&self) -> &TuningFilter {
        &self.filter
    }

    pub fn action(&self) -> &TuningAction {
        &self.action
    }

    pub fn op(&self) -> &'static str {
        self.action.op()
    }

    pub fn tuning_type(&self) -> TuningType {
        self.action.tuning_type()
    }

    /// Serializes to the wire form:
    /// `{"type": ..., "op": ..., "filter": {...}, <payload>}`.
    /// The payload member is only present for `apply`; a clear is bare.
    pub fn to_value(&self) -> Value {
        let mut doc = json!({
            "type": self.tuning_type().name(),
            "op": self.action.op(),
            "filter": &self.filter,
        });
        if let TuningAction::Apply(kind) = &self.action {
            match kind {
                TuningKind::Attacker => {}
                TuningKind::Ttc { ttc } => {
                    doc["ttc"] = json!(ttc);
                }
                TuningKind::Probability { probability } => {
                    doc["probability"] = json!(probability);
                }
                TuningKind::Consequence { consequence } => {
                    doc["consequence"] = json!(consequence);
                }
                TuningKind::Tag { tags } => {
                    doc["tags"] = json!(tags);
                }
            }
        }
        doc
    }

    /// Parses and validates a wire document. A document carrying payload
    /// members for more than one tuning type is rejected, whatever its
    /// declared type.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::Invalid("tuning without 'type'".to_string()))?;
        let tuning_type = TuningType::from_name(type_name)
            .ok_or_else(|| ValidationError::Invalid(format!("unknown tuning type '{type_name}'")))?;
        let op = value
            .get("op")
            .and_then(Value::as_str)
            .unwrap_or("apply");
        let filter: TuningFilter = match value.get("filter") {
            Some(f) => serde_json::from_value(f.clone())
                .map_err(|e| ValidationError::Invalid(format!("invalid tuning filter: {e}")))?,
            None => TuningFilter::default(),
        };

        let present: Vec<&str> = ["ttc", "probability", "consequence", "tags"]
            .into_iter()
            .filter(|key| value.get(key).is_some_and(|v| !v.is_null()))
            .collect();
        if present.len() > 1 {
            return Err(ValidationError::Invalid(format!(
                "tuning carries multiple payloads: {}",
                present.join(", ")
            )));
        }
        if let Some(&stray) = present.first() {
            if tuning_type.payload_key() != Some(stray) {
                return Err(ValidationError::Invalid(format!(
                    "payload '{stray}' does not match tuning type '{type_name}'"
                )));
            }
        }

        let action = match op {
            "clear" => {
                if let Some(&stray) = present.first() {
                    return Err(ValidationError::Invalid(format!(
                        "clear tuning must not carry payload '{stray}'"
                    )));
                }
                TuningAction::Clear(tuning_type)
            }
            "apply" => {
                let kind = match tuning_type {
                    TuningType::Attacker => TuningKind::Attacker,
                    TuningType::Ttc => TuningKind::Ttc {
                        ttc: value
                            .get("ttc")
                            .and_then(Value::as_str)
                            .ok_or_else(|| missing_payload("ttc"))?
                            .to_string(),
                    },
                    TuningType::Probability => TuningKind::Probability {
                        probability: value
                            .get("probability")
                            .and_then(Value::as_f64)
                            .ok_or_else(|| missing_payload("probability"))?,
                    },
                    TuningType::Consequence => TuningKind::Consequence {
                        consequence: value
                            .get("consequence")
                            .and_then(Value::as_u64)
                            .and_then(|c| u8::try_from(c).ok())
                            .ok_or_else(|| missing_payload("consequence"))?,
                    },
                    TuningType::Tag => TuningKind::Tag {
                        tags: value
                            .get("tags")
                            .map(|t| {
                                serde_json::from_value(t.clone()).map_err(|e| {
                                    ValidationError::Invalid(format!("invalid tuning tags: {e}"))
                                })
                            })
                            .transpose()?
                            .ok_or_else(|| missing_payload("tags"))?,
                    },
                };
                TuningAction::Apply(kind)
            }
            other => {
                return Err(ValidationError::Invalid(format!(
                    "unknown tuning op '{other}'"
                )))
            }
        };

        Self::new(action, filter)
    }
}

fn missing_payload(key: &'static str) -> ValidationError {
    ValidationError::Invalid(format!("tuning missing required payload '{key}'"))
}

/// Enforces the per-type filter constraints and payload ranges.
fn validate(action: &TuningAction, filter: &TuningFilter) -> Result<(), ValidationError> {
    filter.check_tags()?;

    let tuning_type = action.tuning_type();
    let forbid = |key: &'static str| ValidationError::ForbiddenFilterKey {
        tuning_type: tuning_type.name(),
        key,
    };

    match tuning_type {
        TuningType::Attacker | TuningType::Ttc | TuningType::Consequence => {
            if filter.defense.is_some() {
                return Err(forbid("defense"));
            }
        }
        TuningType::Probability => {
            if filter.attackstep.is_some() {
                return Err(forbid("attackstep"));
            }
        }
        TuningType::Tag => {
            if filter.attackstep.is_some() {
                return Err(forbid("attackstep"));
            }
            if filter.defense.is_some() {
                return Err(forbid("defense"));
            }
        }
    }

    if let TuningAction::Apply(kind) = action {
        match kind {
            TuningKind::Ttc { ttc } => {
                ttc.parse::<Ttc>()?;
            }
            TuningKind::Probability { probability } => {
                if !probability.is_finite() || !(0.0..=1.0).contains(probability) {
                    return Err(ValidationError::OutOfRange {
                        field: "probability",
                        value: probability.to_string(),
                        expected: "0.0..=1.0",
                    });
                }
            }
            TuningKind::Consequence { consequence } => {
                if !(1..=10).contains(consequence) {
                    return Err(ValidationError::OutOfRange {
                        field: "consequence",
                        value: consequence.to_string(),
                        expected: "1..=10",
                    });
                }
            }
            TuningKind::Attacker | TuningKind::Tag { .. } => {}
        }
    }
    Ok(())
}

/// A tuning persisted on the platform, attached to a project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTuning {
    pub pid: String,
    pub tuning_id: String,
    pub tuning: Tuning,
}

impl ProjectTuning {
    fn from_response(pid: &str, tuning_id: &str, config: &Value) -> Result<Self, ApiError> {
        let tuning = Tuning::from_value(config)
            .map_err(|e| ApiError::Parse(format!("tuning {tuning_id}: {e}")))?;
        Ok(Self {
            pid: pid.to_string(),
            tuning_id: tuning_id.to_string(),
            tuning,
        })
    }
}

impl Client {
    /// Lists the tunings stored for a project.
    pub async fn list_tunings(&self, project: &Project) -> Result<Vec<ProjectTuning>> {
        let response = self
            .post("tunings", Some(json!({"pid": project.pid})))
            .await?;
        let configs = response
            .get("configs")
            .and_then(Value::as_object)
            .ok_or_else(|| ApiError::Parse("tunings response missing 'configs'".to_string()))?;
        let mut tunings = Vec::with_capacity(configs.len());
        for (tuning_id, config) in configs {
            tunings.push(ProjectTuning::from_response(&project.pid, tuning_id, config)?);
        }
        Ok(tunings)
    }

    /// Stores a tuning on the platform and returns its persisted form.
    pub async fn create_tuning(
        &self,
        project: &Project,
        tuning: &Tuning,
    ) -> Result<ProjectTuning> {
        let data = json!({
            "pid": project.pid,
            "tunings": [tuning.to_value()],
        });
        let response = self.put("tunings", Some(data)).await?;
        let created = response
            .get(0)
            .ok_or_else(|| ApiError::Parse("empty tunings response".to_string()))?;
        let tuning_id = created
            .get("cid")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("tuning response missing 'cid'".to_string()))?;
        let config = created
            .get("config")
            .ok_or_else(|| ApiError::Parse("tuning response missing 'config'".to_string()))?;
        Ok(ProjectTuning::from_response(&project.pid, tuning_id, config)?)
    }

    /// Deletes a stored tuning.
    pub async fn delete_tuning(&self, tuning: &ProjectTuning) -> Result<()> {
        self.delete(
            "tunings",
            Some(json!({"pid": tuning.pid, "cids": [tuning.tuning_id]})),
        )
        .await?;
        Ok(())
    }
}
