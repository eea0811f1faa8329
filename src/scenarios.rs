//! Scenario management.
//!
//! A scenario binds a stored model to a set of tunings and collects the
//! simulations run against it.

use serde_json::{json, Value};

use crate::client::Client;
use crate::errors::{ApiError, ModelError, Result};
use crate::models::ModelInfo;
use crate::projects::Project;
use crate::tunings::{ProjectTuning, Tuning};

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub pid: String,
    pub tid: String,
    pub name: String,
    pub description: String,
}

impl Scenario {
    fn from_response(value: &Value) -> std::result::Result<Self, ApiError> {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::Parse(format!("scenario missing '{key}'")))
        };
        Ok(Scenario {
            pid: field("pid")?,
            tid: field("tid")?,
            name: field("name")?,
            description: field("description")?,
        })
    }
}

impl Client {
    pub(crate) async fn scenario_record(&self, pid: &str, tid: &str) -> Result<Value> {
        self.post("scenario/data", Some(json!({"pid": pid, "tid": tid})))
            .await
    }

    pub async fn list_scenarios(&self, project: &Project) -> Result<Vec<Scenario>> {
        let response = self
            .post("scenarios", Some(json!({"pid": project.pid})))
            .await?;
        let records = response
            .as_object()
            .ok_or_else(|| ApiError::Parse("scenario list is not an object".to_string()))?;
        records
            .values()
            .map(|record| Ok(Scenario::from_response(record)?))
            .collect()
    }

    pub async fn get_scenario_by_tid(&self, project: &Project, tid: &str) -> Result<Scenario> {
        let record = self.scenario_record(&project.pid, tid).await?;
        Ok(Scenario::from_response(&record)?)
    }

    /// Exact-name lookup with a case-insensitive fallback.
    pub async fn get_scenario_by_name(&self, project: &Project, name: &str) -> Result<Scenario> {
        let scenarios = self.list_scenarios(project).await?;
        if let Some(scenario) = scenarios.iter().find(|s| s.name == name) {
            return Ok(scenario.clone());
        }
        let lowered = name.to_lowercase();
        scenarios
            .into_iter()
            .find(|s| s.name.to_lowercase() == lowered)
            .ok_or_else(|| ModelError::not_found("scenario", name).into())
    }

    /// Creates a scenario for a stored model, optionally attaching stored
    /// tunings (`tunings`) and/or inline ones (`raw_tunings`).
    pub async fn create_scenario(
        &self,
        project: &Project,
        model_info: &ModelInfo,
        name: &str,
        description: Option<&str>,
        tunings: Option<&[ProjectTuning]>,
        raw_tunings: Option<&[Tuning]>,
    ) -> Result<Scenario> {
        let mut data = json!({
            "pid": project.pid,
            "mid": model_info.mid,
            "name": name,
            "description": description.unwrap_or(""),
            "filter_results": true,
        });
        if let Some(tunings) = tunings {
            let cids: Vec<&str> = tunings.iter().map(|t| t.tuning_id.as_str()).collect();
            data["cids"] = json!(cids);
        }
        if let Some(raw_tunings) = raw_tunings {
            let raw: Vec<Value> = raw_tunings.iter().map(Tuning::to_value).collect();
            data["tunings"] = json!(raw);
        }
        let response = self.put("scenario", Some(data)).await?;
        Ok(Scenario::from_response(&response)?)
    }

    pub async fn update_scenario(
        &self,
        scenario: &mut Scenario,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        let data = json!({
            "pid": scenario.pid,
            "tid": scenario.tid,
            "name": name.unwrap_or(&scenario.name),
            "description": description.unwrap_or(&scenario.description),
        });
        let response = self.post("scenario", Some(data)).await?;
        if let Some(name) = response.get("name").and_then(Value::as_str) {
            scenario.name = name.to_string();
        }
        if let Some(description) = response.get("description").and_then(Value::as_str) {
            scenario.description = description.to_string();
        }
        Ok(())
    }

    pub async fn delete_scenario(&self, scenario: &Scenario) -> Result<()> {
        self.delete(
            "scenarios",
            Some(json!({"pid": scenario.pid, "tids": [scenario.tid]})),
        )
        .await?;
        Ok(())
    }
}
