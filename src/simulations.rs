//! Simulations and their results.
//!
//! Simulations run remotely; the client polls progress and parses the
//! result document into typed aggregates. The interesting risk numbers
//! (per-high-value-asset TTC percentiles and sample sets) are typed;
//! deeply server-defined sections (threat summary, chokepoints, attacker
//! info) stay as raw JSON values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::client::Client;
use crate::errors::{ApiError, ModelError, Result};
use crate::model::Model;
use crate::scenarios::Scenario;
use crate::tunings::{ProjectTuning, Tuning};

#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub pid: String,
    pub tid: String,
    pub simid: String,
    pub name: String,
    /// 0..=100; negative means the run failed.
    pub progress: i64,
}

impl Simulation {
    fn from_response(value: &Value) -> std::result::Result<Self, ApiError> {
        let tid = match value.get("basemodel") {
            Some(Value::String(tid)) => tid.clone(),
            Some(Value::Number(tid)) => tid.to_string(),
            _ => return Err(ApiError::Parse("simulation missing 'basemodel'".to_string())),
        };
        Ok(Simulation {
            pid: value
                .get("pid")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::Parse("simulation missing 'pid'".to_string()))?
                .to_string(),
            tid,
            simid: value
                .get("mid")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::Parse("simulation missing 'mid'".to_string()))?
                .to_string(),
            name: value
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            progress: value.get("progress").and_then(Value::as_i64).unwrap_or(0),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.progress == 100
    }

    pub fn is_failed(&self) -> bool {
        self.progress < 0
    }
}

/// Risk numbers for one high-value attack step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEntry {
    /// `"<object id>.<attack step>"`, e.g. `"1.ReadObject"`.
    pub attackstep_id: String,
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub attackstep: Option<String>,
    #[serde(default)]
    pub metaconcept: Option<String>,
    #[serde(default)]
    pub consequence: Option<f64>,
    #[serde(default)]
    pub probability: Option<f64>,
    /// TTC percentiles (days).
    #[serde(default)]
    pub ttc5: Option<f64>,
    #[serde(default)]
    pub ttc50: Option<f64>,
    #[serde(default)]
    pub ttc95: Option<f64>,
    /// Raw TTC samples when the platform includes them.
    #[serde(default)]
    pub samples: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskResults {
    #[serde(default)]
    pub risk: f64,
    #[serde(default)]
    pub maxrisk: f64,
    #[serde(default)]
    pub risks: Vec<RiskEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResults {
    pub simid: String,
    pub report_url: String,
    pub results: RiskResults,
    /// Same schema as a model document.
    pub model_data: Option<Value>,
    pub threat_summary: Value,
    pub chokepoints: Value,
    pub attacker: Value,
}

impl SimulationResults {
    fn from_response(
        value: &Value,
        simid: &str,
        report_url: String,
    ) -> std::result::Result<Self, ApiError> {
        let results: RiskResults = match value.get("results") {
            Some(results) => serde_json::from_value(results.clone())
                .map_err(|e| ApiError::Parse(format!("simulation results: {e}")))?,
            None => RiskResults::default(),
        };
        Ok(SimulationResults {
            simid: simid.to_string(),
            report_url,
            results,
            model_data: value.get("model_data").cloned(),
            threat_summary: value.get("threat_summary").cloned().unwrap_or(Value::Null),
            chokepoints: value.get("chokepoints").cloned().unwrap_or(Value::Null),
            attacker: value.get("attacker").cloned().unwrap_or(Value::Null),
        })
    }
}

impl Client {
    async fn simulation_record(&self, pid: &str, simid: &str) -> Result<Value> {
        let response = self
            .post("simulations/data", Some(json!({"pid": pid, "simids": [simid]})))
            .await?;
        response
            .get(simid)
            .cloned()
            .ok_or_else(|| ModelError::not_found("simulation", simid).into())
    }

    pub async fn list_simulations(&self, scenario: &Scenario) -> Result<Vec<Simulation>> {
        let record = self.scenario_record(&scenario.pid, &scenario.tid).await?;
        let results = record
            .get("results")
            .and_then(Value::as_object)
            .ok_or_else(|| ApiError::Parse("scenario record missing 'results'".to_string()))?;
        results
            .values()
            .map(|sim| Ok(Simulation::from_response(sim)?))
            .collect()
    }

    pub async fn get_simulation_by_simid(
        &self,
        scenario: &Scenario,
        simid: &str,
    ) -> Result<Simulation> {
        let record = self.simulation_record(&scenario.pid, simid).await?;
        Ok(Simulation::from_response(&record)?)
    }

    /// Exact-name lookup with a case-insensitive fallback.
    pub async fn get_simulation_by_name(
        &self,
        scenario: &Scenario,
        name: &str,
    ) -> Result<Simulation> {
        let simulations = self.list_simulations(scenario).await?;
        if let Some(simulation) = simulations.iter().find(|s| s.name == name) {
            return Ok(simulation.clone());
        }
        let lowered = name.to_lowercase();
        simulations
            .into_iter()
            .find(|s| s.name.to_lowercase() == lowered)
            .ok_or_else(|| ModelError::not_found("simulation", name).into())
    }

    /// Launches a simulation in the scenario. A local model can be sent
    /// along as the blob to simulate instead of the stored one; stored
    /// and/or inline tunings are applied server-side.
    pub async fn create_simulation(
        &self,
        scenario: &Scenario,
        name: Option<&str>,
        model: Option<&Model>,
        tunings: Option<&[ProjectTuning]>,
        raw_tunings: Option<&[Tuning]>,
    ) -> Result<Simulation> {
        let mut data = json!({
            "pid": scenario.pid,
            "tid": scenario.tid,
            "filter_results": true,
        });
        if let Some(name) = name {
            data["name"] = json!(name);
        }
        if let Some(model) = model {
            data["blob"] = model.to_json()?;
        }
        if let Some(tunings) = tunings {
            let cids: Vec<&str> = tunings.iter().map(|t| t.tuning_id.as_str()).collect();
            data["cids"] = json!(cids);
        }
        if let Some(raw_tunings) = raw_tunings {
            let raw: Vec<Value> = raw_tunings.iter().map(Tuning::to_value).collect();
            data["tunings"] = json!(raw);
        }
        let response = self.put("simulation", Some(data)).await?;
        let simid = response
            .get("simid")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("simulation response missing 'simid'".to_string()))?;
        self.get_simulation_by_simid(scenario, simid).await
    }

    pub async fn delete_simulation(&self, simulation: &Simulation) -> Result<()> {
        self.delete(
            "simulations",
            Some(json!({"pid": simulation.pid, "simids": [simulation.simid]})),
        )
        .await?;
        Ok(())
    }

    /// Polls until the run finishes or fails, updating `progress`.
    async fn wait_for_results(&self, simulation: &mut Simulation) -> Result<()> {
        while !simulation.is_finished() && !simulation.is_failed() {
            let record = self
                .simulation_record(&simulation.pid, &simulation.simid)
                .await?;
            simulation.progress = record.get("progress").and_then(Value::as_i64).unwrap_or(0);
            if simulation.is_finished() || simulation.is_failed() {
                break;
            }
            debug!("simulation {} at {}%", simulation.simid, simulation.progress);
            sleep(Duration::from_secs(1)).await;
        }
        Ok(())
    }

    /// Waits for the run and fetches the parsed result document.
    pub async fn get_results(&self, simulation: &mut Simulation) -> Result<SimulationResults> {
        self.wait_for_results(simulation).await?;
        let data = json!({"pid": simulation.pid, "simid": simulation.simid});
        let response = self.post("simulation/data", Some(data)).await?;
        let report_url = self
            .base_url()
            .join(&format!(
                "project/{}/scenario/{}/report/{}",
                simulation.pid, simulation.tid, simulation.simid
            ))
            .map_err(|e| ApiError::Parse(format!("report url: {e}")))?
            .to_string();
        Ok(SimulationResults::from_response(
            &response,
            &simulation.simid,
            report_url,
        )?)
    }

    /// Waits for the run and fetches the raw CSV export.
    pub async fn get_raw_results(&self, simulation: &mut Simulation) -> Result<String> {
        self.wait_for_results(simulation).await?;
        let data = json!({"pid": simulation.pid, "simid": simulation.simid});
        let response = self.post("simulation/raw_data", Some(data)).await?;
        let csv = response
            .get("csv_data")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("raw results missing 'csv_data'".to_string()))?;
        Ok(cleanup_raw_csv(csv))
    }

    /// Critical paths for the given high-value attack steps
    /// (`"<object id>.<attack step>"`). With `None`, paths for every risk
    /// entry in the simulation results are fetched.
    pub async fn get_critical_paths(
        &self,
        simulation: &mut Simulation,
        hvas: Option<&[String]>,
    ) -> Result<HashMap<String, Value>> {
        let hvas: Vec<String> = match hvas {
            Some(hvas) => hvas.to_vec(),
            None => {
                let results = self.get_results(simulation).await?;
                results
                    .results
                    .risks
                    .iter()
                    .map(|risk| risk.attackstep_id.clone())
                    .collect()
            }
        };
        let mut paths = HashMap::with_capacity(hvas.len());
        for hva in hvas {
            let data = json!({"simid": simulation.simid, "attackstep": hva});
            let response = self.post("simulation/attackpath", Some(data)).await?;
            let path = response
                .get("data")
                .cloned()
                .ok_or_else(|| ApiError::Parse("attack path missing 'data'".to_string()))?;
            paths.insert(hva, path);
        }
        Ok(paths)
    }
}

/// The raw export is not quite CSV: some builds prepend samplecount/build
/// header lines that have to be stripped.
fn cleanup_raw_csv(csv: &str) -> String {
    let lines: Vec<&str> = csv.split('\n').collect();
    if lines.len() > 4
        && lines[2].starts_with("\"samplecount=")
        && lines[3].starts_with("\"build=")
    {
        return lines[4..].join("\n");
    }
    csv.to_string()
}
