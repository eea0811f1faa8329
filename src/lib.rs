//! Aegis Client - drive the Aegis threat modeling platform from Rust
//!
//! A client SDK for the Aegis attack simulation platform: authenticate,
//! manage organizations/projects/users, import infrastructure descriptions
//! into a graph model, tune that model, launch simulations and interpret
//! the structured results.
//!
//! - **Model graph**: typed in-memory model with id/name indexes and full
//!   referential-integrity checking, round-tripped to the platform's JSON
//! - **Tunings**: declarative model mutations, validated before anything
//!   is sent
//! - **Simulations**: launch, poll, and read typed risk results
//! - **Local-only core**: all graph and validation logic is pure and
//!   synchronous; every remote call is explicit
//!
//! # Quick Start
//!
//! ```no_run
//! use aegis_client::{Client, ClientConfig, HighValueAsset};
//!
//! # async fn run() -> aegis_client::Result<()> {
//! let config = ClientConfig::new("https://aegis.example.com")
//!     .with_credentials("alice", "secret")
//!     .with_organization("acme");
//! let client = Client::connect(config).await?;
//!
//! let project = client.get_project_by_name("My project").await?;
//! let info = client.get_model_by_name(&project, "My model").await?;
//! let mut model = client.get_model(&info).await?;
//!
//! let catalog = client.get_metadata().await?;
//! model.set_high_value_assets(
//!     &catalog,
//!     &[HighValueAsset::new("S3Bucket", "ReadObject")],
//! )?;
//! client.save_model(&info, &model).await?;
//!
//! let scenario = client
//!     .create_scenario(&project, &info, "My scenario", None, None, None)
//!     .await?;
//! let mut simulation = client
//!     .get_simulation_by_name(&scenario, "Initial simulation")
//!     .await?;
//! let results = client.get_results(&mut simulation).await?;
//! println!("risk: {} (report at {})", results.results.risk, results.report_url);
//! # Ok(())
//! # }
//! ```

// ─── Core (pure, synchronous) ──────────────────────────────────────
pub mod errors;
pub mod findings;
pub mod model;
pub mod tunings;

// ─── Transport & platform endpoints ────────────────────────────────
pub mod client;
pub mod config;
pub mod metadata;
pub mod models;
pub mod organizations;
pub mod parsers;
pub mod projects;
pub mod scenarios;
pub mod simulations;
pub mod users;

pub use client::Client;
pub use config::ClientConfig;
pub use errors::{AegisError, ApiError, ModelError, Result, ValidationError};
pub use metadata::{MetadataCatalog, RiskType};
pub use model::{
    Association, AttackStep, Defense, HighValueAsset, IdMatcher, Model, Object, Ttc, TuningFilter,
};
pub use models::ModelInfo;
pub use organizations::Organization;
pub use projects::{AccessLevel, Project};
pub use scenarios::Scenario;
pub use simulations::{RiskEntry, RiskResults, Simulation, SimulationResults};
pub use tunings::{ProjectTuning, Tuning, TuningAction, TuningKind, TuningType};
pub use users::{Role, User};
