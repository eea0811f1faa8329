//! Unit tests for aegis-client modules
//!
//! These tests cover the local core (model graph, filtering, tunings,
//! high-value assets, finding validation) without network I/O.

mod test_client;
mod test_findings;
mod test_hva;
mod test_model;
mod test_query;
mod test_tunings;
