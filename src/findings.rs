//! Vulnerability-finding ingestion.
//!
//! Finding documents accompany collector data so the platform can weave
//! known vulnerabilities into the generated model. The document is
//! validated locally before upload: every finding needs an application, a
//! port, at least one host selector and at least one well-formed CVSS
//! vector (versions 2.0, 3.0 and 3.1 are accepted; when a finding carries
//! several, the highest version wins).

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ValidationError;

static CVSS2_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^AV:[NAL]/AC:[HML]/Au:[MSN]/C:[NPC]/I:[NPC]/A:[NPC]")
        .expect("CVSS v2 pattern is valid")
});

static CVSS3_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CVSS:3\.[01]/AV:[NALP]/AC:[LH]/PR:[NLH]/UI:[NR]/S:[UC]/C:[NLH]/I:[NLH]/A:[NLH]")
        .expect("CVSS v3 pattern is valid")
});

/// CVSS versions the platform understands, ordered oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CvssVersion {
    V2_0,
    V3_0,
    V3_1,
}

/// Detects the version of a CVSS vector string, or `None` when the string
/// is not a well-formed vector of any supported version.
pub fn cvss_version(vector: &str) -> Option<CvssVersion> {
    if vector.starts_with("CVSS:3.1/") && CVSS3_RE.is_match(vector) {
        Some(CvssVersion::V3_1)
    } else if vector.starts_with("CVSS:3.0/") && CVSS3_RE.is_match(vector) {
        Some(CvssVersion::V3_0)
    } else if CVSS2_RE.is_match(vector) {
        Some(CvssVersion::V2_0)
    } else {
        None
    }
}

/// Picks the vector with the highest CVSS version.
pub fn select_cvss(vectors: &[String]) -> Option<&str> {
    vectors
        .iter()
        .filter_map(|v| cvss_version(v).map(|version| (version, v.as_str())))
        .max_by_key(|(version, _)| *version)
        .map(|(_, vector)| vector)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub application: String,
    pub port: u16,
    /// CVSS vector strings; at least one, each well-formed.
    pub cvss: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploit: Option<String>,
}

impl Finding {
    fn has_host_selector(&self) -> bool {
        self.host_id.is_some()
            || self.host_ip.is_some()
            || self.image_id.is_some()
            || self.host_tags.as_ref().is_some_and(|tags| !tags.is_empty())
    }

    /// The effective vector: highest CVSS version among those given.
    pub fn effective_cvss(&self) -> Option<&str> {
        select_cvss(&self.cvss)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Findings {
    pub findings: Vec<Finding>,
}

/// Validates a finding document, returning its typed form.
pub fn validate(document: &Value) -> Result<Findings, ValidationError> {
    let findings: Findings = serde_json::from_value(document.clone())
        .map_err(|e| ValidationError::Invalid(format!("finding document: {e}")))?;

    for (index, finding) in findings.findings.iter().enumerate() {
        if finding.application.is_empty() {
            return Err(ValidationError::Finding {
                index,
                message: "empty 'application'".to_string(),
            });
        }
        if finding.cvss.is_empty() {
            return Err(ValidationError::Finding {
                index,
                message: "no CVSS vectors".to_string(),
            });
        }
        for vector in &finding.cvss {
            if cvss_version(vector).is_none() {
                return Err(ValidationError::Finding {
                    index,
                    message: format!("malformed CVSS vector '{vector}'"),
                });
            }
        }
        if !finding.has_host_selector() {
            return Err(ValidationError::Finding {
                index,
                message: "needs at least one of host_id, host_ip, image_id, host_tags"
                    .to_string(),
            });
        }
    }
    Ok(findings)
}
