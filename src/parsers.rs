//! Infrastructure parsers.
//!
//! The platform turns collector output (AWS CLI data, Azure environment
//! data, vulnerability findings) into models via named parsers. This module
//! lists the available parsers and wraps collector files for the
//! multi-parser endpoint.

use serde_json::Value;

use crate::client::Client;
use crate::errors::{ApiError, Result};
use crate::findings;
use crate::models::ModelInfo;
use crate::projects::Project;

/// One input file for the multi-parser endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserFile {
    pub sub_parser: String,
    pub name: String,
    pub content: Vec<u8>,
}

impl ParserFile {
    fn from_json(
        sub_parser: &str,
        name: &str,
        document: &Value,
    ) -> std::result::Result<Self, ApiError> {
        let content = serde_json::to_vec_pretty(document)
            .map_err(|e| ApiError::Parse(format!("parser file '{name}': {e}")))?;
        Ok(Self {
            sub_parser: sub_parser.to_string(),
            name: name.to_string(),
            content,
        })
    }
}

impl Client {
    /// The parsers the platform has installed.
    pub async fn list_parsers(&self) -> Result<Vec<Value>> {
        let response = self.get("parsers", None).await?;
        response
            .as_array()
            .cloned()
            .ok_or_else(|| ApiError::Parse("parser list is not an array".to_string()).into())
    }

    /// Generates a model from AWS collector data.
    ///
    /// `cli_files` is collector output; `vul_files` are vulnerability
    /// finding documents, validated locally before upload.
    pub async fn generate_aws_model(
        &self,
        project: &Project,
        name: &str,
        cli_files: &[Value],
        vul_files: &[Value],
    ) -> Result<ModelInfo> {
        let mut files = Vec::with_capacity(cli_files.len() + vul_files.len());
        for cli_file in cli_files {
            files.push(ParserFile::from_json("aws-cli-parser", "aws.json", cli_file)?);
        }
        for vul_file in vul_files {
            findings::validate(vul_file)?;
            files.push(ParserFile::from_json("aws-vul-parser", "vul.json", vul_file)?);
        }
        self.generate_model(project, "aws-parser", name, &files).await
    }

    /// Generates a model from Azure collector data.
    pub async fn generate_azure_model(
        &self,
        project: &Project,
        name: &str,
        active_directory_files: &[Value],
        application_insight_files: &[Value],
    ) -> Result<ModelInfo> {
        let mut files =
            Vec::with_capacity(active_directory_files.len() + application_insight_files.len());
        for aad_file in active_directory_files {
            files.push(ParserFile::from_json(
                "azure-active-directory-parser",
                "azure_ad.json",
                aad_file,
            )?);
        }
        for insight_file in application_insight_files {
            files.push(ParserFile::from_json(
                "azure-application-insights-parser",
                "insights.json",
                insight_file,
            )?);
        }
        self.generate_model(project, "azure-parser", name, &files).await
    }
}
