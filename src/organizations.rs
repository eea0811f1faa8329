//! Organization management.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::Client;
use crate::errors::{ApiError, ModelError, Result};
use crate::projects::Project;
use crate::users::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub tag: String,
    pub name: String,
}

impl Organization {
    fn from_response(value: &Value) -> std::result::Result<Self, ApiError> {
        serde_json::from_value(value.clone())
            .map_err(|e| ApiError::Parse(format!("organization: {e}")))
    }
}

impl Client {
    pub async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let response = self.get("organization/all", None).await?;
        let orgs = response
            .as_array()
            .ok_or_else(|| ApiError::Parse("organization list is not an array".to_string()))?;
        orgs.iter()
            .map(|org| Ok(Organization::from_response(org)?))
            .collect()
    }

    pub async fn get_organization_by_tag(&self, tag: &str) -> Result<Organization> {
        let response = self.get(&format!("organization/{tag}"), None).await?;
        Ok(Organization::from_response(&response)?)
    }

    /// Exact-name lookup with a case-insensitive fallback.
    pub async fn get_organization_by_name(&self, name: &str) -> Result<Organization> {
        let organizations = self.list_organizations().await?;
        if let Some(org) = organizations.iter().find(|o| o.name == name) {
            return Ok(org.clone());
        }
        let lowered = name.to_lowercase();
        if let Some(org) = organizations
            .iter()
            .find(|o| o.name.to_lowercase() == lowered)
        {
            return Ok(org.clone());
        }
        Err(ModelError::not_found("organization", name).into())
    }

    pub async fn create_organization(
        &self,
        name: &str,
        license: Option<&str>,
    ) -> Result<Organization> {
        let mut data = json!({"name": name});
        if let Some(license) = license {
            data["license"] = json!(license);
        }
        let response = self.put("organization", Some(data)).await?;
        Ok(Organization::from_response(&response)?)
    }

    pub async fn update_organization(&self, organization: &mut Organization, name: &str) -> Result<()> {
        let data = json!({"tag": organization.tag, "name": name});
        let response = self.post("organization", Some(data)).await?;
        let updated = Organization::from_response(&response)?;
        organization.name = updated.name;
        Ok(())
    }

    pub async fn delete_organization(&self, organization: &Organization) -> Result<()> {
        self.delete("organization", Some(json!({"tag": organization.tag})))
            .await?;
        Ok(())
    }

    /// Users that are members of the organization.
    pub async fn list_organization_users(&self, organization: &Organization) -> Result<Vec<User>> {
        let response = self
            .get(&format!("organization/{}", organization.tag), None)
            .await?;
        let mut users = Vec::new();
        for member in response
            .get("users")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let uid = member
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| ApiError::Parse("organization user without id".to_string()))?;
            users.push(self.get_user_by_uid(uid).await?);
        }
        Ok(users)
    }

    /// Projects owned by the organization.
    pub async fn list_organization_projects(
        &self,
        organization: &Organization,
    ) -> Result<Vec<Project>> {
        let response = self
            .get(&format!("organization/{}", organization.tag), None)
            .await?;
        let mut projects = Vec::new();
        for entry in response
            .get("projects")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let pid = entry
                .get("pid")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::Parse("organization project without pid".to_string()))?;
            projects.push(self.get_project_by_pid(pid).await?);
        }
        Ok(projects)
    }
}
