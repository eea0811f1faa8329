//! Project management.

use serde_json::{json, Value};

use crate::client::Client;
use crate::errors::{ApiError, ModelError, Result};
use crate::models::ModelInfo;
use crate::organizations::Organization;
use crate::users::User;

/// Per-project access levels, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    Guest,
    User,
    Owner,
    Admin,
}

impl AccessLevel {
    pub fn as_int(&self) -> u32 {
        match self {
            AccessLevel::Guest => 100,
            AccessLevel::User => 180,
            AccessLevel::Owner => 250,
            AccessLevel::Admin => 255,
        }
    }

    pub fn from_int(level: u32) -> std::result::Result<Self, ApiError> {
        match level {
            100 => Ok(AccessLevel::Guest),
            180 => Ok(AccessLevel::User),
            250 => Ok(AccessLevel::Owner),
            255 => Ok(AccessLevel::Admin),
            other => Err(ApiError::Parse(format!("Invalid access level {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub pid: String,
    pub name: String,
    pub description: String,
    pub access_level: AccessLevel,
}

impl Project {
    fn from_response(value: &Value) -> std::result::Result<Self, ApiError> {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::Parse(format!("project missing '{key}'")))
        };
        let level = value
            .get("accesslevel")
            .and_then(Value::as_u64)
            .ok_or_else(|| ApiError::Parse("project missing 'accesslevel'".to_string()))?;
        Ok(Project {
            pid: field("pid")?,
            name: field("name")?,
            description: field("description")?,
            access_level: AccessLevel::from_int(level as u32)?,
        })
    }
}

impl Client {
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let response = self.post("projects", None).await?;
        let projects = response
            .as_array()
            .ok_or_else(|| ApiError::Parse("project list is not an array".to_string()))?;
        projects
            .iter()
            .map(|project| Ok(Project::from_response(project)?))
            .collect()
    }

    pub async fn get_project_by_pid(&self, pid: &str) -> Result<Project> {
        let response = self.post("project/data", Some(json!({"pid": pid}))).await?;
        Ok(Project::from_response(&response)?)
    }

    /// Exact-name lookup with a case-insensitive fallback.
    pub async fn get_project_by_name(&self, name: &str) -> Result<Project> {
        let projects = self.list_projects().await?;
        if let Some(project) = projects.iter().find(|p| p.name == name) {
            return Ok(project.clone());
        }
        let lowered = name.to_lowercase();
        projects
            .into_iter()
            .find(|p| p.name.to_lowercase() == lowered)
            .ok_or_else(|| ModelError::not_found("project", name).into())
    }

    pub async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
        organization: Option<&Organization>,
    ) -> Result<Project> {
        let mut data = json!({
            "name": name,
            "description": description.unwrap_or(""),
        });
        if let Some(organization) = organization {
            data["organization"] = json!(organization.tag);
        }
        let response = self.put("project", Some(data)).await?;
        let pid = response
            .get("pid")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("project response missing 'pid'".to_string()))?;
        self.get_project_by_pid(pid).await
    }

    pub async fn update_project(
        &self,
        project: &mut Project,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        let data = json!({
            "pid": project.pid,
            "name": name.unwrap_or(&project.name),
            "description": description.unwrap_or(&project.description),
        });
        let response = self.post("project", Some(data)).await?;
        if let Some(name) = response.get("name").and_then(Value::as_str) {
            project.name = name.to_string();
        }
        if let Some(description) = response.get("description").and_then(Value::as_str) {
            project.description = description.to_string();
        }
        Ok(())
    }

    pub async fn delete_project(&self, project: &Project) -> Result<()> {
        self.delete("project", Some(json!({"pid": project.pid})))
            .await?;
        Ok(())
    }

    /// Users with access to the project.
    pub async fn list_project_users(&self, project: &Project) -> Result<Vec<User>> {
        let response = self
            .post("project/data", Some(json!({"pid": project.pid})))
            .await?;
        let mut users = Vec::new();
        for member in response
            .get("users")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let uid = member
                .get("uid")
                .and_then(Value::as_i64)
                .ok_or_else(|| ApiError::Parse("project user without uid".to_string()))?;
            users.push(self.get_user_by_uid(uid).await?);
        }
        Ok(users)
    }

    pub async fn add_project_user(
        &self,
        project: &Project,
        user: &User,
        access_level: Option<AccessLevel>,
    ) -> Result<()> {
        let mut data = json!({"pid": project.pid, "uid": user.uid});
        if let Some(level) = access_level {
            data["accesslevel"] = json!(level.as_int());
        }
        self.put("project/user", Some(data)).await?;
        Ok(())
    }

    pub async fn remove_project_user(&self, project: &Project, user: &User) -> Result<()> {
        self.delete(
            "project/user",
            Some(json!({"pid": project.pid, "uid": user.uid})),
        )
        .await?;
        Ok(())
    }

    /// The user's access level on the project, or `None` when the user is
    /// not a member.
    pub async fn get_project_access_level(
        &self,
        project: &Project,
        user: &User,
    ) -> Result<Option<AccessLevel>> {
        let response = self
            .post("project/data", Some(json!({"pid": project.pid})))
            .await?;
        for member in response
            .get("users")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if member.get("uid").and_then(Value::as_i64) == Some(user.uid) {
                let level = member
                    .get("accesslevel")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| ApiError::Parse("project user without accesslevel".to_string()))?;
                return Ok(Some(AccessLevel::from_int(level as u32)?));
            }
        }
        Ok(None)
    }

    pub async fn set_project_access_level(
        &self,
        project: &Project,
        user: &User,
        access_level: AccessLevel,
    ) -> Result<()> {
        let data = json!({
            "pid": project.pid,
            "uid": user.uid,
            "accesslevel": access_level.as_int(),
        });
        self.post("project/user", Some(data)).await?;
        Ok(())
    }

    /// Imports models from other projects into this one.
    pub async fn import_models(&self, project: &Project, models: &[ModelInfo]) -> Result<()> {
        let mids: Vec<&str> = models.iter().map(|m| m.mid.as_str()).collect();
        self.post("models/import", Some(json!({"pid": project.pid, "mids": mids})))
            .await?;
        Ok(())
    }
}
