//! User management.

use serde_json::{json, Value};

use crate::client::Client;
use crate::errors::{ApiError, ModelError, Result};
use crate::organizations::Organization;

/// Platform roles, each implying the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    User,
    ProjectCreator,
    Admin,
    SysAdmin,
}

impl Role {
    /// The role-name list the platform stores for this role.
    pub fn as_list(&self) -> &'static [&'static str] {
        match self {
            Role::User => &["user"],
            Role::ProjectCreator => &["user", "project_creator"],
            Role::Admin => &["user", "project_creator", "admin"],
            Role::SysAdmin => &["user", "project_creator", "admin", "system_admin"],
        }
    }

    /// Maps a stored role-name list back to a role; order is not significant.
    pub fn from_list(roles: &[String]) -> std::result::Result<Self, ApiError> {
        let mut sorted: Vec<&str> = roles.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        for role in [Role::User, Role::ProjectCreator, Role::Admin, Role::SysAdmin] {
            let mut expected: Vec<&str> = role.as_list().to_vec();
            expected.sort_unstable();
            if sorted == expected {
                return Ok(role);
            }
        }
        Err(ApiError::Parse(format!("Invalid role list {roles:?}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub uid: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub role: Role,
    pub organization: Option<String>,
}

impl User {
    fn from_response(value: &Value) -> std::result::Result<Self, ApiError> {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::Parse(format!("user missing '{key}'")))
        };
        let roles: Vec<String> = value
            .get("roles")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .ok_or_else(|| ApiError::Parse("user missing 'roles'".to_string()))?;
        Ok(User {
            uid: value
                .get("uid")
                .and_then(Value::as_i64)
                .ok_or_else(|| ApiError::Parse("user missing 'uid'".to_string()))?,
            username: field("email")?,
            firstname: field("firstname")?,
            lastname: field("lastname")?,
            role: Role::from_list(&roles)?,
            organization: value
                .get("organization")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

impl Client {
    /// The user the session token belongs to.
    pub async fn whoami(&self) -> Result<User> {
        let mut response = self.get("whoami", None).await?;
        // The whoami endpoint calls the uid "id".
        if let Some(id) = response.get("id").cloned() {
            response["uid"] = id;
        }
        Ok(User::from_response(&response)?)
    }

    /// Changes the session user's password; the platform rotates the token.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        let data = json!({"oldpassword": old_password, "newpassword": new_password});
        let response = self.post("changepwd", Some(data)).await?;
        let token = response
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Parse("changepwd response missing 'access_token'".to_string()))?;
        self.set_access_token(Some(token.to_string()));
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let response = self.post("users", None).await?;
        let users = response
            .get("users")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::Parse("users response missing 'users'".to_string()))?;
        users
            .iter()
            .map(|user| Ok(User::from_response(user)?))
            .collect()
    }

    pub async fn get_user_by_uid(&self, uid: i64) -> Result<User> {
        self.list_users()
            .await?
            .into_iter()
            .find(|user| user.uid == uid)
            .ok_or_else(|| ModelError::not_found("user", uid.to_string()).into())
    }

    /// Exact-username lookup with a case-insensitive fallback.
    pub async fn get_user_by_username(&self, username: &str) -> Result<User> {
        let users = self.list_users().await?;
        if let Some(user) = users.iter().find(|u| u.username == username) {
            return Ok(user.clone());
        }
        let lowered = username.to_lowercase();
        users
            .into_iter()
            .find(|u| u.username.to_lowercase() == lowered)
            .ok_or_else(|| ModelError::not_found("user", username).into())
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        firstname: &str,
        lastname: &str,
        role: Role,
        organization: Option<&Organization>,
    ) -> Result<User> {
        let mut data = json!({
            "email": username,
            "password": password,
            "firstname": firstname,
            "lastname": lastname,
            "roles": role.as_list(),
            "isactive": true,
        });
        if let Some(organization) = organization {
            data["organization"] = json!(organization.tag);
        }
        let response = self.put("user", Some(data)).await?;
        Ok(User::from_response(&response)?)
    }

    pub async fn update_user(
        &self,
        user: &mut User,
        username: Option<&str>,
        password: Option<&str>,
        firstname: Option<&str>,
        lastname: Option<&str>,
    ) -> Result<()> {
        let mut data = json!({
            "uid": user.uid,
            "email": username.unwrap_or(&user.username),
            "firstname": firstname.unwrap_or(&user.firstname),
            "lastname": lastname.unwrap_or(&user.lastname),
        });
        if let Some(password) = password {
            data["password"] = json!(password);
        }
        let response = self.post("user", Some(data)).await?;
        let updated = response
            .get("user")
            .ok_or_else(|| ApiError::Parse("user response missing 'user'".to_string()))?;
        let field = |key: &str| {
            updated
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::Parse(format!("user missing '{key}'")))
        };
        user.username = field("email")?;
        user.firstname = field("firstname")?;
        user.lastname = field("lastname")?;
        Ok(())
    }

    pub async fn delete_user(&self, user: &User) -> Result<()> {
        self.delete("user", Some(json!({"uid": user.uid}))).await?;
        Ok(())
    }

    /// Grants and revokes the role-name differences between the user's
    /// current role and the target role.
    pub async fn set_user_role(&self, user: &mut User, role: Role) -> Result<()> {
        let current = user.role.as_list();
        let target = role.as_list();
        let to_add: Vec<&str> = target
            .iter()
            .filter(|r| !current.contains(r))
            .copied()
            .collect();
        let to_remove: Vec<&str> = current
            .iter()
            .filter(|r| !target.contains(r))
            .copied()
            .collect();
        if !to_add.is_empty() {
            self.put("user/roles", Some(json!({"uid": user.uid, "roles": to_add})))
                .await?;
        }
        if !to_remove.is_empty() {
            self.delete(
                "user/roles",
                Some(json!({"uid": user.uid, "roles": to_remove})),
            )
            .await?;
        }
        user.role = role;
        Ok(())
    }
}
