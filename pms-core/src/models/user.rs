use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::lenient;
use super::EntityId;

/// Role of a team member. `Admin` unlocks edit and delete affordances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum UserRole {
    Admin,
    #[default]
    Team,
    Other(String),
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "Admin",
            Self::Team => "Team",
            Self::Other(raw) => raw,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Admin" => Self::Admin,
            "" | "Team" => Self::Team,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl Serialize for UserRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub role: UserRole,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub title: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl User {
    pub fn to_draft(&self) -> UserDraft {
        UserDraft {
            name: self.name.clone(),
            role: self.role.clone(),
            title: self.title.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserDraft {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub role: UserRole,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserDraft {
    pub fn new(name: impl Into<String>, role: UserRole) -> Self {
        Self {
            name: name.into(),
            role,
            ..Default::default()
        }
    }

    pub fn into_user(self, id: EntityId) -> User {
        User {
            id,
            name: self.name,
            role: self.role,
            title: self.title,
            avatar_url: self.avatar_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_defaults_to_team() {
        let user: User = serde_json::from_value(json!({"id": "3", "name": "Ana"})).unwrap();
        assert_eq!(user.role, UserRole::Team);
        assert_eq!(user.id, EntityId::new(3));
        assert!(!user.role.is_admin());
    }

    #[test]
    fn custom_roles_are_preserved() {
        let user: User =
            serde_json::from_value(json!({"id": 1, "name": "Bo", "role": "Designer"})).unwrap();
        assert_eq!(user.role, UserRole::Other("Designer".into()));
        assert_eq!(serde_json::to_value(&user).unwrap()["role"], json!("Designer"));
    }
}
