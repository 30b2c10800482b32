use serde::{Deserialize, Serialize};

use crate::entities::users;

/// User as exposed over the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i32,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub favorite_genres: Vec<String>,
    pub created_at: String,
}

impl From<users::Model> for PublicUser {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            favorite_genres: decode_genres(&model.favorite_genres),
            created_at: model.created_at,
        }
    }
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_genres: Option<Vec<String>>,
}

#[must_use]
pub fn encode_genres(genres: &[String]) -> String {
    serde_json::to_string(genres).unwrap_or_else(|_| "[]".to_string())
}

#[must_use]
pub fn decode_genres(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
