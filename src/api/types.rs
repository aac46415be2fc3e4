use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

/// Profile details a user can fill in after signing up. Unset fields are
/// sent as null.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub organization_name: Option<String>,
    pub organization_address: Option<String>,
    pub job_title: Option<String>,
    pub notify_for_projects_within_km: Option<u32>,
    pub drone_you_own: Option<String>,
    pub experience_years: Option<u32>,
    pub certified_drone_operator: Option<bool>,
}
