use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::message::TemplateComponent;

pub const DEFAULT_TEMPLATE_NAME: &str = "hello_world";

fn default_template_name() -> String {
    DEFAULT_TEMPLATE_NAME.to_string()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePhoneRequest {
    #[schema(example = "0304-2783912")]
    pub phone_number: String,
    /// Defaults to the authenticated user.
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendTemplateRequest {
    #[serde(default = "default_template_name")]
    #[schema(example = "hello_world")]
    pub template_name: String,
    pub user_id: Option<i64>,
    #[serde(default)]
    pub components: Vec<TemplateComponent>,
    /// Falls back to the configured default language (`en_US`).
    #[schema(example = "en_US")]
    pub language_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendTextRequest {
    #[schema(example = "Your order has shipped")]
    pub message: String,
    pub user_id: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SendCodeRequest {
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyCodeRequest {
    #[schema(example = "48213")]
    pub code: String,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    pub user_id: Option<i64>,
}

/// Raw Cloud API response, parsed as JSON when possible.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    #[schema(value_type = Object)]
    pub api_response: serde_json::Value,
}

impl SendMessageResponse {
    pub fn from_raw(raw: String) -> Self {
        let api_response =
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
        Self { api_response }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PhoneNumberResponse {
    pub user_id: i64,
    #[schema(example = "+923042783912")]
    pub phone_number: String,
    pub verified: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyCodeResponse {
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerificationStatus {
    pub user_id: i64,
    pub phone_number: Option<String>,
    pub verified: bool,
    /// A code has been issued and not yet consumed.
    pub pending_code: bool,
}
