use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MESSAGING_PRODUCT: &str = "whatsapp";

/// Body of `POST /{version}/{phone_number_id}/messages`. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub messaging_product: String,
    pub to: String,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody {
    Text { text: TextBody },
    Template { template: Template },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub language: TemplateLanguage,
    pub components: Vec<TemplateComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLanguage {
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Header,
    Body,
    Button,
}

/// One component of a template message (header, body or button parameters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemplateComponent {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Button kind, e.g. `url` or `quick_reply`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "url")]
    pub sub_type: Option<String>,
    /// Button position. The Cloud API takes it as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "0")]
    pub index: Option<String>,
    #[serde(default)]
    pub parameters: Vec<TemplateParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateParameter {
    Text { text: String },
    Payload { payload: String },
}

impl OutboundMessage {
    pub fn text(to: &str, body: &str) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT.to_string(),
            to: to.to_string(),
            body: MessageBody::Text {
                text: TextBody {
                    body: body.to_string(),
                },
            },
        }
    }

    pub fn template(
        to: &str,
        name: &str,
        language_code: &str,
        components: Vec<TemplateComponent>,
    ) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT.to_string(),
            to: to.to_string(),
            body: MessageBody::Template {
                template: Template {
                    name: name.to_string(),
                    language: TemplateLanguage {
                        code: language_code.to_string(),
                    },
                    components,
                },
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.body {
            MessageBody::Text { .. } => "text",
            MessageBody::Template { .. } => "template",
        }
    }
}

impl TemplateComponent {
    pub fn body(parameters: Vec<TemplateParameter>) -> Self {
        Self {
            component_type: ComponentType::Body,
            sub_type: None,
            index: None,
            parameters,
        }
    }

    pub fn url_button(index: u32, parameters: Vec<TemplateParameter>) -> Self {
        Self {
            component_type: ComponentType::Button,
            sub_type: Some("url".to_string()),
            index: Some(index.to_string()),
            parameters,
        }
    }
}

impl TemplateParameter {
    pub fn text(text: &str) -> Self {
        TemplateParameter::Text {
            text: text.to_string(),
        }
    }
}
