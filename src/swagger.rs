use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::new);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::whatsapp::update_phone,
        handlers::whatsapp::send_template,
        handlers::whatsapp::send_text,
        handlers::whatsapp::send_code,
        handlers::whatsapp::verify_code,
        handlers::whatsapp::verification_status,
    ),
    components(
        schemas(
            UpdatePhoneRequest,
            PhoneNumberResponse,
            SendTemplateRequest,
            SendTextRequest,
            SendCodeRequest,
            VerifyCodeRequest,
            VerifyCodeResponse,
            SendMessageResponse,
            VerificationStatus,
            TemplateComponent,
            TemplateParameter,
            ComponentType,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "whatsapp", description = "WhatsApp messaging and phone verification API"),
    ),
    info(
        title = "WhatsApp Gateway API",
        version = "1.0.0",
        description = "Sends WhatsApp Cloud API messages to registered users and verifies their phone numbers"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_whatsapp_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for path in [
            "/whatsapp/phone",
            "/whatsapp/messages/template",
            "/whatsapp/messages/text",
            "/whatsapp/verification/send",
            "/whatsapp/verification/verify",
            "/whatsapp/verification/status",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == path), "missing {path}");
        }
        assert!(
            doc.components
                .as_ref()
                .is_some_and(|c| c.security_schemes.contains_key("bearer_auth"))
        );
    }
}
