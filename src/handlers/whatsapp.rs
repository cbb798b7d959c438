use actix_web::{HttpResponse, Result, web};

use crate::error::AppError;
use crate::middlewares::CurrentUser;
use crate::models::*;
use crate::services::MessagingGateway;

#[utoipa::path(
    put,
    path = "/whatsapp/phone",
    tag = "whatsapp",
    request_body = UpdatePhoneRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Phone number stored", body = PhoneNumberResponse),
        (status = 400, description = "Invalid phone number"),
        (status = 403, description = "Not allowed to update another user")
    )
)]
pub async fn update_phone(
    gateway: web::Data<MessagingGateway>,
    user: CurrentUser,
    request: web::Json<UpdatePhoneRequest>,
) -> Result<HttpResponse> {
    let target = user.authorize_target(request.user_id)?;
    let response = gateway
        .update_phone_number(&user, &request.phone_number, target)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

#[utoipa::path(
    post,
    path = "/whatsapp/messages/template",
    tag = "whatsapp",
    request_body = SendTemplateRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Template message accepted by WhatsApp", body = SendMessageResponse),
        (status = 400, description = "User has no phone number"),
        (status = 403, description = "Phone number not verified"),
        (status = 502, description = "WhatsApp API unreachable or rejected the message")
    )
)]
pub async fn send_template(
    gateway: web::Data<MessagingGateway>,
    user: CurrentUser,
    request: web::Json<SendTemplateRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    let target = user.authorize_target(request.user_id)?;
    let language_code = request
        .language_code
        .unwrap_or_else(|| gateway.default_language().to_string());

    let raw = gateway
        .send_template_message(
            &user,
            &request.template_name,
            target,
            request.components,
            &language_code,
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        SendMessageResponse::from_raw(raw),
        "Message sent",
    )))
}

#[utoipa::path(
    post,
    path = "/whatsapp/messages/text",
    tag = "whatsapp",
    request_body = SendTextRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Text message accepted by WhatsApp", body = SendMessageResponse),
        (status = 400, description = "User has no phone number"),
        (status = 502, description = "WhatsApp API unreachable or rejected the message")
    )
)]
pub async fn send_text(
    gateway: web::Data<MessagingGateway>,
    user: CurrentUser,
    request: web::Json<SendTextRequest>,
) -> Result<HttpResponse> {
    let target = user.authorize_target(request.user_id)?;
    let raw = gateway
        .send_text_message(&user, &request.message, target)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        SendMessageResponse::from_raw(raw),
        "Message sent",
    )))
}

#[utoipa::path(
    post,
    path = "/whatsapp/verification/send",
    tag = "whatsapp",
    request_body = SendCodeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Verification code sent", body = SendMessageResponse),
        (status = 400, description = "User has no phone number"),
        (status = 502, description = "WhatsApp API unreachable or rejected the message")
    )
)]
pub async fn send_code(
    gateway: web::Data<MessagingGateway>,
    user: CurrentUser,
    request: Option<web::Json<SendCodeRequest>>,
) -> Result<HttpResponse> {
    let request = request.map(web::Json::into_inner).unwrap_or_default();
    let target = user.authorize_target(request.user_id)?;
    let raw = gateway.send_verification_code(&user, target).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        SendMessageResponse::from_raw(raw),
        "Verification code sent",
    )))
}

#[utoipa::path(
    post,
    path = "/whatsapp/verification/verify",
    tag = "whatsapp",
    request_body = VerifyCodeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Phone number verified", body = VerifyCodeResponse),
        (status = 400, description = "Code invalid, expired or never issued")
    )
)]
pub async fn verify_code(
    gateway: web::Data<MessagingGateway>,
    user: CurrentUser,
    request: web::Json<VerifyCodeRequest>,
) -> Result<HttpResponse> {
    let target = user.authorize_target(request.user_id)?;
    if !gateway.verify_code(&user, &request.code, target).await? {
        return Err(AppError::VerificationMismatch.into());
    }
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        VerifyCodeResponse { verified: true },
        "Phone number verified",
    )))
}

#[utoipa::path(
    get,
    path = "/whatsapp/verification/status",
    tag = "whatsapp",
    params(StatusQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Verification status", body = VerificationStatus),
        (status = 403, description = "Not allowed to read another user")
    )
)]
pub async fn verification_status(
    gateway: web::Data<MessagingGateway>,
    user: CurrentUser,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse> {
    let target = user.authorize_target(query.user_id)?;
    let status = gateway.verification_status(&user, target).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(status)))
}

pub fn whatsapp_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/whatsapp")
            .route("/phone", web::put().to(update_phone))
            .route("/messages/template", web::post().to(send_template))
            .route("/messages/text", web::post().to(send_text))
            .route("/verification/send", web::post().to(send_code))
            .route("/verification/verify", web::post().to(verify_code))
            .route("/verification/status", web::get().to(verification_status)),
    );
}
