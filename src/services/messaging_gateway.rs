use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::user_attributes::{UserAttributeStore, encode_flag, keys, parse_flag};
use crate::config::WhatsAppConfig;
use crate::error::{AppError, AppResult};
use crate::external::WhatsAppClient;
use crate::models::*;
use crate::utils::{generate_verification_code, normalize_phone_number, validate_phone_number};

/// Resolves the caller's identity when an operation is called without an
/// explicit user id.
pub trait CurrentUserResolver: Send + Sync {
    fn current_user_id(&self) -> Option<i64>;
}

const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1024;

/// Serializes verification-code issuance and consumption per user.
#[derive(Clone, Default)]
struct UserLocks {
    locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    async fn lock(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() > LOCK_TABLE_PRUNE_THRESHOLD {
                locks.retain(|_, l| Arc::strong_count(l) > 1);
            }
            locks.entry(user_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Sends WhatsApp messages to users and runs the phone verification flow.
#[derive(Clone)]
pub struct MessagingGateway {
    client: WhatsAppClient,
    store: Arc<dyn UserAttributeStore>,
    config: Arc<WhatsAppConfig>,
    locks: UserLocks,
}

impl MessagingGateway {
    pub fn new(
        config: WhatsAppConfig,
        client: WhatsAppClient,
        store: Arc<dyn UserAttributeStore>,
    ) -> Self {
        Self {
            client,
            store,
            config: Arc::new(config),
            locks: UserLocks::default(),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.config.default_language
    }

    /// Sends a pre-registered template. Refused unless the user's number is
    /// verified.
    pub async fn send_template_message(
        &self,
        caller: &dyn CurrentUserResolver,
        template_name: &str,
        user_id: Option<i64>,
        components: Vec<TemplateComponent>,
        language_code: &str,
    ) -> AppResult<String> {
        let user_id = resolve_user_id(caller, user_id)?;
        let Some(phone) = self.user_phone_number(user_id).await? else {
            log::error!("Phone number not found for user {user_id}");
            return Err(AppError::NoPhoneNumber(format!(
                "Phone number not found for user {user_id}"
            )));
        };

        if !self.verified_flag(user_id).await? {
            log::error!("Phone number {phone} of user {user_id} not verified");
            return Err(AppError::NotVerified(phone));
        }

        let message = OutboundMessage::template(&phone, template_name, language_code, components);

        log::info!("Sending WhatsApp message to {phone}, template: {template_name}");
        self.client.send(&message).await
    }

    /// Sends free-form text. Verification is only enforced when
    /// `require_verified_for_text` is set.
    pub async fn send_text_message(
        &self,
        caller: &dyn CurrentUserResolver,
        message: &str,
        user_id: Option<i64>,
    ) -> AppResult<String> {
        let user_id = resolve_user_id(caller, user_id)?;
        let Some(phone) = self.user_phone_number(user_id).await? else {
            log::error!("Phone number not found for user {user_id}");
            return Err(AppError::NoPhoneNumber(format!(
                "Phone number not found for user {user_id}"
            )));
        };

        if self.config.require_verified_for_text && !self.verified_flag(user_id).await? {
            log::error!("Phone number {phone} of user {user_id} not verified");
            return Err(AppError::NotVerified(phone));
        }

        let message = OutboundMessage::text(&phone, message);

        log::info!("Sending WhatsApp text message to {phone}");
        self.client.send(&message).await
    }

    /// Issues a fresh 5-digit code, stores it, then sends it with the
    /// verification template. The stored code stays valid if the send fails.
    pub async fn send_verification_code(
        &self,
        caller: &dyn CurrentUserResolver,
        user_id: Option<i64>,
    ) -> AppResult<String> {
        let user_id = resolve_user_id(caller, user_id)?;

        // number lookup and code storage share one critical section
        let (phone, code) = {
            let _guard = self.locks.lock(user_id).await;
            let Some(phone) = self.user_phone_number(user_id).await? else {
                log::error!("Phone number not found for user {user_id}");
                return Err(AppError::NoPhoneNumber(
                    "No phone number found for the user.".to_string(),
                ));
            };

            let code = generate_verification_code();
            self.store
                .set(user_id, keys::VERIFICATION_CODE, &code)
                .await?;
            self.store
                .set(
                    user_id,
                    keys::VERIFICATION_CODE_ISSUED_AT,
                    &Utc::now().to_rfc3339(),
                )
                .await?;
            (phone, code)
        };

        let message = OutboundMessage::template(
            &phone,
            &self.config.verification_template,
            "en_US",
            vec![
                TemplateComponent::body(vec![TemplateParameter::text(&code)]),
                TemplateComponent::url_button(0, vec![TemplateParameter::text(&code)]),
            ],
        );

        log::info!("Sending verification code to {phone} (user {user_id})");
        self.client.send(&message).await
    }

    /// Returns true and marks the number verified iff `code` equals the pending
    /// code exactly and has not expired. Otherwise nothing changes.
    pub async fn verify_code(
        &self,
        caller: &dyn CurrentUserResolver,
        code: &str,
        user_id: Option<i64>,
    ) -> AppResult<bool> {
        let user_id = resolve_user_id(caller, user_id)?;
        let _guard = self.locks.lock(user_id).await;

        let stored = self.store.get(user_id, keys::VERIFICATION_CODE).await?;
        match stored.as_deref() {
            Some(stored) if !stored.is_empty() && stored == code => {}
            _ => {
                log::info!("Verification code mismatch for user {user_id}");
                return Ok(false);
            }
        }

        if self.code_expired(user_id).await? {
            log::info!("Verification code for user {user_id} has expired");
            return Ok(false);
        }

        self.clear_pending_code(user_id).await?;
        self.store
            .set(user_id, keys::PHONE_VERIFIED, encode_flag(true))
            .await?;

        log::info!("Phone number of user {user_id} verified");
        Ok(true)
    }

    pub async fn is_phone_verified(
        &self,
        caller: &dyn CurrentUserResolver,
        user_id: Option<i64>,
    ) -> AppResult<bool> {
        let user_id = resolve_user_id(caller, user_id)?;
        self.verified_flag(user_id).await
    }

    /// Stores a normalized number. A changed number loses its verified status
    /// and any pending code.
    pub async fn update_phone_number(
        &self,
        caller: &dyn CurrentUserResolver,
        phone_number: &str,
        user_id: Option<i64>,
    ) -> AppResult<PhoneNumberResponse> {
        let user_id = resolve_user_id(caller, user_id)?;
        let phone = normalize_phone_number(phone_number);
        validate_phone_number(&phone)?;

        let _guard = self.locks.lock(user_id).await;

        let stored = self.store.get(user_id, keys::PHONE_NUMBER).await?;
        if stored.as_deref().map(normalize_phone_number).as_deref() == Some(phone.as_str()) {
            if stored.as_deref() != Some(phone.as_str()) {
                self.store.set(user_id, keys::PHONE_NUMBER, &phone).await?;
            }
            return Ok(PhoneNumberResponse {
                user_id,
                phone_number: phone,
                verified: self.verified_flag(user_id).await?,
            });
        }

        self.store.set(user_id, keys::PHONE_NUMBER, &phone).await?;
        self.store
            .set(user_id, keys::PHONE_VERIFIED, encode_flag(false))
            .await?;
        self.clear_pending_code(user_id).await?;

        log::info!("Phone number of user {user_id} set to {phone}");
        Ok(PhoneNumberResponse {
            user_id,
            phone_number: phone,
            verified: false,
        })
    }

    pub async fn verification_status(
        &self,
        caller: &dyn CurrentUserResolver,
        user_id: Option<i64>,
    ) -> AppResult<VerificationStatus> {
        let user_id = resolve_user_id(caller, user_id)?;
        let phone_number = self.user_phone_number(user_id).await?;
        let verified = self.verified_flag(user_id).await?;
        let pending_code = self
            .store
            .get(user_id, keys::VERIFICATION_CODE)
            .await?
            .is_some_and(|c| !c.is_empty());

        Ok(VerificationStatus {
            user_id,
            phone_number,
            verified,
            pending_code,
        })
    }

    /// Stored number (or the configured default), normalized. `None` when
    /// nothing usable is left.
    async fn user_phone_number(&self, user_id: i64) -> AppResult<Option<String>> {
        let stored = self
            .store
            .get(user_id, keys::PHONE_NUMBER)
            .await?
            .filter(|p| !p.trim().is_empty());

        let raw = match (stored, &self.config.default_phone_number) {
            (Some(phone), _) => phone,
            (None, Some(default)) => {
                log::warn!("User {user_id} has no phone number, using the configured default");
                default.clone()
            }
            (None, None) => return Ok(None),
        };

        let phone = normalize_phone_number(&raw);
        Ok((!phone.is_empty()).then_some(phone))
    }

    async fn verified_flag(&self, user_id: i64) -> AppResult<bool> {
        let value = self.store.get(user_id, keys::PHONE_VERIFIED).await?;
        Ok(parse_flag(value.as_deref()))
    }

    /// A missing or unreadable issuance time counts as expired while a TTL is
    /// configured.
    async fn code_expired(&self, user_id: i64) -> AppResult<bool> {
        let ttl = self.config.verification_code_ttl_secs;
        if ttl == 0 {
            return Ok(false);
        }

        let issued_at = self
            .store
            .get(user_id, keys::VERIFICATION_CODE_ISSUED_AT)
            .await?
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(match issued_at {
            Some(issued_at) => {
                (Utc::now() - issued_at).num_seconds() > i64::try_from(ttl).unwrap_or(i64::MAX)
            }
            None => true,
        })
    }

    async fn clear_pending_code(&self, user_id: i64) -> AppResult<()> {
        self.store.delete(user_id, keys::VERIFICATION_CODE).await?;
        self.store
            .delete(user_id, keys::VERIFICATION_CODE_ISSUED_AT)
            .await
    }
}

fn resolve_user_id(caller: &dyn CurrentUserResolver, user_id: Option<i64>) -> AppResult<i64> {
    user_id
        .or_else(|| caller.current_user_id())
        .ok_or_else(|| AppError::AuthError("No current user".to_string()))
}
