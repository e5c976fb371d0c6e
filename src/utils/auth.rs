use std::future::Future;
use std::pin::Pin;

use actix_web::http::header::Header;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::Repository;
use crate::models::auth::{Role, User};
use crate::utils::errors::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    pub role: Role,
    pub exp: usize, // Expiration time (Unix timestamp)
    pub iat: usize, // Issued at (Unix timestamp)
}

pub fn issue_token(user: &User, config: &AppConfig) -> Result<String, ServiceError> {
    let now = Utc::now();
    let exp = Duration::try_hours(config.jwt_expiry_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| ServiceError::InternalError("Token expiry overflow".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        exp,
        iat: now.timestamp() as usize,
    };

    encode(
        &JwtHeader::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| {
        log::error!("JWT encoding error: {}", e);
        ServiceError::AuthenticationError("Failed to generate token".to_string())
    })
}

pub fn verify_token(token: &str, config: &AppConfig) -> Result<Claims, ServiceError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::warn!("JWT validation error: {}", e);
        ServiceError::Unauthorized("Not authorized, token failed".to_string())
    })
}

pub fn hash_password(password: &str, config: &AppConfig) -> Result<String, ServiceError> {
    Ok(bcrypt::hash(password, config.bcrypt_cost)?)
}

/// The caller behind a request's bearer token.
///
/// Extracting it rejects requests without a valid token and requests whose
/// user has since been removed.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub user: User,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Access denied, admin only".to_string()))
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Result<String, ServiceError> {
    Authorization::<Bearer>::parse(req)
        .map(|auth| auth.into_scheme().token().to_string())
        .map_err(|_| ServiceError::Unauthorized("Not authorized, no token".to_string()))
}

impl FromRequest for AuthUser {
    type Error = ServiceError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let config = req.app_data::<web::Data<AppConfig>>().cloned();
        let repo = req.app_data::<web::Data<dyn Repository>>().cloned();

        Box::pin(async move {
            let (config, repo) = match (config, repo) {
                (Some(config), Some(repo)) => (config, repo),
                _ => {
                    return Err(ServiceError::InternalError(
                        "Auth extractor used without app state".to_string(),
                    ))
                }
            };

            let claims = verify_token(&token?, &config)?;
            let id: Uuid = claims
                .sub
                .parse()
                .map_err(|_| ServiceError::Unauthorized("Invalid user ID in token".to_string()))?;

            let user = repo.find_user_by_id(id).await?.ok_or_else(|| {
                log::warn!("Token refers to unknown user {}", id);
                ServiceError::Unauthorized("User not found".to_string())
            })?;

            Ok(AuthUser {
                id: user.id,
                role: user.role,
                user,
            })
        })
    }
}
