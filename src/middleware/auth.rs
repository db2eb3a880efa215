use axum::{extract::FromRequestParts, http::header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::JwtConfig, error::AppError, models::Role, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub token_type: TokenType,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role.as_str() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

pub fn issue_token(
    jwt: &JwtConfig,
    user_id: Uuid,
    role: &str,
    token_type: TokenType,
) -> Result<String, AppError> {
    let ttl = match token_type {
        TokenType::Access => Duration::minutes(jwt.access_ttl_minutes),
        TokenType::Refresh => Duration::days(jwt.refresh_ttl_days),
    };
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        token_type,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Decodes a token and checks that it is of the expected type.
pub fn decode_token(
    jwt: &JwtConfig,
    token: &str,
    expected: TokenType,
) -> Result<(Uuid, Claims), AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    if decoded.claims.token_type != expected {
        return Err(AppError::Unauthorized("Invalid token type".into()));
    }

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    Ok((user_id, decoded.claims))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let (user_id, claims) = decode_token(&state.jwt, token, TokenType::Access)?;

        Ok(AuthUser {
            user_id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            access_ttl_minutes: 5,
            refresh_ttl_days: 1,
            reset_ttl_minutes: 5,
        }
    }

    #[test]
    fn access_token_round_trips() {
        let jwt = jwt();
        let user_id = Uuid::new_v4();
        let token = issue_token(&jwt, user_id, "ADMIN", TokenType::Access).unwrap();

        let (decoded_id, claims) = decode_token(&jwt, &token, TokenType::Access).unwrap();
        assert_eq!(decoded_id, user_id);
        assert_eq!(claims.role, "ADMIN");
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let jwt = jwt();
        let token = issue_token(&jwt, Uuid::new_v4(), "USER", TokenType::Refresh).unwrap();

        let err = decode_token(&jwt, &token, TokenType::Access).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(decode_token(&jwt, &token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = issue_token(&jwt(), Uuid::new_v4(), "USER", TokenType::Access).unwrap();
        let other = JwtConfig {
            secret: "another-secret".into(),
            ..jwt()
        };
        assert!(matches!(
            decode_token(&other, &token, TokenType::Access),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn only_admins_pass_ensure_admin() {
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: "ADMIN".into(),
        };
        let customer = AuthUser {
            user_id: Uuid::new_v4(),
            role: "USER".into(),
        };
        assert!(ensure_admin(&admin).is_ok());
        assert!(matches!(ensure_admin(&customer), Err(AppError::Forbidden)));
        assert!(customer.is_admin() == false);
    }
}
