use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{
        ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
        ResetPasswordRequest, TokenResponse,
    },
    entity::{
        carts,
        password_reset_tokens::{self, Column as ResetCol, Entity as ResetTokens},
        users::{self, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, TokenType, decode_token, issue_token},
    models::Role,
    response::{ApiResponse, Meta},
    state::AppState,
    validation::{require_email, require_min_len},
};

const INVALID_CREDENTIALS: &str = "Invalid username/email or password";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Password rules shared by registration, reset and password change.
pub fn validate_new_password(password: &str, confirm_password: &str) -> AppResult<()> {
    require_min_len("password", password, 8)?;
    if password != confirm_password {
        return Err(AppError::BadRequest(
            "Password and confirm password do not match".into(),
        ));
    }
    Ok(())
}

/// Rejects a username or email already used by another account.
pub async fn ensure_identity_available<C: ConnectionTrait>(
    conn: &C,
    username: Option<&str>,
    email: Option<&str>,
) -> AppResult<()> {
    if let Some(username) = username {
        let taken = Users::find()
            .filter(UserCol::Username.eq(username))
            .one(conn)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict("Username is already in use".into()));
        }
    }
    if let Some(email) = email {
        let taken = Users::find().filter(UserCol::Email.eq(email)).one(conn).await?;
        if taken.is_some() {
            return Err(AppError::Conflict("Email is already in use".into()));
        }
    }
    Ok(())
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
}

/// Inserts the user together with its empty cart.
pub async fn insert_user_with_cart<C: ConnectionTrait>(
    conn: &C,
    new_user: NewUser,
) -> AppResult<users::Model> {
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(new_user.username),
        email: Set(new_user.email),
        password_hash: Set(new_user.password_hash),
        full_name: Set(new_user.full_name),
        phone_number: Set(new_user.phone_number),
        image_url: Set(None),
        email_verified: Set(false),
        is_active: Set(true),
        role: Set(new_user.role.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;

    carts::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;

    Ok(user)
}

fn token_pair(state: &AppState, user: &users::Model) -> AppResult<TokenResponse> {
    Ok(TokenResponse {
        access_token: issue_token(&state.jwt, user.id, &user.role, TokenType::Access)?,
        refresh_token: issue_token(&state.jwt, user.id, &user.role, TokenType::Refresh)?,
        user_id: user.id,
    })
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<TokenResponse>> {
    let username = payload.username.trim().to_string();
    let email = normalize_email(&payload.email);

    require_min_len("username", &username, 8)?;
    require_email(&email)?;
    validate_new_password(&payload.password, &payload.confirm_password)?;

    let txn = state.orm.begin().await?;
    ensure_identity_available(&txn, Some(&username), Some(&email)).await?;

    let user = insert_user_with_cart(
        &txn,
        NewUser {
            username,
            email,
            password_hash: hash_password(&payload.password)?,
            full_name: None,
            phone_number: None,
            role: Role::User,
        },
    )
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let tokens = token_pair(state, &user)?;
    Ok(ApiResponse::success("User created", tokens, Some(Meta::empty())))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<TokenResponse>> {
    let identifier = payload.identifier.trim();
    let user = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Username.eq(identifier))
                .add(UserCol::Email.eq(normalize_email(identifier))),
        )
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into())),
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    if !user.is_active {
        return Err(AppError::Forbidden);
    }

    let tokens = token_pair(state, &user)?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("Logged in", tokens, Some(Meta::empty())))
}

pub async fn refresh_token(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<TokenResponse>> {
    let (user_id, _) = decode_token(&state.jwt, &payload.refresh_token, TokenType::Refresh)?;

    let user = Users::find_by_id(user_id).one(&state.orm).await?;
    let user = match user {
        Some(u) if u.is_active => u,
        _ => return Err(AppError::Unauthorized("Invalid or expired token".into())),
    };

    let access_token = issue_token(&state.jwt, user.id, &user.role, TokenType::Access)?;
    Ok(ApiResponse::success(
        "Token refreshed",
        TokenResponse {
            access_token,
            refresh_token: payload.refresh_token,
            user_id: user.id,
        },
        Some(Meta::empty()),
    ))
}

pub async fn logout_user(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_logout",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged out",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::not_found("User")),
    };

    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now() + Duration::minutes(state.jwt.reset_ttl_minutes);

    let txn = state.orm.begin().await?;
    ResetTokens::delete_many()
        .filter(ResetCol::UserId.eq(user.id))
        .exec(&txn)
        .await?;
    password_reset_tokens::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        token: Set(token.clone()),
        expires_at: Set(expires_at.into()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    let link = format!(
        "{}/reset-password?email={}&token={}",
        state.frontend_url.trim_end_matches('/'),
        email,
        token
    );
    tracing::info!(user_id = %user.id, %link, "password reset requested");

    audit::record(
        &state.pool,
        Some(user.id),
        "password_reset_requested",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password reset link sent",
        serde_json::json!({ "email": email }),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    validate_new_password(&payload.password, &payload.confirm_password)?;

    let email = normalize_email(&payload.email);
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::not_found("User")),
    };

    let txn = state.orm.begin().await?;
    let stored = ResetTokens::find()
        .filter(
            Condition::all()
                .add(ResetCol::UserId.eq(user.id))
                .add(ResetCol::Token.eq(payload.token.trim()))
                .add(ResetCol::ExpiresAt.gt(Utc::now())),
        )
        .one(&txn)
        .await?;
    if stored.is_none() {
        return Err(AppError::BadRequest("Invalid or expired reset token".into()));
    }

    let user_id = user.id;
    let mut active: users::ActiveModel = user.into();
    active.password_hash = Set(hash_password(&payload.password)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    ResetTokens::delete_many()
        .filter(ResetCol::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user_id),
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password has been reset",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong-pass", &hash).unwrap());
    }

    #[test]
    fn new_password_rules() {
        assert!(validate_new_password("longenough", "longenough").is_ok());
        assert!(validate_new_password("short", "short").is_err());
        assert!(validate_new_password("longenough", "different1").is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Jane@Raumania.VN "), "jane@raumania.vn");
    }
}
