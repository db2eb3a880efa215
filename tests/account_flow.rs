mod common;

use chrono::{Duration, Utc};
use raumania_api::{
    dto::{
        addresses::{AddressRequest, AdminCreateAddressRequest},
        auth::{
            ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
            ResetPasswordRequest,
        },
        users::{CreateUserRequest, UpdatePasswordRequest},
    },
    entity::{
        password_reset_tokens::{self, Column as ResetCol, Entity as ResetTokens},
        users::{Column as UserCol, Entity as Users},
    },
    error::AppError,
    middleware::auth::{TokenType, decode_token},
    models::Role,
    services::{address_service, auth_service, user_service},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

fn register_request(username: &str, email: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.into(),
        email: email.into(),
        password: "password123".into(),
        confirm_password: "password123".into(),
    }
}

fn login(identifier: &str, password: &str) -> LoginRequest {
    LoginRequest {
        identifier: identifier.into(),
        password: password.into(),
    }
}

fn home(city: &str) -> AddressRequest {
    AddressRequest {
        house_number: "7".into(),
        street_name: "Hang Bac".into(),
        city: city.into(),
        state: "Hoan Kiem".into(),
        country: "Vietnam".into(),
        postal_code: "100000".into(),
    }
}

async fn reset_token(state: &AppState, email: &str) -> anyhow::Result<password_reset_tokens::Model> {
    auth_service::forgot_password(state, ForgotPasswordRequest { email: email.into() }).await?;
    let user = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?
        .expect("user");
    let token = ResetTokens::find()
        .filter(ResetCol::UserId.eq(user.id))
        .one(&state.orm)
        .await?
        .expect("reset token");
    Ok(token)
}

#[tokio::test]
async fn tokens_refresh_and_password_reset() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let _db = common::lock_db().await;
    let state = common::setup_state(&database_url).await?;

    let tokens = auth_service::register_user(
        &state,
        register_request("perfumista", "Perfumista@Raumania.test"),
    )
    .await?
    .data
    .expect("tokens");

    // Email is stored lowercased and either identifier logs in
    auth_service::login_user(&state, login("perfumista@raumania.test", "password123")).await?;
    auth_service::login_user(&state, login("perfumista", "password123")).await?;
    let wrong = auth_service::login_user(&state, login("perfumista", "password124")).await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

    let refreshed = auth_service::refresh_token(
        &state,
        RefreshRequest {
            refresh_token: tokens.refresh_token.clone(),
        },
    )
    .await?
    .data
    .expect("tokens");
    let (user_id, claims) =
        decode_token(&state.jwt, &refreshed.access_token, TokenType::Access)?;
    assert_eq!(user_id, tokens.user_id);
    assert_eq!(claims.role, Role::User.as_str());

    // An access token is not accepted where a refresh token is expected
    let wrong_type = auth_service::refresh_token(
        &state,
        RefreshRequest {
            refresh_token: tokens.access_token.clone(),
        },
    )
    .await;
    assert!(matches!(wrong_type, Err(AppError::Unauthorized(_))));

    let garbage = auth_service::refresh_token(
        &state,
        RefreshRequest {
            refresh_token: "not-a-jwt".into(),
        },
    )
    .await;
    assert!(matches!(garbage, Err(AppError::Unauthorized(_))));

    let unknown = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: "nobody@raumania.test".into(),
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    let stored = reset_token(&state, "perfumista@raumania.test").await?;

    let bad_token = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            email: "perfumista@raumania.test".into(),
            token: "0000".into(),
            password: "newpassword1".into(),
            confirm_password: "newpassword1".into(),
        },
    )
    .await;
    assert!(matches!(bad_token, Err(AppError::BadRequest(_))));

    // Expired tokens are rejected
    let mut expired: password_reset_tokens::ActiveModel = stored.clone().into();
    expired.expires_at = Set((Utc::now() - Duration::minutes(1)).into());
    expired.update(&state.orm).await?;
    let too_late = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            email: "perfumista@raumania.test".into(),
            token: stored.token.clone(),
            password: "newpassword1".into(),
            confirm_password: "newpassword1".into(),
        },
    )
    .await;
    assert!(matches!(too_late, Err(AppError::BadRequest(_))));

    // A fresh request replaces the old token
    let fresh = reset_token(&state, "perfumista@raumania.test").await?;
    assert_ne!(fresh.token, stored.token);
    auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            email: "perfumista@raumania.test".into(),
            token: fresh.token.clone(),
            password: "newpassword1".into(),
            confirm_password: "newpassword1".into(),
        },
    )
    .await?;

    let old = auth_service::login_user(&state, login("perfumista", "password123")).await;
    assert!(matches!(old, Err(AppError::Unauthorized(_))));
    auth_service::login_user(&state, login("perfumista", "newpassword1")).await?;

    // Tokens are single use
    let reused = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            email: "perfumista@raumania.test".into(),
            token: fresh.token,
            password: "another-pass1".into(),
            confirm_password: "another-pass1".into(),
        },
    )
    .await;
    assert!(matches!(reused, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn users_reject_duplicates_and_wrong_passwords() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let _db = common::lock_db().await;
    let state = common::setup_state(&database_url).await?;
    let admin = common::admin();
    let member = common::register(&state, "member0001").await?;

    let duplicate_email = auth_service::register_user(
        &state,
        register_request("member0002", "MEMBER0001@raumania.test"),
    )
    .await;
    assert!(matches!(duplicate_email, Err(AppError::Conflict(_))));

    let staff = CreateUserRequest {
        username: "member0001".into(),
        email: "staff@raumania.test".into(),
        password: "password123".into(),
        full_name: Some("Staff Member".into()),
        phone_number: None,
        role: Some(Role::Admin),
    };
    let duplicate_username = user_service::create_user(&state, &admin, staff).await;
    assert!(matches!(duplicate_username, Err(AppError::Conflict(_))));

    let not_admin = user_service::create_user(
        &state,
        &member,
        CreateUserRequest {
            username: "sneaky001".into(),
            email: "sneaky@raumania.test".into(),
            password: "password123".into(),
            full_name: None,
            phone_number: None,
            role: Some(Role::Admin),
        },
    )
    .await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));

    // Racing registrations for one username: one wins, the other gets 409
    let (first, second) = tokio::join!(
        auth_service::register_user(&state, register_request("racer0001", "racer1@raumania.test")),
        auth_service::register_user(&state, register_request("racer0001", "racer2@raumania.test")),
    );
    assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = if first.is_err() { first } else { second };
    assert!(matches!(loser, Err(AppError::Conflict(_))));

    let wrong_current = user_service::update_password(
        &state,
        &member,
        UpdatePasswordRequest {
            current_password: "not-my-password".into(),
            new_password: "password456".into(),
            confirm_password: "password456".into(),
        },
    )
    .await;
    assert!(matches!(wrong_current, Err(AppError::BadRequest(_))));

    let mismatch = user_service::update_password(
        &state,
        &member,
        UpdatePasswordRequest {
            current_password: "password123".into(),
            new_password: "password456".into(),
            confirm_password: "password789".into(),
        },
    )
    .await;
    assert!(matches!(mismatch, Err(AppError::BadRequest(_))));

    user_service::update_password(
        &state,
        &member,
        UpdatePasswordRequest {
            current_password: "password123".into(),
            new_password: "password456".into(),
            confirm_password: "password456".into(),
        },
    )
    .await?;
    auth_service::login_user(&state, login("member0001", "password456")).await?;

    let me = user_service::get_my_info(&state, &member).await?.data.expect("user");
    assert_eq!(me.username, "member0001");
    assert_eq!(me.role, "USER");

    Ok(())
}

#[tokio::test]
async fn addresses_are_private_to_their_owner() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let _db = common::lock_db().await;
    let state = common::setup_state(&database_url).await?;
    let admin = common::admin();
    let owner = common::register(&state, "addressee1").await?;
    let other = common::register(&state, "neighbour1").await?;

    let saved = address_service::create_my_address(&state, &owner, home("Hanoi"))
        .await?
        .data
        .expect("address");
    assert_eq!(saved.user_id, owner.user_id);

    let blank = address_service::create_my_address(&state, &owner, home("   ")).await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));

    let foreign_update =
        address_service::update_my_address(&state, &other, saved.id, home("Da Nang")).await;
    assert!(matches!(foreign_update, Err(AppError::NotFound(_))));
    let foreign_delete = address_service::delete_my_address(&state, &other, saved.id).await;
    assert!(matches!(foreign_delete, Err(AppError::NotFound(_))));

    let theirs = address_service::list_my_addresses(&state, &other)
        .await?
        .data
        .expect("addresses");
    assert!(theirs.items.is_empty());

    let moved = address_service::update_my_address(&state, &owner, saved.id, home("Hue"))
        .await?
        .data
        .expect("address");
    assert_eq!(moved.city, "Hue");

    let forbidden = address_service::get_address(&state, &other, saved.id).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    let for_other = address_service::create_address(
        &state,
        &admin,
        AdminCreateAddressRequest {
            user_id: other.user_id,
            address: home("Can Tho"),
        },
    )
    .await?
    .data
    .expect("address");
    assert_eq!(for_other.user_id, other.user_id);

    let ghost = address_service::create_address(
        &state,
        &admin,
        AdminCreateAddressRequest {
            user_id: uuid::Uuid::new_v4(),
            address: home("Vung Tau"),
        },
    )
    .await;
    assert!(matches!(ghost, Err(AppError::NotFound(_))));

    address_service::delete_my_address(&state, &owner, saved.id).await?;
    let mine = address_service::list_my_addresses(&state, &owner)
        .await?
        .data
        .expect("addresses");
    assert!(mine.items.is_empty());

    Ok(())
}
