use axum::{extract::FromRequestParts, http::request::Parts};
use kernel::model::{
    auth::Actor,
    id::UserId,
    role::Role,
};
use serde::Deserialize;
use shared::error::AppError;

/// リバースプロキシ側で認証済みのユーザー情報。
/// `x-user` ヘッダに JSON（id と role）で渡される前提であり、
/// このサービス自身は認証を行わない。
#[derive(Debug, Clone)]
pub struct AuthorizedUser {
    actor: Actor,
}

impl AuthorizedUser {
    pub fn id(&self) -> UserId {
        self.actor.user_id
    }

    pub fn role(&self) -> Role {
        self.actor.role
    }

    pub fn actor(&self) -> Actor {
        self.actor
    }
}

/// 認証ヘッダが無くてもよいエンドポイント用（ゲスト予約など）。
#[derive(Debug, Clone)]
pub struct OptionalAuthorizedUser(pub Option<AuthorizedUser>);

#[derive(Deserialize)]
struct UserHeader {
    id: UserId,
    role: Role,
}

fn parse_user_header(parts: &Parts) -> Result<Option<AuthorizedUser>, AppError> {
    let header = match parts.headers.get("x-user") {
        None => return Ok(None),
        Some(value) => value,
    };
    let raw = header
        .to_str()
        .map_err(|_| AppError::Unauthenticated)?;
    let parsed: UserHeader =
        serde_json::from_str(raw).map_err(|_| AppError::Unauthenticated)?;
    Ok(Some(AuthorizedUser {
        actor: Actor {
            user_id: parsed.id,
            role: parsed.role,
        },
    }))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthorizedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_user_header(parts)?.ok_or(AppError::Unauthenticated)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalAuthorizedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthorizedUser(parse_user_header(parts)?))
    }
}
