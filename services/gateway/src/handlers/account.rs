use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::handlers::JsonBody;
use crate::state::AppState;
use crate::usecase::account::{LoginInput, LoginUseCase, RegisterInput, RegisterUseCase};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// ── POST /auth/register ──────────────────────────────────────────────────────

pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<Json<TokenResponse>, GatewayError> {
    let usecase = RegisterUseCase {
        accounts: state.user_directory(),
    };
    let token = usecase
        .execute(RegisterInput {
            email: body.email,
            password: body.password,
            name: body.name,
            phone: body.phone,
        })
        .await?;
    Ok(Json(TokenResponse { token }))
}

// ── POST /auth/login ─────────────────────────────────────────────────────────

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>, GatewayError> {
    let usecase = LoginUseCase {
        accounts: state.user_directory(),
    };
    let token = usecase
        .execute(LoginInput {
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok(Json(TokenResponse { token }))
}
