use axum::{Json, extract::State};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::handlers::{ClientIp, JsonBody, MessageResponse};
use crate::infra::cache::RedisCodeStore;
use crate::infra::grpc::GrpcUserDirectory;
use crate::infra::mail::SmtpMailer;
use crate::state::AppState;
use crate::usecase::password_reset::{IssueResetInput, RedeemResetInput, ResetCoordinator};

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub password: String,
}

fn coordinator(state: &AppState) -> ResetCoordinator<GrpcUserDirectory, RedisCodeStore, SmtpMailer> {
    ResetCoordinator {
        users: state.user_directory(),
        codes: state.code_store(),
        mailer: state.mailer(),
        limiter: state.limiter.clone(),
        code_ttl: state.code_ttl,
        max_failed_attempts: state.max_failed_attempts,
    }
}

// ── POST /auth/forgot-password ───────────────────────────────────────────────

pub async fn forgot_password(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    JsonBody(body): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    coordinator(&state)
        .issue(IssueResetInput {
            email: body.email,
            client_ip,
        })
        .await?;
    Ok(Json(MessageResponse {
        message: "if the address is registered, a verification code has been sent",
    }))
}

// ── POST /auth/reset-password ────────────────────────────────────────────────

pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    coordinator(&state)
        .redeem(RedeemResetInput {
            email: body.email,
            code: body.code,
            new_password: body.password,
        })
        .await?;
    Ok(Json(MessageResponse {
        message: "password has been reset",
    }))
}
