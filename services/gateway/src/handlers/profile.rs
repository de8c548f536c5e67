use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::domain::types::UserProfile;
use crate::error::GatewayError;
use crate::handlers::{Caller, JsonBody, MessageResponse, MultipartBody};
use crate::state::AppState;
use crate::usecase::account::{
    ChangePasswordInput, ChangePasswordUseCase, GetProfileUseCase, UpdateProfileInput,
    UpdateProfileUseCase,
};
use crate::usecase::avatar::{UploadAvatarInput, UploadAvatarUseCase};

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct PhotoResponse {
    pub url: String,
}

/// Multipart field carrying the avatar.
const PHOTO_FIELD: &str = "file";

// ── GET /user/profile ────────────────────────────────────────────────────────

pub async fn get_profile(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<Json<UserProfile>, GatewayError> {
    let usecase = GetProfileUseCase {
        accounts: state.user_directory(),
    };
    Ok(Json(usecase.execute(&user).await?))
}

// ── PUT /user/profile ────────────────────────────────────────────────────────

pub async fn update_profile(
    State(state): State<AppState>,
    Caller(user): Caller,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let usecase = UpdateProfileUseCase {
        accounts: state.user_directory(),
    };
    usecase
        .execute(
            &user,
            UpdateProfileInput {
                name: body.name,
                phone: body.phone,
            },
        )
        .await?;
    Ok(Json(MessageResponse {
        message: "profile updated",
    }))
}

// ── POST /user/change-password ───────────────────────────────────────────────

pub async fn change_password(
    State(state): State<AppState>,
    Caller(user): Caller,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let usecase = ChangePasswordUseCase {
        accounts: state.user_directory(),
    };
    usecase
        .execute(
            &user,
            ChangePasswordInput {
                old_password: body.old_password,
                new_password: body.new_password,
            },
        )
        .await?;
    Ok(Json(MessageResponse {
        message: "password changed",
    }))
}

// ── POST /user/photo ─────────────────────────────────────────────────────────

pub async fn upload_photo(
    State(state): State<AppState>,
    Caller(user): Caller,
    MultipartBody(mut multipart): MultipartBody,
) -> Result<Json<PhotoResponse>, GatewayError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(PHOTO_FIELD) {
            let content_type = field.content_type().map(str::to_owned);
            let data = field.bytes().await?;
            upload = Some(UploadAvatarInput { content_type, data });
            break;
        }
    }
    let upload = upload
        .ok_or_else(|| GatewayError::BadRequest(format!("missing multipart field {PHOTO_FIELD:?}")))?;

    let usecase = UploadAvatarUseCase {
        accounts: state.user_directory(),
        objects: state.object_store(),
        max_bytes: state.max_upload_bytes,
    };
    let url = usecase.execute(&user, upload).await?;
    Ok(Json(PhotoResponse { url }))
}
