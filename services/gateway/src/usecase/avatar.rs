use bytes::Bytes;
use uuid::Uuid;

use crate::domain::repository::{AccountDirectory, ObjectStore};
use crate::domain::types::{ProfileUpdate, UserHandle};
use crate::error::GatewayError;

/// File extension for each accepted image type.
fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        _ => None,
    }
}

pub struct UploadAvatarInput {
    pub content_type: Option<String>,
    pub data: Bytes,
}

pub struct UploadAvatarUseCase<A, O>
where
    A: AccountDirectory,
    O: ObjectStore,
{
    pub accounts: A,
    pub objects: O,
    pub max_bytes: usize,
}

impl<A, O> UploadAvatarUseCase<A, O>
where
    A: AccountDirectory,
    O: ObjectStore,
{
    /// Store the image and point the profile photo at it. Returns the public URL.
    pub async fn execute(
        &self,
        user: &UserHandle,
        input: UploadAvatarInput,
    ) -> Result<String, GatewayError> {
        let content_type = input
            .content_type
            .ok_or_else(|| GatewayError::BadRequest("file content type is required".to_owned()))?;
        let ext = image_extension(&content_type)
            .ok_or_else(|| GatewayError::BadRequest(format!("unsupported image type {content_type}")))?;
        if input.data.is_empty() {
            return Err(GatewayError::BadRequest("file is empty".to_owned()));
        }
        if input.data.len() > self.max_bytes {
            return Err(GatewayError::BadRequest(format!(
                "file exceeds {} bytes",
                self.max_bytes
            )));
        }

        let key = format!("{}{ext}", Uuid::new_v4());
        let url = self
            .objects
            .put_object(&key, &content_type, input.data)
            .await?;

        let update = ProfileUpdate {
            photo: Some(url.clone()),
            ..ProfileUpdate::default()
        };
        self.accounts.update_profile(user, &update).await?;
        tracing::info!(user_id = %user.as_str(), key = %key, "avatar updated");
        Ok(url)
    }
}
