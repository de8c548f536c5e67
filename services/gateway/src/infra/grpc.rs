use anyhow::anyhow;
use tonic::transport::Channel;
use tonic::{Code, Status};

use portico_proto::user::{
    ChangePasswordRequest, GetUserByEmailRequest, GetUserRequest, LoginRequest,
    RegisterRequest, UpdatePasswordRequest, UpdateUserRequest,
    user_service_client::UserServiceClient,
};

use crate::domain::repository::{AccountDirectory, UserDirectory};
use crate::domain::types::{ProfileUpdate, Registration, UserHandle, UserProfile};
use crate::error::GatewayError;

/// gRPC client for the remote user service. Cloning is cheap; the channel is shared.
#[derive(Clone)]
pub struct GrpcUserDirectory {
    client: UserServiceClient<Channel>,
}

impl GrpcUserDirectory {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: UserServiceClient::new(channel),
        }
    }
}

/// Fallback mapping for statuses a call does not handle itself.
fn upstream_error(op: &str, status: Status) -> GatewayError {
    match status.code() {
        Code::InvalidArgument | Code::FailedPrecondition => {
            let message = status.message().trim();
            if message.is_empty() {
                GatewayError::Rejected("rejected by user service".to_owned())
            } else {
                GatewayError::Rejected(message.to_owned())
            }
        }
        _ => GatewayError::UpstreamUnavailable(anyhow!("gRPC {op} failed: {status}")),
    }
}

fn is_credential_failure(code: Code) -> bool {
    matches!(
        code,
        Code::Unauthenticated | Code::PermissionDenied | Code::NotFound
    )
}

impl UserDirectory for GrpcUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserHandle>, GatewayError> {
        let response = self
            .client
            .clone()
            .get_user_by_email(GetUserByEmailRequest {
                email: email.to_owned(),
            })
            .await;
        match response {
            Ok(resp) => Ok(Some(UserHandle(resp.into_inner().id))),
            Err(status) if status.code() == Code::NotFound => Ok(None),
            Err(status) => Err(upstream_error("get_user_by_email", status)),
        }
    }

    async fn update_password(
        &self,
        id: &UserHandle,
        password: &str,
    ) -> Result<(), GatewayError> {
        self.client
            .clone()
            .update_password(UpdatePasswordRequest {
                id: id.as_str().to_owned(),
                password: password.to_owned(),
            })
            .await
            .map(|_| ())
            .map_err(|status| upstream_error("update_password", status))
    }
}

impl AccountDirectory for GrpcUserDirectory {
    async fn register(&self, registration: &Registration) -> Result<String, GatewayError> {
        let response = self
            .client
            .clone()
            .register(RegisterRequest {
                email: registration.email.clone(),
                password: registration.password.clone(),
                name: registration.name.clone(),
                phone: registration.phone.clone(),
            })
            .await;
        match response {
            Ok(resp) => Ok(resp.into_inner().token),
            Err(status) if status.code() == Code::AlreadyExists => Err(GatewayError::Conflict),
            Err(status) => Err(upstream_error("register", status)),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .clone()
            .login(LoginRequest {
                email: email.to_owned(),
                password: password.to_owned(),
            })
            .await;
        match response {
            Ok(resp) => Ok(resp.into_inner().token),
            Err(status) if is_credential_failure(status.code()) => {
                Err(GatewayError::InvalidCredentials)
            }
            Err(status) => Err(upstream_error("login", status)),
        }
    }

    async fn get_profile(&self, id: &UserHandle) -> Result<Option<UserProfile>, GatewayError> {
        let response = self
            .client
            .clone()
            .get_user(GetUserRequest {
                id: id.as_str().to_owned(),
            })
            .await;
        match response {
            Ok(resp) => Ok(Some(resp.into_inner().into())),
            Err(status) if status.code() == Code::NotFound => Ok(None),
            Err(status) => Err(upstream_error("get_user", status)),
        }
    }

    async fn update_profile(
        &self,
        id: &UserHandle,
        update: &ProfileUpdate,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .clone()
            .update_user(UpdateUserRequest {
                id: id.as_str().to_owned(),
                name: update.name.clone(),
                phone: update.phone.clone(),
                photo: update.photo.clone(),
            })
            .await;
        match response {
            Ok(_) => Ok(()),
            Err(status) if status.code() == Code::NotFound => Err(GatewayError::UnknownUser),
            Err(status) => Err(upstream_error("update_user", status)),
        }
    }

    async fn change_password(
        &self,
        id: &UserHandle,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .clone()
            .change_password(ChangePasswordRequest {
                id: id.as_str().to_owned(),
                old_password: old_password.to_owned(),
                new_password: new_password.to_owned(),
            })
            .await;
        match response {
            Ok(_) => Ok(()),
            Err(status) if is_credential_failure(status.code()) => {
                Err(GatewayError::InvalidCredentials)
            }
            Err(status) => Err(upstream_error("change_password", status)),
        }
    }
}

impl From<portico_proto::user::User> for UserProfile {
    fn from(user: portico_proto::user::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            photo: user.photo,
            role: user.role,
        }
    }
}
