use crate::domain::email::{is_valid_email, normalize_address};
use crate::domain::repository::AccountDirectory;
use crate::domain::types::{ProfileUpdate, Registration, UserHandle, UserProfile};
use crate::error::GatewayError;

fn require(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        Err(GatewayError::BadRequest(format!("{field} is required")))
    } else {
        Ok(())
    }
}

// ── register ─────────────────────────────────────────────────────────────────

pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

pub struct RegisterUseCase<A: AccountDirectory> {
    pub accounts: A,
}

impl<A: AccountDirectory> RegisterUseCase<A> {
    /// Returns the access token issued for the new account.
    pub async fn execute(&self, input: RegisterInput) -> Result<String, GatewayError> {
        let email = normalize_address(&input.email);
        if !is_valid_email(&email) {
            return Err(GatewayError::BadAddress);
        }
        require("password", &input.password)?;

        let registration = Registration {
            email,
            password: input.password,
            name: input.name.unwrap_or_default(),
            phone: input.phone.unwrap_or_default(),
        };
        self.accounts.register(&registration).await
    }
}

// ── login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub struct LoginUseCase<A: AccountDirectory> {
    pub accounts: A,
}

impl<A: AccountDirectory> LoginUseCase<A> {
    pub async fn execute(&self, input: LoginInput) -> Result<String, GatewayError> {
        require("email", &input.email)?;
        require("password", &input.password)?;
        self.accounts
            .login(&normalize_address(&input.email), &input.password)
            .await
    }
}

// ── profile ──────────────────────────────────────────────────────────────────

pub struct GetProfileUseCase<A: AccountDirectory> {
    pub accounts: A,
}

impl<A: AccountDirectory> GetProfileUseCase<A> {
    pub async fn execute(&self, user: &UserHandle) -> Result<UserProfile, GatewayError> {
        self.accounts
            .get_profile(user)
            .await?
            .ok_or(GatewayError::UnknownUser)
    }
}

pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub phone: Option<String>,
}

pub struct UpdateProfileUseCase<A: AccountDirectory> {
    pub accounts: A,
}

impl<A: AccountDirectory> UpdateProfileUseCase<A> {
    pub async fn execute(
        &self,
        user: &UserHandle,
        input: UpdateProfileInput,
    ) -> Result<(), GatewayError> {
        let update = ProfileUpdate {
            name: input.name,
            phone: input.phone,
            photo: None,
        };
        if update.is_empty() {
            return Err(GatewayError::BadRequest("nothing to update".to_owned()));
        }
        self.accounts.update_profile(user, &update).await
    }
}

// ── change password ──────────────────────────────────────────────────────────

pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
}

pub struct ChangePasswordUseCase<A: AccountDirectory> {
    pub accounts: A,
}

impl<A: AccountDirectory> ChangePasswordUseCase<A> {
    pub async fn execute(
        &self,
        user: &UserHandle,
        input: ChangePasswordInput,
    ) -> Result<(), GatewayError> {
        require("old_password", &input.old_password)?;
        require("new_password", &input.new_password)?;
        self.accounts
            .change_password(user, &input.old_password, &input.new_password)
            .await
    }
}
