//! Authenticated user, login and registration types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidateEmail, ValidationError};

use super::not_blank;

/// Portal roles; anything the backend sends other than ADMIN is a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Member
        }
    }
}

impl Role {
    /// Page a freshly logged-in user lands on
    pub fn landing_page(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Member => "/user/homepage",
        }
    }
}

/// User profile kept in the session next to the access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
}

impl SessionUser {
    pub fn role(&self) -> Role {
        Role::from(self.role.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

/// Login form
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /auth/login` and `POST /auth/register`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    #[serde(default, alias = "accessToken")]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if not_blank(name) {
        Ok(())
    } else {
        Err(ValidationError::new("required").with_message("Name is required".into()))
    }
}

fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    if !not_blank(email) {
        return Err(ValidationError::new("required").with_message("Email is required".into()));
    }
    if email.trim().validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("Please enter a valid email address".into()))
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if !not_blank(username) {
        return Err(ValidationError::new("required").with_message("Username is required".into()));
    }
    if username.chars().count() < 3 {
        return Err(ValidationError::new("length")
            .with_message("Username must be at least 3 characters".into()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new("required").with_message("Password is required".into()));
    }
    if password.chars().count() < 6 {
        return Err(ValidationError::new("length")
            .with_message("Password must be at least 6 characters".into()));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if not_blank(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("required").with_message("Phone number is required".into()))
    }
}

/// Field order used to pick the message shown on the registration form
pub const REGISTER_FORM_FIELDS: &[&str] =
    &["name", "email", "username", "password", "confirm_password", "phone"];

/// Registration form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterForm {
    #[serde(default)]
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_email_address"))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[serde(default)]
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[serde(default)]
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    #[serde(default)]
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl From<&RegisterForm> for RegisterRequest {
    fn from(form: &RegisterForm) -> Self {
        let phone = form.phone.trim();
        Self {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            username: form.username.trim().to_string(),
            password: form.password.clone(),
            phone: (!phone.is_empty()).then(|| phone.to_string()),
        }
    }
}
