use parley_core::UserProfile;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::ServerError;

/// Request body for `POST /api/v1/users`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    /// Display name; must not be empty.
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
}

impl TryFrom<UserProfile> for UserResponse {
    type Error = ServerError;

    fn try_from(profile: UserProfile) -> Result<Self, Self::Error> {
        let id = profile
            .id
            .ok_or_else(|| ServerError::Internal("user profile was never saved".into()))?;
        Ok(Self {
            id,
            name: profile.name,
        })
    }
}
