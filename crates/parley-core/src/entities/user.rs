use std::future::Future;

use tracing::debug;

use crate::db::Database;
use crate::entities::dao::UserProfile;
use crate::entities::dao::user::UserDocument;
use crate::error::CoreError;

pub trait UserStore: Send + Sync + 'static {
    /// Validate `name`, insert a new profile and return it with its id.
    fn create_user(&self, name: &str) -> impl Future<Output = Result<UserProfile, CoreError>> + Send;
    fn load_user(&self, id: i64) -> impl Future<Output = Result<UserProfile, CoreError>> + Send;
    /// Insert when `profile.id` is `None`, otherwise overwrite by id.
    fn save_user(&self, profile: &mut UserProfile) -> impl Future<Output = Result<i64, CoreError>> + Send;
}

impl UserStore for Database {
    async fn create_user(&self, name: &str) -> Result<UserProfile, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("name must not be empty".into()));
        }
        let mut profile = UserProfile::new(name);
        self.save_user(&mut profile).await?;
        Ok(profile)
    }

    async fn load_user(&self, id: i64) -> Result<UserProfile, CoreError> {
        let pool = self.connection_source().await?;
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM user_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        let (data,) = row.ok_or_else(|| CoreError::user_not_found(id))?;
        let doc: UserDocument = serde_json::from_str(&data)?;
        Ok(UserProfile::from_document(id, doc))
    }

    async fn save_user(&self, profile: &mut UserProfile) -> Result<i64, CoreError> {
        let pool = self.connection_source().await?;
        let data = serde_json::to_string(&profile.to_document())?;
        match profile.id {
            None => {
                let (id,): (i64,) =
                    sqlx::query_as("INSERT INTO user_profiles (data) VALUES ($1) RETURNING id")
                        .bind(&data)
                        .fetch_one(pool)
                        .await?;
                debug!(user_id = id, "user profile inserted");
                profile.id = Some(id);
                Ok(id)
            }
            Some(id) => {
                let result = sqlx::query("UPDATE user_profiles SET data = $1 WHERE id = $2")
                    .bind(&data)
                    .bind(id)
                    .execute(pool)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(CoreError::user_not_found(id));
                }
                debug!(user_id = id, "user profile updated");
                Ok(id)
            }
        }
    }
}
