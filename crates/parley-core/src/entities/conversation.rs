use std::future::Future;

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::entities::UserStore;
use crate::entities::dao::conversation::ConversationDocument;
use crate::entities::dao::{Conversation, ConversationSummary, Message};
use crate::error::CoreError;
use crate::pipeline::Generator;

pub trait ConversationStore: Send + Sync + 'static {
    /// Start an empty conversation for an existing user.
    fn create_conversation(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Conversation, CoreError>> + Send;
    fn load_conversation(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Conversation, CoreError>> + Send;
    /// All conversations of `user_id`, oldest first, each reduced to its last message.
    fn list_by_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<ConversationSummary>, CoreError>> + Send;
    /// Insert when `conversation.id` is `None`, otherwise overwrite the whole document.
    fn save_conversation(
        &self,
        conversation: &mut Conversation,
    ) -> impl Future<Output = Result<i64, CoreError>> + Send;
}

impl ConversationStore for Database {
    async fn create_conversation(&self, user_id: i64) -> Result<Conversation, CoreError> {
        // Fails with NotFound before anything is written.
        self.load_user(user_id).await?;

        let mut conversation = Conversation::new(user_id);
        self.save_conversation(&mut conversation).await?;
        Ok(conversation)
    }

    async fn load_conversation(&self, id: i64) -> Result<Conversation, CoreError> {
        let pool = self.connection_source().await?;
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT user_id, data FROM conversations WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        let (user_id, data) = row.ok_or_else(|| CoreError::conversation_not_found(id))?;
        let doc: ConversationDocument = serde_json::from_str(&data)?;
        Ok(Conversation::from_document(id, user_id, doc))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<ConversationSummary>, CoreError> {
        let pool = self.connection_source().await?;
        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT id, user_id, data FROM conversations \
             WHERE user_id = $1 ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|(id, user_id, data)| -> Result<ConversationSummary, CoreError> {
                let doc: ConversationDocument = serde_json::from_str(&data)?;
                Ok(ConversationSummary {
                    id,
                    user_id,
                    last_message: doc.messages.into_iter().last(),
                })
            })
            .collect()
    }

    async fn save_conversation(&self, conversation: &mut Conversation) -> Result<i64, CoreError> {
        let pool = self.connection_source().await?;
        let data = serde_json::to_string(&conversation.to_document())?;
        match conversation.id {
            None => {
                let (id,): (i64,) = sqlx::query_as(
                    "INSERT INTO conversations (user_id, data) VALUES ($1, $2) RETURNING id",
                )
                .bind(conversation.user_id)
                .bind(&data)
                .fetch_one(pool)
                .await?;
                debug!(conversation_id = id, user_id = conversation.user_id, "conversation inserted");
                conversation.id = Some(id);
                Ok(id)
            }
            Some(id) => {
                let result =
                    sqlx::query("UPDATE conversations SET user_id = $1, data = $2 WHERE id = $3")
                        .bind(conversation.user_id)
                        .bind(&data)
                        .bind(id)
                        .execute(pool)
                        .await?;
                if result.rows_affected() == 0 {
                    return Err(CoreError::conversation_not_found(id));
                }
                debug!(
                    conversation_id = id,
                    messages = conversation.messages.len(),
                    "conversation updated"
                );
                Ok(id)
            }
        }
    }
}

impl Conversation {
    /// Run one user turn: append `content`, generate a reply, append it.
    ///
    /// The user message is persisted before the model is called, so a failed
    /// generation leaves it in the log without an assistant answer.
    /// Concurrent turns on the same conversation are not serialised; the last
    /// document write wins.
    pub async fn append_and_generate(
        &mut self,
        db: &Database,
        generator: &dyn Generator,
        content: &str,
    ) -> Result<String, CoreError> {
        if content.trim().is_empty() {
            return Err(CoreError::Validation("content must not be empty".into()));
        }

        self.messages.push(Message::user(content));
        db.save_conversation(self).await?;

        let profile = db.load_user(self.user_id).await?;

        let reply = generator
            .invoke(&self.messages, &profile)
            .await
            .inspect_err(|e| {
                warn!(conversation_id = ?self.id, error = %e, "generation failed; user message kept");
            })?;

        self.messages.push(Message::assistant(reply.clone()));
        db.save_conversation(self).await?;

        info!(
            conversation_id = ?self.id,
            reply_len = reply.len(),
            "assistant reply appended"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::db::test::temp_database;
    use crate::entities::{Role, UserProfile};
    use crate::pipeline::GenerationError;

    /// Replies with a fixed string and records what it was called with.
    struct EchoGenerator {
        reply: Result<String, String>,
        calls: Mutex<Vec<(usize, String)>>,
    }

    impl EchoGenerator {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn invoke(
            &self,
            messages: &[Message],
            profile: &UserProfile,
        ) -> Result<String, GenerationError> {
            self.calls
                .lock()
                .expect("lock")
                .push((messages.len(), profile.name.clone()));
            self.reply.clone().map_err(GenerationError::Service)
        }
    }

    #[tokio::test]
    async fn create_requires_existing_user() {
        let (_dir, db) = temp_database().await;
        let err = db.create_conversation(7).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");

        let pool = db.connection_source().await.expect("pool");
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
            .fetch_one(pool)
            .await
            .expect("count");
        assert_eq!(count, 0, "no row may be written for an unknown user");
    }

    #[tokio::test]
    async fn create_starts_empty_and_loads_back() {
        let (_dir, db) = temp_database().await;
        let user = db.create_user("Jan").await.expect("user");
        let user_id = user.id.expect("id");

        let created = db.create_conversation(user_id).await.expect("create");
        assert!(created.messages.is_empty());

        let loaded = db
            .load_conversation(created.id.expect("id"))
            .await
            .expect("load");
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn missing_conversation_is_not_found() {
        let (_dir, db) = temp_database().await;
        let err = db.load_conversation(1).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn list_by_user_is_ordered_with_last_message_preview() {
        let (_dir, db) = temp_database().await;
        let user_id = db.create_user("Jan").await.expect("user").id.expect("id");
        let other_id = db.create_user("Ada").await.expect("user").id.expect("id");

        let c1 = db.create_conversation(user_id).await.expect("c1");
        let mut c2 = db.create_conversation(user_id).await.expect("c2");
        let c3 = db.create_conversation(user_id).await.expect("c3");
        db.create_conversation(other_id).await.expect("other");

        let generator = EchoGenerator::ok("pong");
        c2.append_and_generate(&db, &generator, "Hello")
            .await
            .expect("turn");

        let items = db.list_by_user(user_id).await.expect("list");
        let ids: Vec<_> = items.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![c1.id.unwrap(), c2.id.unwrap(), c3.id.unwrap()]);
        assert!(items[0].last_message.is_none());
        let preview = items[1].last_message.as_ref().expect("preview");
        assert_eq!(preview.role, Role::Assistant);
        assert_eq!(preview.content, "pong");
        assert!(items[2].last_message.is_none());
        assert!(items.iter().all(|s| s.user_id == user_id));
    }

    #[tokio::test]
    async fn list_for_unknown_user_is_empty() {
        let (_dir, db) = temp_database().await;
        assert!(db.list_by_user(5).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn turns_alternate_user_and_assistant() {
        let (_dir, db) = temp_database().await;
        let user_id = db.create_user("Jan").await.expect("user").id.expect("id");
        let mut conversation = db.create_conversation(user_id).await.expect("create");
        let generator = EchoGenerator::ok("pong");

        for n in 0..3 {
            let reply = conversation
                .append_and_generate(&db, &generator, &format!("message {n}"))
                .await
                .expect("turn");
            assert_eq!(reply, "pong");
        }

        let stored = db
            .load_conversation(conversation.id.expect("id"))
            .await
            .expect("load");
        assert_eq!(stored.messages.len(), 6);
        for (i, message) in stored.messages.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected, "message {i}");
        }

        // The generator sees the full history including the new user message.
        let calls = generator.calls.lock().expect("lock");
        assert_eq!(*calls, vec![(1, "Jan".into()), (3, "Jan".into()), (5, "Jan".into())]);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn failed_generation_keeps_user_message_only() {
        let (_dir, db) = temp_database().await;
        let user_id = db.create_user("Jan").await.expect("user").id.expect("id");
        let mut conversation = db.create_conversation(user_id).await.expect("create");
        let generator = EchoGenerator::failing("model down");

        let err = conversation
            .append_and_generate(&db, &generator, "Hello")
            .await
            .unwrap_err();
        assert!(
            matches!(err, CoreError::Generation(GenerationError::Service(_))),
            "got {err:?}"
        );

        let stored = db
            .load_conversation(conversation.id.expect("id"))
            .await
            .expect("load");
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.messages[0].role, Role::User);
        assert_eq!(stored.messages[0].content, "Hello");
        assert!(logs_contain("generation failed; user message kept"));
    }

    #[tokio::test]
    async fn empty_content_is_rejected_without_writing() {
        let (_dir, db) = temp_database().await;
        let user_id = db.create_user("Jan").await.expect("user").id.expect("id");
        let mut conversation = db.create_conversation(user_id).await.expect("create");
        let generator = EchoGenerator::ok("pong");

        let err = conversation
            .append_and_generate(&db, &generator, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)), "got {err:?}");
        assert!(conversation.messages.is_empty());
        assert!(generator.calls.lock().expect("lock").is_empty());
    }
}
