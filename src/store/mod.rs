//! Data access behind traits, so handlers run against Postgres in
//! production and against [`memory::MemoryStore`] in tests.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::repo_types::{LoginEvent, NewLoginEvent, NewSession, NewUser, Session, User},
    journal::repo_types::{JournalEntry, NewJournalEntry, StoredPrediction},
    prediction::repo_types::{FlareStatistics, PredictionRecord},
    users::repo_types::UserProfile,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Returns `None` when the email is already taken.
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>>;
    async fn record_failed_login(
        &self,
        id: Uuid,
        login_attempts: i32,
        locked_until: Option<OffsetDateTime>,
    ) -> anyhow::Result<()>;
    /// Resets the failure counter, clears the lock and stamps `last_login`.
    async fn record_successful_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()>;
    async fn update_user_names(
        &self,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> anyhow::Result<()>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>>;
    async fn upsert_profile(&self, profile: &UserProfile) -> anyhow::Result<()>;
}

#[async_trait]
pub trait LoginHistoryRepo: Send + Sync {
    async fn insert_login_event(&self, event: NewLoginEvent) -> anyhow::Result<()>;
    /// Stamps `logout_timestamp` on the user's newest history row that has
    /// none yet. Returns whether a row was closed.
    async fn close_latest_login(&self, user_id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool>;
    async fn list_login_history(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<LoginEvent>>;
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn insert_session(&self, session: NewSession) -> anyhow::Result<()>;
    async fn deactivate_session(&self, user_id: Uuid, token_hash: &str) -> anyhow::Result<()>;
    async fn list_active_sessions(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<Session>>;
}

#[async_trait]
pub trait JournalRepo: Send + Sync {
    /// Inserts the entry and its prediction atomically.
    async fn create_journal_entry(
        &self,
        user_id: Uuid,
        entry: &NewJournalEntry,
        prediction: StoredPrediction,
    ) -> anyhow::Result<JournalEntry>;
    async fn list_journal_entries(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<JournalEntry>>;
}

#[async_trait]
pub trait PredictionRepo: Send + Sync {
    async fn recent_predictions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<PredictionRecord>>;
    /// Aggregates predictions dated in `from..=until`; `from: None` is
    /// unbounded. Probabilities at or above `high_risk` count as high risk.
    async fn flare_statistics(
        &self,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        until: OffsetDateTime,
        high_risk: f64,
    ) -> anyhow::Result<FlareStatistics>;
}

/// Everything the HTTP layer needs from persistence.
pub trait Store:
    UserRepo + ProfileRepo + LoginHistoryRepo + SessionRepo + JournalRepo + PredictionRepo
{
}

impl<T> Store for T where
    T: UserRepo + ProfileRepo + LoginHistoryRepo + SessionRepo + JournalRepo + PredictionRepo
{
}
