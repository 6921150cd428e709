use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{JournalRepo, LoginHistoryRepo, PredictionRepo, ProfileRepo, SessionRepo, UserRepo};
use crate::{
    auth::repo_types::{LoginEvent, NewLoginEvent, NewSession, NewUser, Session, User},
    journal::repo_types::{JournalEntry, NewJournalEntry, StoredPrediction},
    prediction::repo_types::{FlareStatistics, PredictionRecord},
    users::repo_types::UserProfile,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    profiles: Vec<UserProfile>,
    login_history: Vec<LoginEvent>,
    /// Keyed by token hash.
    sessions: Vec<(String, Session)>,
    /// Keyed by owning user.
    journal: Vec<(Uuid, JournalEntry)>,
    predictions: Vec<(Uuid, PredictionRecord)>,
}

/// In-memory stand-in for [`super::postgres::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self, email: &str) -> Option<User> {
        let t = self.tables.lock().unwrap();
        t.users.iter().find(|u| u.email == email).cloned()
    }

    pub fn set_user<F: FnOnce(&mut User)>(&self, email: &str, f: F) {
        let mut t = self.tables.lock().unwrap();
        if let Some(u) = t.users.iter_mut().find(|u| u.email == email) {
            f(u);
        }
    }

    pub fn login_history(&self) -> Vec<LoginEvent> {
        self.tables.lock().unwrap().login_history.clone()
    }

    pub fn sessions(&self) -> Vec<Session> {
        let t = self.tables.lock().unwrap();
        t.sessions.iter().map(|(_, s)| s.clone()).collect()
    }

    /// `is_active` of every session issued for `token_hash`.
    pub fn session_states(&self, token_hash: &str) -> Vec<bool> {
        let t = self.tables.lock().unwrap();
        t.sessions
            .iter()
            .filter(|(hash, _)| hash == token_hash)
            .map(|(_, s)| s.is_active)
            .collect()
    }

    /// Seeds a prediction that is not tied to a journal entry written here.
    pub fn insert_prediction(&self, user_id: Uuid, probability: f64, at: OffsetDateTime) {
        let record = PredictionRecord {
            prediction_id: Uuid::new_v4(),
            entry_id: Uuid::new_v4(),
            prediction: probability > 0.5,
            probability,
            prediction_date: at,
            model_version: "1.0.0".to_string(),
        };
        self.tables.lock().unwrap().predictions.push((user_id, record));
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.user(email))
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == new.email) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            created_at: now,
            updated_at: now,
            last_login: None,
            login_attempts: 0,
            locked_until: None,
            is_active: true,
            email_verified: false,
        };
        t.users.push(user.clone());
        Ok(Some(user))
    }

    async fn record_failed_login(
        &self,
        id: Uuid,
        login_attempts: i32,
        locked_until: Option<OffsetDateTime>,
    ) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
            u.login_attempts = login_attempts;
            u.locked_until = locked_until;
        }
        Ok(())
    }

    async fn record_successful_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
            u.login_attempts = 0;
            u.locked_until = None;
            u.last_login = Some(at);
        }
        Ok(())
    }

    async fn update_user_names(
        &self,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
            if let Some(v) = first_name {
                u.first_name = v.to_string();
            }
            if let Some(v) = last_name {
                u.last_name = v.to_string();
            }
            u.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
            u.password_hash = password_hash.to_string();
            u.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let t = self.tables.lock().unwrap();
        Ok(t.profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        match t.profiles.iter_mut().find(|p| p.user_id == profile.user_id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = profile.clone();
                existing.created_at = created_at;
            }
            None => t.profiles.push(profile.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl LoginHistoryRepo for MemoryStore {
    async fn insert_login_event(&self, e: NewLoginEvent) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        let id = t.login_history.len() as i64 + 1;
        t.login_history.push(LoginEvent {
            id,
            user_id: e.user_id,
            login_timestamp: OffsetDateTime::now_utc(),
            logout_timestamp: None,
            ip_address: e.ip_address,
            user_agent: e.user_agent,
            success: e.success,
            failure_reason: e.failure_reason.map(str::to_string),
        });
        Ok(())
    }

    async fn close_latest_login(&self, user_id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let latest = t
            .login_history
            .iter_mut()
            .filter(|e| e.user_id == Some(user_id) && e.logout_timestamp.is_none())
            .max_by_key(|e| (e.login_timestamp, e.id));
        Ok(match latest {
            Some(e) => {
                e.logout_timestamp = Some(at);
                true
            }
            None => false,
        })
    }

    async fn list_login_history(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<LoginEvent>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<_> = t
            .login_history
            .iter()
            .filter(|e| e.user_id == Some(user_id))
            .cloned()
            .collect();
        rows.sort_by_key(|e| std::cmp::Reverse((e.login_timestamp, e.id)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

#[async_trait]
impl SessionRepo for MemoryStore {
    async fn insert_session(&self, s: NewSession) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        let id = t.sessions.len() as i64 + 1;
        let session = Session {
            id,
            user_id: s.user_id,
            device_info: s.device_info,
            ip_address: s.ip_address,
            created_at: OffsetDateTime::now_utc(),
            expires_at: s.expires_at,
            is_active: true,
        };
        t.sessions.push((s.token_hash, session));
        Ok(())
    }

    async fn deactivate_session(&self, user_id: Uuid, token_hash: &str) -> anyhow::Result<()> {
        let mut t = self.tables.lock().unwrap();
        for (_, s) in t
            .sessions
            .iter_mut()
            .filter(|(hash, s)| s.user_id == user_id && hash == token_hash)
        {
            s.is_active = false;
        }
        Ok(())
    }

    async fn list_active_sessions(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<Session>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<_> = t
            .sessions
            .iter()
            .map(|(_, s)| s)
            .filter(|s| s.user_id == user_id && s.is_active && s.expires_at > now)
            .cloned()
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse((s.created_at, s.id)));
        Ok(rows)
    }
}

#[async_trait]
impl JournalRepo for MemoryStore {
    async fn create_journal_entry(
        &self,
        user_id: Uuid,
        entry: &NewJournalEntry,
        prediction: StoredPrediction,
    ) -> anyhow::Result<JournalEntry> {
        let now = OffsetDateTime::now_utc();
        let row = entry.clone().into_entry(Uuid::new_v4(), now, prediction);
        let record = PredictionRecord {
            prediction_id: Uuid::new_v4(),
            entry_id: row.entry_id,
            prediction: prediction.prediction,
            probability: prediction.probability,
            prediction_date: now,
            model_version: prediction.model_version.to_string(),
        };
        let mut t = self.tables.lock().unwrap();
        t.journal.push((user_id, row.clone()));
        t.predictions.push((user_id, record));
        Ok(row)
    }

    async fn list_journal_entries(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<JournalEntry>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<_> = t
            .journal
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, e)| e.clone())
            .collect();
        rows.sort_by_key(|e| std::cmp::Reverse((e.entry_date, e.created_at)));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl PredictionRepo for MemoryStore {
    async fn recent_predictions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<PredictionRecord>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<_> = t
            .predictions
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, p)| p.clone())
            .collect();
        rows.sort_by_key(|p| std::cmp::Reverse(p.prediction_date));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn flare_statistics(
        &self,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        until: OffsetDateTime,
        high_risk: f64,
    ) -> anyhow::Result<FlareStatistics> {
        let t = self.tables.lock().unwrap();
        let probabilities = t
            .predictions
            .iter()
            .filter(|(owner, p)| {
                *owner == user_id
                    && from.map_or(true, |f| p.prediction_date >= f)
                    && p.prediction_date <= until
            })
            .map(|(_, p)| p.probability);
        Ok(FlareStatistics::from_probabilities(probabilities, high_risk))
    }
}
