use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{JournalRepo, LoginHistoryRepo, PredictionRepo, ProfileRepo, SessionRepo, UserRepo};
use crate::{
    auth::repo_types::{LoginEvent, NewLoginEvent, NewSession, NewUser, Session, User},
    journal::repo_types::{JournalEntry, NewJournalEntry, StoredPrediction},
    prediction::repo_types::{FlareStatistics, PredictionRecord},
    users::repo_types::UserProfile,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, created_at, updated_at,
                   last_login, login_attempts, locked_until, is_active, email_verified
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, created_at, updated_at,
                   last_login, login_attempts, locked_until, is_active, email_verified
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, first_name, last_name, created_at, updated_at,
                      last_login, login_attempts, locked_until, is_active, email_verified
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_optional(&self.pool)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn record_failed_login(
        &self,
        id: Uuid,
        login_attempts: i32,
        locked_until: Option<OffsetDateTime>,
    ) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET login_attempts = $1, locked_until = $2 WHERE id = $3"#)
            .bind(login_attempts)
            .bind(locked_until)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("record failed login")?;
        Ok(())
    }

    async fn record_successful_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET login_attempts = 0, locked_until = NULL, last_login = $1
             WHERE id = $2
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("record successful login")?;
        Ok(())
    }

    async fn update_user_names(
        &self,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET first_name = COALESCE($1, first_name),
                   last_name = COALESCE($2, last_name),
                   updated_at = now()
             WHERE id = $3
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("update user names")?;
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2"#)
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("update password hash")?;
        Ok(())
    }
}

#[async_trait]
impl ProfileRepo for PgStore {
    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT user_id, date_of_birth, gender, diagnosis_date, ibd_type,
                   emergency_contact_name, emergency_contact_phone,
                   emergency_contact_relationship, created_at, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("find profile")?;
        Ok(profile)
    }

    async fn upsert_profile(&self, p: &UserProfile) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (
                user_id, date_of_birth, gender, diagnosis_date, ibd_type,
                emergency_contact_name, emergency_contact_phone,
                emergency_contact_relationship, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE SET
                date_of_birth = EXCLUDED.date_of_birth,
                gender = EXCLUDED.gender,
                diagnosis_date = EXCLUDED.diagnosis_date,
                ibd_type = EXCLUDED.ibd_type,
                emergency_contact_name = EXCLUDED.emergency_contact_name,
                emergency_contact_phone = EXCLUDED.emergency_contact_phone,
                emergency_contact_relationship = EXCLUDED.emergency_contact_relationship,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(p.user_id)
        .bind(p.date_of_birth)
        .bind(&p.gender)
        .bind(p.diagnosis_date)
        .bind(&p.ibd_type)
        .bind(&p.emergency_contact_name)
        .bind(&p.emergency_contact_phone)
        .bind(&p.emergency_contact_relationship)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&self.pool)
        .await
        .context("upsert profile")?;
        Ok(())
    }
}

#[async_trait]
impl LoginHistoryRepo for PgStore {
    async fn insert_login_event(&self, e: NewLoginEvent) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO login_history (user_id, success, failure_reason, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(e.user_id) // NULL for unknown emails
        .bind(e.success)
        .bind(e.failure_reason)
        .bind(e.ip_address)
        .bind(e.user_agent)
        .execute(&self.pool)
        .await
        .context("insert login event")?;
        Ok(())
    }

    async fn close_latest_login(&self, user_id: Uuid, at: OffsetDateTime) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE login_history
               SET logout_timestamp = $1
             WHERE id = (
                   SELECT id
                     FROM login_history
                    WHERE user_id = $2 AND logout_timestamp IS NULL
                    ORDER BY login_timestamp DESC, id DESC
                    LIMIT 1
             )
            "#,
        )
        .bind(at)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("close latest login")?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_login_history(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<LoginEvent>> {
        let rows = sqlx::query_as::<_, LoginEvent>(
            r#"
            SELECT id, user_id, login_timestamp, logout_timestamp, ip_address, user_agent,
                   success, failure_reason
            FROM login_history
            WHERE user_id = $1
            ORDER BY login_timestamp DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("list login history")?;
        Ok(rows)
    }
}

#[async_trait]
impl SessionRepo for PgStore {
    async fn insert_session(&self, s: NewSession) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (user_id, token_hash, device_info, ip_address, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(s.user_id)
        .bind(s.token_hash)
        .bind(s.device_info)
        .bind(s.ip_address)
        .bind(s.expires_at)
        .execute(&self.pool)
        .await
        .context("insert session")?;
        Ok(())
    }

    async fn deactivate_session(&self, user_id: Uuid, token_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE user_sessions SET is_active = FALSE WHERE user_id = $1 AND token_hash = $2"#,
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .context("deactivate session")?;
        Ok(())
    }

    async fn list_active_sessions(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<Session>> {
        let rows = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, device_info, ip_address, created_at, expires_at, is_active
            FROM user_sessions
            WHERE user_id = $1 AND is_active AND expires_at > $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .context("list active sessions")?;
        Ok(rows)
    }
}

#[async_trait]
impl JournalRepo for PgStore {
    async fn create_journal_entry(
        &self,
        user_id: Uuid,
        e: &NewJournalEntry,
        prediction: StoredPrediction,
    ) -> anyhow::Result<JournalEntry> {
        let entry_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await.context("begin tx")?;

        let (created_at,): (OffsetDateTime,) = sqlx::query_as(
            r#"
            INSERT INTO journal_entries (
                entry_id, user_id, entry_date, calories, protein, carbs, fiber,
                has_allergens, meals_per_day, hydration_level, bowel_frequency,
                bristol_scale, urgency_level, blood_present, pain_location,
                pain_severity, pain_time, medication_taken, medication_type,
                dosage_level, sleep_hours, stress_level, menstruation,
                fatigue_level, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            RETURNING created_at
            "#,
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(e.entry_date)
        .bind(e.calories)
        .bind(e.protein)
        .bind(e.carbs)
        .bind(e.fiber)
        .bind(e.has_allergens)
        .bind(e.meals_per_day)
        .bind(e.hydration_level)
        .bind(e.bowel_frequency)
        .bind(e.bristol_scale)
        .bind(e.urgency_level)
        .bind(e.blood_present)
        .bind(&e.pain_location)
        .bind(e.pain_severity)
        .bind(&e.pain_time)
        .bind(e.medication_taken)
        .bind(&e.medication_type)
        .bind(e.dosage_level)
        .bind(e.sleep_hours)
        .bind(e.stress_level)
        .bind(&e.menstruation)
        .bind(e.fatigue_level)
        .bind(&e.notes)
        .fetch_one(&mut *tx)
        .await
        .context("insert journal entry")?;

        sqlx::query(
            r#"
            INSERT INTO flare_predictions (prediction_id, user_id, entry_id, prediction, probability, model_version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(entry_id)
        .bind(prediction.prediction)
        .bind(prediction.probability)
        .bind(prediction.model_version)
        .execute(&mut *tx)
        .await
        .context("insert flare prediction")?;

        tx.commit().await.context("commit tx")?;

        Ok(e.clone().into_entry(entry_id, created_at, prediction))
    }

    async fn list_journal_entries(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<JournalEntry>> {
        let rows = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT j.entry_id, j.entry_date, j.calories, j.protein, j.carbs, j.fiber,
                   j.has_allergens, j.meals_per_day, j.hydration_level, j.bowel_frequency,
                   j.bristol_scale, j.urgency_level, j.blood_present, j.pain_location,
                   j.pain_severity, j.pain_time, j.medication_taken, j.medication_type,
                   j.dosage_level, j.sleep_hours, j.stress_level, j.menstruation,
                   j.fatigue_level, j.notes, j.created_at,
                   fp.prediction, fp.probability, fp.model_version
            FROM journal_entries j
            LEFT JOIN flare_predictions fp ON fp.entry_id = j.entry_id
            WHERE j.user_id = $1
            ORDER BY j.entry_date DESC, j.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("list journal entries")?;
        Ok(rows)
    }
}

#[async_trait]
impl PredictionRepo for PgStore {
    async fn recent_predictions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<PredictionRecord>> {
        let rows = sqlx::query_as::<_, PredictionRecord>(
            r#"
            SELECT prediction_id, entry_id, prediction, probability, prediction_date, model_version
            FROM flare_predictions
            WHERE user_id = $1
            ORDER BY prediction_date DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("list recent predictions")?;
        Ok(rows)
    }

    async fn flare_statistics(
        &self,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        until: OffsetDateTime,
        high_risk: f64,
    ) -> anyhow::Result<FlareStatistics> {
        let stats = sqlx::query_as::<_, FlareStatistics>(
            r#"
            SELECT COUNT(*) AS total_predictions,
                   COALESCE(SUM(CASE WHEN probability >= $4 THEN 1 ELSE 0 END), 0)::BIGINT
                       AS high_risk_count,
                   AVG(probability) AS average_risk,
                   MAX(probability) AS highest_risk
            FROM flare_predictions
            WHERE user_id = $1
              AND ($2::TIMESTAMPTZ IS NULL OR prediction_date >= $2)
              AND prediction_date <= $3
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(until)
        .bind(high_risk)
        .fetch_one(&self.pool)
        .await
        .context("flare statistics")?;
        Ok(stats)
    }
}
