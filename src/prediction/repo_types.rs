use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A prediction stored alongside a journal entry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PredictionRecord {
    pub prediction_id: Uuid,
    pub entry_id: Uuid,
    pub prediction: bool,
    pub probability: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub prediction_date: OffsetDateTime,
    pub model_version: String,
}

/// Aggregate over a user's stored predictions in a time window.
/// `average_risk` and `highest_risk` are null when the window is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct FlareStatistics {
    pub total_predictions: i64,
    pub high_risk_count: i64,
    pub average_risk: Option<f64>,
    pub highest_risk: Option<f64>,
}

impl FlareStatistics {
    /// Folds probabilities the way the SQL aggregate does.
    pub fn from_probabilities(probabilities: impl IntoIterator<Item = f64>, high_risk: f64) -> Self {
        let mut stats = Self::default();
        let mut sum = 0.0;
        for p in probabilities {
            stats.total_predictions += 1;
            if p >= high_risk {
                stats.high_risk_count += 1;
            }
            sum += p;
            stats.highest_risk = Some(stats.highest_risk.map_or(p, |m: f64| m.max(p)));
        }
        if stats.total_predictions > 0 {
            stats.average_risk = Some(sum / stats.total_predictions as f64);
        }
        stats
    }
}
