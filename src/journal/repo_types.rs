use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Journal entry joined with the prediction stored alongside it.
#[derive(Debug, Clone, FromRow)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    pub entry_date: Date,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fiber: Option<f64>,
    pub has_allergens: Option<bool>,
    pub meals_per_day: Option<i32>,
    pub hydration_level: Option<i32>,
    pub bowel_frequency: Option<i32>,
    pub bristol_scale: Option<i32>,
    pub urgency_level: Option<i32>,
    pub blood_present: Option<bool>,
    pub pain_location: Option<String>,
    pub pain_severity: Option<i32>,
    pub pain_time: Option<String>,
    pub medication_taken: Option<bool>,
    pub medication_type: Option<String>,
    pub dosage_level: Option<i32>,
    pub sleep_hours: Option<f64>,
    pub stress_level: Option<i32>,
    pub menstruation: Option<String>,
    pub fatigue_level: Option<i32>,
    pub notes: String,
    pub created_at: OffsetDateTime,
    pub prediction: Option<bool>,
    pub probability: Option<f64>,
    pub model_version: Option<String>,
}

/// A validated entry ready to insert; dosage already normalised to 1..=3.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJournalEntry {
    pub entry_date: Date,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fiber: Option<f64>,
    pub has_allergens: Option<bool>,
    pub meals_per_day: Option<i32>,
    pub hydration_level: Option<i32>,
    pub bowel_frequency: Option<i32>,
    pub bristol_scale: Option<i32>,
    pub urgency_level: Option<i32>,
    pub blood_present: Option<bool>,
    pub pain_location: Option<String>,
    pub pain_severity: Option<i32>,
    pub pain_time: Option<String>,
    pub medication_taken: Option<bool>,
    pub medication_type: Option<String>,
    pub dosage_level: Option<i32>,
    pub sleep_hours: Option<f64>,
    pub stress_level: Option<i32>,
    pub menstruation: Option<String>,
    pub fatigue_level: Option<i32>,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredPrediction {
    pub prediction: bool,
    pub probability: f64,
    pub model_version: &'static str,
}

impl NewJournalEntry {
    pub fn into_entry(
        self,
        entry_id: Uuid,
        created_at: OffsetDateTime,
        prediction: StoredPrediction,
    ) -> JournalEntry {
        JournalEntry {
            entry_id,
            entry_date: self.entry_date,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fiber: self.fiber,
            has_allergens: self.has_allergens,
            meals_per_day: self.meals_per_day,
            hydration_level: self.hydration_level,
            bowel_frequency: self.bowel_frequency,
            bristol_scale: self.bristol_scale,
            urgency_level: self.urgency_level,
            blood_present: self.blood_present,
            pain_location: self.pain_location,
            pain_severity: self.pain_severity,
            pain_time: self.pain_time,
            medication_taken: self.medication_taken,
            medication_type: self.medication_type,
            dosage_level: self.dosage_level,
            sleep_hours: self.sleep_hours,
            stress_level: self.stress_level,
            menstruation: self.menstruation,
            fatigue_level: self.fatigue_level,
            notes: self.notes,
            created_at,
            prediction: Some(prediction.prediction),
            probability: Some(prediction.probability),
            model_version: Some(prediction.model_version.to_string()),
        }
    }
}
