use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::{JournalEntry, NewJournalEntry};
use crate::{
    error::AppError,
    prediction::FlarePrediction,
    validation::{parse_date, Validator},
};

const PAIN_LOCATIONS: [&str; 4] = ["None", "full_abdomen", "lower_abdomen", "upper_abdomen"];
const PAIN_TIMES: [&str; 6] = ["None", "morning", "afternoon", "evening", "night", "variable"];
const MEDICATION_TYPES: [&str; 4] = ["None", "biologic", "immunosuppressant", "steroid"];
const MENSTRUATION: [&str; 3] = ["yes", "no", "not_applicable"];

/// Named dosages per medication type; position + 1 is the stored level.
fn dosage_names(medication_type: &str) -> Option<[&'static str; 3]> {
    match medication_type {
        "immunosuppressant" => Some(["daily", "twice_daily", "weekly"]),
        "biologic" => Some(["every_2_weeks", "every_4_weeks", "every_8_weeks"]),
        "steroid" => Some(["5", "10", "20"]),
        _ => None,
    }
}

/// Boolean answers arrive either as JSON booleans or as `"yes"`/`"no"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Dosage {
    Level(i64),
    Named(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JournalEntryRequest {
    pub entry_date: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fiber: Option<f64>,
    pub has_allergens: Option<Flag>,
    pub meals_per_day: Option<i32>,
    pub hydration_level: Option<i32>,
    pub bowel_frequency: Option<i32>,
    pub bristol_scale: Option<i32>,
    pub urgency_level: Option<i32>,
    pub blood_present: Option<Flag>,
    pub pain_location: Option<String>,
    pub pain_severity: Option<i32>,
    pub pain_time: Option<String>,
    pub medication_taken: Option<Flag>,
    pub medication_type: Option<String>,
    pub dosage_level: Option<Dosage>,
    pub sleep_hours: Option<f64>,
    pub stress_level: Option<i32>,
    pub menstruation: Option<String>,
    pub fatigue_level: Option<i32>,
    pub notes: Option<String>,
}

fn check_min<T>(v: &mut Validator, field: &str, value: Option<T>, min: T)
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if let Some(x) = value {
        if x < min {
            v.push(field, format!("{field} must be at least {min}"));
        }
    }
}

fn check_range(v: &mut Validator, field: &str, value: Option<i32>, min: i32, max: i32) {
    match value {
        Some(x) if x < min => v.push(field, format!("{field} must be at least {min}")),
        Some(x) if x > max => v.push(field, format!("{field} must be at most {max}")),
        _ => {}
    }
}

fn check_choice(v: &mut Validator, field: &str, value: Option<&str>, allowed: &[&str]) {
    if let Some(x) = value {
        if !allowed.contains(&x) {
            v.push(field, format!("{field} must be one of: {}", allowed.join(", ")));
        }
    }
}

fn flag(v: &mut Validator, field: &str, value: Option<Flag>) -> Option<bool> {
    match value? {
        Flag::Bool(b) => Some(b),
        Flag::Text(t) if t == "yes" => Some(true),
        Flag::Text(t) if t == "no" => Some(false),
        Flag::Text(_) => {
            v.push(field, format!("{field} must be 'yes', 'no', or a boolean"));
            None
        }
    }
}

/// Resolves the dosage to a level in 1..=3 for the given medication type.
fn resolve_dosage(medication_type: &str, dosage: &Dosage) -> Option<i32> {
    let names = dosage_names(medication_type)?;
    match dosage {
        Dosage::Level(n) if (1..=3).contains(n) => Some(*n as i32),
        Dosage::Level(_) => None,
        Dosage::Named(s) => names
            .iter()
            .position(|n| *n == s.as_str())
            .map(|i| i as i32 + 1),
    }
}

impl JournalEntryRequest {
    /// Validates every field, reporting all failures together, and
    /// normalises flags and dosage. A missing `entry_date` means `today`.
    pub fn into_new_entry(self, today: Date) -> Result<NewJournalEntry, AppError> {
        let mut v = Validator::new();

        let entry_date = match self.entry_date.as_deref() {
            None => today,
            Some(raw) => parse_date(raw).unwrap_or_else(|| {
                v.push("entry_date", "entry_date must be a date (YYYY-MM-DD)");
                today
            }),
        };

        check_min(&mut v, "calories", self.calories, 0.0);
        check_min(&mut v, "protein", self.protein, 0.0);
        check_min(&mut v, "carbs", self.carbs, 0.0);
        check_min(&mut v, "fiber", self.fiber, 0.0);
        check_min(&mut v, "meals_per_day", self.meals_per_day, 0);
        check_range(&mut v, "hydration_level", self.hydration_level, 0, 10);
        check_min(&mut v, "bowel_frequency", self.bowel_frequency, 0);
        check_range(&mut v, "bristol_scale", self.bristol_scale, 1, 7);
        check_range(&mut v, "urgency_level", self.urgency_level, 0, 10);
        check_range(&mut v, "pain_severity", self.pain_severity, 0, 10);
        check_min(&mut v, "sleep_hours", self.sleep_hours, 0.0);
        check_range(&mut v, "stress_level", self.stress_level, 0, 10);
        check_range(&mut v, "fatigue_level", self.fatigue_level, 0, 10);

        check_choice(&mut v, "pain_location", self.pain_location.as_deref(), &PAIN_LOCATIONS);
        check_choice(&mut v, "pain_time", self.pain_time.as_deref(), &PAIN_TIMES);
        check_choice(&mut v, "medication_type", self.medication_type.as_deref(), &MEDICATION_TYPES);
        check_choice(&mut v, "menstruation", self.menstruation.as_deref(), &MENSTRUATION);

        let has_allergens = flag(&mut v, "has_allergens", self.has_allergens);
        let blood_present = flag(&mut v, "blood_present", self.blood_present);
        let medication_taken = flag(&mut v, "medication_taken", self.medication_taken);

        let type_missing = medication_taken == Some(true) && self.medication_type.is_none();
        if type_missing {
            v.push("medication_type", "Invalid medication type");
        }
        let medication_type = self.medication_type.as_deref().unwrap_or("None");
        let on_medication = medication_taken == Some(true) && medication_type != "None";
        let dosage_level = match (&self.dosage_level, on_medication) {
            _ if type_missing => None,
            (Some(d), true) => resolve_dosage(medication_type, d).or_else(|| {
                if let Some(names) = dosage_names(medication_type) {
                    v.push(
                        "dosage_level",
                        format!(
                            "Invalid dosage level for medication type {medication_type}. Must be one of: {} or numeric values 1, 2, 3",
                            names.join(", ")
                        ),
                    );
                }
                None
            }),
            (None, true) => {
                v.push("dosage_level", "dosage_level is required when medication is taken");
                None
            }
            (Some(_), false) => {
                v.push(
                    "dosage_level",
                    "Dosage level should be null when no medication is taken",
                );
                None
            }
            (None, false) => None,
        };

        v.finish()?;

        Ok(NewJournalEntry {
            entry_date,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fiber: self.fiber,
            has_allergens,
            meals_per_day: self.meals_per_day,
            hydration_level: self.hydration_level,
            bowel_frequency: self.bowel_frequency,
            bristol_scale: self.bristol_scale,
            urgency_level: self.urgency_level,
            blood_present,
            pain_location: self.pain_location,
            pain_severity: self.pain_severity,
            pain_time: self.pain_time,
            medication_taken,
            medication_type: self.medication_type,
            dosage_level,
            sleep_hours: self.sleep_hours,
            stress_level: self.stress_level,
            menstruation: self.menstruation,
            fatigue_level: self.fatigue_level,
            notes: self.notes.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct CreatedEntryResponse {
    pub message: &'static str,
    pub entry_id: Uuid,
    pub prediction: FlarePrediction,
}

#[derive(Debug, Serialize)]
pub struct StoredPredictionBody {
    pub prediction: bool,
    pub probability: f64,
    pub model_version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JournalEntryBody {
    pub entry_id: Uuid,
    pub entry_date: String,
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
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    pub prediction: Option<StoredPredictionBody>,
}

impl From<JournalEntry> for JournalEntryBody {
    fn from(e: JournalEntry) -> Self {
        let prediction = match (e.prediction, e.probability) {
            (Some(prediction), Some(probability)) => Some(StoredPredictionBody {
                prediction,
                probability,
                model_version: e.model_version,
            }),
            _ => None,
        };
        Self {
            entry_id: e.entry_id,
            entry_date: e.entry_date.to_string(),
            calories: e.calories,
            protein: e.protein,
            carbs: e.carbs,
            fiber: e.fiber,
            has_allergens: e.has_allergens,
            meals_per_day: e.meals_per_day,
            hydration_level: e.hydration_level,
            bowel_frequency: e.bowel_frequency,
            bristol_scale: e.bristol_scale,
            urgency_level: e.urgency_level,
            blood_present: e.blood_present,
            pain_location: e.pain_location,
            pain_severity: e.pain_severity,
            pain_time: e.pain_time,
            medication_taken: e.medication_taken,
            medication_type: e.medication_type,
            dosage_level: e.dosage_level,
            sleep_hours: e.sleep_hours,
            stress_level: e.stress_level,
            menstruation: e.menstruation,
            fatigue_level: e.fatigue_level,
            notes: e.notes,
            created_at: e.created_at,
            prediction,
        }
    }
}
