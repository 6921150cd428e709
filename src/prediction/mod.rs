//! Placeholder flare predictor.
//!
//! There is no trained model: the probability is drawn uniformly at random
//! and the input features are ignored.

use axum::Router;
use rand::Rng;
use serde::Serialize;

use crate::state::AppState;

mod handlers;
pub mod repo_types;

pub const MODEL_VERSION: &str = "1.0.0";
const THRESHOLD: f64 = 0.5;
/// Probability from which a stored prediction counts as high risk.
pub const HIGH_RISK: f64 = 0.7;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlarePrediction {
    pub prediction: u8,
    pub probability: f64,
    pub confidence: String,
    pub interpretation: &'static str,
}

impl FlarePrediction {
    pub fn from_probability(probability: f64) -> Self {
        let flare = probability > THRESHOLD;
        Self {
            prediction: u8::from(flare),
            probability,
            confidence: format!("{}%", (probability * 100.0).round() as i64),
            interpretation: if flare {
                "High risk of flare-up based on current symptoms"
            } else {
                "Low risk of flare-up based on current symptoms"
            },
        }
    }

    pub fn is_flare(&self) -> bool {
        self.prediction == 1
    }
}

pub fn predict_with<R: Rng + ?Sized>(rng: &mut R) -> FlarePrediction {
    FlarePrediction::from_probability(rng.gen::<f64>())
}

pub fn predict() -> FlarePrediction {
    predict_with(&mut rand::thread_rng())
}

pub fn router() -> Router<AppState> {
    handlers::prediction_routes()
}
