#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use actix_web::web;
use digit_serve::handlers::AppState;
use digit_serve::{Classifier, Result};
use ndarray::Array4;

/// Logits 0..9, so class 9 always wins.
pub const RAMP: [f32; 10] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];

/// Returns the same logits for every input and remembers the last input.
pub struct StubClassifier {
    logits: Vec<f32>,
    last_input: Mutex<Option<Array4<f32>>>,
}

impl StubClassifier {
    pub fn new(logits: &[f32]) -> Self {
        Self {
            logits: logits.to_vec(),
            last_input: Mutex::new(None),
        }
    }

    pub fn last_input(&self) -> Option<Array4<f32>> {
        self.last_input.lock().unwrap().clone()
    }
}

impl Classifier for StubClassifier {
    fn logits(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        *self.last_input.lock().unwrap() = Some(input.clone());
        Ok(self.logits.clone())
    }
}

pub fn state_with(classifier: Arc<StubClassifier>) -> web::Data<AppState> {
    web::Data::new(AppState::new(classifier))
}
