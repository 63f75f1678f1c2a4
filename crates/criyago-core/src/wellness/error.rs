use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum WellnessError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl WellnessError {
    pub fn is_validation(&self) -> bool {
        matches!(self, WellnessError::Validation(_))
    }
}
