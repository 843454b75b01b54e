//! Prescription input files.
//!
//! `rx <file>` reads a JSON document shaped like the backend's prescription
//! payload:
//!
//! ```json
//! {
//!   "doctor": { "name": "Jane Smith", "specialization": "Cardiology" },
//!   "patient": { "id": "p1", "name": "Ayesha Khan", "date_of_birth": "1990-04-02T00:00:00Z" },
//!   "prescription": { "id": "rx-1", "prescription_notes": "Amoxicillin 500mg, 1x3" },
//!   "symptoms": "Fever",
//!   "diagnosis": "Tonsillitis"
//! }
//! ```

use std::path::Path;

use medipos_core::prescription::PrescriptionContext;

use crate::error::AppError;

pub fn parse_prescription(json: &str) -> Result<PrescriptionContext, AppError> {
    serde_json::from_str(json)
        .map_err(|e| AppError::validation(format!("Invalid prescription file: {e}")))
}

pub fn load_prescription(path: &Path) -> Result<PrescriptionContext, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::validation(format!("Cannot read {}: {e}", path.display()))
    })?;
    parse_prescription(&text)
}
