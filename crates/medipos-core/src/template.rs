//! # Document Templates
//!
//! A closed set of `{{token}}` placeholders for receipt headers/footers and
//! prescription layouts.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "Dr. {{ doctor_name }} · {{clinic_name}}"                              │
//! │        │                                                                │
//! │        ▼  Template::parse                                               │
//! │  [Text("Dr. "), Token(DoctorName), Text(" · "), Token(ClinicName)]      │
//! │        │                                                                │
//! │        ▼  render(&TemplateValues)                                       │
//! │  "Dr. Jane Smith · MediPOS Pharmacy"                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unknown tokens and unterminated `{{` fail at parse time, so a typo is
//! reported instead of printing as blank. Whitespace inside the braces is
//! ignored. A known token with no value renders empty.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

// =============================================================================
// Tokens
// =============================================================================

macro_rules! template_tokens {
    ($( $variant:ident => $name:literal, $description:literal; )+) => {
        /// Every placeholder a document template may use.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum TemplateToken {
            $( $variant, )+
        }

        impl TemplateToken {
            pub const ALL: &'static [TemplateToken] = &[ $( TemplateToken::$variant, )+ ];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( TemplateToken::$variant => $name, )+
                }
            }

            /// One-line description for the placeholder reference.
            pub fn description(&self) -> &'static str {
                match self {
                    $( TemplateToken::$variant => $description, )+
                }
            }
        }

        impl FromStr for TemplateToken {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $name => Ok(TemplateToken::$variant), )+
                    _ => Err(()),
                }
            }
        }
    };
}

template_tokens! {
    ClinicName => "clinic_name", "Name of the clinic or pharmacy";
    ClinicAddress => "clinic_address", "Address of the clinic";
    ClinicPhone => "clinic_phone", "Clinic contact number";
    ClinicEmail => "clinic_email", "Clinic email address";
    ClinicWebsite => "clinic_website", "Clinic website";
    ShopLicense => "shop_license", "Pharmacy license number";
    DoctorName => "doctor_name", "Doctor's full name";
    DoctorSpecialization => "doctor_specialization", "Medical specialization";
    DoctorQualification => "doctor_qualification", "Degrees and qualifications";
    DoctorLicense => "doctor_license", "Medical license number";
    DoctorPhone => "doctor_phone", "Doctor's contact number";
    DoctorEmail => "doctor_email", "Doctor's email address";
    PatientName => "patient_name", "Patient's full name";
    PatientAge => "patient_age", "Patient's age in years";
    PatientGender => "patient_gender", "Patient's gender";
    PatientPhone => "patient_phone", "Patient's contact number";
    PatientAddress => "patient_address", "Patient's address";
    MedicalHistory => "medical_history", "Patient's medical history";
    PrescriptionDate => "prescription_date", "Date of the prescription";
    PrescriptionTime => "prescription_time", "Time of the prescription";
    PrescriptionId => "prescription_id", "Short prescription reference";
    PrescriptionNotes => "prescription_notes", "Main prescription content";
    Symptoms => "symptoms", "Reported symptoms";
    Diagnosis => "diagnosis", "Diagnosis";
    ConsultationFee => "consultation_fee", "Consultation fee";
    NextVisitDate => "next_visit_date", "Next appointment date";
    PrintInstructions => "print_instructions", "General instructions for the patient";
    WatermarkText => "watermark_text", "Watermark text";
    ReceiptId => "receipt_id", "Short receipt reference";
    ReceiptDate => "receipt_date", "Date of the transaction";
    ReceiptTime => "receipt_time", "Time of the transaction";
    CustomerName => "customer_name", "Customer on the receipt";
    PaymentMethod => "payment_method", "Payment or refund method";
    TotalAmount => "total_amount", "Formatted transaction total";
}

impl fmt::Display for TemplateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.as_str())
    }
}

// =============================================================================
// Values
// =============================================================================

/// Resolved values for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateValues {
    values: BTreeMap<TemplateToken, String>,
}

impl TemplateValues {
    pub fn new() -> Self {
        TemplateValues::default()
    }

    pub fn set(&mut self, token: TemplateToken, value: impl Into<String>) -> &mut Self {
        self.values.insert(token, value.into());
        self
    }

    pub fn with(mut self, token: TemplateToken, value: impl Into<String>) -> Self {
        self.set(token, value);
        self
    }

    pub fn get(&self, token: TemplateToken) -> &str {
        self.values.get(&token).map(String::as_str).unwrap_or("")
    }
}

// =============================================================================
// Template
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Token(TemplateToken),
}

/// A parsed template. Parsing is the only step that can fail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let token_offset = offset + start;
            let inner_start = start + OPEN.len();
            let end = rest[inner_start..]
                .find(CLOSE)
                .ok_or(TemplateError::Unterminated {
                    offset: token_offset,
                })?;

            let name = rest[inner_start..inner_start + end].trim();
            let token = name
                .parse::<TemplateToken>()
                .map_err(|_| TemplateError::UnknownToken {
                    token: name.to_string(),
                    offset: token_offset,
                })?;
            segments.push(Segment::Token(token));

            let consumed = inner_start + end + CLOSE.len();
            rest = &rest[consumed..];
            offset += consumed;
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }
        Ok(Template { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn tokens(&self) -> impl Iterator<Item = TemplateToken> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Token(token) => Some(*token),
            Segment::Text(_) => None,
        })
    }

    /// Substitutes values as-is.
    pub fn render(&self, values: &TemplateValues) -> String {
        self.render_with(values, |value| value.to_string())
    }

    /// Substitutes HTML-escaped values; template text is kept as markup.
    pub fn render_html(&self, values: &TemplateValues) -> String {
        self.render_with(values, escape_html)
    }

    fn render_with(&self, values: &TemplateValues, encode: impl Fn(&str) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Token(token) => out.push_str(&encode(values.get(*token))),
            }
        }
        out
    }
}

/// Parses and renders plain text in one step.
pub fn resolve(source: &str, values: &TemplateValues) -> Result<String, TemplateError> {
    Ok(Template::parse(source)?.render(values))
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
