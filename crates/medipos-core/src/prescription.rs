//! # OPD Prescriptions
//!
//! Renders an outpatient prescription page from doctor, patient and
//! prescription data plus the `opd_paper` settings.
//!
//! ## Rendering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PrescriptionContext + ShopSettings                                     │
//! │        │                                                                │
//! │        ▼  prescription_values()                                         │
//! │  TemplateValues (defaults filled in: "Dr. Unknown", age from DOB, ...)  │
//! │        │                                                                │
//! │        ├── custom_html_enabled + html + css ──► custom template         │
//! │        └── otherwise ─────────────────────────► built-in layout         │
//! │        │                                                                │
//! │        ▼  Template::render_html (values escaped)                        │
//! │  page(): margins, font, paper size, watermark, CSS                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::money::Money;
use crate::settings::ShopSettings;
use crate::template::{escape_html, Template, TemplateToken, TemplateValues};
use crate::types::Customer;

const CLINIC_WEBSITE: &str = "www.medipos.com";

// =============================================================================
// Input Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Doctor {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prescription {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, with = "crate::types::opt_utc_timestamp")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prescription_notes: String,
    #[serde(default)]
    pub consultation_fee: Option<Money>,
    #[serde(default, with = "crate::types::opt_utc_timestamp")]
    pub next_visit_date: Option<DateTime<Utc>>,
}

/// Everything one prescription page is rendered from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrescriptionContext {
    #[serde(default)]
    pub doctor: Option<Doctor>,
    #[serde(default)]
    pub patient: Option<Customer>,
    pub prescription: Prescription,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
}

// =============================================================================
// Values
// =============================================================================

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn or_default(value: Option<&str>, default: &str) -> String {
    non_blank(value).unwrap_or(default).to_string()
}

/// Resolves every prescription token, applying the documented defaults.
pub fn prescription_values(
    context: &PrescriptionContext,
    settings: &ShopSettings,
    now: DateTime<FixedOffset>,
) -> TemplateValues {
    let general = &settings.general;
    let paper = &settings.opd_paper;
    let doctor = context.doctor.clone().unwrap_or_default();
    let patient = context.patient.as_ref();
    let rx = &context.prescription;
    let issued = rx
        .date
        .map(|date| date.with_timezone(now.offset()))
        .unwrap_or(now);

    let age = patient
        .and_then(|p| p.date_of_birth)
        .map(|dob| age_on(dob.date_naive(), now.date_naive()).to_string())
        .unwrap_or_default();
    let prescription_id = non_blank(rx.id.as_deref())
        .map(|id| crate::receipt::short_id(id).to_uppercase())
        .unwrap_or_else(|| "N/A".to_string());
    let medical_history = if paper.show_medical_history {
        patient
            .and_then(|p| p.medical_history.clone())
            .unwrap_or_default()
    } else {
        String::new()
    };
    let fee = rx
        .consultation_fee
        .filter(|fee| !fee.is_zero())
        .map(|fee| settings.format_currency(fee))
        .unwrap_or_default();
    let next_visit = rx
        .next_visit_date
        .map(|date| settings.format_date(&date.with_timezone(now.offset())))
        .unwrap_or_default();

    TemplateValues::new()
        .with(
            TemplateToken::ClinicName,
            or_default(Some(general.shop_name.as_str()), "MediPOS Clinic"),
        )
        .with(
            TemplateToken::ClinicAddress,
            or_default(Some(general.shop_address.as_str()), "123 Health Street, Medical District"),
        )
        .with(
            TemplateToken::ClinicPhone,
            or_default(Some(general.shop_phone.as_str()), "+1-234-567-8900"),
        )
        .with(
            TemplateToken::ClinicEmail,
            or_default(Some(general.shop_email.as_str()), "info@medipos.com"),
        )
        .with(TemplateToken::ClinicWebsite, CLINIC_WEBSITE)
        .with(TemplateToken::ShopLicense, general.shop_license.clone())
        .with(
            TemplateToken::DoctorName,
            or_default(doctor.name.as_deref(), "Dr. Unknown"),
        )
        .with(
            TemplateToken::DoctorSpecialization,
            or_default(doctor.specialization.as_deref(), "General Medicine"),
        )
        .with(
            TemplateToken::DoctorQualification,
            or_default(doctor.qualification.as_deref(), "MD, MBBS"),
        )
        .with(
            TemplateToken::DoctorLicense,
            or_default(doctor.license_number.as_deref(), "N/A"),
        )
        .with(TemplateToken::DoctorPhone, doctor.phone.unwrap_or_default())
        .with(TemplateToken::DoctorEmail, doctor.email.unwrap_or_default())
        .with(
            TemplateToken::PatientName,
            or_default(patient.map(|p| p.name.as_str()), "Unknown Patient"),
        )
        .with(TemplateToken::PatientAge, age)
        .with(
            TemplateToken::PatientGender,
            or_default(patient.and_then(|p| p.gender.as_deref()), "Not specified"),
        )
        .with(
            TemplateToken::PatientPhone,
            patient.and_then(|p| p.phone.clone()).unwrap_or_default(),
        )
        .with(
            TemplateToken::PatientAddress,
            patient.and_then(|p| p.address.clone()).unwrap_or_default(),
        )
        .with(TemplateToken::MedicalHistory, medical_history)
        .with(TemplateToken::PrescriptionDate, settings.format_date(&issued))
        .with(TemplateToken::PrescriptionTime, settings.format_time(&issued))
        .with(TemplateToken::PrescriptionId, prescription_id)
        .with(TemplateToken::PrescriptionNotes, rx.prescription_notes.clone())
        .with(
            TemplateToken::Symptoms,
            context.symptoms.clone().unwrap_or_default(),
        )
        .with(
            TemplateToken::Diagnosis,
            context.diagnosis.clone().unwrap_or_default(),
        )
        .with(TemplateToken::ConsultationFee, fee)
        .with(TemplateToken::NextVisitDate, next_visit)
        .with(
            TemplateToken::PrintInstructions,
            or_default(
                Some(paper.print_instructions.as_str()),
                "Please follow doctor's instructions carefully",
            ),
        )
        .with(TemplateToken::WatermarkText, paper.watermark_text.clone())
}

// =============================================================================
// Rendering
// =============================================================================

/// Renders the complete prescription page.
///
/// ## Errors
/// `CoreError::Template` when the custom template uses an unknown or
/// unterminated placeholder.
pub fn render_prescription(
    context: &PrescriptionContext,
    settings: &ShopSettings,
    now: DateTime<FixedOffset>,
) -> CoreResult<String> {
    let values = prescription_values(context, settings, now);
    let paper = &settings.opd_paper;

    let use_custom = paper.custom_html_enabled
        && !paper.custom_html.trim().is_empty()
        && !paper.custom_css.trim().is_empty();

    let (body, css) = if use_custom {
        let template = Template::parse(&paper.custom_html)?;
        (
            strip_document_wrapper(&template.render_html(&values)),
            paper.custom_css.clone(),
        )
    } else {
        let template = Template::parse(&default_layout(&values))?;
        (template.render_html(&values), DEFAULT_CSS.to_string())
    };

    Ok(page(settings, &css, &body))
}

/// Built-in layout. Optional sections are left out when their values are
/// empty.
fn default_layout(values: &TemplateValues) -> String {
    let mut html = String::from(
        r#"<div class="prescription-document">
<header class="header">
<div class="clinic-name">{{clinic_name}}</div>
<div class="clinic-address">{{clinic_address}}</div>
<div class="clinic-contact">{{clinic_phone}} | {{clinic_email}}</div>
</header>
<section class="doctor-info">
<strong>{{doctor_name}}</strong><br>
{{doctor_specialization}}<br>
{{doctor_qualification}}<br>
License: {{doctor_license}}
</section>
<section class="patient-info">
<strong>Patient:</strong> {{patient_name}}<br>
<strong>Date:</strong> {{prescription_date}}<br>
<strong>Age:</strong> {{patient_age}} | <strong>Gender:</strong> {{patient_gender}}"#,
    );
    if !values.get(TemplateToken::PatientPhone).is_empty() {
        html.push_str("<br>\n<strong>Phone:</strong> {{patient_phone}}");
    }
    html.push_str("\n</section>\n");
    if !values.get(TemplateToken::MedicalHistory).is_empty() {
        html.push_str(
            "<section class=\"medical-history\">\n<strong>Medical History:</strong> {{medical_history}}\n</section>\n",
        );
    }
    html.push_str(
        r#"<section class="prescription-area">
<strong>℞ Prescription</strong><br><br>
<pre>{{prescription_notes}}</pre>
</section>
<footer class="footer">
<p>{{print_instructions}}</p>
<br>
<p>Doctor's Signature: _________________</p>
</footer>
</div>"#,
    );
    html
}

const DEFAULT_CSS: &str = r#".header { text-align: center; margin-bottom: 30px; border-bottom: 2px solid #333; padding-bottom: 15px; }
.clinic-name { font-size: 18px; font-weight: bold; color: #2c5282; margin-bottom: 5px; }
.clinic-contact { font-size: 12px; color: #666; }
.doctor-info { background-color: #f7fafc; padding: 15px; border-left: 4px solid #4299e1; margin: 20px 0; }
.patient-info { background-color: #f0fff4; padding: 15px; border-left: 4px solid #48bb78; margin: 20px 0; }
.medical-history { background-color: #fffbf0; padding: 15px; border-left: 4px solid #f6ad55; margin: 20px 0; }
.prescription-area { background-color: #fffaf0; border: 1px solid #ccc; border-radius: 8px; padding: 20px; margin: 20px 0; min-height: 300px; }
.prescription-area pre { white-space: pre-wrap; font-family: inherit; margin: 10px 0; }
.footer { margin-top: 40px; text-align: center; font-size: 12px; color: #666; }"#;

/// Removes `<html>`, `<head>…</head>` and `<body>` wrappers from a custom
/// template so it can be placed inside the page body.
fn strip_document_wrapper(html: &str) -> String {
    let mut out = html.to_string();

    loop {
        let lower = out.to_ascii_lowercase();
        let Some(start) = find_tag(&lower, "head") else { break };
        match lower[start..].find("</head>") {
            Some(end) => out.replace_range(start..start + end + "</head>".len(), ""),
            None => break,
        }
    }

    for tag in ["html", "body"] {
        for pattern in [format!("</{tag}>"), String::new()] {
            loop {
                let lower = out.to_ascii_lowercase();
                let found = if pattern.is_empty() {
                    find_tag(&lower, tag)
                } else {
                    lower.find(&pattern)
                };
                let Some(start) = found else { break };
                match lower[start..].find('>') {
                    Some(end) => out.replace_range(start..start + end + 1, ""),
                    None => break,
                }
            }
        }
    }
    out
}

/// Position of an opening `<tag` followed by `>` or whitespace.
fn find_tag(lower: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{tag}");
    let mut from = 0;
    while let Some(pos) = lower[from..].find(&needle) {
        let at = from + pos;
        let next = lower[at + needle.len()..].chars().next();
        if matches!(next, Some(c) if c == '>' || c.is_whitespace()) {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}

fn page(settings: &ShopSettings, css: &str, body: &str) -> String {
    let paper = &settings.opd_paper;
    let margins = format!(
        "{}mm {}mm {}mm {}mm",
        paper.margin_top, paper.margin_right, paper.margin_bottom, paper.margin_left
    );
    let watermark = paper.watermark_text.trim();
    let (watermark_css, watermark_div) = if watermark.is_empty() {
        (String::new(), String::new())
    } else {
        (
            ".watermark { position: fixed; top: 50%; left: 50%; transform: translate(-50%, -50%) rotate(-45deg); font-size: 48px; color: rgba(0,0,0,0.1); z-index: -1; pointer-events: none; }".to_string(),
            format!("<div class=\"watermark\">{}</div>", escape_html(watermark)),
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>OPD Prescription</title>
<style>
body {{ margin: 0; padding: {margins}; font-family: {font}, sans-serif; font-size: {size}px; line-height: 1.6; background: white; color: #333; }}
@media print {{ body {{ margin: {margins}; }} @page {{ size: {paper_size}; margin: 0; }} }}
{css}
{watermark_css}
</style>
</head>
<body>
{watermark_div}
{body}
</body>
</html>"#,
        margins = margins,
        font = paper.font_family,
        size = paper.font_size,
        paper_size = paper.paper_size,
        css = css,
        watermark_css = watermark_css,
        watermark_div = watermark_div,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, TemplateError};
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 15, 9, 30, 0)
            .unwrap()
    }

    fn patient() -> Customer {
        Customer {
            id: "p1".to_string(),
            name: "Ravi <Kumar>".to_string(),
            phone: Some("555-0101".to_string()),
            email: None,
            address: None,
            date_of_birth: Some(Utc.with_ymd_and_hms(1990, 6, 16, 0, 0, 0).unwrap()),
            gender: Some("Male".to_string()),
            medical_history: Some("Asthma".to_string()),
        }
    }

    fn context() -> PrescriptionContext {
        PrescriptionContext {
            doctor: Some(Doctor {
                name: Some("Dr. Jane Smith".to_string()),
                ..Doctor::default()
            }),
            patient: Some(patient()),
            prescription: Prescription {
                id: Some("665f1c2e9a7b4d00rx12ab34".to_string()),
                prescription_notes: "Salbutamol inhaler\n2 puffs as needed".to_string(),
                ..Prescription::default()
            },
            symptoms: None,
            diagnosis: None,
        }
    }

    #[test]
    fn test_age_counts_birthday() {
        let birth = NaiveDate::from_ymd_opt(1990, 6, 16).unwrap();
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 33);
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()), 34);
    }

    #[test]
    fn test_defaults_for_missing_data() {
        let empty = PrescriptionContext::default();
        let values = prescription_values(&empty, &ShopSettings::default(), now());
        assert_eq!(values.get(TemplateToken::DoctorName), "Dr. Unknown");
        assert_eq!(values.get(TemplateToken::DoctorSpecialization), "General Medicine");
        assert_eq!(values.get(TemplateToken::DoctorQualification), "MD, MBBS");
        assert_eq!(values.get(TemplateToken::DoctorLicense), "N/A");
        assert_eq!(values.get(TemplateToken::PatientName), "Unknown Patient");
        assert_eq!(values.get(TemplateToken::PatientGender), "Not specified");
        assert_eq!(values.get(TemplateToken::PatientAge), "");
        assert_eq!(values.get(TemplateToken::PrescriptionId), "N/A");
        assert_eq!(values.get(TemplateToken::PrescriptionDate), "2024-06-15");
        assert_eq!(values.get(TemplateToken::ClinicWebsite), CLINIC_WEBSITE);
    }

    #[test]
    fn test_values_from_context() {
        let values = prescription_values(&context(), &ShopSettings::default(), now());
        assert_eq!(values.get(TemplateToken::PatientAge), "33");
        assert_eq!(values.get(TemplateToken::PrescriptionId), "RX12AB34");
        assert_eq!(values.get(TemplateToken::MedicalHistory), "Asthma");
    }

    #[test]
    fn test_medical_history_hidden_by_setting() {
        let mut settings = ShopSettings::default();
        settings.opd_paper.show_medical_history = false;
        let values = prescription_values(&context(), &settings, now());
        assert_eq!(values.get(TemplateToken::MedicalHistory), "");
        let html = render_prescription(&context(), &settings, now()).unwrap();
        assert!(!html.contains("Medical History"));
    }

    #[test]
    fn test_default_layout_page() {
        let mut settings = ShopSettings::default();
        settings.opd_paper.watermark_text = "COPY".to_string();
        settings.opd_paper.margin_left = 15;
        let html = render_prescription(&context(), &settings, now()).unwrap();

        assert!(html.contains("Ravi &lt;Kumar&gt;"));
        assert!(html.contains("<strong>Phone:</strong> 555-0101"));
        assert!(html.contains("Medical History"));
        assert!(html.contains("padding: 20mm 20mm 20mm 15mm"));
        assert!(html.contains("size: A4"));
        assert!(html.contains("<div class=\"watermark\">COPY</div>"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_custom_template_used_when_complete() {
        let mut settings = ShopSettings::default();
        settings.opd_paper.custom_html_enabled = true;
        settings.opd_paper.custom_html =
            "<html><head><title>x</title></head><body><h1>{{ doctor_name }}</h1><p>{{patient_age}}</p></body></html>"
                .to_string();

        // CSS missing: built-in layout.
        let html = render_prescription(&context(), &settings, now()).unwrap();
        assert!(html.contains("prescription-document"));

        settings.opd_paper.custom_css = "h1 { color: red; }".to_string();
        let html = render_prescription(&context(), &settings, now()).unwrap();
        assert!(html.contains("<h1>Dr. Jane Smith</h1><p>33</p>"));
        assert!(html.contains("h1 { color: red; }"));
        assert!(!html.contains("<title>x</title>"));
        assert_eq!(html.matches("<body>").count(), 1);
    }

    #[test]
    fn test_custom_template_with_unknown_token_fails() {
        let mut settings = ShopSettings::default();
        settings.opd_paper.custom_html_enabled = true;
        settings.opd_paper.custom_html = "<p>{{doctor_fullname}}</p>".to_string();
        settings.opd_paper.custom_css = "p {}".to_string();

        let err = render_prescription(&context(), &settings, now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Template(TemplateError::UnknownToken { ref token, .. }) if token == "doctor_fullname"
        ));
    }

    #[test]
    fn test_strip_wrapper_keeps_similar_tags() {
        let stripped = strip_document_wrapper("<HTML lang=\"en\"><header>h</header><BODY class=\"x\">b</BODY></html>");
        assert_eq!(stripped, "<header>h</header>b");
    }
}
