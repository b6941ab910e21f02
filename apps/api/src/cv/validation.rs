//! Payload-constraint checks for a `CvDocument`.
//!
//! These report problems; they never block a save. Field-level rules that gate
//! user input live in the editor.

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

use crate::cv::model::CvDocument;

pub const MAX_YEARS_OF_EXPERIENCE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path into the document, e.g. `experience[1].endDate`.
    pub path: String,
    pub reason: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Parses the date forms the editor emits: `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

pub fn validate(doc: &CvDocument) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let info = &doc.personal_info;
    for (path, value) in [
        ("personalInfo.firstName", &info.first_name),
        ("personalInfo.lastName", &info.last_name),
        ("personalInfo.email", &info.email),
    ] {
        if value.trim().is_empty() {
            issues.push(ValidationIssue::new(path, "required field is empty"));
        }
    }

    for (i, edu) in doc.education.iter().enumerate() {
        check_date_range(
            &mut issues,
            &format!("education[{i}]"),
            &edu.start_date,
            edu.end_date.as_deref(),
        );
    }

    for (i, exp) in doc.experience.iter().enumerate() {
        // A current position's end date is ignored by the editor.
        let end = if exp.current { None } else { exp.end_date.as_deref() };
        check_date_range(&mut issues, &format!("experience[{i}]"), &exp.start_date, end);
        for (j, achievement) in exp.achievements.iter().enumerate() {
            if achievement.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("experience[{i}].achievements[{j}]"),
                    "blank entry",
                ));
            }
        }
    }

    for (i, skill) in doc.skills.iter().enumerate() {
        if let Some(years) = skill.years_of_experience {
            if years > MAX_YEARS_OF_EXPERIENCE {
                issues.push(ValidationIssue::new(
                    format!("skills[{i}].yearsOfExperience"),
                    format!("must be at most {MAX_YEARS_OF_EXPERIENCE}"),
                ));
            }
        }
    }

    for (section, list) in [
        ("certifications", &doc.certifications),
        ("interests", &doc.interests),
    ] {
        for (i, entry) in list.iter().enumerate() {
            if entry.trim().is_empty() {
                issues.push(ValidationIssue::new(format!("{section}[{i}]"), "blank entry"));
            }
        }
    }

    issues
}

fn check_date_range(
    issues: &mut Vec<ValidationIssue>,
    prefix: &str,
    start: &str,
    end: Option<&str>,
) {
    let start_date = parse_iso_date(start);
    if start_date.is_none() {
        issues.push(ValidationIssue::new(
            format!("{prefix}.startDate"),
            "not an ISO-8601 date",
        ));
    }

    let Some(end) = end else { return };
    match (start_date, parse_iso_date(end)) {
        (_, None) => issues.push(ValidationIssue::new(
            format!("{prefix}.endDate"),
            "not an ISO-8601 date",
        )),
        (Some(s), Some(e)) if e < s => issues.push(ValidationIssue::new(
            format!("{prefix}.endDate"),
            "ends before it starts",
        )),
        _ => {}
    }
}
