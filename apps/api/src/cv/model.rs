use serde::{Deserialize, Serialize};

/// The complete CV record for one user. Persisted as a single JSON attribute and
/// always written whole; there is no field-level remote patching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvDocument {
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certifications: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
}

impl CvDocument {
    /// Default document for a user with no stored CV, seeded from identity profile fields.
    pub fn seeded(first_name: &str, last_name: &str, email: &str) -> Self {
        Self {
            personal_info: PersonalInfo {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                ..PersonalInfo::default()
            },
            ..Self::default()
        }
    }

    /// Canonical wire form. Field order is fixed by the struct definitions, so two
    /// structurally equal documents always serialize identically.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// `current = true` means the editor disables `end_date`; it is not cleared here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub company: String,
    pub position: String,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,
    pub level: SkillLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proficiency {
    #[default]
    Basic,
    Conversational,
    Fluent,
    Native,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub name: String,
    pub proficiency: Proficiency,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_minimal_document() {
        let doc: CvDocument = serde_json::from_value(json!({
            "personalInfo": {"firstName": "A", "lastName": "B", "email": "a@b.com"},
            "education": [],
            "experience": [],
            "skills": [],
            "languages": []
        }))
        .unwrap();

        assert_eq!(doc, CvDocument::seeded("A", "B", "a@b.com"));
        assert!(doc.certifications.is_empty());
        assert!(doc.interests.is_empty());
    }

    #[test]
    fn test_optional_fields_omitted_from_wire_form() {
        let json = CvDocument::seeded("A", "B", "a@b.com")
            .to_canonical_json()
            .unwrap();
        assert_eq!(
            json,
            r#"{"personalInfo":{"firstName":"A","lastName":"B","email":"a@b.com"},"education":[],"experience":[],"skills":[],"languages":[]}"#
        );
    }

    #[test]
    fn test_camel_case_and_enum_names() {
        let skill = Skill {
            name: "Rust".to_string(),
            level: SkillLevel::Expert,
            years_of_experience: Some(6),
        };
        let value = serde_json::to_value(&skill).unwrap();
        assert_eq!(value, json!({"name": "Rust", "level": "Expert", "yearsOfExperience": 6}));
    }

    #[test]
    fn test_unknown_skill_level_rejected() {
        let result = serde_json::from_value::<Skill>(json!({"name": "Go", "level": "Guru"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_experience_current_keeps_end_date() {
        let exp: Experience = serde_json::from_value(json!({
            "company": "Acme",
            "position": "Engineer",
            "startDate": "2020-01-01",
            "endDate": "2021-01-01",
            "current": true,
            "description": ""
        }))
        .unwrap();
        assert!(exp.current);
        assert_eq!(exp.end_date.as_deref(), Some("2021-01-01"));
        assert!(exp.achievements.is_empty());
    }
}
