//! Edit operations and the change-observable local edit store.
//!
//! The editor never mutates a `CvDocument` directly. Every change is an `EditOp`
//! applied through `LocalEditStore`, which publishes the resulting document on a
//! `watch` channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::cv::model::{CvDocument, Education, Experience, Language, Skill};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Education,
    Experience,
    Skills,
    Languages,
    Certifications,
    Interests,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Education => "education",
            Self::Experience => "experience",
            Self::Skills => "skills",
            Self::Languages => "languages",
            Self::Certifications => "certifications",
            Self::Interests => "interests",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersonalField {
    FirstName,
    LastName,
    Email,
    Phone,
    Location,
    Website,
    Linkedin,
    Github,
    Bio,
    Title,
}

/// A single list entry, tagged with the section it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", content = "entry", rename_all = "camelCase")]
pub enum Item {
    Education(Education),
    Experience(Experience),
    Skill(Skill),
    Language(Language),
    Certification(String),
    Interest(String),
}

impl Item {
    pub fn section(&self) -> Section {
        match self {
            Item::Education(_) => Section::Education,
            Item::Experience(_) => Section::Experience,
            Item::Skill(_) => Section::Skills,
            Item::Language(_) => Section::Languages,
            Item::Certification(_) => Section::Certifications,
            Item::Interest(_) => Section::Interests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EditOp {
    /// An empty value clears an optional field.
    SetPersonalField { field: PersonalField, value: String },
    Add { item: Item },
    Update { index: usize, item: Item },
    Remove { section: Section, index: usize },
    /// Remove-and-reinsert: intervening entries shift by one.
    Move { section: Section, from: usize, to: usize },
    Replace { document: CvDocument },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("index {index} out of range for {section} (len {len})")]
    IndexOutOfRange {
        section: Section,
        index: usize,
        len: usize,
    },
}

/// Applies `op` to `doc` in place. On error the document is left untouched.
pub fn apply(doc: &mut CvDocument, op: EditOp) -> Result<(), EditError> {
    match op {
        EditOp::SetPersonalField { field, value } => {
            set_personal_field(doc, field, value);
            Ok(())
        }
        EditOp::Add { item } => {
            match item {
                Item::Education(e) => doc.education.push(e),
                Item::Experience(e) => doc.experience.push(e),
                Item::Skill(s) => doc.skills.push(s),
                Item::Language(l) => doc.languages.push(l),
                Item::Certification(c) => doc.certifications.push(c),
                Item::Interest(i) => doc.interests.push(i),
            }
            Ok(())
        }
        EditOp::Update { index, item } => {
            let section = item.section();
            match item {
                Item::Education(e) => replace_at(&mut doc.education, section, index, e),
                Item::Experience(e) => replace_at(&mut doc.experience, section, index, e),
                Item::Skill(s) => replace_at(&mut doc.skills, section, index, s),
                Item::Language(l) => replace_at(&mut doc.languages, section, index, l),
                Item::Certification(c) => replace_at(&mut doc.certifications, section, index, c),
                Item::Interest(i) => replace_at(&mut doc.interests, section, index, i),
            }
        }
        EditOp::Remove { section, index } => match section {
            Section::Education => remove_at(&mut doc.education, section, index),
            Section::Experience => remove_at(&mut doc.experience, section, index),
            Section::Skills => remove_at(&mut doc.skills, section, index),
            Section::Languages => remove_at(&mut doc.languages, section, index),
            Section::Certifications => remove_at(&mut doc.certifications, section, index),
            Section::Interests => remove_at(&mut doc.interests, section, index),
        },
        EditOp::Move { section, from, to } => match section {
            Section::Education => move_item(&mut doc.education, section, from, to),
            Section::Experience => move_item(&mut doc.experience, section, from, to),
            Section::Skills => move_item(&mut doc.skills, section, from, to),
            Section::Languages => move_item(&mut doc.languages, section, from, to),
            Section::Certifications => move_item(&mut doc.certifications, section, from, to),
            Section::Interests => move_item(&mut doc.interests, section, from, to),
        },
        EditOp::Replace { document } => {
            *doc = document;
            Ok(())
        }
    }
}

fn set_personal_field(doc: &mut CvDocument, field: PersonalField, value: String) {
    let info = &mut doc.personal_info;
    let optional = if value.is_empty() { None } else { Some(value.clone()) };
    match field {
        PersonalField::FirstName => info.first_name = value,
        PersonalField::LastName => info.last_name = value,
        PersonalField::Email => info.email = value,
        PersonalField::Phone => info.phone = optional,
        PersonalField::Location => info.location = optional,
        PersonalField::Website => info.website = optional,
        PersonalField::Linkedin => info.linkedin = optional,
        PersonalField::Github => info.github = optional,
        PersonalField::Bio => info.bio = optional,
        PersonalField::Title => info.title = optional,
    }
}

fn check_index<T>(list: &[T], section: Section, index: usize) -> Result<(), EditError> {
    if index >= list.len() {
        return Err(EditError::IndexOutOfRange {
            section,
            index,
            len: list.len(),
        });
    }
    Ok(())
}

fn replace_at<T>(list: &mut [T], section: Section, index: usize, value: T) -> Result<(), EditError> {
    check_index(list, section, index)?;
    list[index] = value;
    Ok(())
}

fn remove_at<T>(list: &mut Vec<T>, section: Section, index: usize) -> Result<(), EditError> {
    check_index(list, section, index)?;
    list.remove(index);
    Ok(())
}

fn move_item<T>(list: &mut Vec<T>, section: Section, from: usize, to: usize) -> Result<(), EditError> {
    check_index(list, section, from)?;
    check_index(list, section, to)?;
    let item = list.remove(from);
    list.insert(to, item);
    Ok(())
}

/// In-memory, change-observable container for the current document.
pub struct LocalEditStore {
    tx: watch::Sender<CvDocument>,
}

impl LocalEditStore {
    pub fn new(initial: CvDocument) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<CvDocument> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> CvDocument {
        self.tx.borrow().clone()
    }

    pub fn matches(&self, other: &CvDocument) -> bool {
        *self.tx.borrow() == *other
    }

    /// Applies an edit and returns whether the document actually changed.
    /// Subscribers are only notified on a real change.
    pub fn apply(&self, op: EditOp) -> Result<bool, EditError> {
        let mut next = self.current();
        apply(&mut next, op)?;
        Ok(self.publish(next))
    }

    /// Replaces the whole document (load and refresh path).
    pub fn replace(&self, document: CvDocument) -> bool {
        self.publish(document)
    }

    fn publish(&self, next: CvDocument) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        })
    }
}
