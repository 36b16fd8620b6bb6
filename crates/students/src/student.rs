use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rollcall_core::{DomainError, StudentId};

use crate::StudentClass;

/// A stored student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub school_number: String,
    pub birth_date: String,
    pub student_class: Option<StudentClass>,
    /// Course name → grade.
    pub courses: BTreeMap<String, String>,
}

/// Client-supplied fields of a student (create / full update).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentDraft {
    pub first_name: String,
    pub last_name: String,
    pub school_number: String,
    pub birth_date: String,
    pub student_class: Option<StudentClass>,
    pub courses: BTreeMap<String, String>,
}

impl Student {
    pub fn from_draft(id: StudentId, draft: StudentDraft) -> Self {
        Self {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            school_number: draft.school_number,
            birth_date: draft.birth_date,
            student_class: draft.student_class,
            courses: draft.courses,
        }
    }

    /// Overwrite the mutable fields; the school number is kept.
    pub fn apply(&mut self, draft: StudentDraft) {
        self.first_name = draft.first_name;
        self.last_name = draft.last_name;
        self.birth_date = draft.birth_date;
        self.student_class = draft.student_class;
        self.courses = draft.courses;
    }
}

pub fn not_found(id: StudentId) -> DomainError {
    DomainError::not_found(format!("Student not found with id: {id}"))
}

/// Student persistence port.
#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Student>, DomainError>;

    async fn get(&self, id: StudentId) -> Result<Student, DomainError>;

    async fn insert(&self, draft: StudentDraft) -> Result<Student, DomainError>;

    async fn update(&self, id: StudentId, draft: StudentDraft) -> Result<Student, DomainError>;

    async fn remove(&self, id: StudentId) -> Result<(), DomainError>;
}
