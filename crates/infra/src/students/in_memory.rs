use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use rollcall_core::{DomainError, StudentId};
use rollcall_students::{Student, StudentDraft, StudentStore, not_found};

fn poisoned<T>(_: T) -> DomainError {
    DomainError::unavailable("lock poisoned")
}

/// In-memory student store for tests/dev, ordered by id.
#[derive(Debug, Default)]
pub struct InMemoryStudentStore {
    inner: RwLock<BTreeMap<StudentId, Student>>,
}

impl InMemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl StudentStore for InMemoryStudentStore {
    async fn list(&self) -> Result<Vec<Student>, DomainError> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.values().cloned().collect())
    }

    async fn get(&self, id: StudentId) -> Result<Student, DomainError> {
        let map = self.inner.read().map_err(poisoned)?;
        map.get(&id).cloned().ok_or_else(|| not_found(id))
    }

    async fn insert(&self, draft: StudentDraft) -> Result<Student, DomainError> {
        let student = Student::from_draft(StudentId::new(), draft);
        let mut map = self.inner.write().map_err(poisoned)?;
        map.insert(student.id, student.clone());
        Ok(student)
    }

    async fn update(&self, id: StudentId, draft: StudentDraft) -> Result<Student, DomainError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let student = map.get_mut(&id).ok_or_else(|| not_found(id))?;
        student.apply(draft);
        Ok(student.clone())
    }

    async fn remove(&self, id: StudentId) -> Result<(), DomainError> {
        let mut map = self.inner.write().map_err(poisoned)?;
        map.remove(&id).map(|_| ()).ok_or_else(|| not_found(id))
    }
}
