//! Admin-side registration of the entities the workflows resolve against.

use uuid::Uuid;

use crate::core::errors::{NotFoundKind, Result, SchoolError};
use crate::domain::common::find_by_id_mut;
use crate::domain::{SchoolClass, Student, Teacher};
use crate::store::EntityStore;

pub struct RosterService;

impl RosterService {
    pub fn add_class<S: EntityStore>(store: &mut S, class: SchoolClass) -> Result<Uuid> {
        require_name(&class.name, "class")?;
        if let Some(teacher_id) = class.class_teacher_id {
            ensure_assignable(&*store, teacher_id, class.id)?;
        }
        let id = class.id;
        store.update(|data| {
            data.classes.push(class);
            Ok(())
        })?;
        tracing::info!(class_id = %id, "class added");
        Ok(id)
    }

    pub fn add_teacher<S: EntityStore>(store: &mut S, teacher: Teacher) -> Result<Uuid> {
        require_name(&teacher.name, "teacher")?;
        let id = teacher.id;
        store.update(|data| {
            data.teachers.push(teacher);
            Ok(())
        })?;
        tracing::info!(teacher_id = %id, "teacher added");
        Ok(id)
    }

    /// Adds a student to an existing class.
    pub fn add_student<S: EntityStore>(store: &mut S, student: Student) -> Result<Uuid> {
        require_name(&student.name, "student")?;
        if store.state().class(student.class_id).is_none() {
            return Err(SchoolError::NotFound(NotFoundKind::Class(student.class_id)));
        }
        let id = student.id;
        store.update(|data| {
            data.students.push(student);
            Ok(())
        })?;
        tracing::info!(student_id = %id, "student added");
        Ok(id)
    }

    /// Makes `teacher_id` the leave approver for students of `class_id`.
    ///
    /// A teacher is class teacher of at most one class.
    pub fn assign_class_teacher<S: EntityStore>(
        store: &mut S,
        class_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<()> {
        if store.state().class(class_id).is_none() {
            return Err(SchoolError::NotFound(NotFoundKind::Class(class_id)));
        }
        ensure_assignable(&*store, teacher_id, class_id)?;
        store.update(|data| {
            let class = find_by_id_mut(&mut data.classes, class_id)
                .ok_or(SchoolError::NotFound(NotFoundKind::Class(class_id)))?;
            class.class_teacher_id = Some(teacher_id);
            Ok(())
        })?;
        tracing::info!(%class_id, %teacher_id, "class teacher assigned");
        Ok(())
    }
}

fn require_name(name: &str, entity: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SchoolError::Validation(format!("{entity} name must not be empty")));
    }
    Ok(())
}

fn ensure_assignable<S: EntityStore>(store: &S, teacher_id: Uuid, class_id: Uuid) -> Result<()> {
    let data = store.state();
    if data.teacher(teacher_id).is_none() {
        return Err(SchoolError::NotFound(NotFoundKind::Teacher(teacher_id)));
    }
    if let Some(existing) = data.class_taught_by(teacher_id) {
        if existing.id != class_id {
            return Err(SchoolError::Validation(format!(
                "teacher {teacher_id} is already class teacher of {}",
                existing.name
            )));
        }
    }
    Ok(())
}
