#![allow(dead_code)]

use std::sync::Mutex;

use campus_core::{
    domain::{SchoolClass, Student, Teacher},
    storage::JsonStorage,
    EntityStore, RosterService, Store,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates a JSON-backed store rooted in a fresh temporary directory.
pub fn disk_store() -> (Store, std::path::PathBuf) {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let storage = JsonStorage::new(Some(base.clone()), Some(3)).expect("create json storage");
    let store = Store::open(Box::new(storage)).expect("open store");
    (store, base)
}

/// A school with one class, its class teacher, a second teacher and a student.
pub struct School {
    pub class_id: Uuid,
    pub class_teacher: Uuid,
    pub subject_teacher: Uuid,
    pub student: Uuid,
}

pub fn seed_school<S: EntityStore>(store: &mut S) -> School {
    let class_teacher =
        RosterService::add_teacher(store, Teacher::new("Ms. Rao")).expect("add class teacher");
    let subject_teacher =
        RosterService::add_teacher(store, Teacher::new("Mr. Iyer")).expect("add teacher");
    let class_id = RosterService::add_class(store, SchoolClass::new("7A")).expect("add class");
    RosterService::assign_class_teacher(store, class_id, class_teacher).expect("assign");
    let student =
        RosterService::add_student(store, Student::new("Asha", class_id)).expect("add student");
    School {
        class_id,
        class_teacher,
        subject_teacher,
        student,
    }
}
