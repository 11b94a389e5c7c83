//! Leave requests: creation, approver routing and decisions.

use chrono::Utc;
use uuid::Uuid;

use crate::core::errors::{NotFoundKind, Result, SchoolError};
use crate::domain::common::find_by_id_mut;
use crate::domain::{Approver, LeaveApplication, LeaveRequest, RequesterRole};
use crate::store::{EntityStore, SchoolData};

pub struct LeaveService;

impl LeaveService {
    /// Files a new pending request on behalf of a student or teacher.
    pub fn request<S: EntityStore>(
        store: &mut S,
        application: LeaveApplication,
    ) -> Result<LeaveRequest> {
        application.validate()?;
        let data = store.state();
        let (name, class_id) = match application.requester_role {
            RequesterRole::Student => {
                let student = data.student(application.requester_id).ok_or(
                    SchoolError::NotFound(NotFoundKind::Student(application.requester_id)),
                )?;
                (student.name.clone(), Some(student.class_id))
            }
            RequesterRole::Teacher => {
                let teacher = data.teacher(application.requester_id).ok_or(
                    SchoolError::NotFound(NotFoundKind::Teacher(application.requester_id)),
                )?;
                (teacher.name.clone(), None)
            }
        };

        let request = LeaveRequest::pending(application, name, class_id);
        let created = request.clone();
        store.update(|data| {
            data.leaves.push(request);
            Ok(())
        })?;
        tracing::info!(
            leave_id = %created.id,
            requester = %created.requester_id,
            role = %created.requester_role,
            "leave requested"
        );
        Ok(created)
    }

    /// Pending requests the approver is responsible for, oldest first.
    pub fn pending_for_approver<'a, S: EntityStore>(
        store: &'a S,
        approver: &Approver,
    ) -> Vec<&'a LeaveRequest> {
        let data = store.state();
        data.leaves
            .iter()
            .filter(|leave| leave.is_pending() && within_scope(data, approver, leave))
            .collect()
    }

    /// Every request filed by one requester, in filing order.
    pub fn history_for_requester<S: EntityStore>(
        store: &S,
        role: RequesterRole,
        requester_id: Uuid,
    ) -> Vec<&LeaveRequest> {
        store
            .state()
            .leaves
            .iter()
            .filter(|leave| leave.requester_role == role && leave.requester_id == requester_id)
            .collect()
    }

    pub fn get<S: EntityStore>(store: &S, id: Uuid) -> Result<&LeaveRequest> {
        store
            .state()
            .leave(id)
            .ok_or(SchoolError::NotFound(NotFoundKind::Leave(id)))
    }

    /// Approves or rejects a pending request.
    ///
    /// The approver must cover the request under the same routing rule as
    /// [`LeaveService::pending_for_approver`]; decided requests never change.
    pub fn decide<S: EntityStore>(
        store: &mut S,
        id: Uuid,
        approve: bool,
        approver: &Approver,
    ) -> Result<LeaveRequest> {
        ensure_known_approver(store.state(), approver)?;
        let leave = Self::get(&*store, id)?;
        if !within_scope(store.state(), approver, leave) {
            tracing::warn!(
                leave_id = %id,
                approver = %approver.decider_id(),
                "leave decision outside approver scope"
            );
            return Err(SchoolError::Unauthorized(format!(
                "{} may not decide leave request {id}",
                approver.decider_id()
            )));
        }

        let decided = store.update(|data| {
            let leave = find_by_id_mut(&mut data.leaves, id)
                .ok_or(SchoolError::NotFound(NotFoundKind::Leave(id)))?;
            leave.decide(approve, approver.decider_id(), Utc::now())?;
            Ok(leave.clone())
        })?;
        tracing::info!(
            leave_id = %id,
            status = %decided.status,
            decided_by = %approver.decider_id(),
            "leave decided"
        );
        Ok(decided)
    }
}

fn ensure_known_approver(data: &SchoolData, approver: &Approver) -> Result<()> {
    match approver {
        Approver::Admin { id } if id.trim().is_empty() => Err(SchoolError::Validation(
            "admin decider id must not be empty".into(),
        )),
        Approver::Admin { .. } => Ok(()),
        Approver::Teacher(teacher_id) => data
            .teacher(*teacher_id)
            .map(|_| ())
            .ok_or(SchoolError::NotFound(NotFoundKind::Teacher(*teacher_id))),
    }
}

/// Admins cover all teacher requests; a teacher covers student requests filed
/// for the class they are class teacher of.
fn within_scope(data: &SchoolData, approver: &Approver, leave: &LeaveRequest) -> bool {
    if leave.requester_role != approver.requester_role() {
        return false;
    }
    match approver {
        Approver::Admin { .. } => true,
        Approver::Teacher(teacher_id) => match (data.class_taught_by(*teacher_id), leave.class_id)
        {
            (Some(class), Some(class_id)) => class.id == class_id,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LeaveStatus, LeaveType, SchoolClass, Student, Teacher};
    use crate::store::Store;
    use chrono::NaiveDate;

    struct Fixture {
        store: Store,
        class_teacher: Uuid,
        other_teacher: Uuid,
        student: Uuid,
        other_student: Uuid,
    }

    fn fixture() -> Fixture {
        let class_teacher = Teacher::new("Ms. Rao");
        let other_teacher = Teacher::new("Mr. Iyer");
        let class = SchoolClass::new("7A").with_class_teacher(class_teacher.id);
        let other_class = SchoolClass::new("8B").with_class_teacher(other_teacher.id);
        let student = Student::new("Asha", class.id);
        let other_student = Student::new("Ravi", other_class.id);

        let mut data = SchoolData::default();
        let ids = (class_teacher.id, other_teacher.id, student.id, other_student.id);
        data.teachers = vec![class_teacher, other_teacher];
        data.classes = vec![class, other_class];
        data.students = vec![student, other_student];

        Fixture {
            store: Store::with_data(data),
            class_teacher: ids.0,
            other_teacher: ids.1,
            student: ids.2,
            other_student: ids.3,
        }
    }

    fn application(role: RequesterRole, id: Uuid) -> LeaveApplication {
        LeaveApplication::new(
            role,
            id,
            LeaveType::Casual,
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            "Family function",
        )
    }

    #[test]
    fn student_request_carries_name_and_class() {
        let mut fx = fixture();
        let leave =
            LeaveService::request(&mut fx.store, application(RequesterRole::Student, fx.student))
                .unwrap();
        assert_eq!(leave.requester_name, "Asha");
        assert_eq!(
            leave.class_id,
            fx.store.state().student(fx.student).map(|s| s.class_id)
        );
        assert_eq!(leave.status, LeaveStatus::Pending);
    }

    #[test]
    fn unknown_requester_is_not_found() {
        let mut fx = fixture();
        let err = LeaveService::request(
            &mut fx.store,
            application(RequesterRole::Teacher, fx.student),
        )
        .expect_err("a student id is not a teacher");
        assert!(matches!(err, SchoolError::NotFound(NotFoundKind::Teacher(_))));
        assert!(fx.store.state().leaves.is_empty());
    }

    #[test]
    fn teacher_sees_only_their_class() {
        let mut fx = fixture();
        let mine =
            LeaveService::request(&mut fx.store, application(RequesterRole::Student, fx.student))
                .unwrap();
        LeaveService::request(
            &mut fx.store,
            application(RequesterRole::Student, fx.other_student),
        )
        .unwrap();
        LeaveService::request(
            &mut fx.store,
            application(RequesterRole::Teacher, fx.other_teacher),
        )
        .unwrap();

        let pending =
            LeaveService::pending_for_approver(&fx.store, &Approver::teacher(fx.class_teacher));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, mine.id);
    }

    #[test]
    fn teacher_without_class_sees_nothing() {
        let mut fx = fixture();
        let loner = Teacher::new("Mrs. Das");
        let loner_id = loner.id;
        fx.store
            .update(|data| {
                data.teachers.push(loner);
                Ok(())
            })
            .unwrap();
        LeaveService::request(&mut fx.store, application(RequesterRole::Student, fx.student))
            .unwrap();
        assert!(LeaveService::pending_for_approver(&fx.store, &Approver::teacher(loner_id))
            .is_empty());
    }

    #[test]
    fn out_of_scope_decision_is_unauthorized() {
        let mut fx = fixture();
        let leave =
            LeaveService::request(&mut fx.store, application(RequesterRole::Student, fx.student))
                .unwrap();

        let err = LeaveService::decide(
            &mut fx.store,
            leave.id,
            true,
            &Approver::teacher(fx.other_teacher),
        )
        .expect_err("other class teacher may not decide");
        assert!(matches!(err, SchoolError::Unauthorized(_)));

        let err = LeaveService::decide(&mut fx.store, leave.id, true, &Approver::admin("admin"))
            .expect_err("admins decide teacher leave only");
        assert!(matches!(err, SchoolError::Unauthorized(_)));
        assert!(LeaveService::get(&fx.store, leave.id).unwrap().is_pending());
    }

    #[test]
    fn decision_is_final() {
        let mut fx = fixture();
        let leave =
            LeaveService::request(&mut fx.store, application(RequesterRole::Student, fx.student))
                .unwrap();
        let approver = Approver::teacher(fx.class_teacher);

        let decided = LeaveService::decide(&mut fx.store, leave.id, false, &approver).unwrap();
        assert_eq!(decided.status, LeaveStatus::Rejected);
        assert_eq!(decided.decided_by, Some(fx.class_teacher.to_string()));

        let err = LeaveService::decide(&mut fx.store, leave.id, true, &approver)
            .expect_err("rejected is terminal");
        assert!(matches!(err, SchoolError::InvalidTransition { .. }));
        let stored = LeaveService::get(&fx.store, leave.id).unwrap();
        assert_eq!(stored.status, LeaveStatus::Rejected);
        assert_eq!(stored.decided_at, decided.decided_at);
    }

    #[test]
    fn unknown_request_and_blank_admin_are_rejected() {
        let mut fx = fixture();
        let err = LeaveService::decide(&mut fx.store, Uuid::new_v4(), true, &Approver::admin("a"))
            .expect_err("unknown id");
        assert!(matches!(err, SchoolError::NotFound(NotFoundKind::Leave(_))));

        let err = LeaveService::decide(&mut fx.store, Uuid::new_v4(), true, &Approver::admin(" "))
            .expect_err("blank admin id");
        assert!(matches!(err, SchoolError::Validation(_)));
    }
}
