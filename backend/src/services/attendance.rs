//! Check-in / check-out validation pipeline.
//!
//! Per (student, session) pair a record moves NoRecord -> CheckedIn ->
//! CheckedOut. Geofence check-ins and check-outs pass through the code or
//! session lookup, the geofence test and the [`SpoofGuard`]; manual
//! check-ins by the owning teacher skip the location checks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::{Validate, ValidationErrors};

use crate::{
    config::GEOFENCE_RADIUS_RANGE,
    error::{AppError, AttendanceError},
    models::{
        attendance::{
            ActiveSessionResponse, AttendanceLogEntry, AttendanceMethod, AttendanceRecord,
            CheckInRequest, CheckOutRequest, CheckOutUpdate, ManualCheckInRequest,
            NewAttendanceRecord, RecordState,
        },
        attendance_session::AttendanceSession,
        user::{User, UserRole},
    },
    repositories::{
        AttendanceRecordRepositoryTrait, SessionRepositoryTrait, SubjectRepositoryTrait,
        UserRepositoryTrait,
    },
    services::{geo::Geofence, ip_intel::SpoofGuard},
    types::SubjectId,
};

/// Canonical geofence radius around a department, in meters.
pub const DEFAULT_GEOFENCE_RADIUS_METERS: f64 = 200.0;

#[derive(Clone)]
pub struct AttendanceService {
    sessions: Arc<dyn SessionRepositoryTrait>,
    subjects: Arc<dyn SubjectRepositoryTrait>,
    records: Arc<dyn AttendanceRecordRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
    spoof_guard: SpoofGuard,
    geofence_radius_m: f64,
}

impl AttendanceService {
    pub fn new(
        sessions: Arc<dyn SessionRepositoryTrait>,
        subjects: Arc<dyn SubjectRepositoryTrait>,
        records: Arc<dyn AttendanceRecordRepositoryTrait>,
        users: Arc<dyn UserRepositoryTrait>,
        spoof_guard: SpoofGuard,
        geofence_radius_m: f64,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            GEOFENCE_RADIUS_RANGE.contains(&geofence_radius_m),
            "geofence radius must be within {}..={} meters, got {}",
            GEOFENCE_RADIUS_RANGE.start(),
            GEOFENCE_RADIUS_RANGE.end(),
            geofence_radius_m
        );
        Ok(Self {
            sessions,
            subjects,
            records,
            users,
            spoof_guard,
            geofence_radius_m,
        })
    }

    pub async fn check_in(
        &self,
        student: &User,
        request: &CheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let result = self.try_check_in(student, request, now).await;
        log_outcome("check-in", student, &result);
        result
    }

    pub async fn check_out(
        &self,
        student: &User,
        request: &CheckOutRequest,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let result = self.try_check_out(student, request, now).await;
        log_outcome("check-out", student, &result);
        result
    }

    pub async fn manual_check_in(
        &self,
        teacher: &User,
        request: &ManualCheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let result = self.try_manual_check_in(teacher, request, now).await;
        log_outcome("manual check-in", teacher, &result);
        result
    }

    /// The student's open record, so the client knows what to check out of.
    pub async fn active_session(
        &self,
        student: &User,
    ) -> Result<Option<ActiveSessionResponse>, AttendanceError> {
        require_role(student, UserRole::Student)?;
        Ok(self.records.find_active_for_student(student.id).await?)
    }

    /// Attendance of every session of a subject the teacher teaches.
    pub async fn subject_logs(
        &self,
        teacher: &User,
        subject_id: SubjectId,
    ) -> Result<Vec<AttendanceLogEntry>, AttendanceError> {
        require_role(teacher, UserRole::Teacher)?;
        let subject = self
            .subjects
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound("Subject not found".into()))?;
        if subject.teacher_id != Some(teacher.id) {
            return Err(AttendanceError::Forbidden(
                "Subject not found or unauthorized".into(),
            ));
        }
        Ok(self.records.list_for_subject(subject_id).await?)
    }

    async fn try_check_in(
        &self,
        student: &User,
        request: &CheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        require_role(student, UserRole::Student)?;
        request.validate().map_err(validation_error)?;

        let session = self
            .sessions
            .find_by_code(request.code.trim())
            .await?
            .filter(|session| !session.is_expired_at(now))
            .ok_or(AttendanceError::InvalidOrExpiredCode)?;

        let location = request.location();
        let fence = self.geofence_for(&session).await?;
        let distance_m = fence.distance_from_center(&location);
        if !fence.contains(&location) {
            return Err(AttendanceError::OutsideGeofence {
                distance_m,
                radius_m: fence.radius_m,
            });
        }

        self.spoof_guard.assess(&request.ip, location).await?;

        let existing = self
            .records
            .find_by_student_and_session(student.id, session.id)
            .await?;
        if RecordState::of(existing.as_ref()) != RecordState::NoRecord {
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        self.insert_record(NewAttendanceRecord {
            student_id: student.id,
            session_id: session.id,
            check_in_time: now,
            method: AttendanceMethod::Geofence,
            location: Some(location),
        })
        .await
    }

    async fn try_check_out(
        &self,
        student: &User,
        request: &CheckOutRequest,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        require_role(student, UserRole::Student)?;
        request.validate().map_err(validation_error)?;

        // expired sessions can still be checked out of
        let session = self
            .sessions
            .find_by_id(request.session_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound("Session not found".into()))?;

        let location = request.location();
        let fence = self.geofence_for(&session).await?;
        let distance_m = fence.distance_from_center(&location);
        if fence.contains(&location) {
            return Err(AttendanceError::StillWithinGeofence {
                distance_m,
                radius_m: fence.radius_m,
            });
        }

        self.spoof_guard.assess(&request.ip, location).await?;

        let record = self
            .records
            .find_by_student_and_session(student.id, session.id)
            .await?
            .filter(AttendanceRecord::is_open)
            .ok_or(AttendanceError::NoActiveCheckIn)?;

        let update = CheckOutUpdate {
            check_out_time: now,
            method: AttendanceMethod::Geofence,
            location,
        };
        // a concurrent check-out may have closed it in between
        self.records
            .close(record.id, &update)
            .await?
            .ok_or(AttendanceError::NoActiveCheckIn)
    }

    async fn try_manual_check_in(
        &self,
        teacher: &User,
        request: &ManualCheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        require_role(teacher, UserRole::Teacher)?;

        let session = self
            .sessions
            .find_by_id(request.session_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound("Session not found".into()))?;
        if !session.is_owned_by(teacher.id) {
            return Err(AttendanceError::Forbidden(
                "Unauthorized to mark attendance for this session".into(),
            ));
        }
        if session.is_expired_at(now) {
            return Err(AttendanceError::SessionExpired);
        }

        let student = self.users.find_by_id(request.student_id).await?;
        match student.map(|user| user.role) {
            Some(UserRole::Student) => {}
            Some(UserRole::Teacher) | Some(UserRole::Admin) | None => {
                return Err(AttendanceError::Validation(
                    "Invalid or non-student ID".into(),
                ));
            }
        }

        self.insert_record(NewAttendanceRecord {
            student_id: request.student_id,
            session_id: session.id,
            check_in_time: now,
            method: AttendanceMethod::Manual,
            location: None,
        })
        .await
    }

    async fn geofence_for(&self, session: &AttendanceSession) -> Result<Geofence, AttendanceError> {
        let department = self
            .subjects
            .find_department_for_subject(session.subject_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound("Department not found for subject".into()))?;
        Ok(Geofence::new(department.location(), self.geofence_radius_m))
    }

    /// The unique constraint decides races between concurrent check-ins.
    async fn insert_record(
        &self,
        item: NewAttendanceRecord,
    ) -> Result<AttendanceRecord, AttendanceError> {
        match self.records.create(&item).await {
            Ok(record) => Ok(record),
            Err(AppError::Conflict(_)) => Err(AttendanceError::AlreadyCheckedIn),
            Err(err) => Err(err.into()),
        }
    }
}

fn require_role(user: &User, required: UserRole) -> Result<(), AttendanceError> {
    if user.role == required {
        Ok(())
    } else {
        Err(AttendanceError::Unauthorized("Unauthorized".into()))
    }
}

fn validation_error(errors: ValidationErrors) -> AttendanceError {
    let fields = errors
        .field_errors()
        .into_keys()
        .map(|field| field.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    AttendanceError::Validation(format!("Invalid input: {}", fields))
}

fn log_outcome(action: &str, user: &User, result: &Result<AttendanceRecord, AttendanceError>) {
    match result {
        Ok(record) => tracing::info!(
            user_id = %user.id,
            record_id = %record.id,
            session_id = %record.session_id,
            method = record.method.db_value(),
            "Attendance {} accepted",
            action
        ),
        Err(err) if err.is_policy_violation() => tracing::info!(
            user_id = %user.id,
            code = err.code(),
            "Attendance {} rejected: {}",
            action,
            err
        ),
        Err(err) => tracing::warn!(
            user_id = %user.id,
            code = err.code(),
            "Attendance {} failed: {}",
            action,
            err
        ),
    }
}
