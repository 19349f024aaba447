#![allow(dead_code)]
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use geoattend_backend::{
    config::{Config, IpIntelFailurePolicy},
    error::AppError,
    models::{
        attendance::{
            ActiveSessionResponse, AttendanceLogEntry, AttendanceRecord, CheckOutUpdate,
            NewAttendanceRecord,
        },
        attendance_session::{AttendanceSession, NewAttendanceSession},
        subject::{Department, Subject},
        user::{User, UserRole},
    },
    repositories::{
        AttendanceRecordRepositoryTrait, SessionRepositoryTrait, SubjectRepositoryTrait,
        UserRepositoryTrait,
    },
    routes::app_router,
    services::{
        geo::{GeoPoint, EARTH_RADIUS_METERS},
        ip_intel::{IpIntel, IpIntelError, IpIntelProvider},
    },
    state::{AppState, Repositories},
    types::{DepartmentId, RecordId, SessionId, SubjectId, UserId},
    utils::jwt::create_access_token,
};
use serde_json::Value;
use std::{
    collections::HashSet,
    net::IpAddr,
    sync::{Arc, Mutex, MutexGuard},
};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "a_secure_token_that_is_long_enough_123";
pub const DEPARTMENT: GeoPoint = GeoPoint::new(20.0, 85.0);
pub const CLEAN_IP: &str = "203.0.113.10";
pub const VPN_IP: &str = "198.51.100.66";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/geoattend_test".into(),
        bind_addr: "127.0.0.1:0".parse().expect("bind addr"),
        jwt_secret: JWT_SECRET.into(),
        cors_allow_origins: vec!["http://localhost:8000".into()],
        geofence_radius_meters: 200.0,
        session_code_ttl_minutes: 10,
        session_code_length: 8,
        session_code_max_attempts: 5,
        ip_intel_base_url: "http://127.0.0.1:9".into(),
        ip_intel_api_key: None,
        ip_intel_timeout_ms: 500,
        ip_intel_failure_policy: IpIntelFailurePolicy::FailClosed,
        ip_location_check_enabled: false,
        ip_location_max_divergence_meters: 10_000.0,
    }
}

/// Moves `meters` due north of `point` along its meridian.
pub fn north_of(point: GeoPoint, meters: f64) -> GeoPoint {
    GeoPoint::new(
        point.lat + (meters / EARTH_RADIUS_METERS).to_degrees(),
        point.lng,
    )
}

pub fn token_for(user: &User) -> String {
    create_access_token(user.id, user.role, JWT_SECRET, 1).expect("create token")
}

#[derive(Default)]
struct StoreData {
    next_id: i64,
    users: Vec<User>,
    departments: Vec<Department>,
    subjects: Vec<Subject>,
    sessions: Vec<AttendanceSession>,
    records: Vec<AttendanceRecord>,
}

impl StoreData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory stand-in for PostgreSQL that enforces the same unique keys.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().expect("lock memory store")
    }

    pub fn seed_user(&self, role: UserRole) -> User {
        let mut data = self.lock();
        let id = data.next_id();
        let user = User {
            id: UserId::new(id),
            name: format!("{} {}", role, id),
            email: format!("{}{}@example.edu", role, id),
            role,
            created_at: Utc::now(),
        };
        data.users.push(user.clone());
        user
    }

    pub fn seed_department(&self, location: GeoPoint) -> Department {
        let mut data = self.lock();
        let id = data.next_id();
        let department = Department {
            id: DepartmentId::new(id),
            name: format!("Department {}", id),
            latitude: location.lat,
            longitude: location.lng,
        };
        data.departments.push(department.clone());
        department
    }

    pub fn seed_subject(&self, department: &Department, teacher: Option<&User>) -> Subject {
        let mut data = self.lock();
        let id = data.next_id();
        let subject = Subject {
            id: SubjectId::new(id),
            name: format!("Subject {}", id),
            department_id: department.id,
            semester_id: None,
            teacher_id: teacher.map(|t| t.id),
        };
        data.subjects.push(subject.clone());
        subject
    }

    pub fn seed_session(
        &self,
        subject: &Subject,
        teacher: &User,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> AttendanceSession {
        let mut data = self.lock();
        let id = data.next_id();
        let session = AttendanceSession {
            id: SessionId::new(id),
            code: code.into(),
            subject_id: subject.id,
            teacher_id: teacher.id,
            created_at: expires_at - chrono::Duration::minutes(10),
            expires_at,
        };
        data.sessions.push(session.clone());
        session
    }

    pub fn set_role(&self, user_id: UserId, role: UserRole) {
        let mut data = self.lock();
        if let Some(user) = data.users.iter_mut().find(|u| u.id == user_id) {
            user.role = role;
        }
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.lock().records.clone()
    }

    pub fn sessions(&self) -> Vec<AttendanceSession> {
        self.lock().sessions.clone()
    }
}

#[async_trait]
impl UserRepositoryTrait for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl SubjectRepositoryTrait for MemoryStore {
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>, AppError> {
        Ok(self.lock().subjects.iter().find(|s| s.id == id).cloned())
    }

    async fn find_department_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<Department>, AppError> {
        let data = self.lock();
        let department = data
            .subjects
            .iter()
            .find(|s| s.id == subject_id)
            .and_then(|s| data.departments.iter().find(|d| d.id == s.department_id))
            .cloned();
        Ok(department)
    }
}

#[async_trait]
impl SessionRepositoryTrait for MemoryStore {
    async fn create(&self, item: &NewAttendanceSession) -> Result<AttendanceSession, AppError> {
        let mut data = self.lock();
        if data.sessions.iter().any(|s| s.code == item.code) {
            return Err(AppError::Conflict("attendance_sessions_code_key".into()));
        }
        let id = data.next_id();
        let session = AttendanceSession {
            id: SessionId::new(id),
            code: item.code.clone(),
            subject_id: item.subject_id,
            teacher_id: item.teacher_id,
            created_at: item.created_at,
            expires_at: item.expires_at,
        };
        data.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<AttendanceSession>, AppError> {
        Ok(self.lock().sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<AttendanceSession>, AppError> {
        Ok(self.lock().sessions.iter().find(|s| s.code == code).cloned())
    }
}

#[async_trait]
impl AttendanceRecordRepositoryTrait for MemoryStore {
    async fn create(&self, item: &NewAttendanceRecord) -> Result<AttendanceRecord, AppError> {
        let mut data = self.lock();
        if data
            .records
            .iter()
            .any(|r| r.student_id == item.student_id && r.session_id == item.session_id)
        {
            return Err(AppError::Conflict(
                "attendance_records_student_session_key".into(),
            ));
        }
        let id = data.next_id();
        let record = AttendanceRecord {
            id: RecordId::new(id),
            student_id: item.student_id,
            session_id: item.session_id,
            check_in_time: Some(item.check_in_time),
            check_out_time: None,
            method: item.method,
            lat: item.location.map(|p| p.lat),
            lng: item.location.map(|p| p.lng),
        };
        data.records.push(record.clone());
        Ok(record)
    }

    async fn find_by_student_and_session(
        &self,
        student_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self
            .lock()
            .records
            .iter()
            .find(|r| r.student_id == student_id && r.session_id == session_id)
            .cloned())
    }

    async fn close(
        &self,
        id: RecordId,
        update: &CheckOutUpdate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let mut data = self.lock();
        let Some(record) = data
            .records
            .iter_mut()
            .find(|r| r.id == id && r.check_out_time.is_none())
        else {
            return Ok(None);
        };
        record.check_out_time = Some(update.check_out_time);
        record.method = update.method;
        record.lat = Some(update.location.lat);
        record.lng = Some(update.location.lng);
        Ok(Some(record.clone()))
    }

    async fn find_active_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Option<ActiveSessionResponse>, AppError> {
        let data = self.lock();
        let active = data
            .records
            .iter()
            .filter(|r| r.student_id == student_id && r.check_out_time.is_none())
            .max_by_key(|r| r.check_in_time)
            .and_then(|record| {
                let session = data.sessions.iter().find(|s| s.id == record.session_id)?;
                let subject = data.subjects.iter().find(|s| s.id == session.subject_id)?;
                Some(ActiveSessionResponse {
                    record_id: record.id,
                    session_id: session.id,
                    subject_id: subject.id,
                    subject_name: subject.name.clone(),
                    check_in_time: record.check_in_time,
                })
            });
        Ok(active)
    }

    async fn list_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<AttendanceLogEntry>, AppError> {
        let data = self.lock();
        let entries = data
            .records
            .iter()
            .filter_map(|record| {
                let session = data
                    .sessions
                    .iter()
                    .find(|s| s.id == record.session_id && s.subject_id == subject_id)?;
                let student = data.users.iter().find(|u| u.id == record.student_id)?;
                Some(AttendanceLogEntry {
                    record_id: record.id,
                    session_id: session.id,
                    student_id: student.id,
                    student_name: student.name.clone(),
                    check_in_time: record.check_in_time,
                    check_out_time: record.check_out_time,
                    method: record.method,
                })
            })
            .collect();
        Ok(entries)
    }
}

pub fn memory_repositories(store: &Arc<MemoryStore>) -> Repositories {
    Repositories {
        users: store.clone(),
        subjects: store.clone(),
        sessions: store.clone(),
        records: store.clone(),
    }
}

/// IP intelligence double: flags a fixed set of addresses, or fails every
/// lookup when `unavailable` is set.
#[derive(Default)]
pub struct StubIpIntel {
    pub flagged: HashSet<IpAddr>,
    pub unavailable: bool,
    pub location: Option<GeoPoint>,
}

impl StubIpIntel {
    pub fn flagging(ip: &str) -> Self {
        Self {
            flagged: HashSet::from([ip.parse().expect("ip")]),
            ..Self::default()
        }
    }
}

#[async_trait]
impl IpIntelProvider for StubIpIntel {
    async fn lookup(&self, ip: IpAddr) -> Result<IpIntel, IpIntelError> {
        if self.unavailable {
            return Err(IpIntelError::Status(502));
        }
        Ok(IpIntel {
            vpn: self.flagged.contains(&ip),
            proxy: false,
            tor: false,
            location: self.location,
        })
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(test_config(), StubIpIntel::flagging(VPN_IP))
    }

    pub fn with(config: Config, ip_intel: StubIpIntel) -> Self {
        let store = Arc::new(MemoryStore::default());
        let state = AppState::new(config, memory_repositories(&store), Arc::new(ip_intel))
            .expect("test config is valid");
        let router = app_router(state.clone());
        Self {
            store,
            state,
            router,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("call router");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}
