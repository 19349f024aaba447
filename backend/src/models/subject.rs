//! Departments and subjects. A subject's department is its geofence center.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{
    services::geo::GeoPoint,
    types::{DepartmentId, SemesterId, SubjectId, UserId},
};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Department {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub department_id: DepartmentId,
    pub semester_id: Option<SemesterId>,
    pub teacher_id: Option<UserId>,
}
