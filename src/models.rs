use serde::{Deserialize, Serialize};

/// One entry of `/v2/cursus/{id}/cursus_users`.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentRecord {
    pub id: u64,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub cursus_id: Option<u32>,
    #[serde(default)]
    pub blackholed_at: Option<String>,
    #[serde(default)]
    pub user: Option<StudentUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUser {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub displayname: Option<String>,
    #[serde(default)]
    pub usual_full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub wallet: Option<i64>,
    #[serde(default, rename = "active?")]
    pub active: Option<bool>,
    #[serde(default, rename = "alumni?")]
    pub alumni: Option<bool>,
    #[serde(default)]
    pub pool_month: Option<String>,
    #[serde(default)]
    pub pool_year: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StudentStatus {
    Alumni,
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Alumni => "Alumni",
            StudentStatus::Active => "Active",
            StudentStatus::Inactive => "Inactive",
        }
    }
}

/// Reduced view written to the export file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedRecord {
    pub id: u64,
    pub login: Option<String>,
    pub name: Option<String>,
    pub level: Option<f64>,
    pub grade: Option<String>,
    pub cursus_id: Option<u32>,
    pub blackholed_at: Option<String>,
    pub wallet: Option<i64>,
    pub pool_month: Option<String>,
    pub pool_year: Option<String>,
    pub status: StudentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Campus {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
}

impl Campus {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}
