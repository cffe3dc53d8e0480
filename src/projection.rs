use crate::models::{ProjectedRecord, StudentRecord, StudentStatus, StudentUser};

pub fn project_records(records: &[StudentRecord]) -> Vec<ProjectedRecord> {
    records.iter().map(project).collect()
}

/// Records without a user project with every user field empty.
pub fn project(record: &StudentRecord) -> ProjectedRecord {
    let missing = StudentUser::default();
    let user = record.user.as_ref().unwrap_or(&missing);
    ProjectedRecord {
        id: record.id,
        login: user.login.clone(),
        name: display_name(user),
        level: record.level,
        grade: record.grade.clone(),
        cursus_id: record.cursus_id,
        blackholed_at: record.blackholed_at.clone(),
        wallet: user.wallet,
        pool_month: user.pool_month.clone(),
        pool_year: user.pool_year.clone(),
        status: status_of(user),
    }
}

pub fn status_of(user: &StudentUser) -> StudentStatus {
    match (user.alumni.unwrap_or(false), user.active.unwrap_or(false)) {
        (true, _) => StudentStatus::Alumni,
        (false, true) => StudentStatus::Active,
        (false, false) => StudentStatus::Inactive,
    }
}

pub fn display_name(user: &StudentUser) -> Option<String> {
    if let Some(name) = non_blank(&user.usual_full_name).or_else(|| non_blank(&user.displayname)) {
        return Some(name.to_string());
    }

    let parts: Vec<&str> = [non_blank(&user.first_name), non_blank(&user.last_name)]
        .into_iter()
        .flatten()
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
