use tracing::{info, warn};

use crate::error::FetchError;
use crate::fetch::{FetchOutcome, Paginator};
use crate::models::Campus;

const CAMPUS_PATH: &str = "/v2/campus";

pub async fn list_campuses(paginator: &Paginator<'_>) -> Result<FetchOutcome<Campus>, FetchError> {
    let params = vec![("sort".to_string(), "id".to_string())];
    paginator.fetch_all(CAMPUS_PATH, &params).await
}

/// First campus whose name contains `needle`, ignoring case.
pub fn find_campus<'a>(campuses: &'a [Campus], needle: &str) -> Option<&'a Campus> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    campuses
        .iter()
        .find(|campus| campus.name().to_lowercase().contains(&needle))
}

pub fn filter_campuses<'a>(campuses: &'a [Campus], needle: Option<&str>) -> Vec<&'a Campus> {
    match needle.map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty()) {
        Some(needle) => campuses
            .iter()
            .filter(|campus| campus.name().to_lowercase().contains(&needle))
            .collect(),
        None => campuses.iter().collect(),
    }
}

/// Look the campus up by name, keeping `fallback_id` when nothing matches.
pub async fn resolve_campus_id(
    paginator: &Paginator<'_>,
    name: &str,
    fallback_id: u32,
) -> Result<u32, FetchError> {
    let outcome = list_campuses(paginator).await?;

    match find_campus(&outcome.records, name) {
        Some(campus) => {
            info!(campus_id = campus.id, campus = campus.name(), "resolved campus");
            Ok(campus.id)
        }
        None => {
            warn!(
                campus_name = name,
                fallback_id, "no campus matched, using fallback campus id"
            );
            Ok(fallback_id)
        }
    }
}
