use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    database::{
        models::{SkillLevel, Team, TeamType},
        repositories::team as team_repo,
    },
    error::AppError,
};

pub const MAX_PAGE_SIZE: u32 = 100;

/// Conjunction of optional constraints. An empty set constrains nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamFilter {
    #[serde(default)]
    pub skill_levels: Vec<SkillLevel>,
    #[serde(default)]
    pub team_types: Vec<TeamType>,
    pub max_member_count: Option<i64>,
}

impl TeamFilter {
    pub fn matches(&self, team: &Team) -> bool {
        (self.skill_levels.is_empty() || self.skill_levels.contains(&team.skill_level))
            && (self.team_types.is_empty() || self.team_types.contains(&team.team_type))
            && self
                .max_member_count
                .is_none_or(|max| team.member_count <= max)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

/// Zero-based page over an already filtered list. Pages past the end are
/// empty rather than an error.
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> Result<Page<T>, AppError> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "pageSize must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let total_items = items.len() as u64;
    let total_pages = total_items.div_ceil(page_size as u64);
    let start = page as usize * page_size as usize;

    let items = items
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();

    Ok(Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    })
}

#[derive(Clone)]
pub struct ListingService {
    pool: SqlitePool,
}

impl ListingService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Teams of a university, newest first, filtered then paged.
    pub async fn list_teams(
        &self,
        university: &str,
        filter: &TeamFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Team>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let teams = team_repo::get_teams_by_university(&mut conn, university).await?;

        let matching = teams.into_iter().filter(|t| filter.matches(t)).collect();
        paginate(matching, page, page_size)
    }
}
