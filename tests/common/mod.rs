#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use sqlx::SqlitePool;
use std::env;
use tempfile::TempDir;
use uuid::Uuid;

use kickoff::{
    AppState, Config,
    database::{
        init_database,
        models::{
            SkillLevel, Team, TeamInput, TeamMember, TeamRole, TeamType, WaitingSlotInput,
        },
        transaction::DatabaseTransaction,
    },
    services::{
        membership,
        notifier::{DomainEvent, NotificationSink},
    },
};

/// Keeps every published event so tests can assert on them.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct TestContext {
    pub pool: SqlitePool,
    pub config: Config,
    pub state: AppState,
    pub sink: Arc<RecordingSink>,
    _temp_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let config = Config {
            database_url: format!("sqlite:{}/test.db", temp_dir.path().display()),
            ..Config::test_config()
        };

        let pool = init_database(&config).await?;
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::new(pool.clone(), sink.clone());

        Ok(TestContext {
            pool,
            config,
            state,
            sink,
            _temp_dir: temp_dir,
        })
    }

    /// A team led by `leader`.
    pub async fn team(&self, leader: Uuid, name: &str) -> Team {
        self.team_with(leader, name, "Hanbit University", SkillLevel::Amateur)
            .await
    }

    pub async fn team_with(
        &self,
        leader: Uuid,
        name: &str,
        university: &str,
        skill_level: SkillLevel,
    ) -> Team {
        self.state
            .membership
            .create_team(
                leader,
                TeamInput {
                    name: name.to_string(),
                    university: university.to_string(),
                    skill_level,
                    team_type: TeamType::DepartmentClub,
                    description: None,
                },
            )
            .await
            .expect("Failed to create team")
    }

    /// Insert a membership directly, bypassing the join-request flow.
    pub async fn member(&self, team_id: Uuid, user_id: Uuid, role: TeamRole) -> TeamMember {
        DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move { membership::add_member(tx, team_id, user_id, role).await })
        })
        .await
        .expect("Failed to add member")
    }

    pub async fn count(&self, table: &str) -> i64 {
        let query = format!("SELECT COUNT(*) FROM {}", table);
        sqlx::query_scalar::<_, i64>(&query)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count records")
    }
}

pub fn slot_input(owner_team_id: Uuid) -> WaitingSlotInput {
    WaitingSlotInput {
        owner_team_id,
        preferred_date: NaiveDate::from_ymd_opt(2026, 11, 14).unwrap(),
        time_start: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        time_end: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        venue_id: Uuid::new_v4(),
        skill_level_min: SkillLevel::Beginner,
        skill_level_max: SkillLevel::Pro,
        university_only: false,
        message: Some("Friendly match".to_string()),
    }
}

pub fn auth_header(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub fn setup_test_env() {
    unsafe {
        env::set_var("RUST_LOG", "debug");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}
