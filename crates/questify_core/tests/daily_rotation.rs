use chrono::{TimeZone, Utc};
use questify_core::db::open_db_in_memory;
use questify_core::{
    EngineConfig, ErrorKind, FixedClock, ProgressService, SqliteTaskPoolRepository,
    SqliteUserRepository, TaskPoolService,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rusqlite::Connection;
use std::collections::HashSet;

type Service<'a> = ProgressService<
    SqliteUserRepository<'a>,
    SqliteTaskPoolRepository<'a>,
    &'a FixedClock,
    ChaCha8Rng,
>;

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
        .unwrap()
        .timestamp_millis()
}

fn service<'a>(conn: &'a Connection, clock: &'a FixedClock, config: EngineConfig) -> Service<'a> {
    ProgressService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteTaskPoolRepository::try_new(conn).unwrap(),
        clock,
        ChaCha8Rng::seed_from_u64(11),
        config,
    )
    .unwrap()
}

fn seed_pool(conn: &Connection) {
    TaskPoolService::new(SqliteTaskPoolRepository::try_new(conn).unwrap())
        .seed_default_pool()
        .unwrap();
}

#[test]
fn first_request_assigns_three_pending_quests_stamped_now() {
    let conn = open_db_in_memory().unwrap();
    seed_pool(&conn);
    let now = at(2024, 5, 1, 9, 30);
    let clock = FixedClock::new(now);
    let mut service = service(&conn, &clock, EngineConfig::default());
    service.create_user("alice", "secret-pass").unwrap();

    let daily = service.get_or_rotate_daily_tasks("alice").unwrap();
    assert_eq!(daily.tasks.len(), 3);
    assert_eq!(daily.assigned_at, now);
    assert!(daily.tasks.iter().all(|task| !task.completed));
    let titles: HashSet<_> = daily.tasks.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(titles.len(), 3);

    let stored = service.get_user("alice").unwrap();
    assert_eq!(stored.daily, Some(daily));
}

#[test]
fn same_day_requests_keep_the_assignment_and_its_progress() {
    let conn = open_db_in_memory().unwrap();
    seed_pool(&conn);
    let clock = FixedClock::new(at(2024, 5, 1, 0, 1));
    let mut service = service(&conn, &clock, EngineConfig::default());
    service.create_user("alice", "secret-pass").unwrap();

    let morning = service.get_or_rotate_daily_tasks("alice").unwrap();
    service.complete_daily_task("alice", 1).unwrap();
    let version_before = service.get_user("alice").unwrap().version;

    clock.set(at(2024, 5, 1, 23, 59));
    let evening = service.get_or_rotate_daily_tasks("alice").unwrap();
    assert_eq!(evening.assigned_at, morning.assigned_at);
    assert_eq!(
        evening.tasks.iter().map(|t| &t.title).collect::<Vec<_>>(),
        morning.tasks.iter().map(|t| &t.title).collect::<Vec<_>>()
    );
    assert!(evening.tasks[1].completed);
    assert_eq!(service.get_user("alice").unwrap().version, version_before);
}

#[test]
fn next_day_rotates_and_clears_completion() {
    let conn = open_db_in_memory().unwrap();
    seed_pool(&conn);
    let clock = FixedClock::new(at(2024, 4, 30, 23, 59));
    let mut service = service(&conn, &clock, EngineConfig::default());
    service.create_user("alice", "secret-pass").unwrap();

    service.get_or_rotate_daily_tasks("alice").unwrap();
    service.complete_daily_task("alice", 0).unwrap();

    let tomorrow = at(2024, 5, 1, 0, 1);
    clock.set(tomorrow);
    let fresh = service.get_or_rotate_daily_tasks("alice").unwrap();
    assert_eq!(fresh.assigned_at, tomorrow);
    assert_eq!(fresh.tasks.len(), 3);
    assert_eq!(fresh.completed_count(), 0);

    // Rotation never touches XP already earned.
    assert_eq!(service.get_user("alice").unwrap().xp, 15);
}

#[test]
fn explicit_now_overrides_the_clock() {
    let conn = open_db_in_memory().unwrap();
    seed_pool(&conn);
    let clock = FixedClock::new(at(2024, 5, 1, 12, 0));
    let mut service = service(&conn, &clock, EngineConfig::default());
    service.create_user("alice", "secret-pass").unwrap();

    let now = at(2030, 1, 1, 8, 0);
    let daily = service.get_or_rotate_daily_tasks_at("alice", now).unwrap();
    assert_eq!(daily.assigned_at, now);
}

#[test]
fn day_boundary_follows_configured_offset() {
    let conn = open_db_in_memory().unwrap();
    seed_pool(&conn);
    let clock = FixedClock::new(at(2024, 5, 1, 21, 30));
    let config = EngineConfig {
        day_offset_minutes: 120,
        ..EngineConfig::default()
    };
    let mut service = service(&conn, &clock, config);
    service.create_user("alice", "secret-pass").unwrap();

    let before = service.get_or_rotate_daily_tasks("alice").unwrap();

    // 22:30 UTC is already May 2nd at +02:00.
    clock.set(at(2024, 5, 1, 22, 30));
    let after = service.get_or_rotate_daily_tasks("alice").unwrap();
    assert_ne!(after.assigned_at, before.assigned_at);
}

#[test]
fn force_refresh_replaces_a_fresh_assignment() {
    let conn = open_db_in_memory().unwrap();
    seed_pool(&conn);
    let clock = FixedClock::new(at(2024, 5, 1, 8, 0));
    let mut service = service(&conn, &clock, EngineConfig::default());
    service.create_user("alice", "secret-pass").unwrap();

    service.get_or_rotate_daily_tasks("alice").unwrap();
    service.complete_daily_task("alice", 2).unwrap();

    clock.advance(60_000);
    let refreshed = service.force_refresh_daily_tasks("alice").unwrap();
    assert_eq!(refreshed.assigned_at, at(2024, 5, 1, 8, 1));
    assert_eq!(refreshed.tasks.len(), 3);
    assert_eq!(refreshed.completed_count(), 0);
}

#[test]
fn empty_pool_yields_empty_assignment_and_retries_next_time() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(at(2024, 5, 1, 8, 0));
    let mut service = service(&conn, &clock, EngineConfig::default());
    service.create_user("alice", "secret-pass").unwrap();

    let empty = service.get_or_rotate_daily_tasks("alice").unwrap();
    assert!(empty.tasks.is_empty());

    seed_pool(&conn);
    clock.advance(1_000);
    let filled = service.get_or_rotate_daily_tasks("alice").unwrap();
    assert_eq!(filled.tasks.len(), 3);
}

#[test]
fn sparse_pool_assigns_everything_available() {
    let conn = open_db_in_memory().unwrap();
    let pool_service = TaskPoolService::new(SqliteTaskPoolRepository::try_new(&conn).unwrap());
    pool_service.add_pool_entry("Read", None, None).unwrap();
    pool_service.add_pool_entry("Run", None, None).unwrap();

    let clock = FixedClock::new(at(2024, 5, 1, 8, 0));
    let mut service = service(&conn, &clock, EngineConfig::default());
    service.create_user("alice", "secret-pass").unwrap();

    let daily = service.get_or_rotate_daily_tasks("alice").unwrap();
    let titles: HashSet<_> = daily.tasks.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(titles, HashSet::from(["Read", "Run"]));
}

#[test]
fn configured_quest_count_is_respected() {
    let conn = open_db_in_memory().unwrap();
    seed_pool(&conn);
    let clock = FixedClock::new(at(2024, 5, 1, 8, 0));
    let config = EngineConfig {
        daily_task_count: 5,
        ..EngineConfig::default()
    };
    let mut service = service(&conn, &clock, config);
    service.create_user("alice", "secret-pass").unwrap();

    assert_eq!(
        service.get_or_rotate_daily_tasks("alice").unwrap().tasks.len(),
        5
    );
}

#[test]
fn unknown_user_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed_pool(&conn);
    let clock = FixedClock::new(at(2024, 5, 1, 8, 0));
    let mut service = service(&conn, &clock, EngineConfig::default());

    let err = service.get_or_rotate_daily_tasks("ghost").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.force_refresh_daily_tasks("ghost").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
