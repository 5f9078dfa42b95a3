//! End-to-end tests through the engine facade and configuration

use tempfile::tempdir;

use xpengine::progression::AwardOutcome;
use xpengine::{ActionKind, Config, LevelUp, ProgressionEngine};

#[tokio::test]
async fn test_five_missions_reach_level_two() {
    let engine = ProgressionEngine::in_memory(&Config::default()).unwrap();

    let mut level_ups = Vec::new();
    for _ in 0..5 {
        let outcome = engine.award("alice", "complete_mission").await.unwrap();
        level_ups.push(outcome.level_up().cloned());
    }

    assert_eq!(
        level_ups,
        vec![
            None,
            None,
            None,
            None,
            Some(LevelUp {
                old_level: 1,
                new_level: 2
            })
        ]
    );
    let (record, _) = engine.progress("alice").await.unwrap().unwrap();
    assert_eq!(record.total_xp, 100);
    assert_eq!(record.level, 2);
}

#[tokio::test]
async fn test_progress_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("progress.db");
    let config = Config::default();

    {
        let engine = ProgressionEngine::with_path(&path, &config).unwrap();
        engine.award("alice", "view_milestone").await.unwrap();
        engine.award("alice", "view_milestone").await.unwrap();
        engine.award("alice", "publish_content").await.unwrap();
    }

    let engine = ProgressionEngine::with_path(&path, &config).unwrap();
    let (record, progress) = engine.progress("alice").await.unwrap().unwrap();
    assert_eq!(record.total_xp, 250);
    assert_eq!(record.level, 3);
    assert_eq!(progress.next_level_xp, Some(500));
    assert_eq!(engine.history("alice", 10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_config_overrides_apply() {
    let config = Config::from_toml(
        r#"
        [levels]
        thresholds = [0, 25]

        [rewards]
        receive_like = 30
        daily_login = 0
        "#,
    )
    .unwrap();
    let engine = ProgressionEngine::in_memory(&config).unwrap();

    let skipped = engine.award("alice", "daily_login").await.unwrap();
    assert!(matches!(skipped, AwardOutcome::Skipped(_)));
    assert!(engine.progress("alice").await.unwrap().is_none());

    let liked = engine.award("alice", "receive_like").await.unwrap();
    assert_eq!(liked.award().unwrap().action, ActionKind::ReceiveLike);
    assert_eq!(liked.level_up().map(|l| l.new_level), Some(2));

    let (_, progress) = engine.progress("alice").await.unwrap().unwrap();
    assert!(progress.is_max_level());
}

#[test]
fn test_invalid_config_is_rejected_by_engine() {
    let mut config = Config::default();
    config.levels.thresholds = Some(vec![0, 0]);
    assert!(ProgressionEngine::in_memory(&config).is_err());
}
