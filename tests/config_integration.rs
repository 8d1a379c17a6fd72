use std::time::Duration;

use pagelink::config::{ConfigFlags, SyncConfig, load_config_flags, parse_flag_tokens};
use pagelink::sync::{Command, Event, SyncController, TimerKind};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".pagelinkrc");
    let content = r#"
# comment
--sync-scroll

--zoom 150
   
--highlight-ms=900
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.sync_scroll);
    assert_eq!(flags.zoom, Some(150));
    assert_eq!(flags.highlight_ms, Some(900));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".pagelinkrc");
    let content = "--sync-scroll\n--zoom 150\n--echo-window-ms 80\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "pagelink".to_string(),
        "--zoom".to_string(),
        "200".to_string(),
        "--perf".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.sync_scroll, "file flags should remain enabled");
    assert!(effective.perf, "cli flags should be applied");
    assert_eq!(effective.zoom, Some(200), "cli should override zoom");
    assert_eq!(
        effective.echo_window_ms,
        Some(80),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "pagelink".to_string(),
        "--zoom=75".to_string(),
        "--viewport-height=600".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.zoom, Some(75));
    assert_eq!(flags.viewport_height, Some(600));
}

#[test]
fn test_config_union_merges_booleans() {
    let file = ConfigFlags {
        sync_scroll: true,
        ..ConfigFlags::default()
    };
    let cli = ConfigFlags {
        perf: true,
        ..ConfigFlags::default()
    };
    let merged = file.union(&cli);
    assert!(merged.sync_scroll);
    assert!(merged.perf);
}

#[test]
fn test_configured_durations_reach_controller_timers() {
    let flags = parse_flag_tokens(&[
        "--highlight-ms".to_string(),
        "500".to_string(),
        "--echo-window-ms".to_string(),
        "40".to_string(),
    ]);
    let config = flags.sync_config();
    assert_eq!(config.highlight_duration, Duration::from_millis(500));

    let mut controller =
        SyncController::open(config, Vec::new(), "<!-- @block:b1 0,0,10,10 -->\nBody");
    let commands = controller.handle(Event::BlockClicked {
        block_id: "b1".to_string().try_into().unwrap(),
    });
    let delays: Vec<(TimerKind, u64)> = commands
        .iter()
        .filter_map(|command| match command {
            Command::ScheduleTimer { token, after_ms } => Some((token.kind, *after_ms)),
            _ => None,
        })
        .collect();
    assert_eq!(
        delays,
        vec![(TimerKind::EchoRelease, 40), (TimerKind::Highlight, 500)]
    );
}

#[test]
fn test_default_config_matches_documented_values() {
    let config = SyncConfig::default();
    assert_eq!(config.zoom_level, 100);
    assert!((config.viewport_height - 800.0).abs() < f64::EPSILON);
    assert_eq!(config.echo_window, Duration::from_millis(150));
    assert!(!config.sync_scroll);
}
