use poolcast::adapters::{DocumentStore, FsDocumentStore};
use poolcast::domain::{MatchProbabilityRecord, Outcome, ProbabilityTriple};
use poolcast::fusion::{parse_source_document, FusionEngine, FusionWarning, SourceRole, WeightingPolicy};
use poolcast::{AppConfig, FusionJob, PoolcastError, StrengthJob};
use serde_json::json;
use std::sync::Arc;

fn record(id: &str, win: f64, draw: f64, loss: f64) -> MatchProbabilityRecord {
    MatchProbabilityRecord {
        match_id: id.to_string(),
        league: "英超".to_string(),
        home_team: "阿森纳".to_string(),
        away_team: "切尔西".to_string(),
        kickoff: "2026-02-01 20:00".to_string(),
        probabilities: ProbabilityTriple::new(win, draw, loss),
    }
}

/// Discounted weighting: (0.5, 0.3, 0.2) * 0.8 + (0.1, 0.05, 0.05) = (0.5, 0.29, 0.21).
#[test]
fn discounted_weighting_scenario() {
    let engine = FusionEngine::new(WeightingPolicy::DiscountedBasic, 0.8);
    let run = engine
        .fuse(&[record("1", 0.50, 0.30, 0.20)], &[record("1", 0.10, 0.05, 0.05)], None)
        .unwrap();

    let fused = run.results[0].fused_probabilities;
    assert!((fused.win - 0.50).abs() < 1e-9);
    assert!((fused.draw - 0.29).abs() < 1e-9);
    assert!((fused.loss - 0.21).abs() < 1e-9);
    assert_eq!(run.results[0].outcome, Outcome::HomeWin);
}

/// Tie-break precedence on already-normalized inputs.
#[test]
fn tie_break_precedence() {
    let engine = FusionEngine::new(WeightingPolicy::UnweightedSum, 0.8);

    let home_draw_tie = engine
        .fuse(&[record("1", 0.2, 0.2, 0.1)], &[record("1", 0.2, 0.2, 0.1)], None)
        .unwrap();
    assert_eq!(home_draw_tie.results[0].outcome, Outcome::HomeWin);

    let draw_away_tie = engine
        .fuse(&[record("1", 0.1, 0.2, 0.2)], &[record("1", 0.1, 0.2, 0.2)], None)
        .unwrap();
    assert_eq!(draw_away_tie.results[0].outcome, Outcome::Draw);
}

/// All-zero sources fall back to the uniform triple and the home-win default.
#[test]
fn degenerate_sources() {
    let run = FusionEngine::default()
        .fuse(&[record("1", 0.0, 0.0, 0.0)], &[record("1", 0.0, 0.0, 0.0)], None)
        .unwrap();
    assert_eq!(run.results[0].fused_probabilities, ProbabilityTriple::UNIFORM);
    assert_eq!(run.results[0].outcome, Outcome::HomeWin);
}

/// Match "101" exists only in the basic source: skipped with a warning.
#[test]
fn unmatched_record_is_skipped() {
    let run = FusionEngine::default()
        .fuse(
            &[record("101", 0.5, 0.3, 0.2), record("102", 0.4, 0.3, 0.3)],
            &[record("102", 0.4, 0.3, 0.3)],
            None,
        )
        .unwrap();

    assert!(run.results.iter().all(|r| r.match_id != "101"));
    assert!(run.warnings.contains(&FusionWarning::UnmatchedRecord {
        match_id: "101".to_string(),
        missing_from: SourceRole::Advanced,
    }));
}

/// Percent strings from native-key documents feed the arithmetic as fractions.
#[test]
fn native_document_percentages() {
    let doc = json!({
        "期数": "26027期",
        "14场对战信息": [{
            "场次": 1, "主队": "阿森纳", "客队": "切尔西",
            "预测概率": { "阿森纳胜": "45.50%", "平": "30%", "切尔西胜": "bad" }
        }]
    });

    let parsed = parse_source_document(&doc).unwrap();
    let p = parsed.records[0].probabilities;
    assert!((p.win - 0.455).abs() < 1e-12);
    assert!((p.draw - 0.30).abs() < 1e-12);
    assert_eq!(p.loss, 0.0);
}

fn write_sources(store: &FsDocumentStore) {
    let basic = json!({
        "期数": "26027期",
        "14场对战信息": [
            { "场次": 1, "联赛": "英超", "主队": "阿森纳", "客队": "切尔西", "比赛时间": "2026-02-01 20:00",
              "预测概率": { "阿森纳胜": "50.00%", "平": "30.00%", "切尔西胜": "20.00%" } },
            { "场次": 2, "联赛": "西甲", "主队": "皇马", "客队": "巴萨", "比赛时间": "2026-02-01 22:00",
              "预测概率": { "皇马胜": "20.00%", "平": "30.00%", "巴萨胜": "50.00%" } },
            { "场次": 3, "联赛": "意甲", "主队": "米兰", "客队": "国米", "比赛时间": "2026-02-02 01:00",
              "预测概率": { "米兰胜": "35.00%", "平": "35.00%", "国米胜": "30.00%" } }
        ]
    });
    let advanced = json!({
        "期数": "26027期",
        "14场对战信息": [
            { "场次": 1, "主队": "阿森纳", "客队": "切尔西",
              "预测概率": { "阿森纳胜": "10.00%", "平": "5.00%", "切尔西胜": "5.00%" } },
            { "场次": 2, "主队": "皇马", "客队": "巴萨",
              "预测概率": { "皇马胜": "25.00%", "平": "25.00%", "巴萨胜": "50.00%" } }
        ]
    });
    let auxiliary = json!({
        "期数": "26027期",
        "14场对战信息": [
            { "场次": 1, "主队总实力分": 4.25, "客队总实力分": 2.0, "主队相对实力比": 0.68 }
        ]
    });

    store.write("result/26027期_预测概率.json", &basic).unwrap();
    store.write("result/26027期_高级预测概率.json", &advanced).unwrap();
    store.write("result/26027期_共同对手实力分.json", &auxiliary).unwrap();
}

/// Files in, report out: the full job against the filesystem store.
#[test]
fn fusion_job_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsDocumentStore::new(dir.path()));
    write_sources(&store);

    let job = FusionJob::from_config(store.clone(), &AppConfig::default_config());
    let period = job.resolve_period(None, None).unwrap();
    assert_eq!(period, 26027);

    let output = job.run(period).unwrap();
    let report = &output.report;

    assert_eq!(report.period, "26027期");
    assert_eq!(report.weighting, "discounted_basic");
    assert_eq!(report.matches.len(), 2);
    assert_eq!(report.ticket(), "30");
    assert_eq!(report.skipped_matches(), vec!["3"]);
    assert!(report.matches[0].auxiliary.is_some());
    assert!(report.matches[1].auxiliary.is_none());
    assert!(report.sources.auxiliary.is_some());
    for m in &report.matches {
        assert!((m.fused_probabilities.sum() - 1.0).abs() < 1e-9);
    }

    let written = store.read(&output.output_key).unwrap().unwrap();
    assert_eq!(written["matches"][0]["outcome"], "HOME_WIN");
    assert_eq!(written["matches"][0]["auxiliary"]["主队总实力分"], 4.25);
    assert!(dir.path().join("result/26027期_融合预测.json").exists());
}

/// The strength job's output is picked up by the fusion job as auxiliary data.
#[test]
fn strength_scores_flow_into_fusion() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsDocumentStore::new(dir.path()));
    write_sources(&store);
    std::fs::remove_file(dir.path().join("result/26027期_共同对手实力分.json")).unwrap();

    let history = json!({
        "期数": "26027期",
        "14场对战信息": [
            { "场次": 1, "主队": "阿森纳", "客队": "切尔西", "比赛时间": "2026-02-01 20:00",
              "历史交锋数据": { "data": {
                  "home": { "matches": [
                      { "homesxname": "阿森纳", "awaysxname": "热刺", "homescore": 2, "awayscore": 0, "matchdate": "2026-01-18" }
                  ] },
                  "away": { "matches": [
                      { "homesxname": "热刺", "awaysxname": "切尔西", "homescore": 2, "awayscore": 1, "matchdate": "2026-01-25" }
                  ] }
              } } },
            { "场次": 2, "主队": "皇马", "客队": "巴萨" }
        ]
    });
    store.write("result/26027期_历史交锋.json", &history).unwrap();

    let config = AppConfig::default_config();
    let strength = StrengthJob::from_config(store.clone(), &config);
    let as_of = chrono::NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
    strength.run(26027, as_of).unwrap();

    let output = FusionJob::from_config(store, &config).run(26027).unwrap();
    let report = &output.report;
    assert!(!report
        .warnings
        .iter()
        .any(|w| matches!(w, FusionWarning::MissingAuxiliary { .. } | FusionWarning::EmptyAuxiliary)));

    let first = report.matches[0].auxiliary.as_ref().unwrap();
    assert_eq!(first.get("主队相对实力比"), Some(&json!(0.664)));
    assert_eq!(first.get("共同对手数"), Some(&json!(1)));
    let second = report.matches[1].auxiliary.as_ref().unwrap();
    assert_eq!(second.get("错误"), Some(&json!("未找到历史交锋数据")));
    assert_eq!(second.get("主队相对实力比"), Some(&json!(0.5)));
}

/// A missing mandatory document is a hard failure and nothing is written.
#[test]
fn missing_mandatory_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsDocumentStore::new(dir.path()));
    write_sources(&store);
    std::fs::remove_file(dir.path().join("result/26027期_预测概率.json")).unwrap();

    let job = FusionJob::from_config(store, &AppConfig::default_config());
    let err = job.run(26027).unwrap_err();

    assert!(matches!(err, PoolcastError::MissingInput(_)));
    assert!(!dir.path().join("result/26027期_融合预测.json").exists());
}

/// An empty mandatory document is also fatal.
#[test]
fn empty_mandatory_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsDocumentStore::new(dir.path()));
    write_sources(&store);
    store
        .write(
            "result/26027期_高级预测概率.json",
            &json!({ "期数": "26027期", "14场对战信息": [] }),
        )
        .unwrap();

    let job = FusionJob::from_config(store, &AppConfig::default_config());
    assert!(matches!(job.run(26027), Err(PoolcastError::EmptyInput(_))));
}
