mod cli_support;

use cli_support::{run_cli, run_cli_json};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct ConfigOutput {
    config_file_exists: bool,
    store: String,
    history: String,
    settings: Value,
}

#[derive(Debug, Deserialize)]
struct CheckOutput {
    recommendation: String,
    similar_posts: Vec<SimilarPost>,
}

#[derive(Debug, Deserialize)]
struct SimilarPost {
    slug: String,
    similarity: f64,
}

fn seed_store(home: &TempDir) {
    let rows = serde_json::json!([
        {
            "id": "1",
            "title": "실손보험 청구 방법",
            "slug": "silson-claim",
            "keywords": ["실손보험 청구 방법"],
            "category_id": "insurance",
            "status": "published",
            "created_at": "2026-01-05T09:00:00Z"
        },
        {
            "id": "2",
            "title": "전세 대출 금리 비교",
            "slug": "jeonse-rates",
            "keywords": ["전세 대출 금리"],
            "category_id": "finance",
            "status": "published",
            "created_at": "2026-01-06T09:00:00Z"
        }
    ]);
    fs::write(home.path().join("content.json"), rows.to_string()).unwrap();
}

#[test]
fn test_config_json_uses_defaults_without_file() {
    let home = TempDir::new().unwrap();
    let output: ConfigOutput = run_cli_json(&["config", "--json"], home.path());

    assert!(!output.config_file_exists);
    assert!(output.store.ends_with("content.json"));
    assert!(output.history.ends_with("jobs.json"));
    assert_eq!(output.settings["generation"]["command"], "claude");
    assert_eq!(output.settings["rate_limits"]["jobs.start"]["max"], 10);
}

#[test]
fn test_check_json_flags_covered_keyword() {
    let home = TempDir::new().unwrap();
    seed_store(&home);

    let output: CheckOutput = run_cli_json(&["check", "실손보험 청구 방법", "--json"], home.path());
    assert_eq!(output.recommendation, "skip");
    assert_eq!(output.similar_posts[0].slug, "silson-claim");
    assert!(output.similar_posts[0].similarity >= 0.8);
}

#[test]
fn test_blank_keyword_is_json_error() {
    let home = TempDir::new().unwrap();
    let output = run_cli(&["check", "   ", "--json"], home.path());

    assert!(!output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["error"]["message"], "Keyword must not be empty");
}

#[test]
fn test_invalid_config_is_reported() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("config.toml"),
        "[duplicate]\nretain_threshold = 0.9\nskip_threshold = 0.5\n",
    )
    .unwrap();

    let output = run_cli(&["config", "--json"], home.path());
    assert!(!output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Invalid configuration"));
}

#[test]
fn test_jobs_json_empty_history() {
    let home = TempDir::new().unwrap();
    let jobs: Vec<Value> = run_cli_json(&["jobs", "--json"], home.path());
    assert!(jobs.is_empty());
}

#[cfg(unix)]
#[test]
fn test_manual_run_stores_draft_and_records_job() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("config.toml"),
        r#"
[generation]
command = "sh"
args = ["-c", "cat > /dev/null; printf '# 자동차보험 갱신 팁\\n\\n본문입니다.\\n'"]
"#,
    )
    .unwrap();

    let run: Value = run_cli_json(
        &["run", "--keyword", "자동차보험 갱신", "--json"],
        home.path(),
    );
    assert_eq!(run["job"]["mode"], "manual");
    assert_eq!(run["job"]["stage"], "done");
    assert_eq!(run["job"]["results"][0]["title"], "자동차보험 갱신 팁");

    let stored: Vec<Value> =
        serde_json::from_str(&fs::read_to_string(home.path().join("content.json")).unwrap())
            .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["title"], "자동차보험 갱신 팁");
    assert!(stored[0]["body"].as_str().unwrap().contains("본문입니다."));

    let jobs: Vec<Value> = run_cli_json(&["jobs", "--json"], home.path());
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], run["job"]["id"]);

    let cleared: Value = run_cli_json(&["jobs", "--clear", "--json"], home.path());
    assert_eq!(cleared["removed"], 1);
}
