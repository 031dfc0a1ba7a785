//! Batch sync across several real repositories.

mod common;

use common::{no_credential, path_str, GitFixture};
use syncstack::engine::Operation;
use syncstack::{parse_repo_list, EngineConfig, RepoSpec, Strategy, SyncEngine};

fn spec(name: &str, url: &str) -> RepoSpec {
    RepoSpec {
        full_name: name.to_string(),
        clone_url: url.to_string(),
    }
}

#[test]
fn test_batch_is_total_with_failing_entry() {
    let fixture = GitFixture::new();
    let alpha = fixture.remote("alpha");
    let beta = fixture.remote("beta");
    let missing = fixture.root().join("remotes/missing.git");
    let engine = fixture.engine();

    let repos = vec![
        spec("octo/alpha", &path_str(&alpha)),
        spec("octo/missing", &path_str(&missing)),
        spec("../outside", &path_str(&alpha)),
        spec("octo/beta", &path_str(&beta)),
    ];

    let batch = engine.batch_sync(&no_credential(), &repos, Strategy::Pull);

    assert_eq!(batch.len(), 4);
    let names: Vec<&str> = batch.results.iter().map(|e| e.repo.as_str()).collect();
    assert_eq!(names, vec!["octo/alpha", "octo/missing", "../outside", "octo/beta"]);

    assert!(batch.results[0].result.success);
    assert!(!batch.results[1].result.success);
    assert!(!batch.results[2].result.success);
    assert!(batch.results[3].result.success);

    let workspace = fixture.workspace();
    assert!(workspace.join("octo/alpha/README.md").is_file());
    assert!(workspace.join("octo/beta/README.md").is_file());
    assert!(!fixture.root().join("outside").exists());
}

#[test]
fn test_second_batch_pulls_existing_copies() {
    let fixture = GitFixture::new();
    let alpha = fixture.remote("alpha");
    let engine = fixture.engine();
    let repos = vec![spec("octo/alpha", &path_str(&alpha))];

    let first = engine.batch_sync(&no_credential(), &repos, Strategy::Pull);
    assert_eq!(first.results[0].result.operation, Operation::Clone);

    fixture.push_upstream("alpha", "NEWS.md", "news\n", "News");
    let second = engine.batch_sync(&no_credential(), &repos, Strategy::Pull);

    let result = &second.results[0].result;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.operation, Operation::Pull);
    assert!(result.snapshot.is_some());
    assert!(fixture.workspace().join("octo/alpha/NEWS.md").is_file());
}

#[test]
fn test_parallel_batch_matches_input_order() {
    let fixture = GitFixture::new();
    let names = ["one", "two", "three", "four", "five"];
    let repos: Vec<RepoSpec> = names
        .iter()
        .map(|name| spec(&format!("team/{}", name), &path_str(&fixture.remote(name))))
        .collect();

    let config = EngineConfig {
        batch_parallelism: 3,
        ..fixture.config()
    };
    let engine = SyncEngine::from_config(&config);

    let batch = engine.batch_sync(&no_credential(), &repos, Strategy::Reset);

    assert_eq!(batch.len(), names.len());
    assert_eq!(batch.succeeded(), names.len());
    for (entry, name) in batch.results.iter().zip(names) {
        assert_eq!(entry.repo, format!("team/{}", name));
        assert_eq!(entry.result.operation, Operation::Clone);
    }
}

#[test]
fn test_repo_list_from_hosting_json() {
    let fixture = GitFixture::new();
    let alpha = fixture.remote("alpha");
    let json = format!(
        r#"[{{"fullName": "octo/alpha", "cloneUrl": "{}", "private": false}}]"#,
        path_str(&alpha).replace('\\', "\\\\")
    );

    let repos = parse_repo_list(&json).unwrap();
    let batch = fixture.engine().batch_sync(&no_credential(), &repos, Strategy::Pull);

    assert_eq!(batch.succeeded(), 1);
    let value = serde_json::to_value(&batch).unwrap();
    assert_eq!(value["results"][0]["repo"], "octo/alpha");
    assert_eq!(value["results"][0]["result"]["operation"], "clone");
}
