//! End-to-end harvest scenarios: rotation, resume, interruption, dedup.
//!
//! The search transport is a scripted [`SearchApi`] stub; image downloads
//! go through a real wiremock server so the full download/hash/store path
//! is exercised.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use harvester_core::{
    CheckpointState, Credential, CredentialPool, FilterCombination, HarvestConfig, ImageClient,
    ImageItem, Orchestrator, PageResult, RunOutcome, SearchApi, SearchError, WorkUnit,
};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Scripted search transport: pops one response per page request, records
/// the credential key used, and can trip a cancel flag after N requests to
/// simulate an interrupt arriving mid-run.
struct StubSearch {
    responses: Mutex<VecDeque<Result<PageResult, SearchError>>>,
    keys_used: Mutex<Vec<String>>,
    calls: AtomicUsize,
    cancel_after: Option<(usize, std::sync::Arc<AtomicBool>)>,
}

impl StubSearch {
    fn new(responses: Vec<Result<PageResult, SearchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            keys_used: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    fn cancel_after(mut self, calls: usize, flag: std::sync::Arc<AtomicBool>) -> Self {
        self.cancel_after = Some((calls, flag));
        self
    }

    fn keys_used(&self) -> Vec<String> {
        self.keys_used.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchApi for StubSearch {
    async fn search_page(
        &self,
        _query: &str,
        _filters: &FilterCombination,
        _start_index: usize,
        _page_size: usize,
        credential: &Credential,
    ) -> Result<PageResult, SearchError> {
        self.keys_used.lock().unwrap().push(credential.key.clone());
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, flag)) = &self.cancel_after {
            if calls == *after {
                flag.store(true, Ordering::SeqCst);
            }
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(PageResult::Items(Vec::new())))
    }
}

fn config(dir: &TempDir, queries: &[&str], target_count: usize) -> HarvestConfig {
    HarvestConfig {
        queries: queries.iter().map(ToString::to_string).collect(),
        queries_file: PathBuf::from("queries.txt"),
        target_count,
        output_dir: dir.path().join("images"),
        prefix: "img".to_string(),
        use_date_filters: false,
        use_size_filters: false,
        progress_file: dir.path().join("progress.json"),
    }
}

fn pool_of(n: usize) -> CredentialPool {
    CredentialPool::new(
        (1..=n)
            .map(|i| Credential::new(format!("key-{i}"), format!("cx-{i}")))
            .collect(),
    )
    .unwrap()
}

fn item(server_uri: &str, name: &str) -> ImageItem {
    ImageItem {
        url: format!("{server_uri}/{name}"),
        source_page_url: format!("{server_uri}/page/{name}"),
        title: name.to_string(),
    }
}

/// Serves image bytes derived from the request path, so distinct paths are
/// distinct content unless mapped otherwise.
async fn image_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(|request: &Request| {
            let path = request.url.path().to_string();
            // Paths beginning with /same- all serve identical bytes.
            let body = if path.starts_with("/same-") {
                b"identical image content".to_vec()
            } else {
                path.into_bytes()
            };
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/jpeg")
                .set_body_bytes(body)
        })
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn quota_rotation_is_transparent_and_all_units_complete() {
    // Pool of 2; credential 1 runs dry on unit 3 of 5. Rotation must switch
    // to credential 2 mid-run and every unit still completes.
    let dir = TempDir::new().unwrap();
    let server = image_server().await;
    let uri = server.uri();

    let api = StubSearch::new(vec![
        Ok(PageResult::Items(vec![item(&uri, "u1.jpg")])),
        Ok(PageResult::Items(vec![item(&uri, "u2.jpg")])),
        Ok(PageResult::QuotaExceeded),
        Ok(PageResult::Items(vec![item(&uri, "u3.jpg")])),
        Ok(PageResult::Items(vec![item(&uri, "u4.jpg")])),
        Ok(PageResult::Items(vec![item(&uri, "u5.jpg")])),
    ]);
    let config = config(&dir, &["q1", "q2", "q3", "q4", "q5"], 1);
    let client = ImageClient::new();
    let orchestrator = Orchestrator::new(&config, &api, &client)
        .unwrap()
        .without_progress_bar();

    let mut checkpoint = CheckpointState::new(&config.progress_file);
    let mut pool = pool_of(2);
    let cancel = AtomicBool::new(false);

    let report = orchestrator
        .run(&mut checkpoint, &mut pool, &cancel)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed_units, 5);
    assert_eq!(report.stats.images_saved, 5);
    assert_eq!(report.credential_ordinal, 2);
    assert_eq!(report.credentials_exhausted, 1);
    // Unit 3's page was retried on credential 2 after the quota signal.
    assert_eq!(
        api.keys_used(),
        vec!["key-1", "key-1", "key-1", "key-2", "key-2", "key-2"]
    );
}

#[tokio::test]
async fn interrupt_mid_run_then_resume_skips_completed_units() {
    // Six work units; the interrupt flag trips after unit 4's fetch, so the
    // first run completes units 1-4 and saves. The resumed run must fetch
    // only units 5 and 6.
    let dir = TempDir::new().unwrap();
    let queries = ["q1", "q2", "q3", "q4", "q5", "q6"];
    let client = ImageClient::new();

    let cancel = std::sync::Arc::new(AtomicBool::new(false));
    let first_api = StubSearch::new(vec![
        Ok(PageResult::Items(Vec::new())),
        Ok(PageResult::Items(Vec::new())),
        Ok(PageResult::Items(Vec::new())),
        Ok(PageResult::Items(Vec::new())),
    ])
    .cancel_after(4, std::sync::Arc::clone(&cancel));

    let config = config(&dir, &queries, 10);
    let orchestrator = Orchestrator::new(&config, &first_api, &client)
        .unwrap()
        .without_progress_bar();

    let mut checkpoint = CheckpointState::new(&config.progress_file);
    let mut pool = pool_of(1);
    let report = orchestrator
        .run(&mut checkpoint, &mut pool, &cancel)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.completed_units, 4);
    assert_eq!(first_api.call_count(), 4);

    // Second invocation: fresh process, same checkpoint file.
    let second_api = StubSearch::new(vec![
        Ok(PageResult::Items(Vec::new())),
        Ok(PageResult::Items(Vec::new())),
    ]);
    let orchestrator = Orchestrator::new(&config, &second_api, &client)
        .unwrap()
        .without_progress_bar();

    let mut resumed = CheckpointState::new(&config.progress_file);
    assert!(resumed.load(), "interrupted session must be resumable");
    for filter_index in 0..1 {
        for query_index in 0..4 {
            assert!(resumed.is_unit_done(WorkUnit::new(query_index, filter_index)));
        }
    }

    let mut pool = pool_of(1);
    let cancel = AtomicBool::new(false);
    let report = orchestrator
        .run(&mut resumed, &mut pool, &cancel)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed_units, 6);
    assert_eq!(
        second_api.call_count(),
        2,
        "completed units must not be re-fetched"
    );
}

#[tokio::test]
async fn identical_bytes_under_two_urls_dedup_within_one_unit() {
    let dir = TempDir::new().unwrap();
    let server = image_server().await;
    let uri = server.uri();

    // Two different URLs, byte-identical bodies.
    let api = StubSearch::new(vec![Ok(PageResult::Items(vec![
        item(&uri, "same-first.jpg"),
        item(&uri, "same-second.jpg"),
    ]))]);
    let config = config(&dir, &["q1"], 2);
    let client = ImageClient::new();
    let orchestrator = Orchestrator::new(&config, &api, &client)
        .unwrap()
        .without_progress_bar();

    let mut checkpoint = CheckpointState::new(&config.progress_file);
    let mut pool = pool_of(1);
    let cancel = AtomicBool::new(false);

    let report = orchestrator
        .run(&mut checkpoint, &mut pool, &cancel)
        .await
        .unwrap();

    assert_eq!(report.stats.images_saved, 1);
    assert_eq!(report.stats.duplicates_skipped, 1);
    assert_eq!(checkpoint.ledger().counter(), 1);

    let files: Vec<_> = std::fs::read_dir(config.output_dir).unwrap().collect();
    assert_eq!(files.len(), 1, "duplicate content must be saved once");
}

#[tokio::test]
async fn dedup_persists_across_runs_through_the_checkpoint() {
    // A paused run saves the ledger; the resumed run must reject content it
    // already saved even though the unit serving it is different.
    let dir = TempDir::new().unwrap();
    let server = image_server().await;
    let uri = server.uri();
    let client = ImageClient::new();

    let first_api = StubSearch::new(vec![
        Ok(PageResult::Items(vec![item(&uri, "same-a.jpg")])),
        Ok(PageResult::QuotaExceeded),
    ]);
    let config = config(&dir, &["q1", "q2"], 1);
    let orchestrator = Orchestrator::new(&config, &first_api, &client)
        .unwrap()
        .without_progress_bar();

    let mut checkpoint = CheckpointState::new(&config.progress_file);
    let mut pool = pool_of(1);
    let cancel = AtomicBool::new(false);
    let report = orchestrator
        .run(&mut checkpoint, &mut pool, &cancel)
        .await
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::PausedExhausted);
    assert_eq!(report.stats.images_saved, 1);

    let second_api = StubSearch::new(vec![Ok(PageResult::Items(vec![item(
        &uri,
        "same-b.jpg",
    )]))]);
    let orchestrator = Orchestrator::new(&config, &second_api, &client)
        .unwrap()
        .without_progress_bar();

    let mut resumed = CheckpointState::new(&config.progress_file);
    assert!(resumed.load());
    let mut pool = pool_of(1);
    let report = orchestrator
        .run(&mut resumed, &mut pool, &cancel)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.stats.images_saved, 1, "cross-run duplicate rejected");
    assert_eq!(report.stats.duplicates_skipped, 1);
}

#[tokio::test]
async fn no_results_unit_is_reported_and_never_retried() {
    let dir = TempDir::new().unwrap();
    let api = StubSearch::new(vec![Ok(PageResult::Items(Vec::new()))]);
    let config = config(&dir, &["nothing here"], 10);
    let client = ImageClient::new();
    let orchestrator = Orchestrator::new(&config, &api, &client)
        .unwrap()
        .without_progress_bar();

    let mut checkpoint = CheckpointState::new(&config.progress_file);
    let mut pool = pool_of(1);
    let cancel = AtomicBool::new(false);
    let report = orchestrator
        .run(&mut checkpoint, &mut pool, &cancel)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.no_result_units, 1);
    assert!(checkpoint.is_unit_done(WorkUnit::new(0, 0)));

    // The session finished, so the next run starts a fresh plan rather
    // than retrying the empty unit.
    let mut next = CheckpointState::new(&config.progress_file);
    assert!(!next.load());
}

#[tokio::test]
async fn checkpoint_file_matches_documented_schema() {
    let dir = TempDir::new().unwrap();
    let server = image_server().await;
    let uri = server.uri();

    let api = StubSearch::new(vec![
        Ok(PageResult::Items(vec![item(&uri, "u1.jpg")])),
        Ok(PageResult::QuotaExceeded),
    ]);
    let config = config(&dir, &["q1", "q2"], 1);
    let client = ImageClient::new();
    let orchestrator = Orchestrator::new(&config, &api, &client)
        .unwrap()
        .without_progress_bar();

    let mut checkpoint = CheckpointState::new(&config.progress_file);
    let mut pool = pool_of(1);
    let cancel = AtomicBool::new(false);
    orchestrator
        .run(&mut checkpoint, &mut pool, &cancel)
        .await
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.progress_file).unwrap()).unwrap();
    assert_eq!(raw["status"], "in_progress");
    assert!(raw["started_at"].is_string());
    assert!(raw["updated_at"].is_string());
    assert_eq!(raw["queries_file"], "queries.txt");
    assert_eq!(raw["total_queries"], 2);
    assert_eq!(raw["total_combinations"], 2);
    assert!(raw["current_position"]["query_index"].is_number());
    assert_eq!(raw["completed"].as_array().unwrap().len(), 1);
    assert_eq!(raw["stats"]["images_saved"], 1);
    assert_eq!(raw["seen_hashes"].as_array().unwrap().len(), 1);
    assert_eq!(raw["image_counter"], 1);
}
