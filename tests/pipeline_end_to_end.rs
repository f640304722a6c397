/// Orchestrator tests driven through the public API with deterministic
/// collaborators from `scatterlens::testing`.
use std::sync::Arc;

use tokio::sync::Semaphore;

use scatterlens::config::Config;
use scatterlens::filter::{filtered_rows, FilterSpec, SentimentFilter};
use scatterlens::lexicon::{LexiconRootExtractor, SortOrder};
use scatterlens::model::Coords;
use scatterlens::pipeline::{Orchestrator, OrchestratorHandle, PipelineStatus, Services};
use scatterlens::segment::UnicodeSegmenter;
use scatterlens::sentiment::LexiconSentiment;
use scatterlens::testing::{
    DiagonalReducer, FailingReducer, FailingRoots, FailingSentiment, GatedReducer, StubEmbedder,
};

const SCENARIO: &str = "1\tI love the school. It is great.\tparents\n2\tBad traffic.\tparents";

fn topic_embedder() -> StubEmbedder {
    StubEmbedder::new(|t| {
        if t.to_lowercase().contains("traffic") {
            vec![0.0, 1.0]
        } else {
            vec![1.0, 0.0]
        }
    })
}

fn services(embedder: StubEmbedder) -> Services {
    Services {
        segmenter: Arc::new(UnicodeSegmenter),
        embedder: Arc::new(embedder),
        reducer: Arc::new(DiagonalReducer),
        sentiment: Arc::new(LexiconSentiment::new().unwrap()),
        roots: Arc::new(LexiconRootExtractor::new().unwrap()),
    }
}

fn spawn(services: Services) -> OrchestratorHandle {
    Orchestrator::spawn(services, Config::default())
}

// ── Happy path ───────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_merges_and_counts_roots() {
    let handle = spawn(services(topic_embedder()));
    let generation = handle.submit(SCENARIO).await.unwrap();
    let snap = handle.wait_until_settled(generation).await.unwrap();

    assert_eq!(snap.status, PipelineStatus::Complete);
    assert_eq!(snap.rows.len(), 2);
    assert_eq!(snap.merges, 1);
    assert_eq!(snap.rows[0].text, "I love the school. It is great.");
    assert_eq!(snap.rows[0].key().to_string(), "1-0");
    assert_eq!(snap.rows[1].id, 2);
    assert!(snap.rows.iter().all(|r| r.coords.is_some() && r.roots.is_some()));

    for root in ["love", "school", "great", "bad", "traffic"] {
        assert_eq!(snap.frequency.count(root), 1, "root {}", root);
    }
    assert_eq!(snap.frequency.len(), 5);
    let alpha: Vec<String> = snap
        .frequency
        .display(1, SortOrder::Alpha)
        .into_iter()
        .map(|(root, _)| root)
        .collect();
    assert_eq!(alpha, vec!["bad", "great", "love", "school", "traffic"]);
}

#[tokio::test]
async fn sentiment_pass_labels_every_row() {
    let handle = spawn(services(topic_embedder()));
    let generation = handle.submit(SCENARIO).await.unwrap();
    handle.wait_until_settled(generation).await.unwrap();

    handle.request_sentiment().await.unwrap();
    let snap = handle.wait_until_settled(generation).await.unwrap();

    assert_eq!(snap.status, PipelineStatus::Complete);
    assert!(snap.has_sentiment());
    assert!(snap.sentiment_error.is_none());

    // earlier stage outputs survive the sentiment pass
    assert_eq!(snap.rows.len(), 2);
    assert_eq!(snap.rows[0].coords, Some(Coords { x: 0.0, y: 0.0 }));
    assert_eq!(snap.rows[1].coords, Some(Coords { x: 1.0, y: 1.0 }));
    assert_eq!(
        snap.rows[1].roots.as_deref(),
        Some(&["bad".to_string(), "traffic".to_string()][..])
    );
    assert!(snap.rows.iter().all(|r| r.embedding.is_some() && r.roots.is_some()));
    assert_eq!(snap.frequency.count("love"), 1);

    let negative = FilterSpec {
        sentiment: SentimentFilter::Negative,
        ..Default::default()
    };
    let kept = filtered_rows(&snap.rows, &negative);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, 2);
}

// ── Generation guard ─────────────────────────────────────────────────────

#[tokio::test]
async fn newer_submission_supersedes_running_one() {
    let gate = Arc::new(Semaphore::new(0));
    let handle = spawn(services(topic_embedder().with_gate(Arc::clone(&gate))));

    let first = handle.submit("1\tOld school feedback.\tstaff").await.unwrap();
    handle
        .wait_for(|s| s.generation == first && s.status == PipelineStatus::Embedding)
        .await
        .unwrap();

    let second = handle.submit("7\tNew traffic plan.\tparents").await.unwrap();
    assert_eq!(second, first + 1);
    gate.add_permits(16);

    let snap = handle.wait_until_settled(second).await.unwrap();
    assert_eq!(snap.generation, 2);
    assert_eq!(snap.status, PipelineStatus::Complete);
    assert_eq!(snap.rows.len(), 1);
    assert_eq!(snap.rows[0].id, 7);
    assert_eq!(snap.stakeholders, vec!["parents"]);
    assert_eq!(snap.frequency.count("school"), 0);
}

#[tokio::test]
async fn late_result_from_superseded_run_is_dropped() {
    let (reducer, gate) = GatedReducer::new();
    let mut svc = services(topic_embedder());
    svc.reducer = Arc::new(reducer);
    let handle = spawn(svc);

    let first = handle
        .submit("1\tOld school feedback.\tstaff\n2\tOld notes.\tstaff")
        .await
        .unwrap();
    gate.entered().await;

    let second = handle.submit("7\tNew traffic plan.\tparents").await.unwrap();
    assert_eq!(second, first + 1);
    let settled = handle.wait_until_settled(second).await.unwrap();
    assert_eq!(settled.status, PipelineStatus::Complete);
    assert_eq!(settled.dropped_results, 0);

    // the first run's layout now finishes and reports for its old generation
    gate.release();
    let snap = handle
        .wait_for(|s| s.generation == second && s.dropped_results >= 1)
        .await
        .unwrap();

    assert_eq!(snap.status, PipelineStatus::Complete);
    assert!(snap.error.is_none());
    assert_eq!(snap.rows.len(), 1);
    assert_eq!(snap.rows[0].id, 7);
    assert_eq!(snap.rows[0].coords, Some(Coords { x: 0.0, y: 0.0 }));
    assert_eq!(snap.stakeholders, vec!["parents"]);
    assert_eq!(snap.frequency.count("school"), 0);
    assert_eq!(snap.frequency.count("traffic"), 1);
}

// ── Failures ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn reducer_failure_keeps_embedded_rows() {
    let mut svc = services(topic_embedder());
    svc.reducer = Arc::new(FailingReducer);
    let handle = spawn(svc);

    let generation = handle.submit(SCENARIO).await.unwrap();
    let snap = handle.wait_until_settled(generation).await.unwrap();

    assert_eq!(snap.status, PipelineStatus::Error);
    assert_eq!(snap.error.as_deref(), Some("Mapping failed: Reduction failed: layout diverged"));
    assert_eq!(snap.rows.len(), 2);
    assert!(snap.rows.iter().all(|r| r.embedding.is_some() && r.coords.is_none()));
}

#[tokio::test]
async fn embedding_failure_is_reported() {
    let handle = spawn(services(StubEmbedder::failing("quota exceeded")));
    let generation = handle.submit(SCENARIO).await.unwrap();
    let snap = handle.wait_until_settled(generation).await.unwrap();

    assert_eq!(snap.status, PipelineStatus::Error);
    let message = snap.error.unwrap();
    assert!(message.starts_with("Embedding failed"), "{}", message);
    assert!(message.contains("quota exceeded"));
    assert_eq!(snap.rows.len(), 3);
}

#[tokio::test]
async fn root_failure_is_pipeline_error() {
    let mut svc = services(topic_embedder());
    svc.roots = Arc::new(FailingRoots);
    let handle = spawn(svc);

    let generation = handle.submit(SCENARIO).await.unwrap();
    let snap = handle.wait_until_settled(generation).await.unwrap();

    assert_eq!(snap.status, PipelineStatus::Error);
    assert!(snap.error.unwrap().starts_with("Stemming failed"));
    assert!(snap.rows.iter().all(|r| r.coords.is_some()));
    assert!(snap.frequency.is_empty());
}

#[tokio::test]
async fn sentiment_failure_leaves_analysis_complete() {
    let mut svc = services(topic_embedder());
    svc.sentiment = Arc::new(FailingSentiment);
    let handle = spawn(svc);

    let generation = handle.submit(SCENARIO).await.unwrap();
    handle.wait_until_settled(generation).await.unwrap();
    handle.request_sentiment().await.unwrap();
    let snap = handle.wait_until_settled(generation).await.unwrap();

    assert_eq!(snap.status, PipelineStatus::Complete);
    assert!(snap.sentiment_error.unwrap().contains("model unavailable"));
    assert!(snap.rows.iter().all(|r| r.sentiment.is_none()));
    assert_eq!(snap.frequency.count("traffic"), 1);
}

// ── Views over a finished run ────────────────────────────────────────────

#[tokio::test]
async fn filters_apply_to_completed_snapshot() {
    let handle = spawn(services(topic_embedder()));
    let input = "1\tGreat teachers.\tparents\n2\tMore sport.\tstudents\n3\tTeachers care a lot.\tstaff";
    let generation = handle.submit(input).await.unwrap();
    let snap = handle.wait_until_settled(generation).await.unwrap();

    assert_eq!(snap.stakeholders, vec!["parents", "staff", "students"]);

    let spec = FilterSpec {
        stakeholders: vec!["parents".into(), "staff".into()],
        search: "TEACHERS".into(),
        ..Default::default()
    };
    let ids: Vec<i64> = filtered_rows(&snap.rows, &spec).iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3]);
}
