use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, routing::post, Form, Json, Router};
use knox_core::{ItemOutcome, KnoxConfig, PipelineDriver};
use serde_json::{json, Value};
use tokio::sync::watch;

#[derive(Clone, Default)]
struct Remote {
    graphs: Arc<Mutex<Vec<HashMap<String, String>>>>,
    word_counts: Arc<Mutex<Vec<Value>>>,
    lemmatized: Arc<Mutex<Vec<String>>>,
}

async fn lemmatize(State(remote): State<Remote>, Json(body): Json<Value>) -> Json<Value> {
    let text = body["string"].as_str().unwrap_or_default().to_string();
    remote.lemmatized.lock().unwrap().push(body["language"].as_str().unwrap_or_default().to_string());
    Json(json!({ "lemmatized_string": text.replace("runs", "run") }))
}

async fn store_graph(State(remote): State<Remote>, Form(form): Form<HashMap<String, String>>) {
    remote.graphs.lock().unwrap().push(form);
}

async fn word_count(State(remote): State<Remote>, Json(records): Json<Value>) {
    remote.word_counts.lock().unwrap().push(records);
}

async fn serve(remote: Remote) -> String {
    let router = Router::new()
        .route("/lemmatize", post(lemmatize))
        .route("/graph", post(store_graph))
        .route("/word-count", post(word_count))
        .with_state(remote);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base: &str, dir: &std::path::Path) -> KnoxConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("QUEUE_DIRECTORY", dir.join("queue").display().to_string()),
        ("ERROR_DIRECTORY", dir.join("errors").display().to_string()),
        ("LEMMATIZATION_ENDPOINT_URL", format!("{base}/lemmatize")),
        ("WORD_COUNT_DATA_ENDPOINT", format!("{base}/word-count")),
        ("TRIPLE_DATA_ENDPOINT", format!("{base}/graph")),
        ("ONTOLOGY_NAMESPACE", "http://knox.example/ontology#".to_string()),
        ("KNOX_POLL_INTERVAL_MS", "10".to_string()),
        ("KNOX_REQUEST_TIMEOUT_SECS", "5".to_string()),
    ]);
    KnoxConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

fn manual() -> Value {
    json!({
        "generator": {"app": "GrundfosManuals_Handler"},
        "content": {
            "publisher": "Grundfos",
            "publication": "Grundfos Manuals",
            "articles": [{
                "id": "m1",
                "headline": "Model 100",
                "extracted_from": ["m1.json"],
                "paragraphs": [
                    {"value": "The CR 32 runs at 100 bar."},
                    {"value": "Questions: service@grundfos.com"}
                ]
            }]
        }
    })
}

#[tokio::test]
async fn test_manual_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Remote::default();
    let base = serve(remote.clone()).await;
    let driver = PipelineDriver::from_config(&config(&base, dir.path())).unwrap();

    driver.queue().ensure_exists().await.unwrap();
    driver.queue().enqueue(&manual()).await.unwrap();

    let outcome = driver.run_once().await.unwrap().unwrap();
    let ItemOutcome::Processed(report) = outcome else {
        panic!("expected the manual to be processed, got {outcome:?}");
    };
    assert!(report.word_counts_delivered);
    assert!(report.triples_delivered);
    assert!(driver.queue().next().await.unwrap().is_none());

    assert!(remote.lemmatized.lock().unwrap().iter().all(|l| l == "en"));

    let word_counts = remote.word_counts.lock().unwrap();
    let record = &word_counts[0][0];
    assert_eq!(record["article_title"], "model one_zero_zero");
    assert_eq!(record["filepath"], "m1.json");
    let run = record["words"]
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["word"] == "run")
        .unwrap();
    assert_eq!(run["amount"], 1);
    assert_eq!(
        record["total_words_in_article"].as_u64().unwrap() as usize,
        record["words"].as_array().unwrap().len()
    );

    let graphs = remote.graphs.lock().unwrap();
    assert_eq!(graphs[0]["graph"], "Grundfos Manuals");
    let turtle = &graphs[0]["turtle"];
    assert!(turtle.contains(
        "<http://knox.example/ontology#Pump/CR_32> <http://knox.example/ontology#PumpRelates> <http://knox.example/ontology#Article/m1> ."
    ));
    assert!(turtle.contains("<http://knox.example/ontology#Email/service%40grundfos.com>"));
    assert!(turtle.contains(
        "<http://knox.example/ontology#Publisher/Grundfos> <http://knox.example/ontology#publishes> <http://knox.example/ontology#Publication/Grundfos_Manuals> ."
    ));
}

#[tokio::test]
async fn test_driver_drains_queue_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Remote::default();
    let base = serve(remote.clone()).await;
    let driver = Arc::new(PipelineDriver::from_config(&config(&base, dir.path())).unwrap());

    driver.queue().ensure_exists().await.unwrap();
    driver.queue().enqueue(&manual()).await.unwrap();
    driver.queue().enqueue(&json!({"type": "Flyer"})).await.unwrap();
    driver
        .queue()
        .enqueue(&json!({
            "type": "Publication",
            "content": {
                "publisher": "Nordjyske Medier",
                "articles": [{
                    "headline": "Nyt fra havnen",
                    "extracted_from": ["nj.json"],
                    "paragraphs": [{"value": "Skibet lagde til den 12. marts 2020"}]
                }]
            }
        }))
        .await
        .unwrap();

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn({
        let driver = Arc::clone(&driver);
        async move { driver.run(rx).await }
    });

    for _ in 0..500 {
        if driver.queue().pending_count().await.unwrap() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tx.send(true).unwrap();
    task.await.unwrap().unwrap();

    assert_eq!(driver.queue().pending_count().await.unwrap(), 0);
    assert_eq!(remote.graphs.lock().unwrap().len(), 2);
    assert_eq!(remote.word_counts.lock().unwrap().len(), 2);

    let rejected: Vec<_> = std::fs::read_dir(dir.path().join("errors").join("rejected"))
        .unwrap()
        .collect();
    assert_eq!(rejected.len(), 1);

    let languages = remote.lemmatized.lock().unwrap();
    assert!(languages.iter().any(|l| l == "da"));
    assert!(languages.iter().any(|l| l == "en"));
}
