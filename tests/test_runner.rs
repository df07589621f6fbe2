//! Collection runner integration tests
//!
//! Covers iteration/data-file plans, ordering guarantees, cross-request
//! variable passing through the shared script scope, cooperative stop,
//! synthetic failed items, and report export.

use std::sync::atomic::Ordering;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reqforge::config::EngineConfig;
use reqforge::executor::Executor;
use reqforge::models::{Collection, Folder, RequestTemplate};
use reqforge::runner::{
    load_data_file, parse_csv, run_to_json, run_to_text, CollectionRunner, RunOptions, RunPlan,
};

fn executor() -> Executor {
    Executor::new(&EngineConfig::default()).unwrap()
}

fn collection(requests: Vec<RequestTemplate>) -> Collection {
    Collection {
        id: "c1".to_string(),
        name: "API".to_string(),
        auth: None,
        requests,
        folders: Vec::new(),
    }
}

#[tokio::test]
async fn test_two_requests_three_rows_row_major_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let collection = collection(vec![
        RequestTemplate::get("a", &format!("{}/a/{{{{row}}}}", server.uri())),
        RequestTemplate::get("b", &format!("{}/b/{{{{row}}}}", server.uri())),
    ]);

    let rows = parse_csv("row\n1\n2\n3\n").unwrap();
    let plan = RunPlan::Data(rows);

    let executor = executor();
    let runner = CollectionRunner::new(&executor);
    let run = runner
        .run(&collection, &[], None, &[], &plan, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(run.items.len(), 6);
    assert!(!run.stopped);

    // row-major: both requests for row 1, then row 2, then row 3
    let order: Vec<(usize, &str)> = run
        .items
        .iter()
        .map(|i| (i.iteration, i.request_id.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![(0, "a"), (0, "b"), (1, "a"), (1, "b"), (2, "a"), (2, "b")]
    );

    // each row's value reached the URL
    let hits = server.received_requests().await.unwrap();
    let paths: Vec<String> = hits.iter().map(|r| r.url.path().to_string()).collect();
    assert!(paths.contains(&"/a/1".to_string()));
    assert!(paths.contains(&"/b/3".to_string()));
}

#[tokio::test]
async fn test_variables_pass_between_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile/session-9"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut login = RequestTemplate::get("login", &format!("{}/login", server.uri()));
    login.pre_request_script = Some(r#"pm.globals.set("sid", "session-9");"#.to_string());

    let profile = RequestTemplate::get(
        "profile",
        &format!("{}/profile/{{{{sid}}}}", server.uri()),
    );

    let collection = collection(vec![login, profile]);
    let executor = executor();
    let runner = CollectionRunner::new(&executor);
    let run = runner
        .run(
            &collection,
            &[],
            None,
            &[],
            &RunPlan::Iterations(1),
            &RunOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(run.items.len(), 2);
    assert!(run.items.iter().all(|i| i.status == Some(200)));
}

#[tokio::test]
async fn test_stop_after_in_flight_request_finishes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let collection = collection(vec![
        RequestTemplate::get("fast", &format!("{}/fast", server.uri())),
        RequestTemplate::get("slow", &format!("{}/slow", server.uri())),
        RequestTemplate::get("never", &format!("{}/fast", server.uri())),
    ]);

    let executor = executor();
    let runner = CollectionRunner::new(&executor);
    let stop = runner.stop_flag();

    // flip the flag while the slow request is in flight
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        stop.store(true, Ordering::SeqCst);
    });

    let run = runner
        .run(
            &collection,
            &[],
            None,
            &[],
            &RunPlan::Iterations(5),
            &RunOptions::default(),
        )
        .await
        .unwrap();

    // the in-flight request finished, nothing after it started
    assert!(run.stopped);
    assert_eq!(run.items.len(), 2);
    assert_eq!(run.items[1].request_id, "slow");
    assert_eq!(run.items[1].status, Some(200));
}

#[tokio::test]
async fn test_failed_item_is_synthetic_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let collection = collection(vec![
        RequestTemplate::get("down", "http://127.0.0.1:9/nope"),
        RequestTemplate::get("ok", &format!("{}/ok", server.uri())),
    ]);

    let executor = executor();
    let runner = CollectionRunner::new(&executor);
    let run = runner
        .run(
            &collection,
            &[],
            None,
            &[],
            &RunPlan::Iterations(1),
            &RunOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(run.items.len(), 2);
    assert!(!run.stopped);

    let failed = &run.items[0];
    assert!(failed.status.is_none());
    assert!(failed.error.is_some());
    assert_eq!(failed.outcomes.len(), 1);
    assert!(!failed.outcomes[0].passed);

    assert_eq!(run.items[1].status, Some(200));
    assert_eq!(run.tests_failed, 1);
}

#[tokio::test]
async fn test_folder_target_and_folder_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/in-folder"))
        .and(wiremock::matchers::header(
            "Authorization",
            "Bearer folder-token",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let collection = Collection {
        id: "c1".to_string(),
        name: "API".to_string(),
        auth: Some(reqforge::models::AuthConfig::Bearer {
            token: "collection-token".to_string(),
        }),
        requests: vec![RequestTemplate::get("root", &format!("{}/root", server.uri()))],
        folders: vec![Folder {
            id: "f1".to_string(),
            name: "Users".to_string(),
            auth: Some(reqforge::models::AuthConfig::Bearer {
                token: "folder-token".to_string(),
            }),
            requests: vec![RequestTemplate::get(
                "inner",
                &format!("{}/in-folder", server.uri()),
            )],
        }],
    };

    let executor = executor();
    let runner = CollectionRunner::new(&executor);
    let run = runner
        .run(
            &collection,
            &[],
            None,
            &[],
            &RunPlan::Iterations(1),
            &RunOptions {
                folder_id: Some("f1".to_string()),
                delay: None,
            },
        )
        .await
        .unwrap();

    // only the folder's request ran, with folder auth outranking collection auth
    assert_eq!(run.items.len(), 1);
    assert_eq!(run.items[0].request_id, "inner");
    assert_eq!(run.items[0].status, Some(200));
}

#[test]
fn test_data_file_format_detection() {
    let dir = tempfile::tempdir().unwrap();

    let csv_path = dir.path().join("rows.csv");
    std::fs::write(&csv_path, "id,name\n1,\"alice\"\n").unwrap();
    let rows = load_data_file(&csv_path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "alice");

    let json_path = dir.path().join("rows.json");
    std::fs::write(&json_path, r#"[{"id": 1}, {"id": 2}]"#).unwrap();
    let rows = load_data_file(&json_path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["id"], "2");
}

#[tokio::test]
async fn test_report_export() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut request = RequestTemplate::get("r1", &format!("{}/x", server.uri()));
    request.name = "health check".to_string();
    request.test_script =
        Some(r#"pm.test("up", () => pm.expect(pm.response.code).to.equal(200));"#.to_string());
    let collection = collection(vec![request]);

    let executor = executor();
    let runner = CollectionRunner::new(&executor);
    let run = runner
        .run(
            &collection,
            &[],
            None,
            &[],
            &RunPlan::Iterations(2),
            &RunOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(run.tests_passed, 2);

    let json = run_to_json(&run).unwrap();
    assert!(json.contains("\"tests_passed\": 2"));

    let text = run_to_text(&run);
    assert!(text.contains("Run report: API"));
    assert!(text.contains("health check"));
    assert!(text.contains("ok: up"));
}
