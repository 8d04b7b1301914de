//! Load testing for the adapter.

use std::time::Instant;

use serde_json::Value;

mod common;

#[tokio::test]
async fn test_concurrent_requests() {
    let adapter = common::start_default().await;

    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = reqwest::Client::new();
    let start = Instant::now();

    let mut handles = Vec::new();
    for task in 0..concurrency {
        let client = client.clone();
        let base = adapter.url("/express");
        handles.push(tokio::spawn(async move {
            let mut ok = 0;
            for i in 0..requests_per_task {
                let res = client
                    .post(format!("{}/task/{}?i={}", base, task, i))
                    .json(&serde_json::json!({ "task": task, "i": i }))
                    .send()
                    .await;
                if let Ok(res) = res {
                    if res.status() == 200 {
                        let body: Value = res.json().await.unwrap_or_default();
                        if body["body"]["i"] == i && body["path"] == format!("/task/{}", task) {
                            ok += 1;
                        }
                    }
                }
            }
            ok
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        succeeded += handle.await.unwrap();
    }

    let elapsed = start.elapsed();
    println!(
        "{} requests in {:?} ({:.0} req/s)",
        total_requests,
        elapsed,
        total_requests as f64 / elapsed.as_secs_f64()
    );
    assert_eq!(succeeded, total_requests);
}
