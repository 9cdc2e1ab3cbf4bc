//! End-to-end tests: scripted upstream, real relay, reqwest as the dashboard.

use std::time::Duration;

use tokio::time::timeout;

mod common;

use common::{frame, read_payloads, start_relay, start_sse_upstream, test_config};

#[tokio::test]
async fn test_frames_relayed_in_order_across_reconnect() {
    let upstream = start_sse_upstream(
        vec![
            vec![frame("A"), "data: B-partial".to_string()],
            vec![frame("C"), frame("D")],
        ],
        false,
    )
    .await;

    let mut config = test_config();
    config.upstream.sse_url = Some(upstream.url());
    config.upstream.api_token = Some("tok".to_string());
    let (addr, shutdown) = start_relay(config).await;

    let res = reqwest::get(format!("http://{}/events", addr)).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("content-type").unwrap().to_str().unwrap(),
        "text/event-stream"
    );

    let payloads = timeout(Duration::from_secs(10), read_payloads(res, 3))
        .await
        .expect("relay stalled");
    assert_eq!(payloads, vec!["A", "C", "D"]);
    assert!(upstream.connection_count() >= 2);

    let requests = upstream.requests.lock().unwrap().clone();
    for head in &requests {
        let head = head.to_ascii_lowercase();
        assert!(head.contains("accept: text/event-stream"));
        assert!(head.contains("authorization: bearer tok"));
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_refused_upstream_is_retried() {
    let upstream = start_sse_upstream(vec![vec![], vec![frame("first")]], true).await;
    let mut config = test_config();
    config.upstream.sse_url = Some(upstream.url());
    let (addr, shutdown) = start_relay(config).await;

    let res = reqwest::get(format!("http://{}/events", addr)).await.unwrap();
    let payloads = timeout(Duration::from_secs(10), read_payloads(res, 1))
        .await
        .expect("relay stalled");
    assert_eq!(payloads, vec!["first"]);
    assert_eq!(upstream.connection_count(), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unconfigured_upstream_closes_stream() {
    let (addr, shutdown) = start_relay(test_config()).await;

    let res = reqwest::get(format!("http://{}/events", addr)).await.unwrap();
    assert_eq!(res.status(), 200);
    let body = timeout(Duration::from_secs(5), res.text())
        .await
        .expect("stream did not end")
        .unwrap();
    assert!(!body.contains("data:"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let upstream = start_sse_upstream(vec![vec![frame("hello")]], true).await;
    let mut config = test_config();
    config.upstream.sse_url = Some(upstream.url());
    let (addr, shutdown) = start_relay(config).await;

    let res = reqwest::get(format!("http://{}/events", addr)).await.unwrap();
    let reader = tokio::spawn(read_payloads(res, usize::MAX));

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.trigger();

    let payloads = timeout(Duration::from_secs(5), reader)
        .await
        .expect("stream outlived shutdown")
        .unwrap();
    assert_eq!(payloads, vec!["hello"]);
    assert_eq!(upstream.connection_count(), 1);
}

#[tokio::test]
async fn test_each_client_gets_its_own_session() {
    let upstream = start_sse_upstream(
        vec![vec![frame("one")], vec![frame("two")]],
        true,
    )
    .await;
    let mut config = test_config();
    config.upstream.sse_url = Some(upstream.url());
    let (addr, shutdown) = start_relay(config).await;

    let first = reqwest::get(format!("http://{}/events", addr)).await.unwrap();
    let first = timeout(Duration::from_secs(10), read_payloads(first, 1))
        .await
        .unwrap();
    let second = reqwest::get(format!("http://{}/events", addr)).await.unwrap();
    let second = timeout(Duration::from_secs(10), read_payloads(second, 1))
        .await
        .unwrap();

    assert_eq!(first, vec!["one"]);
    assert_eq!(second, vec!["two"]);
    assert_eq!(upstream.connection_count(), 2);

    shutdown.trigger();
}
