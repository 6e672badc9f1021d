//! Concurrency tests: readiness fires once across streams, heartbeats keep going.

use std::sync::Arc;
use std::time::Duration;

use readiness_wrapper::config::DEFAULT_READINESS_MARKER;
use readiness_wrapper::supervisor::{
    fatal_channel, forward_lines, ForwardOutcome, Heartbeat, ReadinessDetector, StreamKind,
};

use super::ScriptedClient;

fn marker_lines(count: usize) -> Vec<u8> {
    (0..count)
        .map(|i| format!("[{i}] {DEFAULT_READINESS_MARKER}\n"))
        .collect::<String>()
        .into_bytes()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn qualifying_lines_on_two_streams_report_once() {
    let client = Arc::new(ScriptedClient::default());
    let (fatal, _rx) = fatal_channel();
    let detector = Arc::new(ReadinessDetector::new(
        DEFAULT_READINESS_MARKER,
        client.clone(),
        fatal,
    ));

    let mut tasks = tokio::task::JoinSet::new();
    for stream in [StreamKind::Stdout, StreamKind::Stderr] {
        let detector = detector.clone();
        tasks.spawn(async move {
            let input = marker_lines(500);
            let mut out = Vec::new();
            let outcome = forward_lines(&input[..], &mut out, stream, &detector).await;
            (outcome, out == input)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (outcome, forwarded_intact) = joined.unwrap();
        assert!(matches!(outcome, ForwardOutcome::Completed { .. }));
        assert!(forwarded_intact);
    }

    assert_eq!(client.ready_count(), 1);
    assert!(detector.latch().is_fired());
}

#[tokio::test(start_paused = true)]
async fn heartbeat_runs_regardless_of_readiness() {
    let client = Arc::new(ScriptedClient::default());
    let (fatal, _rx) = fatal_channel();
    let heartbeat =
        tokio::spawn(Heartbeat::new(client.clone(), Duration::from_secs(2), fatal.clone()).run());
    let detector = ReadinessDetector::new(DEFAULT_READINESS_MARKER, client.clone(), fatal);

    tokio::time::sleep(Duration::from_millis(4100)).await;
    assert_eq!(client.healthy_count(), 3);
    assert_eq!(client.ready_count(), 0);

    assert!(detector.on_line(DEFAULT_READINESS_MARKER, StreamKind::Stdout).await);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(client.healthy_count(), 5);
    assert_eq!(client.ready_count(), 1);

    heartbeat.abort();
}
