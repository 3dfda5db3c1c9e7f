use std::time::{Duration, Instant};

use jobstream_transport::{JobSpec, TransportEvent, TransportHandle, TransportSettings};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn drain_until_terminal(handle: &TransportHandle) -> Vec<TransportEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    loop {
        while let Some(event) = handle.try_recv() {
            let terminal = matches!(
                event,
                TransportEvent::Ended { .. } | TransportEvent::Failed { .. }
            );
            events.push(event);
            if terminal {
                return events;
            }
        }
        assert!(Instant::now() < deadline, "no terminal event, got {events:?}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn long_poll_job_flows_through_the_handle() {
    let server = MockServer::start().await;
    let body = "<message>step 1</message><message>all DONE</message>";
    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let handle = TransportHandle::new(TransportSettings::default());
    handle.start(
        1,
        JobSpec::LongPoll {
            url: format!("{}/update", server.uri()),
            form: vec![("scope".to_string(), "all".to_string())],
        },
    );

    let events = drain_until_terminal(&handle).await;
    let text: String = events
        .iter()
        .filter_map(|event| match event {
            TransportEvent::Chunk { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, body);
    assert_eq!(events.last(), Some(&TransportEvent::Ended { job_id: 1 }));
}

#[tokio::test]
async fn failed_transport_surfaces_as_a_failed_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let handle = TransportHandle::new(TransportSettings::default());
    handle.start(
        2,
        JobSpec::LongPoll {
            url: format!("{}/update", server.uri()),
            form: Vec::new(),
        },
    );

    let events = drain_until_terminal(&handle).await;
    assert!(matches!(
        events.last(),
        Some(TransportEvent::Failed { job_id: 2, .. })
    ));
}

#[tokio::test]
async fn commands_for_unknown_jobs_are_ignored() {
    let handle = TransportHandle::new(TransportSettings::default());
    handle.abort(99);
    handle.close(99);

    // Nothing to receive and nothing crashed.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.try_recv().is_none());
}
