//! End-to-end watch cycles against the mock intranet over real HTTP

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tagwatch::engine::{CycleOutcome, WatchSession};
use tagwatch::fetch::{HttpFetcher, PageFetcher};
use tagwatch::mock::{self, MockState};
use tagwatch::notify::{Notification, NotificationSink};
use tagwatch::render::{Renderer, WatchLabel};
use tagwatch::scrape::{scrape_page, ForgeAdapter};
use tagwatch::store::{MemoryBlob, StateStore};
use tagwatch::tag::{Tag, TagStatus};

// ============================================================================
// Harness
// ============================================================================

fn start_mock() -> String {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            mock::serve_on(listener, MockState::new()).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

fn add_tag(server: &str, name: &str, percent: &str, status: &str) {
    ureq::post(&format!("{}/add-tag", server))
        .send_json(serde_json::json!({ "name": name, "percent": percent, "status": status }))
        .unwrap();
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<Notification>>>);

impl NotificationSink for Recorder {
    fn notify(&self, notification: &Notification) -> tagwatch::Result<()> {
        self.0.borrow_mut().push(notification.clone());
        Ok(())
    }
}

struct Quiet;

impl Renderer for Quiet {
    fn set_label(&mut self, _label: WatchLabel) {}
    fn replace_tag_list(&mut self, _tags: &[Tag]) {}
}

fn session(server: &str, sink: Recorder) -> WatchSession<MemoryBlob> {
    WatchSession::new(
        &format!("{}/", server),
        Duration::from_secs(5),
        StateStore::new(MemoryBlob::new()),
        Box::new(ForgeAdapter),
        Box::new(sink),
        Box::new(Quiet),
    )
    .unwrap()
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(HashMap::new(), None)
}

// ============================================================================
// Server surface
// ============================================================================

#[test]
fn test_index_lists_tags_newest_first() {
    let server = start_mock();
    add_tag(&server, "first", "40", "SUCCEEDED");
    add_tag(&server, "second", "60", "ERROR");

    let html = fetcher().fetch_html(&format!("{}/", server)).unwrap();
    let page = scrape_page(&ForgeAdapter, &html, None).expect("tag section");

    let names: Vec<&str> = page.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["second", "first"]);
    assert_eq!(page.tags[1].status, TagStatus::Succeeded);
    assert_eq!(page.tags[1].percent.as_deref(), Some("40"));
    assert!(matches!(page.tags[0].status, TagStatus::Error(_)));
    assert_eq!(page.project.as_deref(), Some("apping-hello_world"));
}

#[test]
fn test_reset_clears_tags() {
    let server = start_mock();
    add_tag(&server, "first", "40", "SUCCEEDED");
    ureq::post(&format!("{}/reset", server)).send_empty().unwrap();

    let tags: Vec<mock::MockTag> = ureq::get(&format!("{}/tags", server))
        .call()
        .unwrap()
        .body_mut()
        .read_json()
        .unwrap();
    assert!(tags.is_empty());

    let html = fetcher().fetch_html(&format!("{}/", server)).unwrap();
    let page = scrape_page(&ForgeAdapter, &html, None).expect("tag section");
    assert!(page.tags.is_empty());
}

#[test]
fn test_unknown_route_is_404() {
    let server = start_mock();
    let err = ureq::get(&format!("{}/nope", server)).call().unwrap_err();
    assert!(matches!(err, ureq::Error::StatusCode(404)));
}

#[test]
fn test_malformed_add_tag_is_400() {
    let server = start_mock();
    let err = ureq::post(&format!("{}/add-tag", server))
        .content_type("application/json")
        .send("{not json")
        .unwrap_err();
    assert!(matches!(err, ureq::Error::StatusCode(400)));
}

// ============================================================================
// Watch lifecycle
// ============================================================================

#[test]
fn test_full_watch_lifecycle() {
    let server = start_mock();
    add_tag(&server, "v1", "80", "SUCCEEDED");

    let sink = Recorder::default();
    let mut session = session(&server, sink.clone());
    let fetcher = fetcher();

    // what the user sees before clicking Watch
    let visible = fetcher.fetch_html(session.url().as_str()).unwrap();
    session.show_page(&visible);
    let generation = session.activate(Some(&visible)).unwrap();
    assert!(session.store().get_state(session.path()).seen.contains("v1"));

    // nothing new yet
    match session.run_cycle(generation, &fetcher, Instant::now()) {
        CycleOutcome::Finished(report) => {
            assert!(report.notified.is_empty());
            assert!(report.rescheduled);
        }
        CycleOutcome::Cancelled => panic!("cycle should run"),
    }

    // an imperfect result notifies and keeps watching
    add_tag(&server, "v2", "50", "SUCCEEDED");
    add_tag(&server, "v2-pending", "0", "PROCESSING");
    let CycleOutcome::Finished(report) = session.run_cycle(generation, &fetcher, Instant::now()) else {
        panic!("cycle should run");
    };
    assert_eq!(report.notified, vec!["v2"]);
    assert!(!report.stopped);
    assert!(session.is_watching());

    {
        let sent = sink.0.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "apping-hello_world: v2 (50%)");
    }

    // a perfect result notifies and ends the watch
    add_tag(&server, "v3", "100", "SUCCEEDED");
    let CycleOutcome::Finished(report) = session.run_cycle(generation, &fetcher, Instant::now()) else {
        panic!("cycle should run");
    };
    assert_eq!(report.notified, vec!["v3"]);
    assert!(report.stopped);
    assert!(!session.is_watching());
    assert!(session.next_deadline().is_none());

    let state = session.store().get_state(session.path());
    assert!(!state.watching);
    assert!(["v1", "v2", "v3"].iter().all(|n| state.seen.contains(*n)));

    // the old generation is dead
    assert_eq!(
        session.run_cycle(generation, &fetcher, Instant::now()),
        CycleOutcome::Cancelled
    );
    assert_eq!(sink.0.borrow().len(), 2);
}

#[test]
fn test_unreachable_server_keeps_watching() {
    // bind then drop to get a port nobody listens on
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let server = format!("http://{}", addr);

    let mut session = session(&server, Recorder::default());
    let generation = session.activate(None).unwrap();

    let CycleOutcome::Finished(report) = session.run_cycle(generation, &fetcher(), Instant::now()) else {
        panic!("cycle should run");
    };
    assert!(report.fetch_failed);
    assert!(report.rescheduled);
    assert!(session.is_watching());
}
