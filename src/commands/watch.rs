//! Interactive watch session: one engine thread fed by an event channel.
//!
//! Fetches run on short-lived helper threads and come back as events tagged
//! with the generation they were issued under; stdin and Ctrl+C feed toggles
//! and quits. Only this thread touches the session and its store.

use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use colored::Colorize;

use tagwatch::config::Config;
use tagwatch::db::Database;
use tagwatch::engine::{CycleOutcome, CycleRequest, WatchSession};
use tagwatch::error::{Result, TagwatchError};
use tagwatch::fetch::{HttpFetcher, PageFetcher};
use tagwatch::notify::TargetSink;
use tagwatch::render::TerminalRenderer;
use tagwatch::scrape::{scrape_page, ForgeAdapter};
use tagwatch::store::StateStore;

use crate::utils::{format_interval, page_url, parse_interval_str, MIN_INTERVAL_SECS};

enum Event {
    Toggle,
    Quit,
    Fetched {
        generation: u64,
        result: std::result::Result<String, String>,
    },
}

/// Watch a page until the user quits
pub fn cmd_watch(url: &str, interval: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let interval_secs = match interval {
        Some(s) => parse_interval_str(&s)?,
        None => config.poll_interval_secs.max(MIN_INTERVAL_SECS),
    };
    let url = page_url(url)?;
    let fetcher = HttpFetcher::from_config(&config);

    let mut session = WatchSession::new(
        url.as_str(),
        Duration::from_secs(interval_secs),
        StateStore::new(Database::open()?),
        Box::new(ForgeAdapter),
        Box::new(TargetSink::from_config(&config)),
        Box::new(TerminalRenderer::new()),
    )?;

    println!(
        "\n{} {} every {}",
        "Watching".cyan().bold(),
        url,
        format_interval(interval_secs)
    );
    println!(
        "Press {} to toggle, {} + Enter to quit\n",
        "Enter".yellow(),
        "q".yellow()
    );

    // what the user would currently see; seeds the first activation
    let visible = match fetcher.fetch_html(url.as_str()) {
        Ok(html) => Some(html),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "initial fetch failed, nothing to seed");
            println!(
                "  {} page unreachable ({}), will keep trying",
                "warning:".yellow(),
                e
            );
            None
        }
    };
    if let Some(visible) = &visible {
        if scrape_page(&ForgeAdapter, visible, None).is_none() {
            println!(
                "  {} no tag list on this page yet, will keep looking",
                "warning:".yellow()
            );
        }
        session.show_page(visible);
    }

    let (tx, rx) = mpsc::channel();
    spawn_input_reader(tx.clone());

    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(Event::Quit);
    })
    .map_err(|e| TagwatchError::ConfigError(format!("Failed to set Ctrl+C handler: {}", e)))?;

    let generation = match session.resume() {
        Some(generation) => generation,
        None => session.activate(visible.as_deref())?,
    };
    dispatch(session.begin_cycle(generation), &fetcher, &tx);

    loop {
        let event = match session.next_deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        match event {
            None => {
                for request in session.poll_due(Instant::now()) {
                    dispatch(Some(request), &fetcher, &tx);
                }
            }
            Some(Event::Toggle) => {
                if let Some(generation) = session.toggle()? {
                    dispatch(session.begin_cycle(generation), &fetcher, &tx);
                }
            }
            Some(Event::Quit) => break,
            Some(Event::Fetched { generation, result }) => {
                let fetched = result.map_err(TagwatchError::FetchError);
                if let CycleOutcome::Finished(report) =
                    session.complete_cycle(generation, fetched, Instant::now())
                {
                    for name in &report.notified {
                        println!("  {} {}", "✓".green(), name.bold());
                    }
                    if report.stopped {
                        println!(
                            "  Perfect score, watch finished. Press {} to watch again.",
                            "Enter".yellow()
                        );
                    }
                }
            }
        }
    }

    println!("\nStopped. Watch state for {} is kept.", session.path());
    Ok(())
}

/// Run a cycle's fetch off-thread; the result comes back as an event
fn dispatch(request: Option<CycleRequest>, fetcher: &HttpFetcher, tx: &Sender<Event>) {
    let Some(request) = request else {
        return;
    };
    let fetcher = fetcher.clone();
    let tx = tx.clone();
    thread::spawn(move || {
        let result = fetcher
            .fetch_html(&request.url)
            .map_err(|e| e.to_string());
        let _ = tx.send(Event::Fetched {
            generation: request.generation,
            result,
        });
    });
}

fn spawn_input_reader(tx: Sender<Event>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let event = match line.trim() {
                "q" | "quit" | "exit" => Event::Quit,
                _ => Event::Toggle,
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    });
}
