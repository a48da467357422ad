//! One-shot inspection commands: check, status

use colored::Colorize;

use tagwatch::config::Config;
use tagwatch::db::Database;
use tagwatch::engine::reconcile;
use tagwatch::error::{Result, TagwatchError};
use tagwatch::fetch::{HttpFetcher, PageFetcher};
use tagwatch::render::format_tag_row;
use tagwatch::scrape::{scrape_page, ForgeAdapter};
use tagwatch::store::{path_key, StateStore};

use crate::utils::page_url;

/// Fetch a page once and show what the next cycle would do (read-only)
pub fn cmd_check(url: &str, json: bool) -> Result<()> {
    let config = Config::load()?;
    let url = page_url(url)?;

    let html = HttpFetcher::from_config(&config).fetch_html(url.as_str())?;
    let page = scrape_page(&ForgeAdapter, &html, Some(&url))
        .ok_or_else(|| TagwatchError::TagSectionMissing(url.to_string()))?;

    let store = StateStore::new(Database::open()?);
    let path = path_key(&url);
    let state = store.get_state(&path);
    let plan = reconcile(&state.seen, &page.tags);
    let would_notify: Vec<&str> = plan.fresh.iter().map(|t| t.name.as_str()).collect();

    if json {
        let output = serde_json::json!({
            "url": url.as_str(),
            "path": path,
            "project": page.project,
            "watching": state.watching,
            "tags": page.tags,
            "would_notify": would_notify,
            "would_stop": plan.perfect,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "\n{} {}",
        page.project.as_deref().unwrap_or("Unknown project").bold(),
        format!("({})", path).dimmed()
    );
    println!(
        "  Watching: {}   Seen: {}\n",
        if state.watching { "yes".green() } else { "no".dimmed() },
        state.seen.len()
    );

    if page.tags.is_empty() {
        println!("  No tags yet.");
    }
    for tag in &page.tags {
        let marker = if would_notify.contains(&tag.name.as_str()) {
            "new".green().bold()
        } else if state.seen.contains(&tag.name) {
            "seen".dimmed()
        } else {
            "   ".normal()
        };
        println!("  {:>4}  {}", marker, format_tag_row(tag));
    }

    if !would_notify.is_empty() {
        println!("\n  Next cycle would notify: {}", would_notify.join(", "));
        if plan.perfect {
            println!("  ...and stop watching (perfect score)");
        }
    }

    Ok(())
}

/// List persisted watch states
pub fn cmd_status(json: bool) -> Result<()> {
    let store = StateStore::new(Database::open()?);
    let states = store.load();

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    if states.is_empty() {
        println!("No pages watched yet. Start with `tagwatch watch <URL>`.");
        return Ok(());
    }

    println!();
    for (path, state) in &states {
        let flag = if state.watching {
            "watching".green().bold()
        } else {
            "idle".dimmed()
        };
        println!("  {:<60} {:<10} {} seen", path, flag, state.seen.len());
    }
    println!();

    Ok(())
}
