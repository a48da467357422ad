//! Mock intranet: serve, and a small client for its API

use std::net::SocketAddr;

use colored::Colorize;

use tagwatch::error::{Result, TagwatchError};
use tagwatch::mock::{self, MockTag};

/// Run the mock server in the foreground
pub fn cmd_serve(host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| TagwatchError::ConfigError(format!("Invalid address {}:{}: {}", host, port, e)))?;

    println!("\n{} at http://{}", "Mock intra running".cyan().bold(), addr);
    println!("API:");
    println!("  POST /add-tag  {{ name?, percent?, status?, date? }}");
    println!("  GET  /tags");
    println!("  POST /reset\n");

    mock::run(addr)
}

fn endpoint(server: &str, route: &str) -> String {
    format!("{}/{}", server.trim_end_matches('/'), route)
}

pub fn cmd_mock_add(
    server: &str,
    name: Option<String>,
    percent: Option<String>,
    status: Option<String>,
) -> Result<()> {
    let body = serde_json::json!({
        "name": name,
        "percent": percent,
        "status": status,
    });

    let mut response = ureq::post(&endpoint(server, "add-tag")).send_json(&body)?;
    let reply: serde_json::Value = response.body_mut().read_json()?;
    let tag: MockTag = serde_json::from_value(reply["tag"].clone())?;

    println!(
        "  Added {} ({}%, {}) - {} tag(s) total",
        tag.name.bold(),
        tag.percent,
        tag.status,
        reply["total"]
    );
    Ok(())
}

pub fn cmd_mock_list(server: &str) -> Result<()> {
    let mut response = ureq::get(&endpoint(server, "tags")).call()?;
    let tags: Vec<MockTag> = response.body_mut().read_json()?;

    if tags.is_empty() {
        println!("  No tags.");
    }
    for tag in tags.iter().rev() {
        println!("  {:<40} {:>5}%  {:<12} {}", tag.name, tag.percent, tag.status, tag.date.dimmed());
    }
    Ok(())
}

pub fn cmd_mock_reset(server: &str) -> Result<()> {
    ureq::post(&endpoint(server, "reset")).send_empty()?;
    println!("  Tags cleared.");
    Ok(())
}
