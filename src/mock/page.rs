//! HTML rendering of the mock tag list.

use serde::{Deserialize, Serialize};

pub const TAG_LIST_START: &str = "<!-- TAG_LIST_START -->";
pub const TAG_LIST_END: &str = "<!-- TAG_LIST_END -->";

/// Page template served at `/`
pub const INDEX_TEMPLATE: &str = include_str!("../../assets/index.html");

const TAG_CHEVRON_SVG: &str = r#"<svg style="width: 20px; height: 20px" width="10" height="16" viewBox="0 0 10 16" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M1.06 15.44L7.12 8L1.04 1.92C0.85 1.72 0.75 1.49 0.76 1.23C0.77 0.97 0.87 0.74 1.06 0.54C1.26 0.35 1.49 0.25 1.75 0.25C2.01 0.25 2.24 0.35 2.44 0.54L9.35 7.46C9.51 7.63 9.56 7.8 9.56 8C9.56 8.2 9.51 8.37 9.35 8.54L2.42 15.46C2.24 15.65 2.01 15.75 1.75 15.74C1.49 15.73 1.26 15.63 1.06 15.44Z" fill="currentColor"/></svg>"#;

/// A synthetic tag held by the mock server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockTag {
    pub name: String,
    pub percent: String,
    pub status: String,
    pub date: String,
}

impl MockTag {
    fn validated(&self) -> bool {
        self.status == "SUCCEEDED" && self.percent == "100"
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_tag_html(tag: &MockTag) -> String {
    format!(
        r##"<a class="list__item" href="#">
    <div class="list__item__left">
        <div class="list__item__name">{name}</div>
        <div class="list__item__subname" style="font-size: 11px;">Submitted on {date}</div>
    </div>
    <div class="list__item__right">
        <trace-symbol successPercent="{percent}" validated="{validated}" errorStatus="" status="{status}"></trace-symbol>
        <div style="height: 40px; width: 2px; background-color: var(--card-separator)"></div>
        {chevron}
    </div>
</a>"##,
        name = escape(&tag.name),
        date = escape(&tag.date),
        percent = escape(&tag.percent),
        validated = tag.validated(),
        status = escape(&tag.status),
        chevron = TAG_CHEVRON_SVG,
    )
}

/// Newest tag first, like the real intranet
pub fn render_tag_list(tags: &[MockTag]) -> String {
    tags.iter()
        .rev()
        .map(render_tag_html)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace whatever sits between the list markers; templates without both
/// markers are returned unchanged.
pub fn inject_tags(template: &str, tags: &[MockTag]) -> String {
    let (Some(start), Some(end)) = (template.find(TAG_LIST_START), template.find(TAG_LIST_END)) else {
        return template.to_string();
    };
    if end < start {
        return template.to_string();
    }

    let head = &template[..start + TAG_LIST_START.len()];
    let tail = &template[end..];
    format!("{}\n{}\n{}", head, render_tag_list(tags), tail)
}
