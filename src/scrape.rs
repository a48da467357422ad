//! Tag list extraction from a project page.

use std::cmp::Reverse;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::tag::{Tag, TagStatus};

/// Text a heading must contain to introduce the tag list
const TAG_HEADING_TEXT: &str = "Tags";

/// Class carried by the tag list container
const LIST_CLASS: &str = "list";

/// Class marking locked (not yet available) tags
const DISABLED_CLASS: &str = "list__item__disabled";

static ANY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("*").expect("Invalid universal selector"));

static ITEM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".list__item").expect("Invalid item selector"));

static NAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".list__item__name").expect("Invalid name selector"));

static TRACE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("trace-symbol").expect("Invalid trace selector"));

static PROJECT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("main > header > h1").expect("Invalid project selector"));

/// The located tag list container
#[derive(Debug, Clone, Copy)]
pub struct ListView<'a> {
    element: ElementRef<'a>,
}

impl<'a> ListView<'a> {
    /// Extract the enabled tags of this list, in list order
    pub fn tags(&self, base: Option<&Url>) -> Vec<Tag> {
        extract_tags(self.element, base)
    }
}

/// Site-specific knowledge of where the tag list lives
pub trait PageAdapter {
    fn extract_tag_section<'a>(&self, document: &'a Html) -> Option<ListView<'a>>;

    fn project_name(&self, document: &Html) -> Option<String>;
}

/// Layout of the Forge intranet project pages
#[derive(Debug, Default, Clone, Copy)]
pub struct ForgeAdapter;

impl PageAdapter for ForgeAdapter {
    fn extract_tag_section<'a>(&self, document: &'a Html) -> Option<ListView<'a>> {
        find_tag_section(document)
    }

    fn project_name(&self, document: &Html) -> Option<String> {
        document
            .select(&PROJECT_SELECTOR)
            .next()
            .map(element_text)
            .filter(|name| !name.is_empty())
    }
}

/// Locate the list that follows the "Tags" heading
///
/// Returns None while the page is still loading or has no tag section, and
/// when the heading's sibling is not a `.list` container.
///
/// Every ancestor of the heading also contains its text, so among the
/// candidates followed by a `.list` the innermost one wins.
pub fn find_tag_section(document: &Html) -> Option<ListView<'_>> {
    document
        .select(&ANY_SELECTOR)
        .filter(|el| el.text().any(|t| t.contains(TAG_HEADING_TEXT)))
        .filter_map(|heading| {
            let sibling = heading.next_siblings().find_map(ElementRef::wrap)?;
            has_class(&sibling, LIST_CLASS).then(|| (heading.ancestors().count(), sibling))
        })
        .min_by_key(|(depth, _)| Reverse(*depth))
        .map(|(_, element)| ListView { element })
}

/// Extract the enabled, named entries of a tag list
pub fn extract_tags(list: ElementRef<'_>, base: Option<&Url>) -> Vec<Tag> {
    list.select(&ITEM_SELECTOR)
        .filter(|item| !has_class(item, DISABLED_CLASS))
        .filter_map(|item| read_tag(item, base))
        .collect()
}

fn read_tag(item: ElementRef<'_>, base: Option<&Url>) -> Option<Tag> {
    let name = item.select(&NAME_SELECTOR).next().map(element_text)?;
    if name.is_empty() {
        return None;
    }

    let trace = item.select(&TRACE_SELECTOR).next();
    let attr = |key: &str| trace.and_then(|t| t.value().attr(key));

    let status = TagStatus::from_token(attr("status").unwrap_or(""), attr("errorstatus"));
    let percent = attr("successpercent")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from);

    Some(Tag {
        name,
        percent,
        status,
        detail_link: detail_link(item, base),
    })
}

fn detail_link(item: ElementRef<'_>, base: Option<&Url>) -> Option<Url> {
    let href = item.value().attr("href")?.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    match base {
        Some(base) => base.join(href).ok(),
        None => Url::parse(href).ok(),
    }
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything the engine needs from one fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPage {
    pub project: Option<String>,
    pub tags: Vec<Tag>,
}

/// Parse HTML and extract its tag list; None when there is no tag section
pub fn scrape_page(adapter: &dyn PageAdapter, html: &str, base: Option<&Url>) -> Option<ScrapedPage> {
    let document = Html::parse_document(html);
    let section = adapter.extract_tag_section(&document)?;
    Some(ScrapedPage {
        project: adapter.project_name(&document),
        tags: section.tags(base),
    })
}
