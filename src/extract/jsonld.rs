//! Article bodies from embedded JSON-LD.
//!
//! Every `<script type="application/ld+json">` block is parsed and walked.
//! The walk descends into `mainEntity`, `mainEntityOfPage` and
//! `itemListElement`, treating a single object like a one-element list, and
//! collects each non-empty `articleBody` string. Nodes typed
//! `LiveBlogPosting` also contribute the `articleBody` of each
//! `liveBlogUpdate` entry, ahead of their own body.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use crate::utils::{normalize_whitespace, truncate_for_log};

const JSONLD_TYPE: &str = "application/ld+json";
const FOLLOWED_KEYS: [&str; 3] = ["mainEntity", "mainEntityOfPage", "itemListElement"];

static SCRIPT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("script[type]").unwrap());

/// Merged, whitespace-normalized `articleBody` text, if any block has one.
pub fn article_body(document: &Html) -> Option<String> {
    let mut collector = BodyCollector::default();
    for script in document.select(&SCRIPT_SELECTOR) {
        let is_jsonld = script
            .value()
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(JSONLD_TYPE));
        if !is_jsonld {
            continue;
        }
        let raw = script.text().collect::<String>();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(tree) => collector.visit(&tree),
            Err(e) => debug!(error = %e, block = %truncate_for_log(raw, 120), "Skipping malformed JSON-LD"),
        }
    }
    collector.finish()
}

#[derive(Debug, Default)]
struct BodyCollector {
    bodies: Vec<String>,
}

impl BodyCollector {
    fn visit(&mut self, node: &Value) {
        match node {
            Value::Array(items) => items.iter().for_each(|item| self.visit(item)),
            Value::Object(object) => self.visit_object(object),
            _ => {}
        }
    }

    fn visit_object(&mut self, object: &Map<String, Value>) {
        if has_type(object, "LiveBlogPosting") {
            for update in one_or_many(object.get("liveBlogUpdate")) {
                if let Value::Object(update) = update {
                    self.push_body(update.get("articleBody"));
                }
            }
        }
        self.push_body(object.get("articleBody"));
        for key in FOLLOWED_KEYS {
            if let Some(child) = object.get(key) {
                self.visit(child);
            }
        }
    }

    fn push_body(&mut self, body: Option<&Value>) {
        if let Some(Value::String(text)) = body {
            if !text.is_empty() {
                self.bodies.push(text.clone());
            }
        }
    }

    fn finish(self) -> Option<String> {
        normalize_whitespace(&self.bodies.join("\n\n"))
    }
}

fn one_or_many(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::Null) | None => &[],
        Some(single) => std::slice::from_ref(single),
    }
}

/// `@type` match, case-insensitive, for both string and list forms.
fn has_type(object: &Map<String, Value>, wanted: &str) -> bool {
    one_or_many(object.get("@type"))
        .iter()
        .filter_map(Value::as_str)
        .any(|t| t.eq_ignore_ascii_case(wanted))
}
