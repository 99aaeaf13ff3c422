//! Main-content extraction over static HTML.
//!
//! Paragraph-level blocks vote for the element that contains them: each
//! qualifying paragraph credits its parent with its link-discounted length and
//! its grandparent with half of that. The best-scoring container wins and its
//! blocks, in document order, become the article text.
//!
//! The heuristic favours precision. Anything under a boilerplate element
//! (navigation, asides, forms, tables, comment sections, share widgets, ...)
//! is ignored, as are short or link-heavy paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;

use crate::utils::normalize_whitespace;

/// Paragraphs shorter than this (in chars) neither vote nor get emitted.
const MIN_PARAGRAPH_CHARS: usize = 25;
/// Share of a block's text allowed to sit inside links.
const MAX_LINK_DENSITY: f64 = 0.5;
/// Below this the result is treated as no content.
const MIN_ARTICLE_CHARS: usize = 80;
/// Score multiplier for containers inside `<article>` or `itemprop=articleBody`.
const ARTICLE_BOOST: f64 = 1.5;

const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "form",
    "table", "figure", "figcaption", "button", "iframe", "svg", "select", "dialog",
];
const HIDDEN_INLINE_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "button"];
const BLOCK_TAGS: &[&str] = &["p", "pre", "blockquote", "h2", "h3", "h4"];
/// Structural elements whose class/id never disqualify their subtree.
const STRUCTURAL_TAGS: &[&str] = &["html", "body", "main", "article"];

static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p, pre").unwrap());
static BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, pre, blockquote, h2, h3, h4").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static BOILERPLATE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)comment|disqus|respond|related|share|social|sidebar|promo|advert|sponsor|cookie|newsletter|subscribe|breadcrumb|byline|caption|footer|masthead|menu|popup|modal|\bnav\b|\bad\b",
    )
    .unwrap()
});

/// Main article text of `document`, whitespace-normalized.
pub fn main_text(document: &Html) -> Option<String> {
    let container = best_container(document)?;
    let blocks: Vec<String> = container
        .select(&BLOCK_SELECTOR)
        .filter(|block| block.id() != container.id())
        .filter(|block| !nested_in_block(*block, container))
        .filter(|block| !is_excluded(*block))
        .filter_map(|block| {
            let text = visible_text(block);
            let is_heading = block.value().name().starts_with('h');
            let keep = if is_heading {
                !text.is_empty()
            } else {
                text.chars().count() >= MIN_PARAGRAPH_CHARS
                    && link_density(block, &text) <= MAX_LINK_DENSITY
            };
            keep.then_some(text)
        })
        .collect();

    let text = normalize_whitespace(&blocks.join("\n\n"))?;
    (text.chars().count() >= MIN_ARTICLE_CHARS).then_some(text)
}

/// Heuristic output that is markup or metadata rather than prose.
///
/// Empty text, a JSON-LD document, anything carrying `<...>` tags, or inlined
/// CSS (`css-` class tokens next to braces) all qualify.
pub fn looks_like_structured_payload(text: &str) -> bool {
    if text.trim().is_empty() {
        return true;
    }
    if text.trim_start().starts_with('{') && text.contains("\"@context\"") {
        return true;
    }
    if text.contains('<') && text.contains('>') {
        return true;
    }
    text.contains("css-") && text.contains('{') && text.contains('}')
}

struct Candidate<'a> {
    element: ElementRef<'a>,
    score: f64,
}

fn best_container(document: &Html) -> Option<ElementRef<'_>> {
    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    let mut index = HashMap::new();

    for paragraph in document.select(&PARAGRAPH_SELECTOR) {
        if is_excluded(paragraph) {
            continue;
        }
        let text = visible_text(paragraph);
        let chars = text.chars().count();
        if chars < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let density = link_density(paragraph, &text);
        if density > MAX_LINK_DENSITY {
            continue;
        }
        let score = paragraph_score(&text, chars, density);

        let ancestors = paragraph.ancestors().filter_map(ElementRef::wrap);
        for (weight, ancestor) in [1.0, 0.5].into_iter().zip(ancestors) {
            let slot = *index.entry(ancestor.id()).or_insert_with(|| {
                candidates.push(Candidate {
                    element: ancestor,
                    score: 0.0,
                });
                candidates.len() - 1
            });
            candidates[slot].score += score * weight;
        }
    }

    candidates
        .into_iter()
        .map(|c| {
            let boost = if in_article(c.element) { ARTICLE_BOOST } else { 1.0 };
            (c.element, c.score * boost)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(element, _)| element)
}

fn paragraph_score(text: &str, chars: usize, density: f64) -> f64 {
    let commas = text.matches(',').count() as f64;
    let length_points = (chars as f64 / 100.0).min(3.0);
    (1.0 + commas + length_points) * (1.0 - density)
}

fn self_and_ancestors(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    std::iter::once(element).chain(element.ancestors().filter_map(ElementRef::wrap))
}

fn in_article(element: ElementRef<'_>) -> bool {
    self_and_ancestors(element).any(|e| {
        e.value().name() == "article" || e.value().attr("itemprop") == Some("articleBody")
    })
}

fn is_excluded(element: ElementRef<'_>) -> bool {
    self_and_ancestors(element).any(is_boilerplate)
}

fn is_boilerplate(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let name = value.name();
    if EXCLUDED_TAGS.contains(&name) {
        return true;
    }
    if STRUCTURAL_TAGS.contains(&name) {
        return false;
    }
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    let class_id = format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.attr("id").unwrap_or_default()
    );
    BOILERPLATE_ATTR.is_match(&class_id)
}

/// True when `block` sits inside another block element below `container`.
fn nested_in_block(block: ElementRef<'_>, container: ElementRef<'_>) -> bool {
    block
        .ancestors()
        .take_while(|node| node.id() != container.id())
        .filter_map(ElementRef::wrap)
        .any(|e| BLOCK_TAGS.contains(&e.value().name()))
}

/// Text of `element` with scripts and other non-rendered children dropped and
/// whitespace collapsed.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if HIDDEN_INLINE_TAGS.contains(&e.name()) => {}
            Node::Element(e) if e.name() == "br" => out.push(' '),
            Node::Element(_) => {
                if let Some(inner) = ElementRef::wrap(child) {
                    collect_text(inner, out);
                }
            }
            _ => {}
        }
    }
}

fn link_density(block: ElementRef<'_>, text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = block
        .select(&LINK_SELECTOR)
        .map(|a| visible_text(a).chars().count())
        .sum();
    (linked as f64 / total as f64).min(1.0)
}
