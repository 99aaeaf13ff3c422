//! Format-agnostic feed parsing.
//!
//! The document is read into a small element tree with [`quick_xml::NsReader`],
//! then classified by its root element:
//!
//! | Root | Path |
//! |------|------|
//! | local name ends in `rss` | RSS: `channel/item` |
//! | local name ends in `feed` | Atom: `entry` in `http://www.w3.org/2005/Atom` |
//! | anything else with a `channel` child | RSS |
//! | anything else | no items |
//!
//! Text is decoded with the encoding named in the XML declaration (UTF-8 when
//! there is none). Malformed XML is an error; missing fields are not.

use quick_xml::NsReader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use tracing::debug;

use crate::error::FeedError;
use crate::models::FeedItem;

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Which parser a document was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
    Unknown,
}

/// Parse a feed document into items, in document order.
pub fn parse(xml: &[u8]) -> Result<Vec<FeedItem>, FeedError> {
    let root = read_tree(xml)?;
    let format = detect(&root);
    let items = match format {
        FeedFormat::Rss => rss_items(&root),
        FeedFormat::Atom => atom_items(&root),
        FeedFormat::Unknown => Vec::new(),
    };
    debug!(?format, root = %root.name, count = items.len(), "Parsed feed");
    Ok(items)
}

/// Classify a document by its root element without extracting items.
pub fn detect_format(xml: &[u8]) -> Result<FeedFormat, FeedError> {
    read_tree(xml).map(|root| detect(&root))
}

fn detect(root: &Node) -> FeedFormat {
    let tag = root.name.to_ascii_lowercase();
    if tag.ends_with("rss") {
        FeedFormat::Rss
    } else if tag.ends_with("feed") {
        FeedFormat::Atom
    } else if root.child(None, "channel").is_some() {
        FeedFormat::Rss
    } else {
        FeedFormat::Unknown
    }
}

fn rss_items(root: &Node) -> Vec<FeedItem> {
    let Some(channel) = root.child(None, "channel") else {
        return Vec::new();
    };
    channel
        .children_named(None, "item")
        .map(|item| FeedItem {
            title: item.child_text(None, "title"),
            url: item.child_text(None, "link"),
            guid: item.child_text(None, "guid"),
            published: item.child_text(None, "pubDate"),
            summary: item.child_text(None, "description"),
        })
        .collect()
}

fn atom_items(root: &Node) -> Vec<FeedItem> {
    let ns = Some(ATOM_NS);
    root.children_named(ns, "entry")
        .map(|entry| FeedItem {
            title: entry.child_text(ns, "title"),
            url: entry
                .child(ns, "link")
                .and_then(|link| link.attr("href"))
                .map(str::to_string),
            guid: None,
            published: entry
                .child_text(ns, "updated")
                .or_else(|| entry.child_text(ns, "published")),
            summary: entry.child_text(ns, "summary"),
        })
        .collect()
}

/// Minimal owned element tree.
#[derive(Debug, Default)]
struct Node {
    ns: Option<String>,
    name: String,
    attrs: Vec<(String, String)>,
    /// Direct character data, children excluded.
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn children_named<'a, 'b>(
        &'a self,
        ns: Option<&'b str>,
        name: &'b str,
    ) -> impl Iterator<Item = &'a Node> + 'b
    where
        'a: 'b,
    {
        self.children
            .iter()
            .filter(move |c| c.name == name && c.ns.as_deref() == ns)
    }

    fn child(&self, ns: Option<&str>, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|c| c.name == name && c.ns.as_deref() == ns)
    }

    /// Trimmed text of the first matching child; `None` if absent or blank.
    fn child_text(&self, ns: Option<&str>, name: &str) -> Option<String> {
        let text = self.child(ns, name)?.text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn namespace_of(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    }
}

fn xml_error(position: u64, source: quick_xml::Error) -> FeedError {
    FeedError::Xml { position, source }
}

fn open_node(ns: Option<String>, start: &BytesStart<'_>, position: u64) -> Result<Node, FeedError> {
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| xml_error(position, e.into()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = match attr.decode_and_unescape_value(start.decoder()) {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attrs.push((key, value));
    }
    Ok(Node {
        ns,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attrs,
        ..Default::default()
    })
}

fn push_text(stack: &mut [Node], text: &str) {
    if let Some(open) = stack.last_mut() {
        open.text.push_str(text);
    }
}

/// Close `node`, attaching it to its parent or making it the root.
fn close_node(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), FeedError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_some() => return Err(FeedError::MultipleRoots(node.name)),
        None => *root = Some(node),
    }
    Ok(())
}

fn read_tree(xml: &[u8]) -> Result<Node, FeedError> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => return Err(xml_error(reader.error_position() as u64, e)),
        };
        let position = reader.buffer_position() as u64;

        match event {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                    return Err(FeedError::MultipleRoots(name));
                }
                let ns = namespace_of(&reader.resolve_element(start.name()).0);
                stack.push(open_node(ns, &start, position)?);
            }
            Event::Empty(start) => {
                let ns = namespace_of(&reader.resolve_element(start.name()).0);
                let node = open_node(ns, &start, position)?;
                close_node(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    close_node(&mut stack, &mut root, node)?;
                }
            }
            Event::Text(text) => {
                let raw = text
                    .decode()
                    .unwrap_or_else(|_| String::from_utf8_lossy(&text));
                match unescape(&raw) {
                    Ok(unescaped) => push_text(&mut stack, &unescaped),
                    Err(_) => push_text(&mut stack, &raw),
                }
            }
            Event::CData(data) => {
                let raw = data
                    .decode()
                    .unwrap_or_else(|_| String::from_utf8_lossy(&data));
                push_text(&mut stack, &raw);
            }
            Event::GeneralRef(reference) => {
                let name = reference
                    .decode()
                    .unwrap_or_else(|_| String::from_utf8_lossy(&reference))
                    .into_owned();
                match reference.resolve_char_ref() {
                    Ok(Some(ch)) => push_text(&mut stack, ch.encode_utf8(&mut [0; 4])),
                    _ => match resolve_predefined_entity(&name) {
                        Some(resolved) => push_text(&mut stack, resolved),
                        // Undeclared entities (e.g. `&nbsp;` from HTML) stay verbatim
                        None => push_text(&mut stack, &format!("&{name};")),
                    },
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(FeedError::UnexpectedEof(open.name));
    }
    root.ok_or(FeedError::NoRoot)
}
