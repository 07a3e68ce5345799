use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use thiserror::Error;
use url::Url;

use super::dates::parse_timestamp;
use super::types::NewsItem;

const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
const DUBLIN_CORE_NS: &[u8] = b"http://purl.org/dc/elements/1.1/";

/// Errors that make an entire feed document unusable.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The XML tokenizer rejected the document.
    #[error("XML parse error: {0}")]
    Xml(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("unclosed element <{0}>")]
    Unclosed(String),
    /// Markup or text after the root element was closed.
    #[error("junk after document element")]
    TrailingContent,
}

/// Items extracted from one feed document.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub items: Vec<NewsItem>,
    /// Candidates dropped for an empty title or link
    pub skipped: usize,
}

/// Parses an RSS or Atom document into normalized news items.
///
/// A document whose root has a `channel` child is read as RSS; anything else
/// is read as Atom. Item order follows document order. `feed_url` is only
/// used to label items whose own link has no usable host.
///
/// # Errors
///
/// Returns [`ParseError`] when the bytes are not well-formed XML. Missing
/// elements inside a well-formed document are not errors; they produce
/// empty fields and the item is skipped if its title or link ends up empty.
pub fn parse_feed(bytes: &[u8], feed_url: &str) -> Result<ParseResult, ParseError> {
    let root = parse_document(bytes)?;

    let mut result = ParseResult::default();
    let mut push = |title: &str, link: &str, published: &str| {
        match build_item(title, link, published, feed_url) {
            Some(item) => result.items.push(item),
            None => result.skipped += 1,
        }
    };

    if let Some(channel) = root.child(None, "channel") {
        for item in channel.children_named(None, "item") {
            let published = first_non_empty(&[
                item.child_text(None, "pubDate"),
                item.child_text(None, "date"),
                item.child_text(Some(DUBLIN_CORE_NS), "date"),
            ]);
            push(
                item.child_text(None, "title"),
                item.child_text(None, "link"),
                published,
            );
        }
    } else {
        for entry in root.children_named(Some(ATOM_NS), "entry") {
            let link = entry
                .child(Some(ATOM_NS), "link")
                .and_then(|l| l.attr("href"))
                .unwrap_or("");
            push(
                entry.child_text(Some(ATOM_NS), "title"),
                link,
                entry.child_text(Some(ATOM_NS), "updated"),
            );
        }
    }

    Ok(result)
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

fn build_item(title: &str, link: &str, published: &str, feed_url: &str) -> Option<NewsItem> {
    let title = title.trim();
    let link = link.trim();
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let source = source_label(link)
        .or_else(|| source_label(feed_url))
        .unwrap_or_default();

    Some(NewsItem {
        title: title.to_string(),
        link: link.to_string(),
        published: published.to_string(),
        timestamp: parse_timestamp(published),
        source,
    })
}

/// Host of `url` without a leading `www.`, if it has one.
pub fn source_label(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

// ============================================================================
// Minimal element tree
// ============================================================================

/// Just enough of an XML tree to answer "direct child named X" queries.
#[derive(Debug)]
struct Element {
    namespace: Option<Vec<u8>>,
    name: Vec<u8>,
    /// Unprefixed attributes only
    attributes: Vec<(Vec<u8>, String)>,
    /// Character data before the first child element
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn is(&self, namespace: Option<&[u8]>, name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.name == name.as_bytes()
    }

    fn child(&self, namespace: Option<&[u8]>, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    fn children_named<'a>(
        &'a self,
        namespace: Option<&'a [u8]>,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, name))
    }

    fn child_text(&self, namespace: Option<&[u8]>, name: &str) -> &str {
        self.child(namespace, name)
            .map(|c| c.text.as_str())
            .unwrap_or("")
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key.as_bytes())
            .map(|(_, v)| v.as_str())
    }
}

fn xml_err(e: impl std::fmt::Display) -> ParseError {
    ParseError::Xml(e.to_string())
}

/// Reads the whole document into an element tree, failing on any
/// well-formedness problem.
///
/// Text is decoded with the charset from the XML declaration (UTF-8 when
/// there is none). Internal entities declared in the DOCTYPE subset are
/// substituted; external entities are never fetched, so referencing one is
/// a parse error like any other unknown entity.
fn parse_document(bytes: &[u8]) -> Result<Element, ParseError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut entities: HashMap<String, String> = HashMap::new();

    loop {
        let (resolved, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(xml_err)?;
        let namespace = match resolved {
            ResolveResult::Bound(ns) => Some(ns.as_ref().to_vec()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                if matches!(event, Event::Start(_) | Event::Empty(_)) {
                    return Err(ParseError::Xml(format!(
                        "unbound namespace prefix '{}'",
                        String::from_utf8_lossy(&prefix)
                    )));
                }
                None
            }
        };

        match event {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(ParseError::TrailingContent);
                }
                stack.push(open_element(&reader, namespace, &e, &entities)?);
            }
            Event::Empty(e) => {
                if root.is_some() {
                    return Err(ParseError::TrailingContent);
                }
                let element = open_element(&reader, namespace, &e, &entities)?;
                close_element(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                // quick-xml already verified the end tag matches the open one
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Xml("unexpected closing tag".into()))?;
                close_element(element, &mut stack, &mut root);
            }
            Event::Text(t) => match stack.last_mut() {
                Some(current) => {
                    if current.children.is_empty() {
                        let text = t
                            .unescape_with(|name| resolve_entity(&entities, name))
                            .map_err(xml_err)?;
                        current.text.push_str(&text);
                    }
                }
                None => {
                    if !t.iter().all(|b| b.is_ascii_whitespace()) {
                        return Err(if root.is_some() {
                            ParseError::TrailingContent
                        } else {
                            ParseError::Xml("text before root element".into())
                        });
                    }
                }
            },
            Event::CData(c) => match stack.last_mut() {
                Some(current) => {
                    if current.children.is_empty() {
                        current
                            .text
                            .push_str(&reader.decoder().decode(&c).map_err(xml_err)?);
                    }
                }
                None => return Err(ParseError::Xml("CDATA outside root element".into())),
            },
            Event::DocType(d) => {
                let doctype = reader.decoder().decode(&d).map_err(xml_err)?;
                entities = internal_entities(&doctype);
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Unclosed(
            String::from_utf8_lossy(&open.name).into_owned(),
        ));
    }

    root.ok_or(ParseError::NoRoot)
}

fn open_element<R>(
    reader: &NsReader<R>,
    namespace: Option<Vec<u8>>,
    start: &BytesStart<'_>,
    entities: &HashMap<String, String>,
) -> Result<Element, ParseError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.prefix().is_some() {
            continue;
        }
        let value = attr
            .decode_and_unescape_value_with(reader.decoder(), |name| {
                resolve_entity(entities, name)
            })
            .map_err(xml_err)?;
        attributes.push((attr.key.local_name().as_ref().to_vec(), value.into_owned()));
    }

    Ok(Element {
        namespace,
        name: start.local_name().as_ref().to_vec(),
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

/// The five predefined XML entities, then anything declared in the DOCTYPE.
fn resolve_entity<'a>(declared: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => declared.get(name).map(String::as_str),
    }
}

/// Collects `<!ENTITY name "value">` declarations from a DOCTYPE body.
///
/// Parameter entities and `SYSTEM`/`PUBLIC` entities are skipped. Values are
/// substituted literally, without expanding references inside them, so
/// nested entity definitions cannot blow up the document size. The first
/// declaration of a name wins.
fn internal_entities(doctype: &str) -> HashMap<String, String> {
    let mut entities = HashMap::new();
    let mut rest = doctype;

    while let Some(start) = rest.find("<!ENTITY") {
        rest = rest[start + "<!ENTITY".len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }
        let Some((name, after)) = rest.split_once(|c: char| c.is_ascii_whitespace()) else {
            break;
        };
        let after = after.trim_start();
        let Some(quote) = after.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            // External entity
            rest = after;
            continue;
        };
        let Some(len) = after[1..].find(quote) else {
            break;
        };
        entities
            .entry(name.to_string())
            .or_insert_with(|| after[1..1 + len].to_string());
        rest = &after[len + 2..];
    }

    entities
}

fn close_element(element: Element, stack: &mut Vec<Element>, root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}
