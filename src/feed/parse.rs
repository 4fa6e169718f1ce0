// src/feed/parse.rs
use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use regex::{Captures, Regex};
use serde::Deserialize;

/// A parsed syndication document. RSS wraps items in a channel, Atom lists
/// entries directly under the feed root.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedDocument {
    Rss(RssDocument),
    Atom(AtomDocument),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RssDocument {
    #[serde(default)]
    pub channel: Option<RssChannel>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RssChannel {
    #[serde(default, rename = "item")]
    pub items: Vec<RawEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AtomDocument {
    #[serde(default, rename = "entry")]
    pub entries: Vec<RawEntry>,
}

/// Fields shared by `<item>` and `<entry>` that key/link derivation needs.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawEntry {
    #[serde(default)]
    pub guid: Option<TextField>,
    #[serde(default)]
    pub id: Option<TextField>,
    #[serde(default, rename = "link")]
    pub links: Vec<LinkField>,
    #[serde(default)]
    pub title: Option<TextField>,
}

/// Element whose text content is all we care about (`<guid isPermaLink="false">x</guid>`).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TextField {
    #[serde(rename = "$text", default)]
    pub value: Option<String>,
}

impl TextField {
    pub fn text(&self) -> Option<&str> {
        self.value.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// `<link>` is either plain text (RSS) or an `href`/`rel` pair (Atom).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LinkField {
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
    #[serde(rename = "@rel", default)]
    pub rel: Option<String>,
    #[serde(rename = "$text", default)]
    pub value: Option<String>,
}

impl FeedDocument {
    /// Classify by root element and deserialize the matching shape.
    pub fn parse(xml: &str) -> Result<Self> {
        let xml = scrub_html_entities_for_xml(xml);
        let xml = drop_prefixed_elements(&xml)?;
        let root = root_element(&xml)?;
        match root.as_str() {
            "rss" => {
                let doc: RssDocument = from_str(&xml).context("parsing rss document")?;
                Ok(FeedDocument::Rss(doc))
            }
            "feed" => {
                let doc: AtomDocument = from_str(&xml).context("parsing atom document")?;
                Ok(FeedDocument::Atom(doc))
            }
            other => Err(anyhow!("unsupported feed root element <{other}>")),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeedDocument::Rss(_) => "rss",
            FeedDocument::Atom(_) => "atom",
        }
    }
}

/// Entry list of either shape. A missing list is empty; a lone entry is a
/// one-element list.
pub fn pick_items(doc: &FeedDocument) -> &[RawEntry] {
    match doc {
        FeedDocument::Rss(rss) => rss
            .channel
            .as_ref()
            .map(|c| c.items.as_slice())
            .unwrap_or(&[]),
        FeedDocument::Atom(atom) => atom.entries.as_slice(),
    }
}

fn root_element(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().context("reading feed root")? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase());
            }
            Event::Eof => return Err(anyhow!("empty feed document")),
            _ => {}
        }
    }
}

/// Removes namespaced children (`itunes:title`, `atom:link`, `media:*`) and
/// their subtrees. The deserializer matches on local names, so these would
/// otherwise collide with the plain RSS/Atom fields. The root is kept as is.
fn drop_prefixed_elements(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut depth = 0usize;
    let mut skipping = 0usize;
    loop {
        let event = reader.read_event().context("reading feed document")?;
        match &event {
            Event::Eof => break,
            Event::Start(e) => {
                if skipping > 0 {
                    skipping += 1;
                    continue;
                }
                if depth > 0 && e.name().prefix().is_some() {
                    skipping = 1;
                    continue;
                }
                depth += 1;
            }
            Event::End(_) => {
                if skipping > 0 {
                    skipping -= 1;
                    continue;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Empty(e) => {
                if skipping > 0 || (depth > 0 && e.name().prefix().is_some()) {
                    continue;
                }
            }
            _ if skipping > 0 => continue,
            _ => {}
        }
        writer.write_event(event).context("rewriting feed document")?;
    }
    String::from_utf8(writer.into_inner()).context("feed document is not utf-8")
}

// XML predefines only these; everything else is an HTML leak.
const XML_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

/// Rewrite HTML named entities as numeric references so the XML parser
/// accepts them. Unknown names become literal text.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY.get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]{0,31});").unwrap());

    re.replace_all(s, |caps: &Captures| {
        let name = &caps[1];
        if XML_ENTITIES.contains(&name) {
            return caps[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&caps[0]);
        if decoded == &caps[0] {
            format!("&amp;{name};")
        } else {
            decoded.chars().map(|c| format!("&#{};", c as u32)).collect()
        }
    })
    .into_owned()
}
