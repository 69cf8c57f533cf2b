use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;

use crate::ingest::{clean_text, normalize_text};
use crate::ingest::types::{FeedEntry, FeedFetcher};

pub const DEFAULT_USER_AGENT: &str = concat!("feed-sentiment-tracker/", env!("CARGO_PKG_VERSION"));

// RSS 2.0 keeps items inside <channel>; RSS 1.0 (RDF) puts them next to it.
#[derive(Debug, Deserialize)]
struct RssDoc {
    channel: Option<Channel>,
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

// quick-xml matches element names without their namespace prefix, so `<media:title>`,
// `<dc:title>` or an in-item `<atom:link>` land on the same field as the plain element.
// Those fields are lists; the first non-empty value wins.
#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(rename = "title", default)]
    title: Vec<TextNode>,
    #[serde(rename = "link", default)]
    link: Vec<RssLink>,
    #[serde(rename = "pubDate", default)]
    pub_date: Vec<TextNode>,
    #[serde(rename = "date", default)]
    date: Vec<TextNode>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

// RSS `<link>` carries text; `<atom:link>` carries `href`.
#[derive(Debug, Deserialize)]
struct RssLink {
    #[serde(rename = "$text", default)]
    value: String,
    #[serde(rename = "@href")]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(rename = "title", default)]
    title: Vec<AtomText>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    #[serde(rename = "published", default)]
    published: Vec<TextNode>,
    #[serde(rename = "updated", default)]
    updated: Vec<TextNode>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
    #[serde(rename = "@type")]
    kind: Option<String>,
}

impl AtomText {
    // `type="html"` text is escaped HTML, so entities need one more decoding pass.
    fn cleaned(&self) -> String {
        match self.kind.as_deref() {
            Some("html") => normalize_text(&self.value),
            _ => clean_text(&self.value),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

fn first_text(nodes: &[TextNode]) -> Option<String> {
    nodes
        .iter()
        .map(|n| n.value.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Cleaned title, or `None` when nothing readable is left.
fn first_title(nodes: &[TextNode]) -> Option<String> {
    nodes
        .iter()
        .map(|n| clean_text(&n.value))
        .find(|t| !t.is_empty())
}

impl From<RssItem> for FeedEntry {
    fn from(it: RssItem) -> Self {
        let link = it
            .link
            .iter()
            .map(|l| l.value.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| it.link.iter().find_map(|l| l.href.clone()));
        Self {
            title: first_title(&it.title),
            link,
            published: first_text(&it.pub_date).or_else(|| first_text(&it.date)),
        }
    }
}

impl From<AtomEntry> for FeedEntry {
    fn from(e: AtomEntry) -> Self {
        // rel defaults to "alternate" when absent
        let link = e
            .link
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
            .or_else(|| e.link.first())
            .and_then(|l| l.href.clone());
        let title = e.title.iter().map(AtomText::cleaned).find(|t| !t.is_empty());
        Self {
            title,
            link,
            published: first_text(&e.published).or_else(|| first_text(&e.updated)),
        }
    }
}

// `type="xhtml"` titles wrap their text in markup that `$text` never sees.
// Flatten them to plain text before deserializing.
fn flatten_xhtml_titles(xml: &str) -> String {
    static RE_XHTML_TITLE: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_title = RE_XHTML_TITLE.get_or_init(|| {
        Regex::new(r#"(?s)<title\b[^>]*\btype\s*=\s*["']xhtml["'][^>]*>(.*?)</title>"#)
            .expect("xhtml title regex")
    });
    if !re_title.is_match(xml) {
        return xml.to_string();
    }
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("tag regex"));
    re_title
        .replace_all(xml, |caps: &regex::Captures| {
            let inner = re_tags.replace_all(&caps[1], " ");
            format!("<title>{inner}</title>")
        })
        .into_owned()
}

/// Parse an RSS 2.0, RSS 1.0 or Atom document into raw entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let t0 = std::time::Instant::now();
    let xml_clean = flatten_xhtml_titles(&scrub_html_entities_for_xml(xml));
    if !xml_clean.trim_start().starts_with('<') {
        return Err(anyhow!("not an xml document"));
    }

    let out: Vec<FeedEntry> = if looks_like_atom(&xml_clean) {
        let feed: AtomFeed = from_str(&xml_clean).context("parsing atom xml")?;
        feed.entry.into_iter().map(FeedEntry::from).collect()
    } else {
        let doc: RssDoc = from_str(&xml_clean).context("parsing rss xml")?;
        if doc.channel.is_none() && doc.item.is_empty() {
            return Err(anyhow!("document has neither <channel> nor <item>"));
        }
        doc.channel
            .map(|c| c.item)
            .unwrap_or_default()
            .into_iter()
            .chain(doc.item)
            .map(FeedEntry::from)
            .collect()
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_entries_parsed_total").increment(out.len() as u64);
    Ok(out)
}

fn looks_like_atom(xml: &str) -> bool {
    let head: String = xml.chars().take(2048).collect();
    head.contains("<feed") && !head.contains("<rss") && !head.contains("<rdf:RDF")
}

/// Live fetcher: HTTP GET followed by `parse_feed`.
pub struct HttpRssFetcher {
    client: reqwest::Client,
}

impl HttpRssFetcher {
    /// `timeout` is a transport-level ceiling; the pipeline applies its own per-source limit.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpRssFetcher {
    async fn fetch_feed(&self, source: &str) -> Result<Vec<FeedEntry>> {
        let resp = self
            .client
            .get(source)
            .send()
            .await
            .with_context(|| format!("GET {source}"))?
            .error_for_status()
            .with_context(|| format!("GET {source}"))?;
        let body = resp.text().await.context("reading feed body")?;
        parse_feed(&body).with_context(|| format!("feed at {source}"))
    }

    fn name(&self) -> &'static str {
        "http-rss"
    }
}

// Feeds routinely carry HTML entities that are undefined in XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Example</title>
  <link>https://example.test</link>
  <item>
    <title>  Local team &amp; fans celebrate&nbsp;victory </title>
    <link>https://example.test/a</link>
    <pubDate>Tue, 07 Oct 2025 10:00:00 GMT</pubDate>
  </item>
  <item>
    <title><![CDATA[Storm <b>damage</b> closes roads]]></title>
  </item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <entry>
    <title type="html">Great news</title>
    <link rel="self" href="https://example.test/self"/>
    <link rel="alternate" href="https://example.test/post"/>
    <updated>2025-10-07T10:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items_in_order() {
        let items = parse_feed(RSS).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("Local team & fans celebrate victory"));
        assert_eq!(items[0].link.as_deref(), Some("https://example.test/a"));
        assert_eq!(items[0].published.as_deref(), Some("Tue, 07 Oct 2025 10:00:00 GMT"));
        assert_eq!(items[1].title.as_deref(), Some("Storm damage closes roads"));
        assert_eq!(items[1].link, None);
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn parses_atom_entries_and_prefers_alternate_link() {
        let items = parse_feed(ATOM).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("Great news"));
        assert_eq!(items[0].link.as_deref(), Some("https://example.test/post"));
        assert_eq!(items[0].published.as_deref(), Some("2025-10-07T10:00:00Z"));
    }

    #[test]
    fn empty_channel_is_zero_entries_not_an_error() {
        let xml = r#"<rss version="2.0"><channel><title>t</title></channel></rss>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_feed("this is not xml at all").is_err());
        assert!(parse_feed("<html><body>nope</body></html>").is_err());
    }
}
