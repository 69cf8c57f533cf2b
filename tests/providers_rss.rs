// tests/providers_rss.rs
use feed_sentiment_tracker::ingest::providers::{parse_feed, StaticFeed, StaticFeedFetcher};
use feed_sentiment_tracker::ingest::types::FeedFetcher;

const RSS_XML: &str = include_str!("fixtures/sample_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/sample_atom.xml");

#[test]
fn rss_fixture_yields_items_in_document_order() {
    let items = parse_feed(RSS_XML).expect("rss parse ok");
    let titles: Vec<&str> = items.iter().filter_map(|e| e.title.as_deref()).collect();
    assert_eq!(
        titles,
        vec![
            "Students celebrate a great win at the regional finals",
            "Library hours extended & new study rooms open",
            "Flooding causes terrible damage to the science building",
        ]
    );
    assert_eq!(
        items[0].published.as_deref(),
        Some("Mon, 06 Oct 2025 18:30:00 GMT")
    );
    assert_eq!(items[1].published.as_deref(), Some("2025-10-05T09:00:00Z"));
    assert_eq!(items[2].published, None);
}

#[test]
fn atom_fixture_decodes_titles_and_picks_alternate_links() {
    let items = parse_feed(ATOM_XML).expect("atom parse ok");
    assert_eq!(items.len(), 2);

    let first = items[0].title.as_deref().unwrap_or_default();
    assert!(first.starts_with("Release 2.0"), "got {first:?}");
    assert!(!first.contains("&mdash;"), "entity left undecoded: {first:?}");

    assert_eq!(items[1].link.as_deref(), Some("https://blog.example/outage"));
    assert_eq!(items[1].published.as_deref(), Some("2025-10-01T08:00:00Z"));
}

#[tokio::test]
async fn static_fetcher_runs_xml_through_the_same_parser() {
    let src = "https://campus.example/rss";
    let f = StaticFeedFetcher::new().with(src, StaticFeed::Xml(RSS_XML.into()));
    let items = f.fetch_feed(src).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items, parse_feed(RSS_XML).unwrap());
}

#[tokio::test]
async fn broken_xml_fixture_is_a_fetch_error() {
    let f = StaticFeedFetcher::new().with("bad", StaticFeed::Xml("<rss><channel>".into()));
    assert!(f.fetch_feed("bad").await.is_err());
}

const NAMESPACED_XML: &str = include_str!("fixtures/namespaced_rss.xml");

#[test]
fn namespaced_siblings_do_not_sink_the_feed() {
    let items = parse_feed(NAMESPACED_XML).expect("namespaced rss parse ok");
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].title.as_deref(), Some("Harbor reopens after storm repairs"));
    assert_eq!(items[0].link.as_deref(), Some("https://news.example/world/harbor"));
    assert_eq!(
        items[0].published.as_deref(),
        Some("Wed, 08 Oct 2025 07:15:00 GMT")
    );

    // empty <dc:title> is skipped, <atom:link> href stands in for a missing <link>
    assert_eq!(items[1].title.as_deref(), Some("Use &lt;b&gt; tags & more"));
    assert_eq!(items[1].link.as_deref(), Some("https://news.example/world/tags"));
    assert_eq!(items[1].published.as_deref(), Some("2025-10-07T21:00:00Z"));
}

#[test]
fn xhtml_atom_titles_keep_their_text() {
    let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml">Hi <b>there</b></div></title>
    <link href="https://blog.example/hi"/>
  </entry>
  <entry>
    <title type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"></div></title>
  </entry>
</feed>"#;
    let items = parse_feed(xml).expect("atom parse ok");
    assert_eq!(items[0].title.as_deref(), Some("Hi there"));
    assert_eq!(items[1].title, None);
}
