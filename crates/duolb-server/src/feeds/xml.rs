//! Sitemap and RSS 2.0 document writers.

use chrono::{DateTime, Utc};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// One `<url>` of a sitemap.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlEntry {
    pub loc: String,
    pub lastmod: Option<String>,
    pub changefreq: Option<&'static str>,
    pub priority: f32,
}

#[derive(Debug, Clone)]
pub struct RssChannel<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: DateTime<Utc>,
}

struct XmlDoc {
    writer: Writer<Vec<u8>>,
}

impl XmlDoc {
    fn new() -> Result<Self, quick_xml::Error> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(Self { writer })
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), quick_xml::Error> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), quick_xml::Error> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text(&mut self, name: &str, value: &str) -> Result<(), quick_xml::Error> {
        self.open(name, &[])?;
        self.writer.write_event(Event::Text(BytesText::new(value)))?;
        self.close(name)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// `<sitemapindex>` listing child sitemaps.
pub fn render_sitemap_index(locs: &[String]) -> Result<Vec<u8>, quick_xml::Error> {
    let mut doc = XmlDoc::new()?;
    doc.open("sitemapindex", &[("xmlns", SITEMAP_NS)])?;
    for loc in locs {
        doc.open("sitemap", &[])?;
        doc.text("loc", loc)?;
        doc.close("sitemap")?;
    }
    doc.close("sitemapindex")?;
    Ok(doc.finish())
}

pub fn render_urlset(entries: &[UrlEntry]) -> Result<Vec<u8>, quick_xml::Error> {
    let mut doc = XmlDoc::new()?;
    doc.open("urlset", &[("xmlns", SITEMAP_NS)])?;
    for entry in entries {
        doc.open("url", &[])?;
        doc.text("loc", &entry.loc)?;
        if let Some(lastmod) = &entry.lastmod {
            doc.text("lastmod", lastmod)?;
        }
        if let Some(changefreq) = entry.changefreq {
            doc.text("changefreq", changefreq)?;
        }
        doc.text("priority", &format!("{:.1}", entry.priority))?;
        doc.close("url")?;
    }
    doc.close("urlset")?;
    Ok(doc.finish())
}

pub fn render_rss(channel: &RssChannel<'_>, items: &[RssItem]) -> Result<Vec<u8>, quick_xml::Error> {
    let mut doc = XmlDoc::new()?;
    doc.open("rss", &[("version", "2.0")])?;
    doc.open("channel", &[])?;
    doc.text("title", channel.title)?;
    doc.text("link", channel.link)?;
    doc.text("description", channel.description)?;
    for item in items {
        doc.open("item", &[])?;
        doc.text("title", &item.title)?;
        doc.text("link", &item.link)?;
        doc.text("guid", &item.link)?;
        doc.text("description", &item.description)?;
        doc.text("pubDate", &rfc822(item.pub_date))?;
        doc.close("item")?;
    }
    doc.close("channel")?;
    doc.close("rss")?;
    Ok(doc.finish())
}

/// RSS date, e.g. `Fri, 01 Mar 2024 10:20:30 GMT`.
fn rfc822(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
