use serde::Deserialize;

use super::{ArxivError, PaperHandle};

#[derive(Debug, Deserialize)]
pub(super) struct Feed {
    #[serde(rename = "entry", default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Entry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "author", default)]
    pub authors: Vec<Author>,
    #[serde(rename = "link", default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Author {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct Link {
    #[serde(rename = "@href")]
    pub href: String,
    #[serde(rename = "@title")]
    pub title: Option<String>,
    #[serde(rename = "@type")]
    pub mime: Option<String>,
}

pub(super) fn parse_feed(xml: &str) -> Result<Vec<PaperHandle>, ArxivError> {
    let feed: Feed = quick_xml::de::from_str(xml)?;

    // arXiv reports malformed queries as a single entry under /api/errors.
    if let Some(err) = feed.entries.iter().find(|e| e.id.contains("/api/errors")) {
        return Err(ArxivError::Query(collapse_whitespace(&err.summary)));
    }

    Ok(feed.entries.into_iter().map(into_handle).collect())
}

fn into_handle(entry: Entry) -> PaperHandle {
    let abs_url = entry.id.trim().to_string();
    let pdf_url = entry
        .links
        .iter()
        .find(|l| l.title.as_deref() == Some("pdf") || l.mime.as_deref() == Some("application/pdf"))
        .map(|l| l.href.clone())
        .unwrap_or_else(|| abs_url.replacen("/abs/", "/pdf/", 1));
    let id = abs_url
        .rsplit_once("/abs/")
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| abs_url.clone());

    PaperHandle {
        id,
        title: collapse_whitespace(&entry.title),
        authors: entry
            .authors
            .into_iter()
            .map(|a| collapse_whitespace(&a.name))
            .filter(|n| !n.is_empty())
            .collect(),
        pdf_url,
        abs_url,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
pub(super) const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <link href="http://arxiv.org/api/query?search_query%3Dattention" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=attention</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <opensearch:totalResults>2</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T00:41:18Z</updated>
    <title>Attention Is All You
  Need</title>
    <summary>The dominant sequence transduction models are based on complex recurrent networks.</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <arxiv:comment>15 pages, 5 figures</arxiv:comment>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1706.03762v7" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2010.11929v2</id>
    <title>An Image is Worth 16x16 Words</title>
    <summary>While the Transformer architecture has become the de-facto standard.</summary>
    <author><name>Alexey Dosovitskiy</name></author>
    <link href="http://arxiv.org/abs/2010.11929v2" rel="alternate" type="text/html"/>
  </entry>
</feed>"#;
