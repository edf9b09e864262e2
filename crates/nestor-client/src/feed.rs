// SPDX-License-Identifier: MIT OR Apache-2.0
//! Build-history feeds (`rssAll`).

use crate::client::JenkinsClient;
use chrono::{DateTime, Utc};
use nestor_error::{ErrorCode, NestorError, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Which feed to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTarget {
    /// Every build on the server.
    All,
    /// Builds of one job.
    Job(String),
    /// Builds of the jobs in one view.
    View(String),
}

impl FeedTarget {
    fn segments(&self) -> Vec<&str> {
        match self {
            Self::All => vec!["rssAll"],
            Self::Job(job) => vec!["job", job.as_str(), "rssAll"],
            Self::View(view) => vec!["view", view.as_str(), "rssAll"],
        }
    }

    fn not_found(&self) -> NestorError {
        match self {
            Self::All => crate::response::unexpected_status(reqwest::StatusCode::NOT_FOUND),
            Self::Job(job) => NestorError::job_not_found(job),
            Self::View(view) => NestorError::view_not_found(view),
        }
    }
}

/// One feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Entry id.
    pub id: String,
    /// Title, e.g. `job1 #12 (broken since this build)`.
    pub title: Option<String>,
    /// First link of the entry.
    pub link: Option<String>,
    /// Publication time.
    pub published: Option<DateTime<Utc>>,
    /// Last update time.
    pub updated: Option<DateTime<Utc>>,
    /// Summary or content text.
    pub summary: Option<String>,
}

impl From<feed_rs::model::Entry> for Article {
    fn from(entry: feed_rs::model::Entry) -> Self {
        Self {
            id: entry.id,
            title: entry.title.map(|t| t.content),
            link: entry.links.into_iter().next().map(|l| l.href),
            published: entry.published,
            updated: entry.updated,
            summary: entry.summary.map(|t| t.content),
        }
    }
}

/// Parse an RSS or Atom document into articles, in document order.
pub fn parse_feed(body: &[u8]) -> Result<Vec<Article>> {
    let feed = feed_rs::parser::parse(body).map_err(|e| {
        NestorError::new(ErrorCode::InvalidResponse, format!("invalid feed: {e}")).with_source(e)
    })?;
    Ok(feed.entries.into_iter().map(Article::from).collect())
}

impl JenkinsClient {
    /// Read a build feed.
    pub async fn feed(&self, target: &FeedTarget) -> Result<Vec<Article>> {
        let url = self.endpoint(&target.segments());
        let raw = self
            .fetch(Method::GET, url, &[])
            .await?
            .into_success(|| target.not_found())?;
        parse_feed(raw.body.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>All all builds</title>
  <id>urn:uuid:903deee0-7bfa-11db-9fe1-0800200c9a66</id>
  <updated>2014-03-20T12:36:17Z</updated>
  <entry>
    <title>job1 #2 (stable)</title>
    <link rel="alternate" type="text/html" href="http://localhost:8080/job/job1/2/"/>
    <id>tag:hudson.dev.java.net,2014:job1:2</id>
    <published>2014-03-20T12:36:17Z</published>
    <updated>2014-03-20T12:36:17Z</updated>
  </entry>
  <entry>
    <title>job1 #1 (broken)</title>
    <link rel="alternate" type="text/html" href="http://localhost:8080/job/job1/1/"/>
    <id>tag:hudson.dev.java.net,2014:job1:1</id>
    <published>2014-03-20T12:30:00Z</published>
    <updated>2014-03-20T12:30:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn parses_atom_entries_in_order() {
        let articles = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title.as_deref(), Some("job1 #2 (stable)"));
        assert_eq!(
            articles[0].link.as_deref(),
            Some("http://localhost:8080/job/job1/2/")
        );
        assert!(articles[0].published.is_some());
        assert_eq!(articles[1].title.as_deref(), Some("job1 #1 (broken)"));
    }

    #[test]
    fn rejects_non_feed() {
        let err = parse_feed(b"plain text, not a feed").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidResponse);
    }

    #[test]
    fn target_paths() {
        assert_eq!(FeedTarget::All.segments(), vec!["rssAll"]);
        assert_eq!(
            FeedTarget::Job("somejob".into()).segments(),
            vec!["job", "somejob", "rssAll"]
        );
        assert_eq!(
            FeedTarget::View("someview".into()).segments(),
            vec!["view", "someview", "rssAll"]
        );
    }
}
