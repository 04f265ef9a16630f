use anyhow::{bail, Context, Result};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use url::Url;

use crate::config::WebContentConfig;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script regex"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Where the pipeline gets page text from.
///
/// `Ok(None)` means the page answered but had no readable text; both that
/// and `Err` send the link down the domain-only path.
pub trait ContentSource: Send + Sync {
    fn fetch_text<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
}

pub struct WebContentFetcher {
    client: Client,
    config: WebContentConfig,
}

impl WebContentFetcher {
    pub fn new(config: WebContentConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    /// Raw HTML of a page, used when harvesting links from a live URL.
    pub async fn fetch_html(&self, raw_url: &str) -> Result<String> {
        let url = Url::parse(raw_url).with_context(|| format!("invalid URL {}", raw_url))?;
        self.get_body(url).await
    }

    /// Visible text of a page, truncated to the configured budget.
    pub async fn fetch(&self, raw_url: &str) -> Result<Option<String>> {
        let url = upgrade_to_https(raw_url)?;
        let body = self.get_body(url).await?;
        let text = extract_text(&body, self.config.content_max_length);
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    async fn get_body(&self, url: Url) -> Result<String> {
        if !matches!(url.scheme(), "http" | "https") {
            bail!("unsupported scheme {}", url.scheme());
        }

        let mut request = self.client.get(url.clone());
        if let Some(timeout) = self.config.fetch_timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} from {}", status.as_u16(), url);
        }

        response
            .text()
            .await
            .with_context(|| format!("failed to read body of {}", url))
    }
}

impl ContentSource for WebContentFetcher {
    fn fetch_text<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(self.fetch(url))
    }
}

fn upgrade_to_https(raw_url: &str) -> Result<Url> {
    let target = match raw_url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => raw_url.to_string(),
    };
    Url::parse(&target).with_context(|| format!("invalid URL {}", raw_url))
}

/// Drops scripts, styles and markup, collapses whitespace, keeps `max_chars`.
pub fn extract_text(html: &str, max_chars: usize) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(html, "");
    let without_styles = STYLE_BLOCK.replace_all(&without_scripts, "");
    let without_tags = ANY_TAG.replace_all(&without_styles, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&without_tags, " ");
    collapsed.trim().chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_styles_and_tags() {
        let html = r#"<html><head><style>body { color: red }</style>
            <SCRIPT type="text/javascript">var x = "<b>";</SCRIPT></head>
            <body><h1>Title</h1>
            <p>Hello   <a href="/x">world</a></p></body></html>"#;
        assert_eq!(extract_text(html, 2_000), "Title Hello world");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        let html = format!("<p>{}</p>", "ü".repeat(50));
        assert_eq!(extract_text(&html, 10).chars().count(), 10);
    }

    #[test]
    fn markup_only_page_has_no_text() {
        assert_eq!(extract_text("<div><script>1</script></div>", 100), "");
    }

    #[test]
    fn plain_http_is_upgraded() {
        assert_eq!(
            upgrade_to_https("http://example.com/a?b=c").unwrap().as_str(),
            "https://example.com/a?b=c"
        );
        assert_eq!(
            upgrade_to_https("https://example.com/").unwrap().as_str(),
            "https://example.com/"
        );
        assert!(upgrade_to_https("::nope").is_err());
    }
}
