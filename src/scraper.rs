use reqwest::{Client, ClientBuilder, Url};
use scraper::{ElementRef, Html, Node};
use std::time::Duration;
use crate::error::{AppError, Result};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "dd", "details", "div", "dl", "dt",
    "figcaption", "figure", "footer", "header", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li",
    "main", "nav", "ol", "p", "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead",
    "tr", "ul",
];

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Readable text pulled out of a web page.
#[derive(Debug)]
pub struct ExtractedPage {
    pub url: String,
    pub text: String,
}

/// HTTP client used to download pages for extraction.
pub fn build_fetch_client() -> reqwest::Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .user_agent(concat!("yakunote-server/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub async fn extract(client: &Client, url: &str) -> Result<ExtractedPage> {
    let parsed = parse_url(url)?;

    let fetch_start = std::time::Instant::now();
    let html = fetch_html(client, parsed.clone()).await?;
    tracing::debug!(url = %parsed, bytes = html.len(), elapsed = ?fetch_start.elapsed(), "page fetched");

    let text = extract_text(&html, parsed.as_str())
        .ok_or_else(|| AppError::ExtractionError(format!("no readable content found at {}", url)))?;
    tracing::debug!(url = %parsed, chars = text.chars().count(), "readable text extracted");

    Ok(ExtractedPage {
        url: url.to_string(),
        text,
    })
}

fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| AppError::FetchError(format!("invalid URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::FetchError(format!("unsupported URL scheme '{}'", scheme))),
    }
}

async fn fetch_html(client: &Client, url: Url) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::FetchError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::FetchError(format!("page responded with {}", status)));
    }

    response
        .text()
        .await
        .map_err(|e| AppError::FetchError(e.to_string()))
}

/// Runs readability over `html` and renders the main content as plain text.
/// Returns `None` when nothing readable is left.
pub fn extract_text(html: &str, url: &str) -> Option<String> {
    let cfg = dom_smoothie::Config {
        max_elements_to_parse: 9000,
        ..Default::default()
    };

    let mut readability = dom_smoothie::Readability::new(html, Some(url), Some(cfg)).ok()?;
    let article = match readability.parse() {
        Ok(article) => article,
        Err(e) => {
            tracing::debug!("readability gave up: {}", e);
            return None;
        }
    };

    let mut text = render_blocks(&article.content);
    if text.is_empty() {
        text = tidy_lines(&article.text_content);
    }

    if text.is_empty() { None } else { Some(text) }
}

/// One paragraph per block element, separated by a blank line. Text is
/// collected from every node, so content sitting directly in a `div`, `td`
/// or `dd` is kept. Inline elements join their neighbours without adding
/// whitespace that was not in the markup.
fn render_blocks(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut sink = TextSink::default();
    sink.walk(fragment.root_element());
    sink.finish()
}

#[derive(Default)]
struct TextSink {
    blocks: Vec<String>,
    current: String,
    pending_space: bool,
}

impl TextSink {
    fn walk(&mut self, parent: ElementRef) {
        for child in parent.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.element(el);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, el: ElementRef) {
        let name = el.value().name();
        if SKIPPED_TAGS.contains(&name) {
            return;
        }

        match name {
            "br" => self.line_break(),
            "pre" => {
                self.end_block();
                let raw: String = el.text().collect();
                let block = tidy_lines(&raw);
                if !block.is_empty() {
                    self.blocks.push(block);
                }
            }
            _ if BLOCK_TAGS.contains(&name) => {
                self.end_block();
                self.walk(el);
                self.end_block();
            }
            _ => self.walk(el),
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }

        for (i, word) in text.split_whitespace().enumerate() {
            let at_line_start = self.current.is_empty() || self.current.ends_with('\n');
            if (i > 0 || self.pending_space) && !at_line_start {
                self.current.push(' ');
            }
            self.current.push_str(word);
            self.pending_space = false;
        }

        if text.ends_with(char::is_whitespace) {
            self.pending_space = true;
        }
    }

    fn line_break(&mut self) {
        if !self.current.is_empty() && !self.current.ends_with('\n') {
            self.current.push('\n');
        }
        self.pending_space = false;
    }

    fn end_block(&mut self) {
        let block = self.current.trim();
        if !block.is_empty() {
            self.blocks.push(block.to_string());
        }
        self.current.clear();
        self.pending_space = false;
    }

    fn finish(mut self) -> String {
        self.end_block();
        self.blocks.join("\n\n")
    }
}

/// Trims every line and drops the empty ones.
fn tidy_lines(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut first = true;

    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            if !first {
                result.push('\n');
            }
            result.push_str(trimmed);
            first = false;
        }
    }

    result
}
