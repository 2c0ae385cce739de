//! Web page fetching and HTML-to-text conversion.

use scraper::{Html, Node};

use crate::context::ContextError;
use crate::ui::Ui;

/// Fetches one URL entry and returns its readable text. Entries without an
/// explicit scheme default to `http://`.
pub(crate) async fn fetch_page(entry: &str, ui: &Ui) -> Result<String, ContextError> {
    let url = normalize_url(entry);
    ui.info(&format!("Fetching {url}"));

    let response = reqwest::get(&url)
        .await
        .map_err(|cause| classify_fetch(entry, cause))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ContextError::NotFound {
            source: entry.to_string(),
        });
    }
    if status.is_client_error() {
        return Err(ContextError::InvalidRequest {
            source: entry.to_string(),
        });
    }
    let response = response
        .error_for_status()
        .map_err(|cause| ContextError::BadResponse {
            source: entry.to_string(),
            cause,
        })?;

    let body = response
        .text()
        .await
        .map_err(|cause| ContextError::BadResponse {
            source: entry.to_string(),
            cause,
        })?;

    Ok(html_to_text(&body))
}

pub(crate) fn normalize_url(entry: &str) -> String {
    let lowered = entry.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        entry.to_string()
    } else {
        format!("http://{entry}")
    }
}

fn classify_fetch(entry: &str, cause: reqwest::Error) -> ContextError {
    let source = entry.to_string();
    if cause.is_timeout() {
        ContextError::NetworkTimeout { source, cause }
    } else if cause.is_builder() {
        ContextError::InvalidRequest { source }
    } else if cause.is_connect() || cause.is_request() {
        ContextError::NetworkError { source, cause }
    } else {
        ContextError::BadResponse { source, cause }
    }
}

const CHROME_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Strips scripts, styles, and other non-content markup, keeping readable
/// text. Walks the parsed tree so the stripping does not depend on how the
/// source markup was spelled.
pub(crate) fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    let mut stack = vec![doc.tree.root()];
    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Element(el) if CHROME_TAGS.contains(&el.name()) => continue,
            Node::Text(text) => {
                out.push_str(&text.text);
                out.push(' ');
            }
            _ => {}
        }
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }
    out
}
