//! Link previews fetched over HTTP and read from Open Graph metadata.

use std::cell::RefCell;
use std::error::Error as StdError;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use reqwest::{Client, header};
use tracing::debug;
use url::Url;

use crate::application::render::{EmbedError, LinkPreview, LinkPreviewer, TransientKind};
use crate::infra::error::InfraError;

#[derive(Clone)]
pub struct HttpLinkPreviewer {
    http: Client,
}

impl HttpLinkPreviewer {
    pub fn new(timeout: Duration) -> Result<Self, InfraError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quire/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl LinkPreviewer for HttpLinkPreviewer {
    async fn preview(&self, url: &str) -> Result<Option<LinkPreview>, EmbedError> {
        let target = Url::parse(url).map_err(|err| EmbedError::Malformed {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(EmbedError::Malformed {
                url: url.to_string(),
                message: format!("unsupported scheme `{}`", target.scheme()),
            });
        }

        let response = self
            .http
            .get(target.clone())
            .send()
            .await
            .map_err(|err| classify(url, &err))?;

        let status = response.status();
        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_none_or(|value| value.contains("html"));
        if !status.is_success() || !is_html {
            debug!(
                target = "quire::embed",
                url,
                status = status.as_u16(),
                is_html,
                "Target offered no preview"
            );
            return Ok(None);
        }

        let body = response.text().await.map_err(|err| classify(url, &err))?;
        extract_preview(&target, &body).map_err(|message| EmbedError::Failed {
            url: url.to_string(),
            message,
        })
    }
}

/// Map a client error onto the transient classes that permit a degraded retry.
fn classify(url: &str, err: &reqwest::Error) -> EmbedError {
    let message = err.to_string();
    if err.is_builder() {
        return EmbedError::Malformed {
            url: url.to_string(),
            message,
        };
    }

    let kind = io_kind(err)
        .or_else(|| err.is_timeout().then_some(TransientKind::Timeout))
        .or_else(|| err.is_connect().then_some(TransientKind::Connect))
        .or_else(|| (err.is_request() || err.is_body()).then_some(TransientKind::Fetch));

    match kind {
        Some(kind) => EmbedError::Transient {
            url: url.to_string(),
            kind,
            message,
        },
        None => EmbedError::Failed {
            url: url.to_string(),
            message,
        },
    }
}

fn io_kind(err: &reqwest::Error) -> Option<TransientKind> {
    let mut current: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(inner) = current {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            return match io_err.kind() {
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe => Some(TransientKind::ConnectionReset),
                io::ErrorKind::TimedOut => Some(TransientKind::Timeout),
                io::ErrorKind::ConnectionRefused => Some(TransientKind::Connect),
                _ => None,
            };
        }
        current = inner.source();
    }
    None
}

#[derive(Default)]
struct PreviewState {
    og_title: Option<String>,
    og_description: Option<String>,
    og_image: Option<String>,
    description: Option<String>,
    title: String,
    in_title: bool,
}

/// Pull `og:*` metadata, falling back to `<title>` and `meta[name=description]`.
pub(crate) fn extract_preview(page: &Url, html: &str) -> Result<Option<LinkPreview>, String> {
    let state = Rc::new(RefCell::new(PreviewState::default()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("meta[property], meta[name]", {
                    let state = Rc::clone(&state);
                    move |el| {
                        let key = el
                            .get_attribute("property")
                            .or_else(|| el.get_attribute("name"))
                            .unwrap_or_default()
                            .to_ascii_lowercase();
                        let Some(content) = el
                            .get_attribute("content")
                            .map(|value| value.trim().to_string())
                            .filter(|value| !value.is_empty())
                        else {
                            return Ok(());
                        };
                        let mut state = state.borrow_mut();
                        let slot = match key.as_str() {
                            "og:title" => &mut state.og_title,
                            "og:description" => &mut state.og_description,
                            "og:image" => &mut state.og_image,
                            "description" => &mut state.description,
                            _ => return Ok(()),
                        };
                        slot.get_or_insert(content);
                        Ok(())
                    }
                }),
                element!("title", {
                    let state = Rc::clone(&state);
                    move |_| {
                        state.borrow_mut().in_title = true;
                        Ok(())
                    }
                }),
                text!("title", {
                    let state = Rc::clone(&state);
                    move |chunk| {
                        let mut state = state.borrow_mut();
                        if state.in_title {
                            state.title.push_str(chunk.as_str());
                            if chunk.last_in_text_node() {
                                state.in_title = false;
                            }
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| err.to_string())?;

    let state = state.take();
    let fallback_title = Some(state.title.trim().to_string()).filter(|t| !t.is_empty());
    let title = state.og_title.or(fallback_title);
    let description = state.og_description.or(state.description);
    let image = state
        .og_image
        .and_then(|src| page.join(&src).ok())
        .map(|resolved| resolved.to_string());

    if title.is_none() && description.is_none() && image.is_none() {
        return Ok(None);
    }

    Ok(Some(LinkPreview {
        url: page.to_string(),
        title,
        description,
        image,
    }))
}
