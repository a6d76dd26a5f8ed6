use crate::server::config::ServerConfig;
use llm_core::llm::{self, Body, ConnectionError, Outcome, Response};
use llm_core::log::LogLevel;
use reqwest::{header, redirect, Client, RequestBuilder};
use std::collections::HashMap;

const HEARTBEAT_ERROR: &str = "heartbeat error";
const PROMPT_ERROR: &str = "prompt error";

/// Talks to one inference server. Cheap to clone; every call is a single
/// request/response exchange with no retries.
#[derive(Clone, Debug)]
pub struct LlmClient {
    http: Client,
    cfg: ServerConfig,
}

impl LlmClient {
    pub fn new(cfg: ServerConfig) -> anyhow::Result<Self> {
        // 3xx must reach the caller as a Failure, not be chased.
        let mut builder = Client::builder()
            .use_rustls_tls()
            .redirect(redirect::Policy::none());
        builder = match &cfg.proxy {
            Some(p) => builder.proxy(reqwest::Proxy::all(p)?),
            None => builder.no_proxy(),
        };
        let http = builder.build()?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.cfg
    }

    /// `GET {host}/heartbeat`. The body is always the raw text.
    pub async fn heartbeat(&self) -> Outcome {
        let url = format!("{}/heartbeat", self.cfg.host);
        self.cfg.log(
            LogLevel::Debug,
            "Sending a request",
            &[("method", Some("GET".into())), ("url", Some(url.clone()))],
        );

        self.dispatch(self.http.get(&url), false, HEARTBEAT_ERROR)
            .await
    }

    /// `POST {host}/completion` with `{"prompt": ...}`. The prompt is sent as given.
    ///
    /// The body comes back as [`Body::Json`] when the server answered with valid
    /// JSON and as [`Body::Text`] otherwise, whatever the status.
    pub async fn completion(&self, prompt: &str) -> Outcome {
        let url = format!("{}/completion", self.cfg.host);
        self.cfg.log(
            LogLevel::Debug,
            "Sending a request",
            &[("method", Some("POST".into())), ("url", Some(url.clone()))],
        );

        let req = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .json(&serde_json::json!({ "prompt": prompt }));
        self.dispatch(req, true, PROMPT_ERROR).await
    }

    async fn dispatch(&self, req: RequestBuilder, parse: bool, failure: &'static str) -> Outcome {
        match exchange(req, parse).await {
            Ok(response) => {
                let message = if llm::is_success_status(response.status()) {
                    "Successful response"
                } else {
                    "Unsuccessful response"
                };
                self.cfg.log(
                    LogLevel::Info,
                    message,
                    &[("status", Some(response.status().to_string()))],
                );
                llm::classify(response)
            }
            Err(e) => {
                self.cfg
                    .log(LogLevel::Info, failure, &[("error", Some(e.to_string()))]);
                Err(Response::disconnected(ConnectionError::new(failure, e)))
            }
        }
    }
}

/// Sends the request and reads the whole body. Any error here means no usable
/// HTTP response was obtained.
async fn exchange(req: RequestBuilder, parse: bool) -> Result<Response, reqwest::Error> {
    let resp = req.send().await?;
    let status = resp.status();
    let headers = map_headers(resp.headers());
    let text = resp.text().await?;
    let body = if parse {
        Body::parse_or_text(text)
    } else {
        Body::Text(text)
    };
    Ok(Response::received(status, body, headers))
}

fn map_headers(headers: &header::HeaderMap) -> HashMap<String, String> {
    let mut out: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_string())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    out
}
