//! A reply provider for OpenRouter and other OpenAI-compatible APIs.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use heso_model::{
    ErrorKind, Reply, ReplyProvider, ReplyProviderError, ReplyRequest,
};
use mime::Mime;
use reqwest::{Client, StatusCode, header};

pub use config::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, OpenRouterConfig, OpenRouterConfigBuilder,
};

/// Error type for [`OpenRouterProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ReplyProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenRouter (OpenAI-compatible) reply provider.
///
/// Every request is sent as a non-streaming chat completion, with the
/// configured system prompt in front of the conversation history.
#[derive(Clone, Debug)]
pub struct OpenRouterProvider {
    client: Client,
    config: Arc<OpenRouterConfig>,
}

impl OpenRouterProvider {
    /// Creates a new `OpenRouterProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenRouterConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ReplyProvider for OpenRouterProvider {
    type Error = Error;

    fn send_request(
        &self,
        req: &ReplyRequest,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static {
        let openrouter_req = proto::create_request(req, &self.config);
        let mut builder = self
            .client
            .post(format!("{}{}", self.config.base_url, "/chat/completions"))
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");
        if let Some(referer) = &self.config.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.title {
            builder = builder.header("X-Title", title);
        }
        let resp_fut = builder.json(&openrouter_req).send();

        async move {
            let resp = match resp_fut.await {
                Ok(resp) => resp,
                Err(err) => {
                    return Err(Error::new(
                        format!("{err}"),
                        ErrorKind::Transport,
                    ));
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let detail = proto::describe_error_body(&body)
                    .unwrap_or_else(|| status.to_string());
                error!("upstream returned {status}: {body}");
                let kind = if status == StatusCode::TOO_MANY_REQUESTS {
                    ErrorKind::RateLimitExceeded
                } else {
                    ErrorKind::Status
                };
                return Err(Error::new(detail, kind));
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
            let is_valid_content_type = content_type
                .as_deref()
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.subtype() == mime::JSON)
                .unwrap_or(false);
            if !is_valid_content_type {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::Malformed,
                ));
            }

            let body = resp.text().await.map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::Transport)
            })?;
            trace!("got response body: {body}");
            proto::parse_reply(&body)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use heso_model::ReplyMessage;

    use super::*;

    const REPLY_BODY: &str = r#"{
        "model": "openai/gpt-4o-mini",
        "choices": [{ "message": { "role": "assistant", "content": "Hi there!" } }]
    }"#;

    /// Accepts one connection, answers it with the given response and
    /// resolves with the raw request.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api/v1", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let raw = read_request(&mut stream).await;
            let resp = format!(
                "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            raw
        });
        (base_url, server)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&raw);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if !name.eq_ignore_ascii_case("content-length") {
                        return None;
                    }
                    value.trim().parse::<usize>().ok()
                })
                .unwrap_or(0);
            if raw.len() >= head_end + 4 + content_length {
                break;
            }
        }
        String::from_utf8(raw).unwrap()
    }

    fn provider(config: OpenRouterConfig) -> OpenRouterProvider {
        OpenRouterProvider {
            client: Client::builder().no_proxy().build().unwrap(),
            config: Arc::new(config),
        }
    }

    fn request() -> ReplyRequest {
        ReplyRequest {
            messages: vec![ReplyMessage::User("Hello".to_owned())],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let (base_url, server) =
            serve_once("200 OK", "application/json; charset=utf-8", REPLY_BODY)
                .await;
        let config = OpenRouterConfigBuilder::with_api_key("sk-test")
            .with_base_url(format!("{base_url}/"))
            .with_system_prompt("Be kind.")
            .with_referer("https://heso.example")
            .with_title("Heso")
            .build();

        let reply = provider(config).send_request(&request()).await.unwrap();
        assert_eq!(reply.content, "Hi there!");
        assert_eq!(reply.model.as_deref(), Some("openai/gpt-4o-mini"));

        let raw = server.await.unwrap();
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /api/v1/chat/completions HTTP/1.1\r\n"));
        let headers: Vec<String> = head
            .lines()
            .skip(1)
            .map(|line| {
                let (name, value) = line.split_once(':').unwrap();
                format!("{}: {}", name.to_ascii_lowercase(), value.trim())
            })
            .collect();
        for expected in [
            "authorization: Bearer sk-test",
            "http-referer: https://heso.example",
            "x-title: Heso",
            "content-type: application/json",
        ] {
            assert!(
                headers.iter().any(|h| h == expected),
                "missing {expected:?} in {headers:?}"
            );
        }
        assert!(!headers.iter().any(|h| h.starts_with("referer:")));

        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be kind.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello");
    }

    #[tokio::test]
    async fn test_no_attribution_headers_by_default() {
        let (base_url, server) =
            serve_once("200 OK", "application/json", REPLY_BODY).await;
        let config = OpenRouterConfigBuilder::with_api_key("sk-test")
            .with_base_url(base_url)
            .build();

        provider(config).send_request(&request()).await.unwrap();

        let raw = server.await.unwrap().to_ascii_lowercase();
        assert!(!raw.contains("\r\nhttp-referer:"));
        assert!(!raw.contains("\r\nx-title:"));
    }

    #[tokio::test]
    async fn test_status_errors() {
        let cases = [
            (
                "429 Too Many Requests",
                r#"{"error":{"message":"Rate limit exceeded"}}"#,
                ErrorKind::RateLimitExceeded,
                "Rate limit exceeded",
            ),
            (
                "500 Internal Server Error",
                r#"{"message":"Upstream exploded"}"#,
                ErrorKind::Status,
                "Upstream exploded",
            ),
            (
                "401 Unauthorized",
                "not json",
                ErrorKind::Status,
                "401 Unauthorized",
            ),
        ];
        for (status, body, kind, message) in cases {
            let (base_url, server) =
                serve_once(status, "application/json", body).await;
            let config = OpenRouterConfigBuilder::with_api_key("sk-test")
                .with_base_url(base_url)
                .build();

            let err = provider(config)
                .send_request(&request())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), kind, "status: {status}");
            assert_eq!(err.message(), message);
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_unexpected_content_type() {
        let (base_url, server) =
            serve_once("200 OK", "text/html", "<html>oops</html>").await;
        let config = OpenRouterConfigBuilder::with_api_key("sk-test")
            .with_base_url(base_url)
            .build();

        let err = provider(config).send_request(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_upstream_error_body() {
        let (base_url, server) = serve_once(
            "200 OK",
            "application/json",
            r#"{"error":{"message":"Model overloaded"}}"#,
        )
        .await;
        let config = OpenRouterConfigBuilder::with_api_key("sk-test")
            .with_base_url(base_url)
            .build();

        let err = provider(config).send_request(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let config = OpenRouterConfigBuilder::with_api_key("sk-test")
            .with_base_url(format!("http://{addr}/api/v1"))
            .build();

        let err = provider(config).send_request(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
