use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CLIENT_STATUS_ERRORS, STREAM_TTFB,
};
use crate::sse::{DeltaStream, process_sse};
use crate::types::ChatCompletionRequest;

const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1/";
const COMPLETIONS_PATH: &str = "chat/completions";

/// Environment variable consulted when no API key is passed explicitly.
pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// Anything that can stream a chat completion.
///
/// The conversation controller only talks to this trait, so tests and alternate backends can
/// stand in for the HTTP client.
#[async_trait::async_trait]
pub trait ChatCompletions: Send + Sync {
    /// Issue `request` and return its text deltas as they arrive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] when the endpoint answers with a non-success status and a transport
    /// error when the request cannot be sent.  Failures after the first byte arrive as an `Err`
    /// item on the returned stream.
    async fn stream_chat(&self, request: ChatCompletionRequest) -> Result<DeltaStream>;
}

/// Client for the DeepSeek chat completions API.
#[derive(Clone)]
pub struct DeepSeek {
    api_key: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Option<Duration>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl DeepSeek {
    /// Create a new DeepSeek client.
    ///
    /// The API key can be provided directly or read from the `DEEPSEEK_API_KEY` environment
    /// variable.  Requests have no timeout.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(API_KEY_ENV).map_err(|_| {
                Error::config(format!(
                    "API key not provided and {API_KEY_ENV} environment variable not set"
                ))
            })?,
        };

        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
            logger: None,
        })
    }

    /// Attach a logger that observes every request, delta, and failure.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The URL requests are posted to.
    pub fn endpoint(&self) -> String {
        format!("{}{COMPLETIONS_PATH}", self.base_url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::config("API key contains characters not valid in a header"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn log_error(&self, err: &Error) {
        if let Some(logger) = &self.logger {
            logger.log_error(err);
        }
    }

    /// Turn a non-success response into an error carrying its status and raw body.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        // the status alone still classifies the failure
        let body = response.text().await.unwrap_or_default();
        Error::api(status_code, body)
    }

    /// Send a request to the API and get a streaming response.
    ///
    /// Returns a stream of text deltas that can be processed incrementally.  Nothing is retried.
    pub async fn stream(&self, mut request: ChatCompletionRequest) -> Result<DeltaStream> {
        request.stream = true;
        CLIENT_REQUESTS.click();
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }

        let headers = self.default_headers()?;
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                let err = if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        self.timeout.map(|t| t.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                };
                self.log_error(&err);
                err
            })?;
        STREAM_TTFB.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_STATUS_ERRORS.click();
            let err = Self::process_error_response(response).await;
            self.log_error(&err);
            return Err(err);
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(process_sse(stream, self.logger.clone())))
    }
}

#[async_trait::async_trait]
impl ChatCompletions for DeepSeek {
    async fn stream_chat(&self, request: ChatCompletionRequest) -> Result<DeltaStream> {
        self.stream(request).await
    }
}

impl fmt::Debug for DeepSeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepSeek")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, Model};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn serve_once(response: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = find_header_end(&request) {
                    let headers = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let length = headers
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .map(|v| v.trim().parse::<usize>().unwrap())
                        .unwrap_or(0);
                    if request.len() >= end + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}/v1/"), handle)
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
    }

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest::new(Model::default(), Some("sys"), &[ChatMessage::user("hi")])
    }

    #[test]
    fn client_creation() {
        let client = DeepSeek::new(Some("test-key".to_string())).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.endpoint(), "https://api.deepseek.com/v1/chat/completions");
        assert_eq!(client.timeout, None);

        let client = DeepSeek::with_options(
            Some("test-key".to_string()),
            Some("http://localhost:8080/v1".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn debug_hides_api_key() {
        let client = DeepSeek::new(Some("sk-secret".to_string())).unwrap();
        assert!(!format!("{client:?}").contains("sk-secret"));
    }

    #[tokio::test]
    async fn streams_deltas_with_bearer_auth() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
                    data: [DONE]\n\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (base_url, handle) = serve_once(response).await;
        let client = DeepSeek::with_options(Some("sk-test".to_string()), Some(base_url), None)
            .unwrap();

        let stream = client.stream(request()).await.unwrap();
        let deltas = stream.map(|d| d.unwrap()).collect::<Vec<_>>().await;
        assert_eq!(deltas, vec!["Hel", "lo"]);

        let raw = handle.await.unwrap();
        assert!(raw.starts_with("POST /v1/chat/completions"));
        assert!(raw.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(raw.contains("\"stream\":true"));
        assert!(raw.contains("\"model\":\"deepseek-chat\""));
    }

    #[tokio::test]
    async fn non_success_status_carries_code_and_body() {
        let body = r#"{"error":{"message":"Insufficient Balance"}}"#;
        let response = format!(
            "HTTP/1.1 402 Payment Required\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (base_url, handle) = serve_once(response).await;
        let client = DeepSeek::with_options(Some("sk-test".to_string()), Some(base_url), None)
            .unwrap();

        let err = client.stream(request()).await.err().unwrap();
        assert_eq!(err.status_code(), Some(402));
        assert!(err.to_string().contains("Insufficient Balance"));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_error_body_keeps_status() {
        // the body is cut off well short of its declared length
        let response = "HTTP/1.1 503 Service Unavailable\r\nContent-Type: application/json\r\nContent-Length: 200\r\nConnection: close\r\n\r\n{\"err".to_string();
        let (base_url, handle) = serve_once(response).await;
        let client = DeepSeek::with_options(Some("sk-test".to_string()), Some(base_url), None)
            .unwrap();

        let err = client.stream(request()).await.err().unwrap();
        assert!(err.is_api());
        assert_eq!(err.status_code(), Some(503));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = DeepSeek::with_options(
            Some("sk-test".to_string()),
            Some(format!("http://{addr}/v1/")),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        let err = client.stream(request()).await.err().unwrap();
        assert!(err.is_transport());
    }

    #[test]
    fn missing_key_is_config_error() {
        if env::var(API_KEY_ENV).is_ok() {
            return;
        }
        let err = DeepSeek::new(None).unwrap_err();
        assert!(err.is_config());
    }
}
