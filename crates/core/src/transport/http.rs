use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, Url};

use super::source::ChunkSource;
use crate::error::{Result, StreamError};

/// Client identification sent with every request.
pub const USER_AGENT: &str = concat!("camstream/", env!("CARGO_PKG_VERSION"));

/// Largest body [`get`] accepts (catalog JSON, snapshot pictures).
pub const MAX_BODY_SIZE: usize = 10_000_000;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A response whose body is still being received.
#[derive(Debug)]
pub struct HttpSource {
    response: Response,
}

impl HttpSource {
    pub fn new(response: Response) -> Self {
        Self { response }
    }
}

impl ChunkSource for HttpSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.response.chunk().await?.map(|chunk| chunk.to_vec()))
    }
}

fn client() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?)
}

/// Send a `GET` and return the response once its head has arrived.
///
/// Anything but a 2xx status fails with [`StreamError::HttpStatus`].
/// `timeout` bounds the whole exchange including the body; streams pass
/// `None`.
pub async fn send_get(url: &str, accept: &str, timeout: Option<Duration>) -> Result<Response> {
    let url = Url::parse(url).map_err(|_| StreamError::InvalidUrl(url.to_string()))?;

    let mut request = client()?.get(url.clone()).header(ACCEPT, accept);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }
    let response = request.send().await?;

    let status = response.status();
    tracing::debug!(
        %url,
        status = status.as_u16(),
        content_type = content_type(&response).unwrap_or(""),
        "response"
    );

    if !status.is_success() {
        return Err(StreamError::HttpStatus {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
        });
    }

    Ok(response)
}

/// `GET` a complete resource of at most `limit` bytes.
///
/// Returns the response `Content-Type` and the body. A declared or actual
/// body larger than `limit` fails with [`StreamError::BodyTooLarge`].
pub async fn get(url: &str, accept: &str, limit: usize) -> Result<(Option<String>, Vec<u8>)> {
    let mut response = send_get(url, accept, Some(REQUEST_TIMEOUT)).await?;

    if response
        .content_length()
        .is_some_and(|len| len > limit as u64)
    {
        return Err(StreamError::BodyTooLarge { limit });
    }

    let content_type = content_type(&response).map(str::to_string);

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(StreamError::BodyTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }

    Ok((content_type, body))
}

pub fn content_type(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
}
