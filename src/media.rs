//! Attachment download

use crate::runtime::MediaFetcher;
use crate::state_machine::MediaAttachment;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Twilio caps `WhatsApp` media at 16 MB
pub const MAX_MEDIA_BYTES: usize = 16 * 1024 * 1024;

/// Downloaded attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Media request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Media host answered HTTP {0}")]
    Status(u16),
    #[error("Media is {0} bytes, over the size limit")]
    TooLarge(usize),
    #[error("Media body was empty")]
    Empty,
}

/// Credentials for media hosts that require HTTP basic auth
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Fetches attachments over HTTP(S)
pub struct HttpMediaFetcher {
    client: Client,
    auth: Option<BasicAuth>,
}

impl HttpMediaFetcher {
    pub fn new(auth: Option<BasicAuth>) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { client, auth })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, media: &MediaAttachment) -> Result<FetchedMedia, FetchError> {
        let mut request = self.client.get(&media.url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let mut response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // The host's content type wins over what the webhook declared
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| media.content_type.clone());

        if let Some(declared) = response.content_length() {
            let declared = usize::try_from(declared).unwrap_or(usize::MAX);
            if declared > MAX_MEDIA_BYTES {
                return Err(FetchError::TooLarge(declared));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            append_capped(&mut bytes, &chunk)?;
        }
        check_size(bytes.len())?;

        tracing::debug!(url = %media.url, mime_type = %mime_type, size = bytes.len(), "Fetched media");
        Ok(FetchedMedia { bytes, mime_type })
    }
}

/// Grow `buf` by `chunk` unless that would pass the size limit
fn append_capped(buf: &mut Vec<u8>, chunk: &[u8]) -> Result<(), FetchError> {
    let len = buf.len() + chunk.len();
    if len > MAX_MEDIA_BYTES {
        return Err(FetchError::TooLarge(len));
    }
    buf.extend_from_slice(chunk);
    Ok(())
}

fn check_size(len: usize) -> Result<(), FetchError> {
    match len {
        0 => Err(FetchError::Empty),
        n if n > MAX_MEDIA_BYTES => Err(FetchError::TooLarge(n)),
        _ => Ok(()),
    }
}
