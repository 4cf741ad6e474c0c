use crate::config::Destination;
use crate::error::{Result, UploadError};
use crate::upload::types::{FileCandidate, UploadReceipt};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

const MAX_ERROR_BODY_LEN: usize = 200;

/// Performs a single upload attempt. Retrying is the caller's business.
#[async_trait]
pub trait UploadClient: Send + Sync {
    async fn upload(
        &self,
        candidate: &FileCandidate,
        destination: &Destination,
    ) -> std::result::Result<UploadReceipt, UploadError>;
}

#[derive(Deserialize)]
struct UploadResponse {
    status: String,
    #[serde(default)]
    data: Option<UploadResponseData>,
}

#[derive(Deserialize)]
struct UploadResponseData {
    #[serde(rename = "downloadPage")]
    download_page: Option<String>,
}

#[derive(Clone)]
pub struct GofileClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GofileClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http_client(client, endpoint))
    }

    /// Uses a preconfigured `reqwest::Client`, e.g. one with custom proxy or
    /// TLS settings.
    pub fn with_http_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn parse_response(
        status: u16,
        body: &str,
    ) -> std::result::Result<UploadReceipt, UploadError> {
        if !(200..300).contains(&status) {
            return Err(UploadError::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY_LEN).collect(),
            });
        }

        let response: UploadResponse = serde_json::from_str(body)
            .map_err(|e| UploadError::Malformed(format!("invalid JSON: {}", e)))?;

        if response.status != "ok" {
            return Err(UploadError::Rejected(response.status));
        }

        response
            .data
            .and_then(|data| data.download_page)
            .filter(|page| !page.is_empty())
            .map(|download_url| UploadReceipt { download_url })
            .ok_or_else(|| UploadError::Malformed("missing downloadPage".to_string()))
    }
}

#[async_trait]
impl UploadClient for GofileClient {
    async fn upload(
        &self,
        candidate: &FileCandidate,
        destination: &Destination,
    ) -> std::result::Result<UploadReceipt, UploadError> {
        let file = tokio::fs::File::open(candidate.path()).await?;
        let length = file.metadata().await?.len();
        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length).file_name(candidate.file_name());

        let mut form = Form::new().part("file", part);
        if let Some(folder_id) = &destination.folder_id {
            form = form.text("folderId", folder_id.clone());
        }

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &destination.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Self::parse_response(status, &body)
    }
}
