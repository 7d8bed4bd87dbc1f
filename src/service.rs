use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::effects::EffectId;
use crate::error::ServiceError;

/// One photo's payload as submitted to the service: the original,
/// unmodified bytes plus the filename the service echoes into archive
/// entries.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub name: String,
    pub bytes: Arc<Vec<u8>>,
}

/// Boundary to the remote effect processor: effect identifier plus image
/// payloads in, artifact bytes out. The service returns one processed
/// image for a single payload and a ZIP archive for several; callers
/// infer which from the request cardinality they chose.
pub trait EffectService: Send + Sync + 'static {
    fn apply(
        &self,
        effect: EffectId,
        files: Vec<FilePayload>,
    ) -> impl Future<Output = Result<Vec<u8>, ServiceError>> + Send;
}

/// `EffectService` over HTTP: multipart POST to `{base-url}/apply-effect`
/// with a text field `effect` and one `files` part per payload.
#[derive(Debug, Clone)]
pub struct HttpEffectService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEffectService {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/apply-effect", base_url.trim_end_matches('/')),
        })
    }
}

impl EffectService for HttpEffectService {
    async fn apply(
        &self,
        effect: EffectId,
        files: Vec<FilePayload>,
    ) -> Result<Vec<u8>, ServiceError> {
        let mut form = Form::new().text("effect", effect.as_str());
        for file in &files {
            // The service drops parts whose content type is not image/*,
            // so sniff the real subtype from the bytes.
            let mime = image::guess_format(&file.bytes)
                .map(|format| format.to_mime_type())
                .unwrap_or("application/octet-stream");
            let part = Part::bytes(file.bytes.as_ref().clone())
                .file_name(file.name.clone())
                .mime_str(mime)?;
            form = form.part("files", part);
        }

        debug!(effect = %effect, files = files.len(), "posting to effect service");
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "effect service responded");
        Ok(bytes.to_vec())
    }
}
