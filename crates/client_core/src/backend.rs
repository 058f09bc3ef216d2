//! Transport to the conversion backend.

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use shared::{
    domain::{PmPrKind, Workdir},
    protocol::{AskRequest, AskResponse, ConversionResult, GenerationResult, PmPrResponse},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::endpoints::{ASK_PATH, CONVERT_PATH, GENERATE_PATH, PMPR_PATH, RETRY_PATH};

const DEFAULT_IMAGE_MIME: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response body is not valid JSON: {source}")]
    InvalidResponse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ConvertForm {
    pub image: ImageUpload,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct RetryForm {
    pub workdir: Workdir,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

/// Decoded generate reply together with the HTTP status it arrived with.
#[derive(Debug, Clone)]
pub struct GenerateReply {
    pub status: StatusCode,
    pub body: GenerationResult,
}

impl GenerateReply {
    /// Both the transport status and the application flag must report success.
    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.body.ok
    }
}

#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    async fn convert(&self, form: ConvertForm) -> Result<ConversionResult, BackendError>;
    async fn retry(&self, form: RetryForm) -> Result<ConversionResult, BackendError>;
    /// Reads the body as text before decoding so a non-JSON reply surfaces as
    /// [`BackendError::InvalidResponse`] with the raw body attached.
    async fn generate(&self, workdir: &Workdir) -> Result<GenerateReply, BackendError>;
    async fn fetch_text(&self, target: &str) -> Result<String, BackendError>;
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, BackendError>;
    async fn generate_pmpr(
        &self,
        kind: PmPrKind,
        name: &str,
    ) -> Result<PmPrResponse, BackendError>;
    async fn download(&self, target: &str) -> Result<Vec<u8>, BackendError>;
}

pub struct HttpBackend {
    http: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(server_url: &str) -> Result<Self, BackendError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, BackendError> {
        Ok(Self {
            http,
            base: Url::parse(server_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolves a server-relative reference such as `/download/<workdir>/generated.html`.
    pub fn resolve(&self, target: &str) -> Result<Url, BackendError> {
        Ok(self.base.join(target)?)
    }

    fn conversion_form(model: Option<String>, max_tokens: Option<u32>, form: Form) -> Form {
        let form = match model {
            Some(model) => form.text("model", model),
            None => form,
        };
        match max_tokens {
            Some(max_tokens) => form.text("max_tokens", max_tokens.to_string()),
            None => form,
        }
    }

    async fn post_conversion(
        &self,
        path: &str,
        form: Form,
    ) -> Result<ConversionResult, BackendError> {
        let url = self.resolve(path)?;
        let response = self.http.post(url).multipart(form).send().await?;
        debug!(path, status = %response.status(), "conversion reply received");
        // Failure replies carry the same JSON shape, so the status is not checked here.
        Ok(response.json().await?)
    }
}

#[async_trait]
impl WorkflowBackend for HttpBackend {
    async fn convert(&self, form: ConvertForm) -> Result<ConversionResult, BackendError> {
        let ConvertForm {
            image,
            model,
            max_tokens,
        } = form;
        let part = Part::bytes(image.bytes)
            .file_name(image.filename)
            .mime_str(image.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME))?;
        let multipart = Self::conversion_form(model, max_tokens, Form::new().part("image", part));
        self.post_conversion(CONVERT_PATH, multipart).await
    }

    async fn retry(&self, form: RetryForm) -> Result<ConversionResult, BackendError> {
        let RetryForm {
            workdir,
            model,
            max_tokens,
        } = form;
        let multipart =
            Self::conversion_form(model, max_tokens, Form::new().text("workdir", workdir.0));
        self.post_conversion(RETRY_PATH, multipart).await
    }

    async fn generate(&self, workdir: &Workdir) -> Result<GenerateReply, BackendError> {
        let url = self.resolve(GENERATE_PATH)?;
        let response = self
            .http
            .post(url)
            .multipart(Form::new().text("workdir", workdir.0.clone()))
            .send()
            .await?;
        let status = response.status();
        let raw = response.text().await?;
        let body = serde_json::from_str(&raw)
            .map_err(|source| BackendError::InvalidResponse { raw, source })?;
        Ok(GenerateReply { status, body })
    }

    async fn fetch_text(&self, target: &str) -> Result<String, BackendError> {
        let url = self.resolve(target)?;
        Ok(self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, BackendError> {
        let url = self.resolve(ASK_PATH)?;
        let response = self.http.post(url).json(request).send().await?;
        debug!(status = %response.status(), "assistant reply received");
        Ok(response.json().await?)
    }

    async fn generate_pmpr(
        &self,
        kind: PmPrKind,
        name: &str,
    ) -> Result<PmPrResponse, BackendError> {
        let url = self.resolve(PMPR_PATH)?;
        let form = Form::new()
            .text("kind", kind.as_str())
            .text("name", name.to_string());
        let response = self.http.post(url).multipart(form).send().await?;
        Ok(response.json().await?)
    }

    async fn download(&self, target: &str) -> Result<Vec<u8>, BackendError> {
        let url = self.resolve(target)?;
        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
