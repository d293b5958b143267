//! Blocking `reqwest` transport implementing the auth and API seams.

use find_me_auth::{AuthError, AuthTransport};
use find_me_client::{ApiTransport, ClassifyRequest, SubmitError};
use find_me_contract::HttpReply;
use reqwest::blocking::{Client, RequestBuilder, multipart};
use tracing::{debug, error};
use url::Url;

use crate::{AppError, redact_sensitive};

/// HTTP transport backed by a shared blocking client.
///
/// No request timeout is set beyond the client default.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds the transport.
    ///
    /// # Errors
    /// Returns [`AppError::Transport`] when the TLS backend cannot initialise.
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("find-me/", env!("FIND_ME_VERSION")))
            .build()
            .map_err(|error| AppError::Transport(error.to_string()))?;
        Ok(Self { client })
    }

    fn execute(&self, request: RequestBuilder) -> Result<HttpReply, String> {
        let response = request.send().map_err(|error| {
            let message = redact_sensitive(&error.to_string());
            error!(%message, "request failed");
            message
        })?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|error| error.to_string())?;
        debug!(status, bytes = body.len(), "reply received");
        Ok(HttpReply::new(status, body))
    }
}

impl AuthTransport for ReqwestTransport {
    fn post_form(&self, endpoint: &Url, fields: &[(&str, &str)]) -> Result<HttpReply, AuthError> {
        self.execute(self.client.post(endpoint.clone()).form(fields))
            .map_err(AuthError::Transport)
    }

    fn post_json(&self, endpoint: &Url, body: &serde_json::Value) -> Result<HttpReply, AuthError> {
        self.execute(self.client.post(endpoint.clone()).json(body))
            .map_err(AuthError::Transport)
    }
}

impl ApiTransport for ReqwestTransport {
    fn post_multipart(
        &self,
        endpoint: &Url,
        token: &str,
        request: &ClassifyRequest,
    ) -> Result<HttpReply, SubmitError> {
        let mut form = multipart::Form::new();
        for part in request.parts() {
            let file_part = multipart::Part::bytes(part.file.bytes.to_vec())
                .file_name(part.file.name.clone())
                .mime_str(&part.file.media_type)
                .map_err(|error| SubmitError::Transport(error.to_string()))?;
            form = form.part(part.field, file_part);
        }

        self.execute(
            self.client
                .post(endpoint.clone())
                .bearer_auth(token)
                .multipart(form),
        )
        .map_err(SubmitError::Transport)
    }

    fn get(&self, endpoint: &Url, token: &str) -> Result<HttpReply, SubmitError> {
        self.execute(self.client.get(endpoint.clone()).bearer_auth(token))
            .map_err(SubmitError::Transport)
    }
}
