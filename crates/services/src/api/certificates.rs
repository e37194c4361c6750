use trail_core::model::TrailId;

use super::client::{ApiClient, NO_QUERY};
use super::dto::{Certificate, CertificateVerification, GenerateCertificateRequest};
use crate::error::ApiError;

/// Certificate issuance and public verification.
#[derive(Clone, Debug)]
pub struct CertificateClient {
    api: ApiClient,
}

impl CertificateClient {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Issue a certificate for a completed trail.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` when the student is not eligible yet, or other
    /// request failures.
    pub async fn generate(
        &self,
        trail_id: &TrailId,
        student_name: &str,
    ) -> Result<Certificate, ApiError> {
        let body = GenerateCertificateRequest {
            trail_id: trail_id.as_str(),
            student_name,
        };
        self.api.post_json("/certificates/generate", &body).await
    }

    /// Look up a certificate by its public verification code.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidPayload` for a blank code, or request failures.
    pub async fn verify(&self, code: &str) -> Result<CertificateVerification, ApiError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::field("verification_code", "must not be empty"));
        }
        let path = format!("/certificates/verify/{code}");
        self.api.get_json(&path, NO_QUERY).await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    pub async fn user_certificates(&self) -> Result<Vec<Certificate>, ApiError> {
        self.api.get_json("/certificates/user", NO_QUERY).await
    }
}
