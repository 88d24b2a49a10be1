use super::credentials::CredentialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AzureError {
    #[error("Azure API error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid response from Azure: {0}")]
    InvalidResponse(String),

    #[error("Operation {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl AzureError {
    /// Builds an error from an ARM error envelope, falling back to the raw body
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        let code = error
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_str())
            .unwrap_or("Unknown")
            .to_string();
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string());

        AzureError::Api {
            status,
            code,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_arm_envelope() {
        let err = AzureError::from_body(
            409,
            r#"{"error":{"code":"StorageAccountAlreadyTaken","message":"The storage account named x is already taken."}}"#,
        );
        match err {
            AzureError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 409);
                assert_eq!(code, "StorageAccountAlreadyTaken");
                assert!(message.contains("already taken"));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_plain_body() {
        let err = AzureError::from_body(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "Azure API error (502) Unknown: Bad Gateway");
    }
}
