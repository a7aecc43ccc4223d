//! HTTP implementation of the remote backend.
//!
//! Talks to a Supabase-compatible service: object bytes go to the storage
//! API via multipart form data, metadata rows to the REST API. Responses
//! are mapped to human-readable errors; a 409 on the object path means the
//! key already exists, since overwrites are disabled.

use super::{RemoteBackend, RemoteRecord, UploadError};
use async_trait::async_trait;
use tracing::debug;

/// Remote backend speaking the storage + REST HTTP protocol.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    bucket: String,
    table: String,
}

impl HttpBackend {
    pub fn new(endpoint: &str, api_key: &str, bucket: &str, table: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
            table: table.to_string(),
        }
    }

    /// Public download URL for an object, used when the upload response
    /// doesn't carry one.
    fn public_object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.endpoint,
            self.bucket,
            urlencoding::encode(key)
        )
    }
}

fn map_send_error(context: &str, err: reqwest::Error) -> UploadError {
    let message = if err.is_connect() {
        format!("Failed to connect to the upload endpoint for {context}. Check your internet connection and the configured endpoint.")
    } else if err.is_timeout() {
        format!("The {context} request timed out. The upload endpoint is not responding.")
    } else {
        format!("Upload network error during {context}: {err}")
    };
    UploadError::Transport(message)
}

/// Maps a failed object-upload response. 409 means the key already exists
/// in the bucket (overwrites are disabled); everything else goes through the
/// generic status mapping.
fn map_object_status_error(
    key: &str,
    bucket: &str,
    status: reqwest::StatusCode,
    body: String,
) -> UploadError {
    if status.as_u16() == 409 {
        return UploadError::Collision(format!(
            "an object named '{key}' already exists in bucket '{bucket}'"
        ));
    }
    map_status_error("object upload", status, body)
}

fn map_status_error(context: &str, status: reqwest::StatusCode, body: String) -> UploadError {
    let human_readable = match status.as_u16() {
        401 | 403 => format!(
            "The upload API key was rejected during {context}. Run 'echotag config' to update the [upload] credentials."
        ),
        404 => format!(
            "The remote {context} target does not exist. Check the configured bucket and table names."
        ),
        413 => "The recording is larger than the remote storage allows.".to_string(),
        429 => "Too many upload requests. The remote service is rate limiting this client.".to_string(),
        500..=599 => "The upload service is experiencing issues. The recording stays local.".to_string(),
        _ => format!("Upload {context} failed (status {status}): {body}"),
    };
    UploadError::Rejected(human_readable)
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn upload_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.endpoint,
            self.bucket,
            urlencoding::encode(key)
        );

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(key.to_string())
            .mime_str(content_type)
            .map_err(|err| {
                UploadError::BadResponse(format!("invalid content type '{content_type}': {err}"))
            })?;
        let form = reqwest::multipart::Form::new().part("file", file_part);

        debug!("Uploading object '{}' to {}", key, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("x-upsert", "false")
            .multipart(form)
            .send()
            .await
            .map_err(|err| map_send_error("object upload", err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_object_status_error(key, &self.bucket, status, body));
        }

        // Services differ in what they return here; accept the common URL
        // fields and otherwise derive the public object URL.
        let object_url = match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("url")
                .or_else(|| body.get("fileUrl"))
                .and_then(|value| value.as_str())
                .map(|value| value.to_string())
                .unwrap_or_else(|| self.public_object_url(key)),
            Err(_) => self.public_object_url(key),
        };

        debug!("Object '{}' stored at {}", key, object_url);
        Ok(object_url)
    }

    async fn insert_record(&self, record: &RemoteRecord) -> Result<(), UploadError> {
        let url = format!("{}/rest/v1/{}", self.endpoint, self.table);

        debug!("Inserting metadata record for '{}'", record.file_name);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|err| map_send_error("metadata insert", err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_error("metadata insert", status, body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("https://x.example/", "key", "recordings", "recordings");
        assert_eq!(
            backend.public_object_url("a.wav"),
            "https://x.example/storage/v1/object/public/recordings/a.wav"
        );
    }

    #[test]
    fn test_object_keys_are_url_encoded() {
        let backend = HttpBackend::new("https://x.example", "key", "recordings", "recordings");
        assert_eq!(
            backend.public_object_url("a b.wav"),
            "https://x.example/storage/v1/object/public/recordings/a%20b.wav"
        );
    }

    #[test]
    fn test_duplicate_object_key_is_a_collision() {
        let err = map_object_status_error(
            "a.wav",
            "recordings",
            reqwest::StatusCode::CONFLICT,
            String::new(),
        );
        assert!(matches!(err, UploadError::Collision(_)));
        assert!(err.to_string().contains("a.wav"));
        assert!(err.to_string().contains("recordings"));
    }

    #[test]
    fn test_error_statuses_map_to_human_text() {
        let err = map_status_error(
            "object upload",
            reqwest::StatusCode::UNAUTHORIZED,
            String::new(),
        );
        assert!(err.to_string().contains("echotag config"));

        let err = map_status_error(
            "object upload",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            String::new(),
        );
        assert!(err.to_string().contains("stays local"));
    }
}
