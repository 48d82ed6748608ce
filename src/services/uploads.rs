//! Image uploads forwarded to a third-party host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::ServiceError;
use crate::config::UploadConfig;
use crate::domain::{Actor, Permission};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

#[async_trait]
pub trait ImageHost: Send + Sync + std::fmt::Debug {
    /// Returns the public URL of the stored image.
    async fn store(&self, file: UploadedFile) -> Result<String, ServiceError>;
}

/// ImgBB-compatible host: API key as the `key` query parameter, multipart
/// `image` field, hosted URL at `data.url` in the response.
#[derive(Debug)]
pub struct HttpImageHost {
    client: reqwest::Client,
    endpoint: url::Url,
}

#[derive(Debug, Deserialize)]
struct HostResponse {
    data: HostData,
}

#[derive(Debug, Deserialize)]
struct HostData {
    url: String,
}

impl HttpImageHost {
    /// `None` when no host is configured.
    pub fn from_config(config: &UploadConfig) -> Result<Option<Self>, ServiceError> {
        let (Some(base), Some(key)) = (&config.image_host_url, &config.image_host_api_key) else {
            return Ok(None);
        };
        let mut endpoint = url::Url::parse(base)
            .map_err(|e| ServiceError::Internal(format!("invalid image host URL: {}", e)))?;
        endpoint.query_pairs_mut().append_pair("key", key);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(Some(Self { client, endpoint }))
    }
}

#[async_trait]
impl ImageHost for HttpImageHost {
    async fn store(&self, file: UploadedFile) -> Result<String, ServiceError> {
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|e| ServiceError::invalid("file", e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Upstream(format!("image host returned {}: {}", status, body)));
        }

        let parsed: HostResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Upstream(format!("unexpected image host response: {}", e)))?;
        Ok(parsed.data.url)
    }
}

pub struct UploadService {
    host: Option<Arc<dyn ImageHost>>,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(host: Option<Arc<dyn ImageHost>>, max_bytes: usize) -> Self {
        Self { host, max_bytes }
    }

    pub async fn upload_image(&self, actor: &Actor, file: UploadedFile) -> Result<UploadResult, ServiceError> {
        actor.authorize(Permission::UploadFiles)?;
        let host = self
            .host
            .as_ref()
            .ok_or_else(|| ServiceError::Unavailable("Image uploads are not configured".to_string()))?;
        check_image(&file, self.max_bytes)?;

        let content_type = file.content_type.clone();
        let size = file.bytes.len();
        let url = host.store(file).await?;
        tracing::info!(user_id = %actor.user_id(), size, "image uploaded");
        Ok(UploadResult { url, content_type, size })
    }
}

fn check_image(file: &UploadedFile, max_bytes: usize) -> Result<(), ServiceError> {
    if !file.content_type.starts_with("image/") {
        return Err(ServiceError::invalid("file", "only image uploads are accepted"));
    }
    if file.bytes.is_empty() {
        return Err(ServiceError::invalid("file", "is empty"));
    }
    if file.bytes.len() > max_bytes {
        return Err(ServiceError::PayloadTooLarge(format!(
            "Image exceeds the {} byte limit",
            max_bytes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Debug)]
    struct FixedHost;

    #[async_trait]
    impl ImageHost for FixedHost {
        async fn store(&self, file: UploadedFile) -> Result<String, ServiceError> {
            Ok(format!("https://img.example.com/{}", file.file_name))
        }
    }

    fn employee() -> Actor {
        Actor::Employee {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
        }
    }

    fn png(size: usize) -> UploadedFile {
        UploadedFile {
            file_name: "proof.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![7; size],
        }
    }

    #[tokio::test]
    async fn uploads_go_to_the_host() {
        let service = UploadService::new(Some(Arc::new(FixedHost)), 1024);
        let result = service.upload_image(&employee(), png(10)).await.unwrap();
        assert_eq!(result.url, "https://img.example.com/proof.png");
        assert_eq!(result.size, 10);
    }

    #[tokio::test]
    async fn missing_host_is_unavailable() {
        let service = UploadService::new(None, 1024);
        let err = service.upload_image(&employee(), png(10)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn rejects_non_images_and_oversized_files() {
        let service = UploadService::new(Some(Arc::new(FixedHost)), 8);
        let mut pdf = png(4);
        pdf.content_type = "application/pdf".to_string();
        assert!(matches!(
            service.upload_image(&employee(), pdf).await,
            Err(ServiceError::Validation { .. })
        ));
        assert!(matches!(
            service.upload_image(&employee(), png(9)).await,
            Err(ServiceError::PayloadTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn super_admins_need_a_tenant() {
        let service = UploadService::new(Some(Arc::new(FixedHost)), 8);
        let actor = Actor::SuperAdmin { user_id: Uuid::new_v4() };
        assert!(matches!(
            service.upload_image(&actor, png(1)).await,
            Err(ServiceError::Access(_))
        ));
    }

    #[test]
    fn host_is_optional() {
        let config = UploadConfig {
            image_host_url: None,
            image_host_api_key: Some("k".to_string()),
            max_upload_bytes: 1,
        };
        assert!(HttpImageHost::from_config(&config).unwrap().is_none());

        let config = UploadConfig {
            image_host_url: Some("https://api.imgbb.com/1/upload".to_string()),
            image_host_api_key: Some("secret".to_string()),
            max_upload_bytes: 1,
        };
        let host = HttpImageHost::from_config(&config).unwrap().unwrap();
        assert_eq!(host.endpoint.as_str(), "https://api.imgbb.com/1/upload?key=secret");
    }
}
