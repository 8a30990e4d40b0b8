//! User photo uploads for try-on.

use async_trait::async_trait;
use fitroom_core::LocalImage;
use reqwest::Method;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use super::{DataStoreClient, DataStoreError, UserSession, check_status};
use crate::tryon::PhotoUploader;

impl DataStoreClient {
    /// Store a user's photo in the uploads bucket and return its public URL.
    ///
    /// Objects are named `<user>/<uuid>.<ext>` so uploads never collide.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected or the request fails.
    #[instrument(skip(self, session, photo), fields(user_id = %session.user_id, size = photo.bytes().len()))]
    pub async fn upload_photo(&self, session: &UserSession, photo: &LocalImage) -> Result<Url, DataStoreError> {
        let name = format!("{}/{}.{}", session.user_id, Uuid::new_v4(), photo.extension());

        let url = self.object_url("storage/v1/object", &name)?;
        let response = self
            .request(Method::POST, url, Some(session))
            .header(reqwest::header::CONTENT_TYPE, photo.mime_type())
            .header("x-upsert", "false")
            .body(photo.bytes().to_vec())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        check_status(status, &body)?;

        self.object_url("storage/v1/object/public", &name)
    }

    fn object_url(&self, prefix: &str, name: &str) -> Result<Url, DataStoreError> {
        let encoded: Vec<String> = name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let path = format!(
            "{prefix}/{}/{}",
            urlencoding::encode(&self.inner.uploads_bucket),
            encoded.join("/")
        );

        self.inner
            .base_url
            .join(&path)
            .map_err(|e| DataStoreError::InvalidUrl(format!("{path}: {e}")))
    }
}

/// [`PhotoUploader`] that writes to the uploads bucket as one signed-in user.
///
/// Also records that user's try-on history.
#[derive(Debug, Clone)]
pub struct SessionUploads {
    client: DataStoreClient,
    session: UserSession,
}

impl SessionUploads {
    #[must_use]
    pub const fn new(client: DataStoreClient, session: UserSession) -> Self {
        Self { client, session }
    }

    pub(super) const fn client(&self) -> &DataStoreClient {
        &self.client
    }

    pub(super) const fn session(&self) -> &UserSession {
        &self.session
    }
}

#[async_trait]
impl PhotoUploader for SessionUploads {
    async fn upload(&self, photo: &LocalImage) -> Result<Url, DataStoreError> {
        self.client.upload_photo(&self.session, photo).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::client;

    #[test]
    fn test_public_object_url() {
        let url = client("https://db.example")
            .object_url("storage/v1/object/public", "u-1/abc.jpg")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://db.example/storage/v1/object/public/user-uploads/u-1/abc.jpg"
        );
    }
}
