//! HTTP client for the persistence backend.
//!
//! Every call issues exactly one request and either returns the decoded
//! payload or a [`NetworkError`]; nothing here touches application state.

mod endpoints;
mod error;

pub use endpoints::{Collection, EndpointProfile, EndpointTable, IdPlacement};
pub use error::NetworkError;

use std::time::Duration;

use pms_core::models::{
    media_file_name, Ack, EntityId, MediaFile, Project, ProjectDraft, Task, TaskDraft, UploadReply,
    UploadedMedia, User, UserDraft,
};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    profile: EndpointProfile,
}

impl ApiClient {
    /// `timeout` of `None` waits indefinitely.
    pub fn new(
        base_url: &str,
        profile: EndpointProfile,
        timeout: Option<Duration>,
    ) -> Result<Self, NetworkError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| NetworkError::InvalidRequest(format!("bad base url {base_url}: {e}")))?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
            profile,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn profile(&self) -> &EndpointProfile {
        &self.profile
    }

    fn collection_url(&self, collection: Collection) -> Result<Url, NetworkError> {
        self.base_url
            .join(self.profile.path(collection))
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))
    }

    /// Address a single record (or upload) according to the id placement.
    fn item_url(&self, collection: Collection, key: &str) -> Result<Url, NetworkError> {
        let mut url = self.collection_url(collection)?;
        match self.profile.id_placement {
            IdPlacement::Path => {
                url.path_segments_mut()
                    .map_err(|_| NetworkError::InvalidRequest("base url cannot have path segments".into()))?
                    .push(key);
            }
            IdPlacement::Body => {
                let param = match collection {
                    Collection::Upload => "filename",
                    _ => "id",
                };
                url.query_pairs_mut().append_pair(param, key);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "Backend request");
        self.http.request(method, url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, NetworkError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = error_message(&body, status);
            tracing::warn!(status = status.as_u16(), %message, "Backend returned an error");
            return Err(NetworkError::Status {
                status: status.as_u16(),
                message,
            });
        }
        serde_json::from_str(&body).map_err(|e| NetworkError::Decode(e.to_string()))
    }

    async fn list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, NetworkError> {
        let url = self.collection_url(collection)?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: EntityId,
    ) -> Result<T, NetworkError> {
        let url = self.item_url(collection, &id.to_string())?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn create<B: Serialize, T: DeserializeOwned>(
        &self,
        collection: Collection,
        body: &B,
    ) -> Result<T, NetworkError> {
        let url = self.collection_url(collection)?;
        self.send(self.request(Method::POST, url).json(body)).await
    }

    /// Full-record replace.
    async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: EntityId,
        body: &B,
    ) -> Result<T, NetworkError> {
        match self.profile.id_placement {
            IdPlacement::Path => {
                let url = self.item_url(collection, &id.to_string())?;
                self.send(self.request(Method::PUT, url).json(body)).await
            }
            IdPlacement::Body => {
                let mut value = serde_json::to_value(body)
                    .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;
                let object = value.as_object_mut().ok_or_else(|| {
                    NetworkError::InvalidRequest("record must be a JSON object".into())
                })?;
                object.insert("id".into(), serde_json::json!(id.get()));
                let url = self.collection_url(collection)?;
                self.send(self.request(Method::PUT, url).json(&value)).await
            }
        }
    }

    async fn delete(&self, collection: Collection, id: EntityId) -> Result<Ack, NetworkError> {
        match self.profile.id_placement {
            IdPlacement::Path => {
                let url = self.item_url(collection, &id.to_string())?;
                self.send(self.request(Method::DELETE, url)).await
            }
            IdPlacement::Body => {
                let url = self.collection_url(collection)?;
                let body = serde_json::json!({ "id": id.get() });
                self.send(self.request(Method::DELETE, url).json(&body)).await
            }
        }
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, NetworkError> {
        self.list(Collection::Projects).await
    }

    pub async fn get_project(&self, id: EntityId) -> Result<Project, NetworkError> {
        self.get(Collection::Projects, id).await
    }

    pub async fn create_project(&self, draft: &ProjectDraft) -> Result<Project, NetworkError> {
        self.create(Collection::Projects, draft).await
    }

    pub async fn update_project(
        &self,
        id: EntityId,
        draft: &ProjectDraft,
    ) -> Result<Project, NetworkError> {
        self.update(Collection::Projects, id, draft).await
    }

    pub async fn delete_project(&self, id: EntityId) -> Result<Ack, NetworkError> {
        self.delete(Collection::Projects, id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, NetworkError> {
        self.list(Collection::Users).await
    }

    pub async fn get_user(&self, id: EntityId) -> Result<User, NetworkError> {
        self.get(Collection::Users, id).await
    }

    pub async fn create_user(&self, draft: &UserDraft) -> Result<User, NetworkError> {
        self.create(Collection::Users, draft).await
    }

    pub async fn update_user(&self, id: EntityId, draft: &UserDraft) -> Result<User, NetworkError> {
        self.update(Collection::Users, id, draft).await
    }

    pub async fn delete_user(&self, id: EntityId) -> Result<Ack, NetworkError> {
        self.delete(Collection::Users, id).await
    }

    pub async fn list_tasks(&self, project_id: Option<EntityId>) -> Result<Vec<Task>, NetworkError> {
        let mut url = self.collection_url(Collection::Tasks)?;
        if let Some(project_id) = project_id {
            url.query_pairs_mut()
                .append_pair("project_id", &project_id.to_string());
        }
        self.send(self.request(Method::GET, url)).await
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, NetworkError> {
        self.create(Collection::Tasks, draft).await
    }

    /// Upload a file as multipart field `media`.
    pub async fn upload_media(&self, file: &MediaFile) -> Result<UploadedMedia, NetworkError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("media", part);
        let url = self.collection_url(Collection::Upload)?;
        tracing::info!(file = %file.file_name, size = file.bytes.len(), "Uploading media");

        let response = self.request(Method::POST, url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let reply: UploadReply = match serde_json::from_str(&body) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(NetworkError::Upload(error_message(&body, status)))
            }
            Err(e) => return Err(NetworkError::Decode(e.to_string())),
        };
        match reply {
            UploadReply {
                success: true,
                media: Some(media),
                ..
            } if status.is_success() => Ok(media),
            UploadReply { error, .. } => Err(NetworkError::Upload(
                error.unwrap_or_else(|| error_message(&body, status)),
            )),
        }
    }

    /// Delete an upload by file name or by any URL ending in it.
    pub async fn delete_media(&self, filename_or_url: &str) -> Result<Ack, NetworkError> {
        let filename = media_file_name(filename_or_url);
        if filename.is_empty() {
            return Err(NetworkError::InvalidRequest("empty media reference".into()));
        }
        let url = self.item_url(Collection::Upload, filename)?;
        self.send(self.request(Method::DELETE, url)).await
    }

    /// Absolute URL for a stored media reference; root-relative references
    /// resolve against the base URL.
    pub fn resolve_media_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return reference.to_string();
        }
        self.base_url
            .join(reference.trim_start_matches('/'))
            .map(String::from)
            .unwrap_or_else(|_| reference.to_string())
    }

    /// Whether a media reference points at an upload on this backend:
    /// root-relative `/uploads/...`, or an absolute URL with the same origin.
    pub fn owns_upload(&self, reference: &str) -> bool {
        if reference.starts_with('/') && !reference.starts_with("//") {
            return reference.starts_with("/uploads/");
        }
        match Url::parse(reference) {
            Ok(url) => {
                url.origin() == self.base_url.origin() && url.path().starts_with("/uploads/")
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(profile: EndpointProfile) -> ApiClient {
        ApiClient::new("http://localhost:3000", profile, None).unwrap()
    }

    #[test]
    fn item_urls_follow_the_profile() {
        let node = client(EndpointProfile::nodejs());
        assert_eq!(
            node.item_url(Collection::Projects, "7").unwrap().as_str(),
            "http://localhost:3000/api/projects/7"
        );
        let php = client(EndpointProfile::php());
        assert_eq!(
            php.item_url(Collection::Projects, "7").unwrap().as_str(),
            "http://localhost:3000/api/projects.php?id=7"
        );
        assert_eq!(
            php.item_url(Collection::Upload, "a.png").unwrap().as_str(),
            "http://localhost:3000/api/upload.php?filename=a.png"
        );
    }

    #[test]
    fn resolves_relative_media() {
        let node = client(EndpointProfile::nodejs());
        assert_eq!(
            node.resolve_media_url("/uploads/a.png"),
            "http://localhost:3000/uploads/a.png"
        );
        assert_eq!(
            node.resolve_media_url("https://cdn.example.com/b.mp4"),
            "https://cdn.example.com/b.mp4"
        );
    }

    #[test]
    fn only_uploads_on_the_backend_are_owned() {
        let node = client(EndpointProfile::nodejs());
        assert!(node.owns_upload("/uploads/a.png"));
        assert!(node.owns_upload("http://localhost:3000/uploads/a.png"));
        assert!(!node.owns_upload("https://cdn.example.com/uploads/a.png"));
        assert!(!node.owns_upload("//cdn.example.com/uploads/a.png"));
        assert!(!node.owns_upload("/static/uploads/a.png"));
        assert!(!node.owns_upload("uploads/a.png"));
    }

    #[test]
    fn error_bodies_carry_the_message() {
        assert_eq!(
            error_message(r#"{"error":"Project ID required"}"#, StatusCode::BAD_REQUEST),
            "Project ID required"
        );
        assert_eq!(error_message("<html>", StatusCode::BAD_GATEWAY), "Bad Gateway");
    }
}
