//! Document store backed by a REST document API.
//!
//! - `GET    {base}/documents/{doc}`        -> `{"id", "fields"}`, 404 if missing
//! - `PUT    {base}/documents/{doc}`        <- `{"fields"}`
//! - `DELETE {base}/documents/{doc}`
//! - `POST   {base}/documents/{collection}` <- `{"fields"}` -> `{"id"}`
//! - `GET    {base}/documents/{collection}` -> `{"documents": [..]}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{DocPath, Document, DocumentStore, Fields, RemoteError};

#[derive(Serialize)]
struct FieldsBody<'a> {
    fields: &'a Fields,
}

#[derive(Deserialize)]
struct AddResponse {
    id: String,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Builds the URL for a path, percent-encoding every segment.
    pub fn url_for(&self, path: &DocPath) -> String {
        let encoded: Vec<String> = path
            .segments()
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!("{}/documents/{}", self.base_url, encoded.join("/"))
    }

    fn request(&self, method: Method, path: &DocPath) -> RequestBuilder {
        let builder = self.client.request(method, self.url_for(path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        builder
            .send()
            .await
            .map_err(|e| RemoteError::Http(e.to_string()))
    }
}

fn check_status(response: &Response, path: &DocPath) -> Result<(), RemoteError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(RemoteError::Status {
            status: response.status().as_u16(),
            path: path.to_string(),
        })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, RemoteError> {
        path.expect_document()?;
        let response = self.send(self.request(Method::GET, path)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(&response, path)?;

        let document: Document = response
            .json()
            .await
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(Some(document))
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), RemoteError> {
        path.expect_document()?;
        let builder = self
            .request(Method::PUT, path)
            .json(&FieldsBody { fields: &fields });
        let response = self.send(builder).await?;
        check_status(&response, path)
    }

    async fn add(&self, collection: &DocPath, fields: Fields) -> Result<String, RemoteError> {
        collection.expect_collection()?;
        let builder = self
            .request(Method::POST, collection)
            .json(&FieldsBody { fields: &fields });
        let response = self.send(builder).await?;
        check_status(&response, collection)?;

        let added: AddResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(added.id)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), RemoteError> {
        path.expect_document()?;
        let response = self.send(self.request(Method::DELETE, path)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(&response, path)
    }

    async fn list_children(&self, collection: &DocPath) -> Result<Vec<Document>, RemoteError> {
        collection.expect_collection()?;
        let response = self.send(self.request(Method::GET, collection)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        check_status(&response, collection)?;

        let list: ListResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(list.documents)
    }
}
