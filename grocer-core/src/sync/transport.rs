//! HTTP request/response transport.
//!
//! The [`Transport`] trait is the seam between the client and the network.
//! [`HttpTransport`] talks to the real service with `reqwest`; tests swap in
//! an in-memory implementation.

use std::fmt;
use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::error::SyncError;
use super::protocol::{generate_client_id, LoginResponse};

const API_VERSION: &str = "3";
const API_VERSION_HEADER: &str = "X-AnyLeaf-API-Version";
const CLIENT_ID_HEADER: &str = "X-AnyLeaf-Client-Identifier";
const SIGNED_USER_HEADER: &str = "X-AnyLeaf-Signed-User-ID";

/// Account credentials for the login endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque token sent with every data request
    pub signed_user_id: String,
    /// Account id, stamped on every operation this session submits
    pub user_id: String,
    /// Identifies this device to the server
    pub client_id: String,
}

/// Server acknowledgement of a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledgement {
    pub status: u16,
}

/// Request/response access to the service.
pub trait Transport: Send + Sync + 'static {
    /// Exchanges credentials for a session.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Session, SyncError>> + Send;

    /// Fetches the raw user-data snapshot.
    fn fetch_user_data(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Vec<u8>, SyncError>> + Send;

    /// Submits one encoded operation batch.
    fn submit_operations(
        &self,
        session: &Session,
        batch: Vec<u8>,
    ) -> impl Future<Output = Result<Acknowledgement, SyncError>> + Send;
}

/// Transport backed by the service's HTTPS endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    server_url: String,
    client_id: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a freshly generated client id.
    pub fn new(server_url: impl Into<String>) -> Result<Self, SyncError> {
        Self::with_client_id(server_url, generate_client_id())
    }

    pub fn with_client_id(
        server_url: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let client_id = client_id.into();

        let mut headers = HeaderMap::new();
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        headers.insert(
            CLIENT_ID_HEADER,
            HeaderValue::from_str(&client_id)
                .map_err(|e| SyncError::TransportError(format!("Invalid client id: {}", e)))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            server_url: server_url.into(),
            client_id,
            http,
        })
    }

    /// Returns the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Builds an HTTP URL for a given path.
    fn build_http_url(&self, path: &str) -> String {
        // Convert ws(s) to http(s) if needed
        let base_url = if self.server_url.starts_with("ws://") {
            self.server_url.replace("ws://", "http://")
        } else if self.server_url.starts_with("wss://") {
            self.server_url.replace("wss://", "https://")
        } else if !self.server_url.starts_with("http://")
            && !self.server_url.starts_with("https://")
        {
            format!("https://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn signed_header(session: &Session) -> Result<HeaderValue, SyncError> {
        HeaderValue::from_str(&session.signed_user_id)
            .map_err(|e| SyncError::TransportError(format!("Invalid signed user id: {}", e)))
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    if !response.status().is_success() {
        return Err(SyncError::TransportError(format!(
            "Server returned status {}",
            response.status()
        )));
    }
    Ok(response)
}

impl Transport for HttpTransport {
    async fn login(&self, credentials: &Credentials) -> Result<Session, SyncError> {
        let url = self.build_http_url("data/validate-login");
        debug!("Logging in as {}", credentials.email);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("email", credentials.email.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let login: LoginResponse = check_status(response)?.json().await?;

        Ok(Session {
            signed_user_id: login.signed_user_id,
            user_id: login.user_id,
            client_id: self.client_id.clone(),
        })
    }

    async fn fetch_user_data(&self, session: &Session) -> Result<Vec<u8>, SyncError> {
        let url = self.build_http_url("data/user-data/get");

        let response = self
            .http
            .post(&url)
            .header(SIGNED_USER_HEADER, Self::signed_header(session)?)
            .send()
            .await?;

        let body = check_status(response)?.bytes().await?;
        debug!("Fetched {} byte(s) of user data", body.len());
        Ok(body.to_vec())
    }

    async fn submit_operations(
        &self,
        session: &Session,
        batch: Vec<u8>,
    ) -> Result<Acknowledgement, SyncError> {
        let url = self.build_http_url("data/shopping-lists/update");
        let form = Form::new().part("operations", Part::bytes(batch));

        let response = self
            .http
            .post(&url)
            .header(SIGNED_USER_HEADER, Self::signed_header(session)?)
            .multipart(form)
            .send()
            .await?;

        let response = check_status(response)?;
        Ok(Acknowledgement {
            status: response.status().as_u16(),
        })
    }
}
