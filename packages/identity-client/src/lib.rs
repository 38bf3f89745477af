//! Pure identity service REST client.
//!
//! A minimal client for the identity service user listing. Fetches one page
//! of users at a time, each user carrying its organization memberships and
//! the permissions granted in each.
//!
//! # Example
//!
//! ```rust,ignore
//! use identity_client::{IdentityClient, PageRequest};
//! use std::time::Duration;
//!
//! let client = IdentityClient::new(Duration::from_secs(20))?;
//! let request = PageRequest::new("https://id.example.com", "token", 1, 50);
//!
//! let page = client.list_users(&request).await?;
//! for user in &page.results {
//!     println!("{} ({} orgs)", user.details.email, user.organizations.len());
//! }
//! ```

pub mod error;
#[cfg(feature = "testing")]
pub mod testing;
pub mod types;

pub use error::{IdentityError, Result};
pub use secrecy::{ExposeSecret, SecretString};
pub use types::{
    OrganizationMembership, PageRequest, UserDetails, UserListResponse, UserRecord, USERS_PATH,
};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Source of paginated user listings.
///
/// Implemented by [`IdentityClient`] for the real service and by
/// `testing::MockDirectory` for tests.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch one page of users.
    async fn list_users(&self, request: &PageRequest) -> Result<UserListResponse>;
}

/// Identity service client.
#[derive(Clone)]
pub struct IdentityClient {
    http_client: reqwest::Client,
}

impl IdentityClient {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Fetch one page of the user listing.
    pub async fn list_users(&self, request: &PageRequest) -> Result<UserListResponse> {
        let url = request.url();
        tracing::info!(%url, page = request.page, "Fetching user page");

        let resp = self
            .http_client
            .get(&url)
            .header(header::AUTHORIZATION, request.authorization())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.bytes().await?;
        let page: UserListResponse = serde_json::from_slice(&body)?;
        tracing::debug!(
            page = request.page,
            users = page.results.len(),
            count = page.count,
            "Fetched user page"
        );

        Ok(page)
    }
}

#[async_trait]
impl UserDirectory for IdentityClient {
    async fn list_users(&self, request: &PageRequest) -> Result<UserListResponse> {
        IdentityClient::list_users(self, request).await
    }
}
