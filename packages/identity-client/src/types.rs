use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Path of the user listing endpoint, relative to the identity host.
pub const USERS_PATH: &str = "/identity/v3/users/";

/// One page of the user listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListResponse {
    /// Total number of users known to the service, not just this page.
    #[serde(rename = "Count", default)]
    pub count: u64,
    #[serde(rename = "Results", default)]
    pub results: Vec<UserRecord>,
}

/// A user together with its organization memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "Details")]
    pub details: UserDetails,
    #[serde(rename = "Organizations", default)]
    pub organizations: Vec<OrganizationMembership>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Id")]
    pub id: String,
}

/// Membership of a user in one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMembership {
    #[serde(rename = "Organization")]
    pub organization: String,
    #[serde(rename = "Permissions", default)]
    pub permissions: Vec<String>,
}

impl UserRecord {
    pub fn new(email: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            details: UserDetails {
                email: email.into(),
                id: id.into(),
            },
            organizations: Vec::new(),
        }
    }

    /// Add a membership with the given permissions.
    pub fn with_membership<I, S>(mut self, organization: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.organizations.push(OrganizationMembership {
            organization: organization.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        });
        self
    }
}

/// Everything needed to fetch one page of users.
///
/// The token is a [`SecretString`], so `Debug` output never shows it.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub host: String,
    pub token: SecretString,
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(
        host: impl Into<String>,
        token: impl Into<SecretString>,
        page: u32,
        page_size: u32,
    ) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            page,
            page_size,
        }
    }

    /// Same host, token and page size, different page.
    pub fn for_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Value of the `Authorization` header for this request.
    pub fn authorization(&self) -> String {
        format!("bearer {}", self.token.expose_secret())
    }

    /// The fully formed listing URL for this page.
    pub fn url(&self) -> String {
        format!(
            "{}{}?page={}&page_size={}",
            self.host.trim_end_matches('/'),
            USERS_PATH,
            self.page,
            self.page_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_listing_body() {
        let body = r#"{
            "Count": 2,
            "Results": [
                {
                    "Details": {"Email": "a@example.com", "Id": "u-1"},
                    "Organizations": [
                        {"Organization": "org-1", "Permissions": ["read"]}
                    ]
                },
                {
                    "Details": {"Email": "b@example.com", "Id": "u-2"},
                    "Organizations": []
                }
            ]
        }"#;

        let parsed: UserListResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.count, 2);
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].details.email, "a@example.com");
        assert_eq!(parsed.results[0].organizations[0].permissions, vec!["read"]);
        assert!(parsed.results[1].organizations.is_empty());
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let parsed: UserListResponse = serde_json::from_str(r#"{"Count": 7}"#).unwrap();
        assert_eq!(parsed.count, 7);
        assert!(parsed.results.is_empty());

        let user: UserRecord =
            serde_json::from_str(r#"{"Details": {"Email": "x@example.com", "Id": "x"}}"#).unwrap();
        assert!(user.organizations.is_empty());
    }

    #[test]
    fn test_url_includes_page_and_size() {
        let request = PageRequest::new("https://id.example.com/", "t", 3, 50);
        assert_eq!(
            request.url(),
            "https://id.example.com/identity/v3/users/?page=3&page_size=50"
        );
        assert_eq!(request.for_page(7).page, 7);
        assert_eq!(request.for_page(7).page_size, 50);
    }

    #[test]
    fn test_token_only_leaves_through_the_header() {
        let request = PageRequest::new("https://id.example.com", "super-secret", 1, 50);
        assert_eq!(request.authorization(), "bearer super-secret");
        assert!(!format!("{:?}", request).contains("super-secret"));
    }
}
