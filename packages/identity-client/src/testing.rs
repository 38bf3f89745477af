//! Testing utilities.
//!
//! [`MockDirectory`] serves canned pages without any network traffic so the
//! export pipeline can be exercised deterministically.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{IdentityError, Result};
use crate::types::{PageRequest, UserListResponse, UserRecord};
use crate::UserDirectory;

/// A mock user directory.
///
/// Pages that were not configured come back empty but still report the
/// configured total count, the way the real service answers past the end of
/// the listing.
#[derive(Default, Clone)]
pub struct MockDirectory {
    count: u64,
    pages: Arc<RwLock<HashMap<u32, Vec<UserRecord>>>>,
    failures: Arc<RwLock<HashMap<u32, u16>>>,
    calls: Arc<RwLock<Vec<u32>>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total user count reported on every page.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// Serve `users` for `page`.
    pub fn with_page(self, page: u32, users: Vec<UserRecord>) -> Self {
        self.pages.write().unwrap().insert(page, users);
        self
    }

    /// Answer `page` with an HTTP error status.
    pub fn with_failure(self, page: u32, status: u16) -> Self {
        self.failures.write().unwrap().insert(page, status);
        self
    }

    /// Pages requested so far, in call order.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.read().unwrap().clone()
    }

    /// How many times `page` was requested.
    pub fn call_count(&self, page: u32) -> usize {
        self.calls.read().unwrap().iter().filter(|p| **p == page).count()
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn list_users(&self, request: &PageRequest) -> Result<UserListResponse> {
        self.calls.write().unwrap().push(request.page);

        if let Some(status) = self.failures.read().unwrap().get(&request.page) {
            return Err(IdentityError::Api {
                status: *status,
                message: format!("mock failure for page {}", request.page),
            });
        }

        let results = self
            .pages
            .read()
            .unwrap()
            .get(&request.page)
            .cloned()
            .unwrap_or_default();

        Ok(UserListResponse {
            count: self.count,
            results,
        })
    }
}
