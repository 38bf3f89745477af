//! Export rows and page jobs.

use identity_client::{PageRequest, UserRecord};

/// One (user, organization) pair: the unit written to the export.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlattenedEntry {
    pub user_email: String,
    pub user_id: String,
    pub org_id: String,
    pub permissions: Vec<String>,
}

impl FlattenedEntry {
    /// Row fields in export order: email, user id, org id, then one field
    /// per permission.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        [
            self.user_email.as_str(),
            self.user_id.as_str(),
            self.org_id.as_str(),
        ]
        .into_iter()
        .chain(self.permissions.iter().map(String::as_str))
    }
}

/// Expand a user into one entry per organization membership.
pub fn flatten_user(user: &UserRecord) -> impl Iterator<Item = FlattenedEntry> + '_ {
    user.organizations
        .iter()
        .map(move |membership| FlattenedEntry {
            user_email: user.details.email.clone(),
            user_id: user.details.id.clone(),
            org_id: membership.organization.clone(),
            permissions: membership.permissions.clone(),
        })
}

/// A page fetch assigned to exactly one worker.
#[derive(Debug, Clone)]
pub struct PageJob {
    pub id: usize,
    pub request: PageRequest,
}

impl PageJob {
    pub fn page(&self) -> u32 {
        self.request.page
    }
}

/// One job per page, pages numbered from 0.
pub fn build_jobs(template: &PageRequest, page_count: u32) -> Vec<PageJob> {
    (0..page_count)
        .enumerate()
        .map(|(id, page)| PageJob {
            id,
            request: template.for_page(page),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_entry_per_membership() {
        let user = UserRecord::new("ada@example.com", "u-1")
            .with_membership("org-a", ["write"])
            .with_membership("org-b", ["read", "admin"]);

        let entries: Vec<_> = flatten_user(&user).collect();

        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.user_email == "ada@example.com" && e.user_id == "u-1"));
        assert_eq!(entries[0].org_id, "org-a");
        assert_eq!(entries[0].permissions, vec!["write"]);
        assert_eq!(entries[1].org_id, "org-b");
        assert_eq!(entries[1].permissions, vec!["read", "admin"]);
    }

    #[test]
    fn test_user_without_memberships_produces_nothing() {
        let user = UserRecord::new("lonely@example.com", "u-9");
        assert_eq!(flatten_user(&user).count(), 0);
    }

    #[test]
    fn test_fields_trail_permissions() {
        let entry = FlattenedEntry {
            user_email: "a@example.com".into(),
            user_id: "u-1".into(),
            org_id: "org-1".into(),
            permissions: vec!["read".into(), "admin".into()],
        };

        let fields: Vec<_> = entry.fields().collect();
        assert_eq!(fields, vec!["a@example.com", "u-1", "org-1", "read", "admin"]);
    }

    #[test]
    fn test_build_jobs_covers_each_page_once() {
        let template = PageRequest::new("https://id.example.com", "t", 1, 25);
        let jobs = build_jobs(&template, 4);

        let pages: Vec<_> = jobs.iter().map(PageJob::page).collect();
        assert_eq!(pages, vec![0, 1, 2, 3]);
        assert!(jobs.iter().enumerate().all(|(i, job)| job.id == i));
        assert!(jobs.iter().all(|job| job.request.page_size == 25));
    }
}
