//! Page planning.
//!
//! The identity service reports the total user count on every page, so one
//! probe of page 1 is enough to decide how many page jobs to enqueue.

use std::fmt;
use std::str::FromStr;

use identity_client::{PageRequest, UserDirectory};
use tracing::debug;

use crate::error::{ExportError, Result};

/// Page the planning probe asks for.
pub const PROBE_PAGE: u32 = 1;

/// How the number of pages is derived from the reported user count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagePolicy {
    /// `count / size + 2`, plus one more when `count % that == 0`.
    ///
    /// Overestimates on purpose so that users added between the probe and
    /// the fetches are still picked up. Extra pages come back empty. The
    /// remainder check against the page count (not the page size) looks like
    /// a historical rounding slip but is kept for output parity.
    #[default]
    Conservative,
    /// Exact ceiling division. Only safe when the count is stable for the
    /// duration of a run.
    Exact,
}

impl fmt::Display for PagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagePolicy::Conservative => f.write_str("conservative"),
            PagePolicy::Exact => f.write_str("exact"),
        }
    }
}

impl FromStr for PagePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conservative" => Ok(PagePolicy::Conservative),
            "exact" => Ok(PagePolicy::Exact),
            other => Err(format!(
                "unknown page policy '{}', expected 'conservative' or 'exact'",
                other
            )),
        }
    }
}

/// Number of pages to fetch for `total` users at `page_size` per page.
///
/// `page_size` must be non-zero; configuration validation guarantees it.
pub fn page_count(total: u64, page_size: u32, policy: PagePolicy) -> u64 {
    let size = u64::from(page_size.max(1));
    match policy {
        PagePolicy::Conservative => {
            let mut pages = total / size + 2;
            if total % pages == 0 {
                pages += 1;
            }
            pages
        }
        PagePolicy::Exact => total.div_ceil(size),
    }
}

/// Probe page 1 and compute how many page jobs the run needs.
pub async fn plan_page_count<D>(
    directory: &D,
    template: &PageRequest,
    policy: PagePolicy,
) -> Result<u32>
where
    D: UserDirectory + ?Sized,
{
    let probe = template.for_page(PROBE_PAGE);
    let listing = directory
        .list_users(&probe)
        .await
        .map_err(|source| ExportError::Fetch {
            page: PROBE_PAGE,
            source,
        })?;

    let pages = page_count(listing.count, template.page_size, policy);
    debug!(total = listing.count, pages, %policy, "Planned page count");

    u32::try_from(pages)
        .map_err(|_| ExportError::Config(format!("page count {} does not fit a page number", pages)))
}
