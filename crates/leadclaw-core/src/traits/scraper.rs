//! Record scraper seam.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ScrapedProfile;

/// Produces raw candidate profiles for a keyword. The mechanism behind it
/// (browser automation, platform API, fixture data) is none of the core's
/// business.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Implementation name, for logs.
    fn name(&self) -> &str;

    /// Fetch up to `limit` profiles for `keyword`. Best-effort: returning
    /// fewer — or none — is normal and must not be an error. Errors are
    /// reserved for hard failures (session died, upstream rejected us).
    async fn scrape(&self, keyword: &str, limit: usize) -> Result<Vec<ScrapedProfile>>;
}
