//! Remote sync of the whole aggregate.
//!
//! The server keeps one JSON blob per email:
//!
//! - `GET    {base}/stats/{email}` returns the last pushed aggregate or `null`
//! - `POST   {base}/stats/{email}` overwrites it with the request body
//! - `DELETE {base}/stats/{email}` drops it
//!
//! There is no versioning: the last writer wins. Pushes are best effort and a
//! failure is only logged; the local store stays authoritative.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::{OpsError, Result};
use crate::stats::UserStats;

/// Request timeout for every sync call.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote copy of user aggregates.
pub trait Remote {
    /// Last synced aggregate, `None` if the server has nothing.
    fn pull(&self, email: &str) -> Result<Option<UserStats>>;
    /// Overwrite the remote aggregate.
    fn push(&self, stats: &UserStats) -> Result<()>;
    /// Delete the remote aggregate.
    fn purge(&self, email: &str) -> Result<()>;
}

/// Push and swallow failures. Returns whether the push went through.
pub fn push_best_effort(remote: &dyn Remote, stats: &UserStats) -> bool {
    match remote.push(stats) {
        Ok(()) => {
            debug!(email = %stats.email, "stats synced");
            true
        }
        Err(e) => {
            warn!(email = %stats.email, error = %e, "stats sync failed, keeping local copy");
            false
        }
    }
}

/// HTTP implementation against the stats API.
pub struct HttpRemote {
    base: Url,
    client: Client,
}

impl HttpRemote {
    /// `base` is the API root, e.g. `http://localhost:3000/api`.
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| OpsError::Input(format!("bad API url {base}: {e}")))?;
        let client = Client::builder().timeout(SYNC_TIMEOUT).build()?;
        Ok(HttpRemote { base, client })
    }

    /// `{base}/stats/{email}` with the email lower-cased and percent-encoded.
    pub fn stats_url(&self, email: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| OpsError::Input(format!("API url {} cannot take a path", self.base)))?
            .pop_if_empty()
            .push("stats")
            .push(&email.trim().to_lowercase());
        Ok(url)
    }
}

impl Remote for HttpRemote {
    fn pull(&self, email: &str) -> Result<Option<UserStats>> {
        let url = self.stats_url(email)?;
        debug!(%url, "pulling stats");
        let resp = self.client.get(url).send()?.error_for_status()?;
        let stats: Option<UserStats> = resp.json()?;
        Ok(stats)
    }

    fn push(&self, stats: &UserStats) -> Result<()> {
        let url = self.stats_url(&stats.email)?;
        debug!(%url, "pushing stats");
        self.client.post(url).json(stats).send()?.error_for_status()?;
        Ok(())
    }

    fn purge(&self, email: &str) -> Result<()> {
        let url = self.stats_url(email)?;
        self.client.delete(url).send()?.error_for_status()?;
        info!(email, "remote stats deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryRemote {
        blobs: RefCell<HashMap<String, UserStats>>,
    }

    impl Remote for MemoryRemote {
        fn pull(&self, email: &str) -> Result<Option<UserStats>> {
            Ok(self.blobs.borrow().get(email).cloned())
        }
        fn push(&self, stats: &UserStats) -> Result<()> {
            self.blobs.borrow_mut().insert(stats.email.clone(), stats.clone());
            Ok(())
        }
        fn purge(&self, email: &str) -> Result<()> {
            self.blobs.borrow_mut().remove(email);
            Ok(())
        }
    }

    struct DownRemote;

    impl Remote for DownRemote {
        fn pull(&self, _: &str) -> Result<Option<UserStats>> {
            Err(OpsError::Remote("connection refused".into()))
        }
        fn push(&self, _: &UserStats) -> Result<()> {
            Err(OpsError::Remote("connection refused".into()))
        }
        fn purge(&self, _: &str) -> Result<()> {
            Err(OpsError::Remote("connection refused".into()))
        }
    }

    #[test]
    fn last_writer_wins() {
        let remote = MemoryRemote::default();
        let mut a = UserStats::new("t@x.cz", "2025-01-01".into());
        a.points = 10;
        assert!(push_best_effort(&remote, &a));
        a.points = 99;
        assert!(push_best_effort(&remote, &a));
        assert_eq!(remote.pull("t@x.cz").unwrap().map(|s| s.points), Some(99));
        remote.purge("t@x.cz").unwrap();
        assert!(remote.pull("t@x.cz").unwrap().is_none());
    }

    #[test]
    fn failed_push_is_swallowed() {
        let stats = UserStats::new("t@x.cz", "2025-01-01".into());
        assert!(!push_best_effort(&DownRemote, &stats));
    }

    #[test]
    fn builds_stats_urls() {
        let remote = HttpRemote::new("http://localhost:3000/api/").unwrap();
        let url = remote.stats_url("Tata@Example.cz").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/stats/tata@example.cz");

        let remote = HttpRemote::new("https://example.org/api").unwrap();
        assert_eq!(remote.stats_url("a b@c.cz").unwrap().as_str(), "https://example.org/api/stats/a%20b@c.cz");
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(HttpRemote::new("not a url"), Err(OpsError::Input(_))));
    }
}
