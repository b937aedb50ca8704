use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Bucket for requests whose URL yields no host; they contend with each
/// other but not with real hosts.
const FALLBACK_HOST: &str = "default";

/// Caps concurrent outbound requests per remote host.
///
/// Semaphores are created lazily, one per host, and never evicted: the set
/// of hosts is bounded by the feed registry. The map mutex covers only the
/// lookup; waiting happens on the per-host semaphore with the mutex
/// released. tokio semaphores wake waiters in FIFO order, so callers on the
/// same host are admitted in arrival order.
pub struct HostLimiter {
    per_host_limit: usize,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

/// Lease on one request slot for a host; dropping it releases the slot.
pub struct HostLease {
    _permit: OwnedSemaphorePermit,
}

impl HostLimiter {
    pub fn new(per_host_limit: usize) -> Self {
        Self {
            per_host_limit,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for a free slot on `host` and returns the lease.
    pub async fn acquire(&self, host: &str) -> HostLease {
        let semaphore = {
            let mut hosts = self.hosts.lock().expect("host map lock poisoned");
            hosts
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_limit)))
                .clone()
        };

        // Semaphores are never closed, so acquisition cannot fail.
        let permit = semaphore
            .acquire_owned()
            .await
            .expect("host semaphore closed");

        HostLease { _permit: permit }
    }
}

/// Extracts the rate-limit bucket for a request URL.
pub fn host_for_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}
