use std::sync::Arc;

use dashmap::DashSet;

/// Tracks which tracking ids have a status request outstanding, so the same
/// parcel is never submitted twice at once. The slot is released when the
/// returned [`InFlight`] is dropped, whatever the request's outcome.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    keys: Arc<DashSet<String>>,
}

#[derive(Debug)]
pub struct InFlight {
    keys: Arc<DashSet<String>>,
    key: String,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, key: &str) -> Option<InFlight> {
        if !self.keys.insert(key.to_string()) {
            return None;
        }

        Some(InFlight {
            keys: self.keys.clone(),
            key: key.to_string(),
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl InFlight {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}
