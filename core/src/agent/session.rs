use crate::traits::SessionDescriptor;
use chrono::{DateTime, Duration, Utc};

/// Reusable sandbox container carried across turns and runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expires_at: None,
        }
    }

    /// Timestamps that fail to parse are dropped; expiry is advisory only.
    pub fn from_descriptor(descriptor: &SessionDescriptor) -> Self {
        let expires_at = descriptor.expires_at.as_deref().and_then(parse_timestamp);
        if descriptor.expires_at.is_some() && expires_at.is_none() {
            tracing::debug!(
                "Ignoring unparseable container expiry for {}: {:?}",
                descriptor.id,
                descriptor.expires_at
            );
        }

        Self {
            id: descriptor.id.clone(),
            expires_at,
        }
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at.map(|expires| expires - now)
    }

    /// Time left when it has dropped below `buffer`.
    pub fn expiry_warning(&self, buffer: Duration, now: DateTime<Utc>) -> Option<Duration> {
        self.remaining(now).filter(|remaining| *remaining < buffer)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
