//! Connection targets: which live progress channel to open.

use std::fmt;

use url::Url;

use crate::error::ConnectionError;

/// Kind of tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Assignment,
    Project,
}

impl ResourceKind {
    /// Collection segment of the channel path
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Assignment => "assignments",
            ResourceKind::Project => "projects",
        }
    }

    /// Trailing channel segment of the channel path
    pub fn channel(&self) -> &'static str {
        match self {
            ResourceKind::Assignment => "generation",
            ResourceKind::Project => "progress",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Assignment => f.write_str("assignment"),
            ResourceKind::Project => f.write_str("project"),
        }
    }
}

/// Identifier of a tracked resource.
///
/// The backend accepts both numeric and string ids, so the id is kept in its
/// textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies the live progress channel of one resource.
///
/// A target is immutable; tracking another resource means building a new
/// target and reconnecting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTarget {
    pub resource_kind: ResourceKind,
    pub resource_id: ResourceId,
    pub base_url: String,
}

impl ConnectionTarget {
    pub fn new(
        resource_kind: ResourceKind,
        resource_id: impl Into<ResourceId>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            resource_kind,
            resource_id: resource_id.into(),
            base_url: base_url.into(),
        }
    }

    pub fn assignment(resource_id: impl Into<ResourceId>, base_url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Assignment, resource_id, base_url)
    }

    pub fn project(resource_id: impl Into<ResourceId>, base_url: impl Into<String>) -> Self {
        Self::new(ResourceKind::Project, resource_id, base_url)
    }

    /// Build the WebSocket URL of this target's progress channel.
    ///
    /// The scheme follows the base URL's security: `https` becomes `wss` and
    /// `http` becomes `ws`. `ws`/`wss` bases are used as they are.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidUrl` when the base URL does not parse,
    /// has an unsupported scheme, or cannot carry a path.
    pub fn url(&self) -> Result<Url, ConnectionError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ConnectionError::InvalidUrl(format!("'{}': {}", self.base_url, e))
        })?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(ConnectionError::InvalidUrl(format!(
                    "unsupported scheme '{}' in '{}'",
                    other, self.base_url
                )));
            }
        };
        url.set_scheme(scheme).map_err(|_| {
            ConnectionError::InvalidUrl(format!("cannot use scheme '{}' for '{}'", scheme, self.base_url))
        })?;
        url.set_query(None);
        url.set_fragment(None);

        url.path_segments_mut()
            .map_err(|_| {
                ConnectionError::InvalidUrl(format!("'{}' cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend([
                self.resource_kind.collection(),
                self.resource_id.as_str(),
                self.resource_kind.channel(),
                "",
            ]);

        Ok(url)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resource_kind, self.resource_id)
    }
}
