//! # Addresses
//!
//! An [`Address`] names a topic, an RPC method or an RPC reply endpoint.
//! Equality is structural. The default address is empty and never valid
//! for registration or invocation.
//!
//! ## Long form
//!
//! ```text
//! //authority/entity/version/resource.instance#Message
//! ```
//!
//! The authority segment is omitted for local addresses (`/entity/...`).
//! Method addresses use the `rpc` resource (`rpc.GetStatus`); the reply
//! endpoint of an entity is `rpc.response`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Resource name shared by RPC methods and reply endpoints.
pub const RPC_RESOURCE: &str = "rpc";

/// Instance name of an entity's RPC reply endpoint.
pub const RESPONSE_INSTANCE: &str = "response";

/// Errors from parsing the long form of an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("address has no entity segment: {0}")]
    MissingEntity(String),

    #[error("invalid entity version '{0}'")]
    InvalidVersion(String),

    #[error("too many path segments in address: {0}")]
    TooManySegments(String),
}

/// Software entity (application or service) an address belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Entity name.
    pub name: String,
    /// Major version, if pinned.
    pub version_major: Option<u32>,
}

impl Entity {
    pub fn new(name: impl Into<String>, version_major: Option<u32>) -> Self {
        Self {
            name: name.into(),
            version_major,
        }
    }
}

/// Resource within an entity: a topic or an RPC endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name (`rpc` for methods and reply endpoints).
    pub name: String,
    /// Instance, e.g. `front_left` or the method name.
    pub instance: Option<String>,
    /// Message type name carried by a topic.
    pub message: Option<String>,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_empty() && self.instance.is_none() && self.message.is_none()
    }
}

/// A logical endpoint on the bus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Remote authority (device or domain); `None` for local addresses.
    pub authority: Option<String>,
    /// Owning entity.
    pub entity: Entity,
    /// Addressed resource; empty for entity-level addresses.
    pub resource: Resource,
}

impl Address {
    /// Entity-level address, used as a client's own address.
    pub fn entity(name: impl Into<String>, version_major: u32) -> Self {
        Self {
            authority: None,
            entity: Entity::new(name, Some(version_major)),
            resource: Resource::default(),
        }
    }

    /// Topic address under `entity`.
    pub fn topic(
        entity: Entity,
        name: impl Into<String>,
        instance: Option<&str>,
        message: Option<&str>,
    ) -> Self {
        Self {
            authority: None,
            entity,
            resource: Resource {
                name: name.into(),
                instance: instance.map(str::to_string),
                message: message.map(str::to_string),
            },
        }
    }

    /// RPC method address `rpc.<method>` under `entity`.
    pub fn method(entity: Entity, method: impl Into<String>) -> Self {
        Self {
            authority: None,
            entity,
            resource: Resource {
                name: RPC_RESOURCE.to_string(),
                instance: Some(method.into()),
                message: None,
            },
        }
    }

    /// RPC reply endpoint `rpc.response` of `entity`.
    #[must_use]
    pub fn rpc_response(entity: Entity) -> Self {
        Self {
            authority: None,
            entity,
            resource: Resource {
                name: RPC_RESOURCE.to_string(),
                instance: Some(RESPONSE_INSTANCE.to_string()),
                message: None,
            },
        }
    }

    /// Builder-style method to set the authority.
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Reply endpoint of the entity this address belongs to.
    #[must_use]
    pub fn to_rpc_response(&self) -> Self {
        Self {
            authority: self.authority.clone(),
            ..Self::rpc_response(self.entity.clone())
        }
    }

    /// True for the default (empty) address.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.authority.is_none() && self.entity.name.is_empty() && self.resource.is_empty()
    }

    /// True for RPC method addresses (`rpc.<method>`, not the reply endpoint).
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.resource.name == RPC_RESOURCE
            && self
                .resource
                .instance
                .as_deref()
                .is_some_and(|instance| !instance.is_empty() && instance != RESPONSE_INSTANCE)
    }

    /// True for an RPC reply endpoint (`rpc.response`).
    #[must_use]
    pub fn is_rpc_response(&self) -> bool {
        self.resource.name == RPC_RESOURCE
            && self.resource.instance.as_deref() == Some(RESPONSE_INSTANCE)
    }

    /// True for non-empty, non-RPC resources.
    #[must_use]
    pub fn is_topic(&self) -> bool {
        !self.resource.name.is_empty() && self.resource.name != RPC_RESOURCE
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        if let Some(authority) = &self.authority {
            write!(f, "//{authority}")?;
        }
        write!(f, "/{}", self.entity.name)?;
        if let Some(version) = self.entity.version_major {
            write!(f, "/{version}")?;
        } else if !self.resource.is_empty() {
            f.write_str("/")?;
        }
        if !self.resource.is_empty() {
            write!(f, "/{}", self.resource.name)?;
            if let Some(instance) = &self.resource.instance {
                write!(f, ".{instance}")?;
            }
            if let Some(message) = &self.resource.message {
                write!(f, "#{message}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        let (authority, path) = match s.strip_prefix("//") {
            Some(rest) => match rest.split_once('/') {
                Some((authority, path)) => (Some(authority.to_string()), path),
                None => (Some(rest.to_string()), ""),
            },
            None => match s.strip_prefix('/') {
                Some(path) => (None, path),
                None => return Err(AddressParseError::MissingLeadingSlash(s.to_string())),
            },
        };

        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() > 3 {
            return Err(AddressParseError::TooManySegments(s.to_string()));
        }

        let name = segments.first().copied().unwrap_or_default();
        if name.is_empty() {
            if authority.is_some() && segments.len() <= 1 {
                // Authority-only address.
                return Ok(Self {
                    authority,
                    ..Self::default()
                });
            }
            return Err(AddressParseError::MissingEntity(s.to_string()));
        }

        let version_major = match segments.get(1).copied() {
            None | Some("") => None,
            Some(v) => Some(
                v.parse::<u32>()
                    .map_err(|_| AddressParseError::InvalidVersion(v.to_string()))?,
            ),
        };

        let resource = match segments.get(2).copied() {
            None | Some("") => Resource::default(),
            Some(raw) => {
                let (body, message) = match raw.split_once('#') {
                    Some((body, message)) => (body, Some(message.to_string())),
                    None => (raw, None),
                };
                let (name, instance) = match body.split_once('.') {
                    Some((name, instance)) => (name, Some(instance.to_string())),
                    None => (body, None),
                };
                Resource {
                    name: name.to_string(),
                    instance,
                    message,
                }
            }
        };

        Ok(Self {
            authority,
            entity: Entity::new(name, version_major),
            resource,
        })
    }
}
