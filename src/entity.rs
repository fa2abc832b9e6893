// Copyright 2025 Cowboy AI, LLC.

//! Typed identifiers for compliance entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// A typed entity ID using phantom types for type safety
///
/// The phantom parameter keeps client, transaction and alert identifiers
/// from being mixed up at compile time.
///
/// ```rust
/// use cim_compliance::{ClientId, TransactionId};
///
/// let client = ClientId::new();
/// let transaction = TransactionId::new();
///
/// // let _: ClientId = transaction; // does not compile
/// assert_ne!(client.as_uuid(), transaction.as_uuid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId<T> {
    id: Uuid,
    #[serde(skip)]
    _phantom: PhantomData<T>,
}

impl<T> EntityId<T> {
    /// Create a new random entity ID
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            _phantom: PhantomData,
        }
    }

    /// Create an entity ID from a UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.id
    }
}

impl<T> fmt::Display for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> Default for EntityId<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromStr for EntityId<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self::from_uuid)
    }
}

impl<T> From<EntityId<T>> for Uuid {
    fn from(id: EntityId<T>) -> Self {
        id.id
    }
}

/// Marker for client identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientMarker;

/// Marker for transaction identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionMarker;

/// Marker for alert identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertMarker;

/// Identity of a client (as owner or as counterparty)
pub type ClientId = EntityId<ClientMarker>;

/// Identity of a ledger transaction
pub type TransactionId = EntityId<TransactionMarker>;

/// Identity of a compliance alert
pub type AlertId = EntityId<AlertMarker>;
