use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/////////////////////////////////// Identity ///////////////////////////////////

/// Deterministic entity identifier derived from the originating log.
///
/// Two ingestions of the same log always produce the same id, so a repeated
/// upsert overwrites rather than duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn for_log(tx_hash: B256, log_index: u64) -> Self {
        Self(format!("{tx_hash}-{log_index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provenance fields present on every persisted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub id: EntityId,
    pub block_number: u64,
    pub block_timestamp: DateTime<Utc>,
    pub tx_hash: B256,
    pub log_index: u64,
}

//////////////////////////////// Entity records ////////////////////////////////

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeChargedEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub receiver: Address,
    pub token_id: U256,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAdminEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub new_admin_address: Address,
    pub admin: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperatorEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub new_operator_address: Address,
    pub admin: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub order_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFilledEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub order_hash: B256,
    pub maker: Address,
    pub taker: Address,
    pub maker_asset_id: U256,
    pub taker_asset_id: U256,
    pub maker_amount_filled: U256,
    pub taker_amount_filled: U256,
    pub fee: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersMatchedEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub taker_order_hash: B256,
    pub taker_order_maker: Address,
    pub maker_asset_id: U256,
    pub taker_asset_id: U256,
    pub maker_amount_filled: U256,
    pub taker_amount_filled: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyFactoryUpdatedEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub old_proxy_factory: Address,
    pub new_proxy_factory: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedAdminEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub removed_admin: Address,
    pub admin: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedOperatorEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub removed_operator: Address,
    pub admin: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeFactoryUpdatedEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub old_safe_factory: Address,
    pub new_safe_factory: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRegisteredEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub token0: U256,
    pub token1: U256,
    pub condition_id: B256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPausedEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub pauser: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingUnpausedEntity {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub pauser: Address,
}

////////////////////////////////// Sum types //////////////////////////////////

/// One persisted record per decoded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Entity {
    FeeCharged(FeeChargedEntity),
    NewAdmin(NewAdminEntity),
    NewOperator(NewOperatorEntity),
    OrderCancelled(OrderCancelledEntity),
    OrderFilled(OrderFilledEntity),
    OrdersMatched(OrdersMatchedEntity),
    ProxyFactoryUpdated(ProxyFactoryUpdatedEntity),
    RemovedAdmin(RemovedAdminEntity),
    RemovedOperator(RemovedOperatorEntity),
    SafeFactoryUpdated(SafeFactoryUpdatedEntity),
    TokenRegistered(TokenRegisteredEntity),
    TradingPaused(TradingPausedEntity),
    TradingUnpaused(TradingUnpausedEntity),
}

/// Field-less discriminant of [`Entity`], used to select a table slice when
/// scanning the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    FeeCharged,
    NewAdmin,
    NewOperator,
    OrderCancelled,
    OrderFilled,
    OrdersMatched,
    ProxyFactoryUpdated,
    RemovedAdmin,
    RemovedOperator,
    SafeFactoryUpdated,
    TokenRegistered,
    TradingPaused,
    TradingUnpaused,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeeCharged => "FeeCharged",
            Self::NewAdmin => "NewAdmin",
            Self::NewOperator => "NewOperator",
            Self::OrderCancelled => "OrderCancelled",
            Self::OrderFilled => "OrderFilled",
            Self::OrdersMatched => "OrdersMatched",
            Self::ProxyFactoryUpdated => "ProxyFactoryUpdated",
            Self::RemovedAdmin => "RemovedAdmin",
            Self::RemovedOperator => "RemovedOperator",
            Self::SafeFactoryUpdated => "SafeFactoryUpdated",
            Self::TokenRegistered => "TokenRegistered",
            Self::TradingPaused => "TradingPaused",
            Self::TradingUnpaused => "TradingUnpaused",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::FeeCharged(_) => EntityKind::FeeCharged,
            Self::NewAdmin(_) => EntityKind::NewAdmin,
            Self::NewOperator(_) => EntityKind::NewOperator,
            Self::OrderCancelled(_) => EntityKind::OrderCancelled,
            Self::OrderFilled(_) => EntityKind::OrderFilled,
            Self::OrdersMatched(_) => EntityKind::OrdersMatched,
            Self::ProxyFactoryUpdated(_) => EntityKind::ProxyFactoryUpdated,
            Self::RemovedAdmin(_) => EntityKind::RemovedAdmin,
            Self::RemovedOperator(_) => EntityKind::RemovedOperator,
            Self::SafeFactoryUpdated(_) => EntityKind::SafeFactoryUpdated,
            Self::TokenRegistered(_) => EntityKind::TokenRegistered,
            Self::TradingPaused(_) => EntityKind::TradingPaused,
            Self::TradingUnpaused(_) => EntityKind::TradingUnpaused,
        }
    }

    pub fn meta(&self) -> &EntityMeta {
        match self {
            Self::FeeCharged(e) => &e.meta,
            Self::NewAdmin(e) => &e.meta,
            Self::NewOperator(e) => &e.meta,
            Self::OrderCancelled(e) => &e.meta,
            Self::OrderFilled(e) => &e.meta,
            Self::OrdersMatched(e) => &e.meta,
            Self::ProxyFactoryUpdated(e) => &e.meta,
            Self::RemovedAdmin(e) => &e.meta,
            Self::RemovedOperator(e) => &e.meta,
            Self::SafeFactoryUpdated(e) => &e.meta,
            Self::TokenRegistered(e) => &e.meta,
            Self::TradingPaused(e) => &e.meta,
            Self::TradingUnpaused(e) => &e.meta,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.meta().id
    }
}
