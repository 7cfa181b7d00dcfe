use crate::indexer::decoder::DecodedEvent;
use crate::models::entities::{
    Entity, EntityId, EntityMeta, FeeChargedEntity, NewAdminEntity, NewOperatorEntity,
    OrderCancelledEntity, OrderFilledEntity, OrdersMatchedEntity, ProxyFactoryUpdatedEntity,
    RemovedAdminEntity, RemovedOperatorEntity, SafeFactoryUpdatedEntity, TokenRegisteredEntity,
    TradingPausedEntity, TradingUnpausedEntity,
};
use crate::models::logs::RawLogEvent;

/// Map one decoded event to its persisted entity record.
///
/// Total over [`DecodedEvent`]: every rule is a field-for-field copy plus the
/// provenance fields and the deterministic id taken from the originating log.
/// No rule reads existing entities or correlates across events.
pub fn map(log: &RawLogEvent, event: DecodedEvent) -> Entity {
    let meta = EntityMeta {
        id: EntityId::for_log(log.tx_hash, log.log_index),
        block_number: log.block_number,
        block_timestamp: log.block_time,
        tx_hash: log.tx_hash,
        log_index: log.log_index,
    };

    match event {
        DecodedEvent::FeeCharged(ev) => Entity::FeeCharged(FeeChargedEntity {
            meta,
            receiver: ev.receiver,
            token_id: ev.tokenId,
            amount: ev.amount,
        }),
        DecodedEvent::NewAdmin(ev) => Entity::NewAdmin(NewAdminEntity {
            meta,
            new_admin_address: ev.newAdminAddress,
            admin: ev.admin,
        }),
        DecodedEvent::NewOperator(ev) => Entity::NewOperator(NewOperatorEntity {
            meta,
            new_operator_address: ev.newOperatorAddress,
            admin: ev.admin,
        }),
        DecodedEvent::OrderCancelled(ev) => Entity::OrderCancelled(OrderCancelledEntity {
            meta,
            order_hash: ev.orderHash,
        }),
        DecodedEvent::OrderFilled(ev) => Entity::OrderFilled(OrderFilledEntity {
            meta,
            order_hash: ev.orderHash,
            maker: ev.maker,
            taker: ev.taker,
            maker_asset_id: ev.makerAssetId,
            taker_asset_id: ev.takerAssetId,
            maker_amount_filled: ev.makerAmountFilled,
            taker_amount_filled: ev.takerAmountFilled,
            fee: ev.fee,
        }),
        DecodedEvent::OrdersMatched(ev) => Entity::OrdersMatched(OrdersMatchedEntity {
            meta,
            taker_order_hash: ev.takerOrderHash,
            taker_order_maker: ev.takerOrderMaker,
            maker_asset_id: ev.makerAssetId,
            taker_asset_id: ev.takerAssetId,
            maker_amount_filled: ev.makerAmountFilled,
            taker_amount_filled: ev.takerAmountFilled,
        }),
        DecodedEvent::ProxyFactoryUpdated(ev) => {
            Entity::ProxyFactoryUpdated(ProxyFactoryUpdatedEntity {
                meta,
                old_proxy_factory: ev.oldProxyFactory,
                new_proxy_factory: ev.newProxyFactory,
            })
        }
        DecodedEvent::RemovedAdmin(ev) => Entity::RemovedAdmin(RemovedAdminEntity {
            meta,
            removed_admin: ev.removedAdmin,
            admin: ev.admin,
        }),
        DecodedEvent::RemovedOperator(ev) => Entity::RemovedOperator(RemovedOperatorEntity {
            meta,
            removed_operator: ev.removedOperator,
            admin: ev.admin,
        }),
        DecodedEvent::SafeFactoryUpdated(ev) => {
            Entity::SafeFactoryUpdated(SafeFactoryUpdatedEntity {
                meta,
                old_safe_factory: ev.oldSafeFactory,
                new_safe_factory: ev.newSafeFactory,
            })
        }
        DecodedEvent::TokenRegistered(ev) => Entity::TokenRegistered(TokenRegisteredEntity {
            meta,
            token0: ev.token0,
            token1: ev.token1,
            condition_id: ev.conditionId,
        }),
        DecodedEvent::TradingPaused(ev) => Entity::TradingPaused(TradingPausedEntity {
            meta,
            pauser: ev.pauser,
        }),
        DecodedEvent::TradingUnpaused(ev) => Entity::TradingUnpaused(TradingUnpausedEntity {
            meta,
            pauser: ev.pauser,
        }),
    }
}
