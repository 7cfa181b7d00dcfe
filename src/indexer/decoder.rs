use alloy_primitives::B256;
use alloy_sol_types::SolEvent;

use crate::abi;
use crate::models::errors::DecodeError;
use crate::models::logs::RawLogEvent;

/// A raw log resolved against one of the known exchange event shapes.
#[derive(Debug)]
pub enum DecodedEvent {
    FeeCharged(abi::FeeCharged),
    NewAdmin(abi::NewAdmin),
    NewOperator(abi::NewOperator),
    OrderCancelled(abi::OrderCancelled),
    OrderFilled(abi::OrderFilled),
    OrdersMatched(abi::OrdersMatched),
    ProxyFactoryUpdated(abi::ProxyFactoryUpdated),
    RemovedAdmin(abi::RemovedAdmin),
    RemovedOperator(abi::RemovedOperator),
    SafeFactoryUpdated(abi::SafeFactoryUpdated),
    TokenRegistered(abi::TokenRegistered),
    TradingPaused(abi::TradingPaused),
    TradingUnpaused(abi::TradingUnpaused),
}

/// Decode a raw log against the known event-signature table.
///
/// Pure function of its input. Unknown signatures are not an error condition
/// for the pipeline; the caller skips them and moves on.
pub fn decode(log: &RawLogEvent) -> Result<DecodedEvent, DecodeError> {
    // Anonymous events carry no signature topic; nothing tracked here is
    // anonymous, so a topic-less log falls through as unknown.
    let Some(topic0) = log.topics.first().copied() else {
        return Err(DecodeError::UnknownSignature { topic0: B256::ZERO });
    };

    if topic0 == abi::FeeCharged::SIGNATURE_HASH {
        decode_as::<abi::FeeCharged>(log).map(DecodedEvent::FeeCharged)
    } else if topic0 == abi::NewAdmin::SIGNATURE_HASH {
        decode_as::<abi::NewAdmin>(log).map(DecodedEvent::NewAdmin)
    } else if topic0 == abi::NewOperator::SIGNATURE_HASH {
        decode_as::<abi::NewOperator>(log).map(DecodedEvent::NewOperator)
    } else if topic0 == abi::OrderCancelled::SIGNATURE_HASH {
        decode_as::<abi::OrderCancelled>(log).map(DecodedEvent::OrderCancelled)
    } else if topic0 == abi::OrderFilled::SIGNATURE_HASH {
        decode_as::<abi::OrderFilled>(log).map(DecodedEvent::OrderFilled)
    } else if topic0 == abi::OrdersMatched::SIGNATURE_HASH {
        decode_as::<abi::OrdersMatched>(log).map(DecodedEvent::OrdersMatched)
    } else if topic0 == abi::ProxyFactoryUpdated::SIGNATURE_HASH {
        decode_as::<abi::ProxyFactoryUpdated>(log).map(DecodedEvent::ProxyFactoryUpdated)
    } else if topic0 == abi::RemovedAdmin::SIGNATURE_HASH {
        decode_as::<abi::RemovedAdmin>(log).map(DecodedEvent::RemovedAdmin)
    } else if topic0 == abi::RemovedOperator::SIGNATURE_HASH {
        decode_as::<abi::RemovedOperator>(log).map(DecodedEvent::RemovedOperator)
    } else if topic0 == abi::SafeFactoryUpdated::SIGNATURE_HASH {
        decode_as::<abi::SafeFactoryUpdated>(log).map(DecodedEvent::SafeFactoryUpdated)
    } else if topic0 == abi::TokenRegistered::SIGNATURE_HASH {
        decode_as::<abi::TokenRegistered>(log).map(DecodedEvent::TokenRegistered)
    } else if topic0 == abi::TradingPaused::SIGNATURE_HASH {
        decode_as::<abi::TradingPaused>(log).map(DecodedEvent::TradingPaused)
    } else if topic0 == abi::TradingUnpaused::SIGNATURE_HASH {
        decode_as::<abi::TradingUnpaused>(log).map(DecodedEvent::TradingUnpaused)
    } else {
        Err(DecodeError::UnknownSignature { topic0 })
    }
}

fn decode_as<E: SolEvent>(log: &RawLogEvent) -> Result<E, DecodeError> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data).map_err(|source| {
        DecodeError::Malformed {
            signature: E::SIGNATURE,
            source,
        }
    })
}
