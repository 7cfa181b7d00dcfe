//! Event bindings for the CTF exchange contract.
//!
//! These declarations are the full set of log-emitting events in the exchange
//! ABI. The decoder matches `topics[0]` against their signature hashes, so an
//! event added here must also get a `DecodedEvent` variant and a mapping rule.

use alloy_sol_types::sol;

sol! {
    #[derive(Debug)]
    event FeeCharged(address indexed receiver, uint256 tokenId, uint256 amount);

    #[derive(Debug)]
    event NewAdmin(address indexed newAdminAddress, address indexed admin);

    #[derive(Debug)]
    event NewOperator(address indexed newOperatorAddress, address indexed admin);

    #[derive(Debug)]
    event OrderCancelled(bytes32 indexed orderHash);

    #[derive(Debug)]
    event OrderFilled(
        bytes32 indexed orderHash,
        address indexed maker,
        address indexed taker,
        uint256 makerAssetId,
        uint256 takerAssetId,
        uint256 makerAmountFilled,
        uint256 takerAmountFilled,
        uint256 fee
    );

    #[derive(Debug)]
    event OrdersMatched(
        bytes32 indexed takerOrderHash,
        address indexed takerOrderMaker,
        uint256 makerAssetId,
        uint256 takerAssetId,
        uint256 makerAmountFilled,
        uint256 takerAmountFilled
    );

    #[derive(Debug)]
    event ProxyFactoryUpdated(address indexed oldProxyFactory, address indexed newProxyFactory);

    #[derive(Debug)]
    event RemovedAdmin(address indexed removedAdmin, address indexed admin);

    #[derive(Debug)]
    event RemovedOperator(address indexed removedOperator, address indexed admin);

    #[derive(Debug)]
    event SafeFactoryUpdated(address indexed oldSafeFactory, address indexed newSafeFactory);

    #[derive(Debug)]
    event TokenRegistered(uint256 indexed token0, uint256 indexed token1, bytes32 indexed conditionId);

    #[derive(Debug)]
    event TradingPaused(address indexed pauser);

    #[derive(Debug)]
    event TradingUnpaused(address indexed pauser);
}
