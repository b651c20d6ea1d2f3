// src/abi.rs
//! Event ABIs consumed by the indexer.

use alloy::sol;

sol! {
    // ERC20 events of the gvt and pwrd tranche tokens
    #[derive(Debug, PartialEq)]
    event Transfer(address indexed from, address indexed to, uint256 value);

    #[derive(Debug, PartialEq)]
    event Approval(address indexed owner, address indexed spender, uint256 value);

    // Deposit handler
    #[derive(Debug, PartialEq)]
    event LogNewDeposit(
        address indexed user,
        address indexed referral,
        bool pwrd,
        uint256 usdAmount,
        uint256[3] tokens
    );

    // Withdraw handler
    #[derive(Debug, PartialEq)]
    event LogNewWithdrawal(
        address indexed user,
        address indexed referral,
        bool pwrd,
        bool balanced,
        bool all,
        uint256 deductUsd,
        uint256 returnUsd,
        uint256 lpAmount,
        uint256[3] tokenAmounts
    );

    #[derive(Debug, PartialEq)]
    event LogEmergencyWithdrawal(bool pwrd, address asset, uint256 amount, uint256 price);

    // Withdrawal router
    #[derive(Debug, PartialEq)]
    event LogWithdrawal(
        address indexed sender,
        uint256 tokenIndex,
        bool tranche,
        uint256 tokenAmount,
        uint256 calcAmount
    );

    // LP token staker
    #[derive(Debug, PartialEq)]
    event LogDeposit(address indexed user, uint256 pid, uint256 amount);

    #[derive(Debug, PartialEq)]
    event LogWithdraw(address indexed user, uint256 pid, uint256 amount);
}

/// Single-pool staker deployed before pool ids existed. Its events decode
/// with no pool, which no token can be resolved for, so they are logged and
/// dropped by the staker writer.
pub mod legacy_staker {
    use alloy::sol;

    sol! {
        #[derive(Debug, PartialEq)]
        event LogDeposit(address indexed user, uint256 amount);

        #[derive(Debug, PartialEq)]
        event LogWithdraw(address indexed user, uint256 amount);
    }
}
