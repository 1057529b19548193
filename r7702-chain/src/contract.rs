//! Solidity interface definitions for on-chain interactions.
//!
//! - [`IERC20`] - the ERC-20 subset used for approvals and pulled transfers
//! - [`IBatchExecutor`] - the batch entry point exposed by the delegated account

use alloy_sol_types::sol;

sol! {
    /// Minimal ERC-20 interface for approvals, allowance/balance checks and
    /// `transferFrom`.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
    }
}

sol! {
    /// Batch execution interface of the delegation implementation.
    ///
    /// Calls are executed in order from the delegated account's context.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface IBatchExecutor {
        struct Call {
            address target;
            uint256 value;
            bytes data;
        }

        function executeBatch(Call[] calls) external payable;
    }
}
