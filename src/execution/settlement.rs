use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{SolCall, sol};

sol! {
    /// Settlement contract that walks a multi-hop path with the attached value
    interface IComplexPathExecutor {
        function executeComplexPath(string[] path, uint256 amount) external payable;
    }
}

/// Calldata for `executeComplexPath(path, amount)`.
///
/// `path` lists `venue:asset` hop identifiers starting and ending at the start asset.
pub fn encode_execute_path(path: Vec<String>, amount: U256) -> Bytes {
    IComplexPathExecutor::executeComplexPathCall { path, amount }.abi_encode().into()
}
