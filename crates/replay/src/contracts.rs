use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ISafe {
        /// @notice Adds the owner `owner` to the Safe and updates the
        /// threshold to `_threshold`.
        function addOwnerWithThreshold(address owner, uint256 _threshold) external;

        function getOwners() external view returns (address[] memory);

        function getThreshold() external view returns (uint256);

        function execTransaction(
            address to,
            uint256 value,
            bytes calldata data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address refundReceiver,
            bytes memory signatures
        ) external payable returns (bool success);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IMultiSend {
        /// @notice Executes a packed batch of transactions; reverts if any
        /// of them fails.
        function multiSend(bytes memory transactions) external payable;
    }
}
