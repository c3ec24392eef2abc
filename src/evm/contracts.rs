//! EVM contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings.

use alloy::sol;

sol! {
    /// Surge bridge endpoint on the EVM side
    #[sol(rpc)]
    contract SurgeBridge {
        /// Bridged ERC20 token
        function surge() external view returns (address);

        /// Wormhole core contract the bridge publishes through
        function wormhole() external view returns (address);

        /// Protocol fee in native units, paid on top of the messaging fee
        function minFee() external view returns (uint256);

        /// Lock `amount` and publish a transfer message. Payable: minFee + messageFee.
        function initiateTransfer(uint256 amount, bytes32 targetAddress, uint16 targetChain) external payable returns (uint64 sequence);

        /// Redeem a guardian-signed VAA from the other chain
        function completeTransfer(bytes encodedVm) external;

        event TransferInitiated(
            address indexed sender,
            uint256 amount,
            uint16 indexed targetChain,
            bytes32 indexed targetAddress,
            uint64 sequence,
            uint256 feeTaken
        );

        event TransferCompleted(
            address indexed recipient,
            uint256 amount,
            uint16 indexed sourceChain,
            uint64 sequence
        );
    }
}

sol! {
    /// Wormhole core (messaging fee only)
    #[sol(rpc)]
    contract Wormhole {
        function messageFee() external view returns (uint256);
    }
}

sol! {
    /// ERC20 subset used by the allowance gate and balance checks
    #[sol(rpc)]
    contract ERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}
