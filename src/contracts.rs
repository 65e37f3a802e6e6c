//! ABI bindings for the contracts the engine talks to. Semantic surface
//! only: the router's internal routing and pricing stay opaque.

use alloy::sol;

// BaseSwapDEX router: three structural swap entry points, a simplified
// on-chain quote path, and the Swap event history is built from.
sol! {
    #[sol(rpc)]
    interface IBaseSwapRouter {
        function swapETHToToken(
            address tokenOut,
            uint256 minAmountOut,
            uint8 preferredVersion
        ) external payable returns (uint256 amountOut);

        function swapTokenToETH(
            address tokenIn,
            uint256 amountIn,
            uint256 minAmountOut,
            uint8 preferredVersion
        ) external returns (uint256 amountOut);

        function swapTokenToToken(
            address tokenIn,
            address tokenOut,
            uint256 amountIn,
            uint256 minAmountOut,
            uint8 preferredVersion
        ) external returns (uint256 amountOut);

        function getQuoteV2(
            address tokenIn,
            address tokenOut,
            uint256 amountIn
        ) external view returns (uint256);

        event Swap(
            address indexed user,
            address indexed tokenIn,
            address indexed tokenOut,
            uint256 amountIn,
            uint256 amountOut,
            uint256 fee,
            uint8 routerVersion
        );
    }
}

// Uniswap V3 Quoter V1: simulate an exact-input single-hop swap without
// state changes. Invoked via eth_call only, never as a transaction.
sol! {
    #[sol(rpc)]
    interface IQuoter {
        function quoteExactInputSingle(
            address tokenIn,
            address tokenOut,
            uint24 fee,
            uint256 amountIn,
            uint160 sqrtPriceLimitX96
        ) external returns (uint256 amountOut);
    }
}

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function name() external view returns (string);
    }
}
