//! Contract call interfaces
//!
//! Only the functions the quoter and the trade pipeline encode, plus the
//! factory event the pair watcher decodes.

use alloy_sol_types::sol;

sol! {
    /// UniswapV2-style router (PancakeSwap)
    interface IRouter {
        function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] amounts);
        function swapExactETHForTokens(uint256 amountOutMin, address[] path, address to, uint256 deadline) external payable returns (uint256[] amounts);
        function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) external returns (uint256[] amounts);
    }

    /// ERC-20 subset
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// UniswapV2-style pair factory
    interface IFactory {
        event PairCreated(address indexed token0, address indexed token1, address pair, uint256 pairIndex);
    }
}
