pub mod swap_builder;

pub use swap_builder::{SwapSigner, SwapTransaction, build_swap_transaction};
