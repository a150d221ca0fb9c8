pub mod condition;
pub mod filter;
