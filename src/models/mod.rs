pub mod chat;
pub mod coin;
pub mod common;
pub mod pool;
