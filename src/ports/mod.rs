pub mod balance_store;
pub mod history_store;
