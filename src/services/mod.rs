pub mod market_service;
pub mod object_store;
pub mod update;
