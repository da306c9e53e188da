pub mod booth_handlers;
pub mod health_handlers;
pub mod market_handlers;
pub mod object_handlers;
