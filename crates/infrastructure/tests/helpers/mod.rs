pub mod builders;
pub mod bound_exchange;

pub use bound_exchange::BoundUdpExchange;
pub use builders::*;
