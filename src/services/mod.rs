pub mod messaging_gateway;
pub mod user_attributes;

pub use messaging_gateway::*;
pub use user_attributes::*;
