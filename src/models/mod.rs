pub mod common;
pub mod message;
pub mod whatsapp;

pub use common::*;
pub use message::*;
pub use whatsapp::*;
