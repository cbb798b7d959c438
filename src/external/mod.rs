pub mod retry;
pub mod whatsapp;

pub use retry::*;
pub use whatsapp::*;
