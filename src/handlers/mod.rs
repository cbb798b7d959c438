pub mod whatsapp;

pub use whatsapp::whatsapp_config;
