pub mod user_meta;

pub use user_meta as user_meta_entity;
