pub mod assertion;
pub mod error;
pub mod key_material;
pub mod metadata;
pub mod token_manager;
