pub mod alerts;
pub mod catalog;
pub mod health;
pub mod items;
pub mod overrides;
pub mod sessions;
