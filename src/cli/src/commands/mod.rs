pub mod alerts;
pub mod checks;
pub mod config;
pub mod health;
pub mod history;
