pub mod health;
pub mod intake_handlers;
