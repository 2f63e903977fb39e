pub mod catalog;
pub mod guards;
pub mod health;
