pub mod app;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod extract;
#[cfg(test)]
mod memory;
pub mod orders;
pub mod state;
