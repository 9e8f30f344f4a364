pub mod app;
pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod graphql;
pub mod model;
pub mod toast;
pub mod ui;

#[cfg(test)]
mod test_helpers;
