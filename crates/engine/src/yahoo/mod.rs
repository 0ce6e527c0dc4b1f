pub mod client;
pub mod payload;

pub use client::YahooClient;
