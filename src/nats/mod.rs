pub mod client;

pub use client::NatsBroker;
