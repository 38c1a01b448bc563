pub mod client;

pub use client::{DeliveryClient, DeliveryError, StreamTarget};
