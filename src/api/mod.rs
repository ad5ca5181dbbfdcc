//! API client module for WeCom
//!
//! [`WeComClient`] owns the token cache; messaging, media and directory
//! calls are added to it by the submodules.

pub mod client;
mod media;
mod message;
mod user;

pub use client::{http_client, WeComClient, DEFAULT_API_BASE};
