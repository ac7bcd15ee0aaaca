pub mod client;
pub mod protocol;
pub mod service;
pub mod store;

pub use client::{presence_channel, PresenceClient, PresenceHandle, ReconcileOutcome, Visibility};
pub use service::{PresenceApi, PresenceService};
pub use store::PresenceStore;
