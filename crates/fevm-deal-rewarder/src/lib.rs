//! # FEVM Deal Rewarder
//!
//! Escrowed storage bounties. Anyone may fund the escrow, the owner
//! registers a bounty per piece, and the first activated deal storing the
//! piece at the requested size pays the bounty to its client.
//!
//! Deal facts come from a [`fevm_deal_client::DealRegistryView`]; the
//! rewarder never mutates the registry.

pub mod config;
pub mod error;
pub mod events;
pub mod rewarder;

pub use config::RewarderConfig;
pub use error::{Result, RewarderError};
pub use events::RewarderEvent;
pub use rewarder::{BountyEntry, DealRewarder};
