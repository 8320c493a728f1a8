//! Core building blocks for quoting and executing swaps against Uniswap-V2 style AMMs.
//!
//! The crate is split into small components that build on each other:
//!
//! - [`units`] converts between human decimal strings and on-chain minor units.
//! - [`slippage`] derives protection bounds and deadlines from a tolerance.
//! - [`routing`] turns an input/output currency pair into a [`models::route::Route`].
//! - [`quote`] fetches amounts along a route and produces [`models::quote::Quote`]s.
//! - [`sequencer`] runs the approve → swap / approve → add liquidity flows.
//! - [`aggregate`] merges independent asynchronous reads into paginated view models.
//!
//! Everything that touches the network is hidden behind the collaborator traits in [`traits`].

pub mod aggregate;
pub mod constant_product;
pub mod display;
pub mod errors;
pub mod models;
pub mod quote;
pub mod routing;
pub mod sequencer;
pub mod slippage;
pub mod traits;
pub mod units;

pub use alloy_primitives::Address;
pub use models::Amount;
