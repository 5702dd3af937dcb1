//! Claim-order selection over a [`bloodweb_core::BoardGraph`].
//!
//! A [`Selector`] scores every claimable node, hands the best one to the
//! caller, and applies the claim to the graph in place. It never errors on
//! a well-formed graph; an empty candidate set moves it to
//! [`SelectorState::Exhausted`] for good.

mod params;
mod score;
mod selector;

pub use params::SelectorParams;
pub use score::{rank_candidates, Candidate};
pub use selector::{remaining_count, Round, Selector, SelectorState};
