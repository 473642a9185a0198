//! Business logic for strategic planning and activity budgeting.
//!
//! Everything in this crate is pure: no network, no global state. The
//! API client and CLI crates feed backend data through [`normalize`],
//! check it with [`rules`], and render it with [`assemble`].

pub mod assemble;
pub mod budget;
pub mod costing;
pub mod model;
pub mod normalize;
pub mod rules;
pub mod weight;
pub mod wizard;
pub mod workflow;
