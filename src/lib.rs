//! tasklane — micro-task earning platform.
//!
//! Users get a bounded, kind-diverse set of tasks each day ([`allocation`],
//! persisted by [`db::assignments`]), earn balance by completing them
//! ([`db::completions`]), earn bonus by referring others, and convert bonus
//! into balance in fixed chunks ([`ledger`], [`db::redemptions`]). The HTTP
//! API lives in [`server`].

pub mod allocation;
pub mod answer;
pub mod catalog;
pub mod day;
pub mod db;
pub mod error;
pub mod ledger;
pub mod prom_metrics;
pub mod server;
pub mod settings;

pub use error::{TaskError, TaskResult};
