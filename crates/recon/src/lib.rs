//! `stockmatch-recon`: product identity matching between an inventory
//! export and a distributor list.
//!
//! Pure engine crate: receives pre-loaded records, returns grouped and
//! enriched results. No CLI or filesystem dependencies.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod identify;
pub mod matcher;
pub mod model;
pub mod normalize;

pub use config::{MatchOptions, ReconConfig};
pub use engine::run;
pub use error::ReconError;
pub use matcher::reconcile;
pub use model::{DistributorTable, MatchGroup, ProductRecord, ReconInput, ReconResult};
