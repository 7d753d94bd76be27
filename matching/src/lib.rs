//! # Semgate Matching
//!
//! Similarity matching and decision policies for the semantic gateway
//! plugins:
//!
//! - **Clustering**: K-Means++ sub-clustering of reference utterances, so a
//!   route is represented by several semantic prototypes instead of one
//!   blurred mean.
//! - **Selection**: top-K and threshold filtering of scored candidates.
//! - **Routing**: best-route selection with a confidence-gap margin.
//! - **Guard**: allow/deny rule evaluation for prompt guarding.
//!
//! All matchers are read-only over vectors prepared at initialization time;
//! nothing here mutates shared state, so matching needs no locks.

pub mod clustering;
pub mod error;
pub mod guard;
pub mod routing;
pub mod selection;

pub use clustering::{cluster, optimal_k};
pub use error::{MatchError, Result};
pub use guard::{GuardMode, GuardRule, GuardVerdict, RuleAction, RuleSet};
pub use routing::{Route, RouteMatch, RouteTable};
pub use selection::{Scored, SelectionMode, select};
