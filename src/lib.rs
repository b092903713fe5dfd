//! Safe Network Governance.
//!
//! A registry of proposals where every member may cast at most one vote per
//! proposal. The [`Registry`] is the shared entry point; [`Ledger`] is the
//! single-writer state machine underneath it that enforces the invariants.

use core::fmt::Debug;
use serde::Serialize;

pub mod error;
pub mod event;
pub mod ledger;
pub mod proposal;
pub mod registry;
pub mod vote;

#[cfg(feature = "blsttc")]
pub mod transaction;

pub use crate::error::{Error, ErrorKind};
pub use crate::event::{Event, EventSink};
pub use crate::ledger::Ledger;
pub use crate::proposal::{Proposal, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
pub use crate::registry::Registry;
pub use crate::vote::{Vote, Winner};

#[cfg(feature = "blsttc")]
pub use crate::transaction::{Call, Receipt, SignedTransaction, Signer};

pub type Result<T> = std::result::Result<T, Error>;

/// Sequential proposal identifier, starting at 0.
pub type ProposalId = u64;

/// Ledger clock reading, supplied by the caller at the time of each call.
pub type Timestamp = u64;

/// Identity of a caller. Anything orderable and serializable will do:
/// small integers in tests, BLS public keys for signed transactions.
pub trait Name: Ord + Clone + Debug + Serialize {}
impl<T: Ord + Clone + Debug + Serialize> Name for T {}
