use core::fmt::Debug;
use serde::{Deserialize, Serialize};

use crate::{Name, ProposalId, Timestamp};

/// An accepted vote. Votes are appended to their proposal in the order they
/// were accepted and are never changed afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote<T: Name> {
    pub voter: T,
    pub timestamp: Timestamp,
}

impl<T: Name> Debug for Vote<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}@{}", self.voter, self.timestamp)
    }
}

/// The proposal with the most votes, ties going to the earliest created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub id: ProposalId,
    pub vote_count: u64,
}

impl From<Winner> for (ProposalId, u64) {
    fn from(w: Winner) -> Self {
        (w.id, w.vote_count)
    }
}
