use core::fmt::Debug;
use serde::{Deserialize, Serialize};

use crate::{Name, ProposalId, Registry, Timestamp};

/// Notifications emitted by the registry for external indexers.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event<T: Name> {
    ProposalCreated {
        id: ProposalId,
        creator: T,
        title: String,
        timestamp: Timestamp,
    },
    VoteCast {
        proposal_id: ProposalId,
        voter: T,
        timestamp: Timestamp,
    },
}

impl<T: Name> Debug for Event<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::ProposalCreated {
                id,
                creator,
                title,
                timestamp,
            } => write!(f, "Created({}, {:?}, {:?})@{}", id, creator, title, timestamp),
            Event::VoteCast {
                proposal_id,
                voter,
                timestamp,
            } => write!(f, "Voted({}, {:?})@{}", proposal_id, voter, timestamp),
        }
    }
}

impl<T: Name> Event<T> {
    pub fn proposal_id(&self) -> ProposalId {
        match self {
            Event::ProposalCreated { id, .. } => *id,
            Event::VoteCast { proposal_id, .. } => *proposal_id,
        }
    }
}

/// Receives every event, in commit order, once the mutation that produced it
/// has been committed and the writer slot released. Sinks may read the
/// registry. Calling `create_proposal`/`vote` from the sink's own thread fails
/// with [`crate::Error::ReentrantCall`]; a mutation handed to another thread
/// goes through, and its event reaches the sinks after the current one
/// returns.
pub trait EventSink<T: Name>: Send + Sync {
    fn on_event(&self, registry: &Registry<T>, event: &Event<T>);
}

impl<T, F> EventSink<T> for F
where
    T: Name,
    F: Fn(&Registry<T>, &Event<T>) + Send + Sync,
{
    fn on_event(&self, registry: &Registry<T>, event: &Event<T>) {
        self(registry, event)
    }
}
