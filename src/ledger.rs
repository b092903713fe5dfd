use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::proposal::{validate_description, validate_title};
use crate::{Error, Event, Name, Proposal, ProposalId, Result, Timestamp, Vote, Winner};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Entry<T: Name> {
    proposal: Proposal<T>,
    votes: Vec<Vote<T>>,
}

/// The proposal and vote state. Every mutation validates all of its
/// preconditions before it writes anything, so a failed call leaves the
/// ledger exactly as it was.
///
/// `Ledger` is single-writer: share it through [`crate::Registry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Ledger<T: Name> {
    proposals: Vec<Entry<T>>,
    events: Vec<Event<T>>,
    // derived from `proposals`, rebuilt on decode
    #[serde(skip)]
    voted: BTreeMap<ProposalId, BTreeSet<T>>,
}

impl<T: Name> Default for Ledger<T> {
    fn default() -> Self {
        Self {
            proposals: Default::default(),
            events: Default::default(),
            voted: Default::default(),
        }
    }
}

impl<T: Name> Ledger<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_proposal(
        &mut self,
        title: String,
        description: String,
        caller: T,
        now: Timestamp,
    ) -> Result<Event<T>> {
        validate_title(&title)?;
        validate_description(&description)?;

        let id = self.proposal_count();
        let event = Event::ProposalCreated {
            id,
            creator: caller.clone(),
            title: title.clone(),
            timestamp: now,
        };

        self.proposals.push(Entry {
            proposal: Proposal {
                id,
                title,
                description,
                creator: caller,
                created_at: now,
                vote_count: 0,
            },
            votes: Vec::new(),
        });
        self.events.push(event.clone());

        Ok(event)
    }

    pub fn vote(&mut self, proposal_id: ProposalId, caller: T, now: Timestamp) -> Result<Event<T>> {
        let index = self.index(proposal_id)?;
        if self.has_voted(proposal_id, &caller) {
            return Err(Error::AlreadyVoted(proposal_id));
        }

        // membership, vote record and count move together
        self.voted
            .entry(proposal_id)
            .or_default()
            .insert(caller.clone());
        let entry = &mut self.proposals[index];
        entry.votes.push(Vote {
            voter: caller.clone(),
            timestamp: now,
        });
        entry.proposal.vote_count += 1;

        let event = Event::VoteCast {
            proposal_id,
            voter: caller,
            timestamp: now,
        };
        self.events.push(event.clone());

        Ok(event)
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn proposal(&self, id: ProposalId) -> Result<&Proposal<T>> {
        self.entry(id).map(|e| &e.proposal)
    }

    pub fn all_proposals(&self) -> Vec<Proposal<T>> {
        self.proposals.iter().map(|e| e.proposal.clone()).collect()
    }

    /// Proposals with ids in `[start, end)`.
    pub fn proposals(&self, start: u64, end: u64) -> Result<Vec<Proposal<T>>> {
        let count = self.proposal_count();
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        // (0, 0) on an empty ledger is the one in-bounds empty query
        if start >= count && (count > 0 || start > 0) {
            return Err(Error::StartOutOfBounds { start, count });
        }
        if end > count {
            return Err(Error::EndOutOfBounds { end, count });
        }

        Ok(self.proposals[start as usize..end as usize]
            .iter()
            .map(|e| e.proposal.clone())
            .collect())
    }

    pub fn voters(&self, id: ProposalId) -> Result<Vec<T>> {
        Ok(self.votes(id)?.iter().map(|v| v.voter.clone()).collect())
    }

    pub fn votes(&self, id: ProposalId) -> Result<&[Vote<T>]> {
        self.entry(id).map(|e| e.votes.as_slice())
    }

    /// Never fails: an unknown proposal simply has no voters.
    pub fn has_voted(&self, id: ProposalId, voter: &T) -> bool {
        self.voted
            .get(&id)
            .map(|voters| voters.contains(voter))
            .unwrap_or(false)
    }

    pub fn winning_proposal(&self) -> Result<Winner> {
        let mut proposals = self.proposals.iter().map(|e| &e.proposal);
        let first = proposals.next().ok_or(Error::NoProposalsExist)?;

        let mut winner = Winner {
            id: first.id,
            vote_count: first.vote_count,
        };
        for p in proposals {
            // strictly greater, so the earliest proposal keeps a tie
            if p.vote_count > winner.vote_count {
                winner = Winner {
                    id: p.id,
                    vote_count: p.vote_count,
                };
            }
        }

        Ok(winner)
    }

    pub fn events(&self) -> &[Event<T>] {
        &self.events
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self)?)
    }

    /// Decodes a ledger produced by [`Ledger::to_bytes`], rebuilding the
    /// membership records and rejecting anything that breaks an invariant.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self>
    where
        T: DeserializeOwned,
    {
        let mut ledger: Self = bincode::deserialize(bytes)?;
        ledger.voted = ledger
            .proposals
            .iter()
            .map(|e| {
                let voters = BTreeSet::from_iter(e.votes.iter().map(|v| v.voter.clone()));
                (e.proposal.id, voters)
            })
            .filter(|(_, voters)| !voters.is_empty())
            .collect();
        ledger.validate()?;
        Ok(ledger)
    }

    /// Checks every ledger invariant, reporting the first violation found.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| -> Result<()> { Err(Error::CorruptSnapshot(msg)) };

        for (index, entry) in self.proposals.iter().enumerate() {
            let p = &entry.proposal;
            if p.id != index as u64 {
                return corrupt(format!("proposal at position {} has id {}", index, p.id));
            }
            if let Err(e) = validate_title(&p.title).and(validate_description(&p.description)) {
                return corrupt(format!("proposal {}: {}", p.id, e));
            }
            if p.vote_count != entry.votes.len() as u64 {
                return corrupt(format!(
                    "proposal {} counts {} votes but holds {}",
                    p.id,
                    p.vote_count,
                    entry.votes.len()
                ));
            }
            let mut seen = BTreeSet::new();
            for vote in entry.votes.iter() {
                if !seen.insert(&vote.voter) {
                    return corrupt(format!("{:?} voted twice on proposal {}", vote.voter, p.id));
                }
                if !self.has_voted(p.id, &vote.voter) {
                    return corrupt(format!(
                        "{:?} has no membership record on proposal {}",
                        vote.voter, p.id
                    ));
                }
            }
            let members = self.voted.get(&p.id).map(BTreeSet::len).unwrap_or(0);
            if members != seen.len() {
                return corrupt(format!(
                    "proposal {} has {} membership records for {} votes",
                    p.id,
                    members,
                    seen.len()
                ));
            }
        }

        self.validate_events()
    }

    /// Replays the event log against the stored proposals: one creation per
    /// id in id order, and each proposal's votes in acceptance order.
    fn validate_events(&self) -> Result<()> {
        let corrupt = |msg: String| -> Result<()> { Err(Error::CorruptSnapshot(msg)) };

        let mut created = 0;
        let mut replayed = vec![0; self.proposals.len()];
        for event in self.events.iter() {
            match event {
                Event::ProposalCreated {
                    id,
                    creator,
                    title,
                    timestamp,
                } => {
                    let matches = self.proposals.get(created).map_or(false, |e| {
                        let p = &e.proposal;
                        p.id == *id
                            && &p.creator == creator
                            && &p.title == title
                            && p.created_at == *timestamp
                    });
                    if !matches {
                        return corrupt(format!(
                            "event {:?} does not create proposal {}",
                            event, created
                        ));
                    }
                    created += 1;
                }
                Event::VoteCast {
                    proposal_id,
                    voter,
                    timestamp,
                } => {
                    let index = *proposal_id as usize;
                    if *proposal_id >= created as u64 {
                        return corrupt(format!("event {:?} precedes its proposal", event));
                    }
                    let expected = self.proposals[index].votes.get(replayed[index]);
                    if expected.map_or(true, |v| &v.voter != voter || v.timestamp != *timestamp) {
                        return corrupt(format!(
                            "event {:?} does not match vote {} of proposal {}",
                            event, replayed[index], proposal_id
                        ));
                    }
                    replayed[index] += 1;
                }
            }
        }

        if created != self.proposals.len() {
            return corrupt(format!(
                "event log creates {} of {} proposals",
                created,
                self.proposals.len()
            ));
        }
        for (entry, n) in self.proposals.iter().zip(replayed) {
            if n != entry.votes.len() {
                return corrupt(format!(
                    "event log casts {} of {} votes on proposal {}",
                    n,
                    entry.votes.len(),
                    entry.proposal.id
                ));
            }
        }

        Ok(())
    }

    fn index(&self, id: ProposalId) -> Result<usize> {
        usize::try_from(id)
            .ok()
            .filter(|i| *i < self.proposals.len())
            .ok_or(Error::ProposalDoesNotExist(id))
    }

    fn entry(&self, id: ProposalId) -> Result<&Entry<T>> {
        Ok(&self.proposals[self.index(id)?])
    }
}
