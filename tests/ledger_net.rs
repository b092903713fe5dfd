use std::collections::{BTreeMap, BTreeSet};

use eyre::{ensure, eyre};
use sn_governance::{
    Error, Event, ProposalId, Registry, Result, Timestamp, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN,
};

/// Drives a registry from a set of scripted callers while keeping an
/// independent model of what the registry should contain.
#[derive(Debug, Default)]
pub struct Net {
    pub registry: Registry<u8>,
    pub clock: Timestamp,
    pub model: BTreeMap<ProposalId, Vec<u8>>,
    pub rejected: Vec<String>,
}

impl Net {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) -> Timestamp {
        self.clock += 1;
        self.clock
    }

    pub fn propose(&mut self, caller: u8, title: String, description: String) -> Result<ProposalId> {
        let now = self.tick();
        let valid = !title.is_empty()
            && title.len() <= MAX_TITLE_LEN
            && !description.is_empty()
            && description.len() <= MAX_DESCRIPTION_LEN;

        let res = self.registry.create_proposal(title, description, caller, now);
        match &res {
            Ok(id) => {
                assert!(valid, "accepted an invalid proposal");
                assert_eq!(*id, self.model.len() as u64);
                self.model.insert(*id, Vec::new());
            }
            Err(e) => {
                assert!(!valid, "rejected a valid proposal: {}", e);
                self.rejected.push(e.to_string());
            }
        }
        res
    }

    pub fn vote(&mut self, caller: u8, id: ProposalId) -> Result<()> {
        let now = self.tick();
        let res = self.registry.vote(id, caller, now);
        match (&res, self.model.get_mut(&id)) {
            (Ok(()), Some(voters)) => {
                assert!(!voters.contains(&caller), "accepted a second vote");
                voters.push(caller);
            }
            (Ok(()), None) => panic!("accepted a vote on a missing proposal {}", id),
            (Err(Error::AlreadyVoted(_)), Some(voters)) => assert!(voters.contains(&caller)),
            (Err(Error::ProposalDoesNotExist(_)), None) => (),
            (Err(e), _) => panic!("unexpected rejection: {}", e),
        }
        if let Err(e) = &res {
            self.rejected.push(e.to_string());
        }
        res
    }

    /// Replaces the registry with one restored from its own snapshot.
    pub fn reload(&mut self) -> Result<()> {
        let bytes = self.registry.snapshot()?;
        self.registry = Registry::restore(&bytes)?;
        Ok(())
    }

    pub fn check_invariants(&self) -> eyre::Result<()> {
        let proposals = self.registry.all_proposals();
        ensure!(
            proposals.len() as u64 == self.registry.proposal_count(),
            "count disagrees with listing"
        );
        ensure!(proposals.len() == self.model.len(), "lost or invented a proposal");

        let mut total_votes = 0;
        for (index, p) in proposals.iter().enumerate() {
            ensure!(p.id == index as u64, "gap in ids at {}", index);
            ensure!(
                !p.title.is_empty() && p.title.len() <= MAX_TITLE_LEN,
                "bad title stored"
            );
            ensure!(
                !p.description.is_empty() && p.description.len() <= MAX_DESCRIPTION_LEN,
                "bad description stored"
            );

            let voters = self.registry.proposal_voters(p.id)?;
            ensure!(
                p.vote_count == voters.len() as u64,
                "proposal {} counts {} but holds {}",
                p.id,
                p.vote_count,
                voters.len()
            );
            ensure!(
                BTreeSet::from_iter(voters.iter()).len() == voters.len(),
                "duplicate voter on proposal {}",
                p.id
            );
            ensure!(
                Some(&voters) == self.model.get(&p.id),
                "voters of {} differ from model",
                p.id
            );
            for voter in voters.iter() {
                ensure!(self.registry.has_voted(p.id, voter), "missing membership");
            }
            total_votes += voters.len();
        }

        let events = self.registry.events();
        ensure!(
            events.len() == proposals.len() + total_votes,
            "event log out of step with state"
        );
        let created = events
            .iter()
            .filter(|e| matches!(e, Event::ProposalCreated { .. }))
            .count();
        ensure!(created == proposals.len(), "missing creation events");

        match self.registry.winning_proposal() {
            Ok(winner) => {
                let expected = self
                    .model
                    .iter()
                    .map(|(id, voters)| (*id, voters.len() as u64))
                    .fold(None, |best: Option<(u64, u64)>, (id, n)| match best {
                        Some((_, best_n)) if best_n >= n => best,
                        _ => Some((id, n)),
                    })
                    .ok_or_else(|| eyre!("registry has a winner but model is empty"))?;
                ensure!(
                    (winner.id, winner.vote_count) == expected,
                    "winner {:?} != expected {:?}",
                    winner,
                    expected
                );
            }
            Err(Error::NoProposalsExist) => ensure!(self.model.is_empty(), "winner missing"),
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }
}
