use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, TryLockError};
use std::thread::{self, ThreadId};

use core::fmt::Debug;
use log::{debug, info};
use serde::de::DeserializeOwned;

use crate::{
    Error, Event, EventSink, Ledger, Name, Proposal, ProposalId, Result, Timestamp, Vote, Winner,
};

/// Shared handle to a [`Ledger`].
///
/// Mutations are serialized: one writer at a time, and readers only ever see
/// fully committed calls.
///
/// Committed events are queued while the writer slot is held and delivered
/// to sinks after it is released, in commit order, by whichever thread holds
/// the dispatch slot. A sink that calls `create_proposal` or `vote` on its own
/// thread is refused with [`Error::ReentrantCall`]. A mutation a sink hands to
/// another thread commits normally; its event is queued and delivered once
/// the current sink returns.
pub struct Registry<T: Name> {
    ledger: RwLock<Ledger<T>>,
    writer: Mutex<()>,
    active_writer: Mutex<Option<ThreadId>>,
    pending: Mutex<VecDeque<Event<T>>>,
    dispatch: Mutex<()>,
    active_dispatcher: Mutex<Option<ThreadId>>,
    sinks: RwLock<Vec<Arc<dyn EventSink<T>>>>,
}

struct WriteGuard<'a, T: Name> {
    registry: &'a Registry<T>,
    _serial: MutexGuard<'a, ()>,
}

impl<'a, T: Name> Drop for WriteGuard<'a, T> {
    fn drop(&mut self) {
        *lock(&self.registry.active_writer) = None;
    }
}

struct DispatchGuard<'a, T: Name> {
    registry: &'a Registry<T>,
    _serial: MutexGuard<'a, ()>,
}

impl<'a, T: Name> Drop for DispatchGuard<'a, T> {
    fn drop(&mut self) {
        *lock(&self.registry.active_dispatcher) = None;
    }
}

// Every mutation validates before it writes, so state behind a poisoned lock
// is still a committed state.
fn lock<M>(m: &Mutex<M>) -> MutexGuard<'_, M> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Name> Default for Registry<T> {
    fn default() -> Self {
        Self::from(Ledger::default())
    }
}

impl<T: Name> From<Ledger<T>> for Registry<T> {
    fn from(ledger: Ledger<T>) -> Self {
        Registry {
            ledger: RwLock::new(ledger),
            writer: Mutex::new(()),
            active_writer: Mutex::new(None),
            pending: Mutex::new(VecDeque::new()),
            dispatch: Mutex::new(()),
            active_dispatcher: Mutex::new(None),
            sinks: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Name> Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("ledger", &*self.read())
            .finish()
    }
}

impl<T: Name> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a registry from [`Registry::snapshot`] output.
    pub fn restore(bytes: &[u8]) -> Result<Self>
    where
        T: DeserializeOwned,
    {
        let ledger = Ledger::from_bytes(bytes)?;
        info!(
            "[REG] restored {} proposals, {} events",
            ledger.proposal_count(),
            ledger.events().len()
        );
        Ok(Self::from(ledger))
    }

    pub fn snapshot(&self) -> Result<Vec<u8>> {
        self.read().to_bytes()
    }

    pub fn subscribe<S: EventSink<T> + 'static>(&self, sink: S) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(sink));
    }

    pub fn create_proposal(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        caller: T,
        now: Timestamp,
    ) -> Result<ProposalId> {
        let (title, description) = (title.into(), description.into());
        let event = self.commit("create_proposal", |ledger| {
            ledger.create_proposal(title, description, caller, now)
        })?;
        Ok(event.proposal_id())
    }

    pub fn vote(&self, proposal_id: ProposalId, caller: T, now: Timestamp) -> Result<()> {
        self.commit("vote", |ledger| ledger.vote(proposal_id, caller, now))?;
        Ok(())
    }

    pub fn proposal_count(&self) -> u64 {
        self.read().proposal_count()
    }

    pub fn proposal(&self, id: ProposalId) -> Result<Proposal<T>> {
        self.read().proposal(id).cloned()
    }

    pub fn all_proposals(&self) -> Vec<Proposal<T>> {
        self.read().all_proposals()
    }

    pub fn proposals(&self, start: u64, end: u64) -> Result<Vec<Proposal<T>>> {
        self.read().proposals(start, end)
    }

    pub fn proposal_voters(&self, id: ProposalId) -> Result<Vec<T>> {
        self.read().voters(id)
    }

    pub fn proposal_votes(&self, id: ProposalId) -> Result<Vec<Vote<T>>> {
        self.read().votes(id).map(<[_]>::to_vec)
    }

    pub fn has_voted(&self, id: ProposalId, voter: &T) -> bool {
        self.read().has_voted(id, voter)
    }

    pub fn winning_proposal(&self) -> Result<Winner> {
        self.read().winning_proposal()
    }

    pub fn events(&self) -> Vec<Event<T>> {
        self.read().events().to_vec()
    }

    fn read(&self) -> RwLockReadGuard<'_, Ledger<T>> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_write(&self) -> Result<WriteGuard<'_, T>> {
        let me = Some(thread::current().id());
        if *lock(&self.active_writer) == me || *lock(&self.active_dispatcher) == me {
            return Err(Error::ReentrantCall);
        }

        let serial = lock(&self.writer);
        *lock(&self.active_writer) = me;

        Ok(WriteGuard {
            registry: self,
            _serial: serial,
        })
    }

    fn commit(
        &self,
        op: &str,
        mutation: impl FnOnce(&mut Ledger<T>) -> Result<Event<T>>,
    ) -> Result<Event<T>> {
        let result = {
            let _guard = self.begin_write().map_err(|e| {
                debug!("[REG] refused reentrant {}", op);
                e
            })?;

            let result = {
                let mut ledger = self.ledger.write().unwrap_or_else(PoisonError::into_inner);
                mutation(&mut ledger)
            };
            if let Ok(event) = &result {
                // queued under the writer slot, so queue order is commit order
                lock(&self.pending).push_back(event.clone());
            }
            result
        };

        match result {
            Ok(event) => {
                info!("[REG] {} committed {:?}", op, event);
                self.dispatch_pending();
                Ok(event)
            }
            Err(e) => {
                debug!("[REG] {} rejected: {}", op, e);
                Err(e)
            }
        }
    }

    fn begin_dispatch(&self) -> Option<DispatchGuard<'_, T>> {
        let serial = match self.dispatch.try_lock() {
            Ok(serial) => serial,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            // the thread holding the slot drains our event too
            Err(TryLockError::WouldBlock) => return None,
        };
        *lock(&self.active_dispatcher) = Some(thread::current().id());

        Some(DispatchGuard {
            registry: self,
            _serial: serial,
        })
    }

    fn dispatch_pending(&self) {
        loop {
            let guard = match self.begin_dispatch() {
                Some(guard) => guard,
                None => return,
            };

            loop {
                let next = lock(&self.pending).pop_front();
                match next {
                    Some(event) => self.notify(&event),
                    None => break,
                }
            }
            drop(guard);

            // an event queued after our last pop but before the slot was
            // released has no other thread to deliver it
            if lock(&self.pending).is_empty() {
                return;
            }
        }
    }

    fn notify(&self, event: &Event<T>) {
        let sinks = self
            .sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for sink in sinks {
            sink.on_event(self, event);
        }
    }
}
