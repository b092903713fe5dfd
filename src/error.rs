use thiserror::Error;

use crate::ProposalId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Title too long: {len} bytes exceeds the limit of {max}")]
    TitleTooLong { len: usize, max: usize },
    #[error("Description cannot be empty")]
    EmptyDescription,
    #[error("Description too long: {len} bytes exceeds the limit of {max}")]
    DescriptionTooLong { len: usize, max: usize },
    #[error("Proposal {0} does not exist")]
    ProposalDoesNotExist(ProposalId),
    #[error("No proposals exist")]
    NoProposalsExist,
    #[error("Already voted on proposal {0}")]
    AlreadyVoted(ProposalId),
    #[error("Invalid range: start {start} > end {end}")]
    InvalidRange { start: u64, end: u64 },
    #[error("Start index {start} out of bounds (proposal count: {count})")]
    StartOutOfBounds { start: u64, count: u64 },
    #[error("End index {end} out of bounds (proposal count: {count})")]
    EndOutOfBounds { end: u64, count: u64 },
    #[error("A state changing call is already in progress on this thread")]
    ReentrantCall,
    #[error("Snapshot violates a ledger invariant: {0}")]
    CorruptSnapshot(String),
    #[error("Failed to encode with bincode")]
    Encoding(#[from] bincode::Error),

    #[cfg(feature = "blsttc")]
    #[error("Transaction signature is not valid")]
    InvalidSignature,
}

/// Coarse grouping of [`Error`] variants, for callers that only need to know
/// which class of precondition was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Range,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyTitle
            | Error::TitleTooLong { .. }
            | Error::EmptyDescription
            | Error::DescriptionTooLong { .. } => ErrorKind::Validation,
            Error::ProposalDoesNotExist(_) | Error::NoProposalsExist => ErrorKind::NotFound,
            Error::AlreadyVoted(_) => ErrorKind::Conflict,
            Error::InvalidRange { .. }
            | Error::StartOutOfBounds { .. }
            | Error::EndOutOfBounds { .. } => ErrorKind::Range,
            #[cfg(feature = "blsttc")]
            Error::InvalidSignature => ErrorKind::Validation,
            Error::ReentrantCall | Error::CorruptSnapshot(_) | Error::Encoding(_) => {
                ErrorKind::Internal
            }
        }
    }
}
