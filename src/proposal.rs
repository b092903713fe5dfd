use serde::{Deserialize, Serialize};

use crate::{Error, Name, ProposalId, Result, Timestamp};

/// Upper bound on a proposal title, in UTF-8 bytes.
pub const MAX_TITLE_LEN: usize = 200;
/// Upper bound on a proposal description, in UTF-8 bytes.
pub const MAX_DESCRIPTION_LEN: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal<T: Name> {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub creator: T,
    pub created_at: Timestamp,
    pub vote_count: u64,
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.is_empty() {
        Err(Error::EmptyTitle)
    } else if title.len() > MAX_TITLE_LEN {
        Err(Error::TitleTooLong {
            len: title.len(),
            max: MAX_TITLE_LEN,
        })
    } else {
        Ok(())
    }
}

pub fn validate_description(description: &str) -> Result<()> {
    if description.is_empty() {
        Err(Error::EmptyDescription)
    } else if description.len() > MAX_DESCRIPTION_LEN {
        Err(Error::DescriptionTooLong {
            len: description.len(),
            max: MAX_DESCRIPTION_LEN,
        })
    } else {
        Ok(())
    }
}
