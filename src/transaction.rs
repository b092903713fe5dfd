use blsttc::{PublicKey, SecretKey, Signature};
use core::fmt::Debug;
use log::debug;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

use crate::{Error, ProposalId, Registry, Result, Timestamp};

/// A state changing call, as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    CreateProposal { title: String, description: String },
    Vote { proposal_id: ProposalId },
}

impl Call {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self)?)
    }
}

/// A [`Call`] together with the key of its caller and a signature over it.
/// The caller identity the registry records is the signing key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub call: Call,
    pub caller: PublicKey,
    pub sig: Signature,
}

impl Debug for SignedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}@{}", self.call, short_hex(&self.caller))
    }
}

impl SignedTransaction {
    pub fn validate_signature(&self) -> Result<()> {
        if self.caller.verify(&self.sig, &self.call.to_bytes()?) {
            Ok(())
        } else {
            Err(Error::InvalidSignature)
        }
    }
}

fn short_hex(key: &PublicKey) -> String {
    let mut hex = hex::encode(key.to_bytes());
    hex.truncate(8);
    hex
}

/// Holds a caller's secret key and signs calls on their behalf.
pub struct Signer {
    secret_key: SecretKey,
}

impl Signer {
    pub fn from(secret_key: SecretKey) -> Self {
        Signer { secret_key }
    }

    pub fn random(mut rng: impl Rng + CryptoRng) -> Self {
        Signer {
            secret_key: rng.gen(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret_key.public_key()
    }

    pub fn sign(&self, call: Call) -> Result<SignedTransaction> {
        Ok(SignedTransaction {
            sig: self.secret_key.sign(&call.to_bytes()?),
            caller: self.public_key(),
            call,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    ProposalCreated(ProposalId),
    VoteCast(ProposalId),
}

impl Registry<PublicKey> {
    /// Authenticates the caller and applies the call on their behalf.
    pub fn submit(&self, tx: &SignedTransaction, now: Timestamp) -> Result<Receipt> {
        if let Err(e) = tx.validate_signature() {
            debug!("[REG] dropping {:?}: {}", tx, e);
            return Err(e);
        }

        match &tx.call {
            Call::CreateProposal { title, description } => self
                .create_proposal(title.clone(), description.clone(), tx.caller, now)
                .map(Receipt::ProposalCreated),
            Call::Vote { proposal_id } => self
                .vote(*proposal_id, tx.caller, now)
                .map(|()| Receipt::VoteCast(*proposal_id)),
        }
    }
}
