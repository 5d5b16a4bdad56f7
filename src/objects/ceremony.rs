use crate::objects::Identity;

use serde::{Deserialize, Serialize};

/// The lifecycle state of a participant, as reported by the ceremony state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantState {
    Waiting,
    Running,
    Complete,
    Invalidated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub address: Identity,
    pub state: ParticipantState,
}

impl ParticipantRecord {
    #[inline]
    pub fn new(address: Identity, state: ParticipantState) -> Self {
        Self { address, state }
    }

    /// Returns `true` if the participant finished and its contribution was verified.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state == ParticipantState::Complete
    }
}

///
/// A snapshot of the ceremony, owned by the ceremony state store.
///
/// Participants are listed in submission order. Fields of the snapshot that
/// the coordinator does not use are ignored on deserialization.
///
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyState {
    #[serde(default)]
    pub participants: Vec<ParticipantRecord>,
}

impl CeremonyState {
    #[inline]
    pub fn new(participants: Vec<ParticipantRecord>) -> Self {
        Self { participants }
    }

    /// Returns the most recently submitted participant in the `COMPLETE` state, if any.
    pub fn last_completed(&self) -> Option<&ParticipantRecord> {
        self.participants.iter().rev().find(|participant| participant.is_complete())
    }
}
