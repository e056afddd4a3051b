//! Party membership, owned by the game state.

use crate::error::ActionError;
use log::info;
use shared::{PartyId, PlayerId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Party {
    pub id: PartyId,
    pub leader: PlayerId,
    /// In join order.
    pub members: Vec<PlayerId>,
}

#[derive(Debug, Clone)]
pub struct PartyManager {
    parties: HashMap<PartyId, Party>,
    membership: HashMap<PlayerId, PartyId>,
    /// invitee -> inviter
    invites: HashMap<PlayerId, PlayerId>,
    next_id: PartyId,
    max_size: usize,
}

impl PartyManager {
    pub fn new(max_size: usize) -> Self {
        Self {
            parties: HashMap::new(),
            membership: HashMap::new(),
            invites: HashMap::new(),
            next_id: 1,
            max_size: max_size.max(2),
        }
    }

    pub fn party_of(&self, player: PlayerId) -> Option<PartyId> {
        self.membership.get(&player).copied()
    }

    pub fn members(&self, party: PartyId) -> &[PlayerId] {
        self.parties.get(&party).map_or(&[][..], |p| p.members.as_slice())
    }

    /// Party members of `player`, including `player`. Solo players get
    /// just themselves.
    pub fn group_of(&self, player: PlayerId) -> Vec<PlayerId> {
        match self.party_of(player) {
            Some(party) => self.members(party).to_vec(),
            None => vec![player],
        }
    }

    pub fn same_party(&self, a: PlayerId, b: PlayerId) -> bool {
        match (self.party_of(a), self.party_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn invite(&mut self, from: PlayerId, to: PlayerId) -> Result<(), ActionError> {
        if from == to {
            return Err(ActionError::InvalidTarget);
        }
        if self.party_of(to).is_some() {
            return Err(ActionError::AlreadyInParty);
        }
        if let Some(party) = self.party_of(from) {
            if self.members(party).len() >= self.max_size {
                return Err(ActionError::PartyFull);
            }
        }
        self.invites.insert(to, from);
        Ok(())
    }

    /// Accepts the pending invite; forms a new party if the inviter had none.
    pub fn accept(&mut self, player: PlayerId) -> Result<PartyId, ActionError> {
        if self.party_of(player).is_some() {
            self.invites.remove(&player);
            return Err(ActionError::AlreadyInParty);
        }
        let inviter = self.invites.remove(&player).ok_or(ActionError::NoInvite)?;
        let party_id = match self.party_of(inviter) {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id = self.next_id.wrapping_add(1).max(1);
                self.parties.insert(
                    id,
                    Party {
                        id,
                        leader: inviter,
                        members: vec![inviter],
                    },
                );
                self.membership.insert(inviter, id);
                id
            }
        };
        let party = self.parties.get_mut(&party_id).ok_or(ActionError::NoInvite)?;
        if party.members.len() >= self.max_size {
            return Err(ActionError::PartyFull);
        }
        party.members.push(player);
        self.membership.insert(player, party_id);
        info!("Player {} joined party {}", player, party_id);
        Ok(party_id)
    }

    /// Leaves the current party; a party left with one member disbands.
    pub fn leave(&mut self, player: PlayerId) -> Result<(), ActionError> {
        let party_id = self.membership.remove(&player).ok_or(ActionError::NotInParty)?;
        let Some(party) = self.parties.get_mut(&party_id) else {
            return Ok(());
        };
        party.members.retain(|m| *m != player);
        if party.leader == player {
            if let Some(first) = party.members.first() {
                party.leader = *first;
            }
        }
        if party.members.len() <= 1 {
            for m in &party.members {
                self.membership.remove(m);
            }
            self.parties.remove(&party_id);
            info!("Party {} disbanded", party_id);
        }
        Ok(())
    }

    /// Drops every trace of a disconnecting player.
    pub fn forget(&mut self, player: PlayerId) {
        let _ = self.leave(player);
        self.invites.remove(&player);
        self.invites.retain(|_, from| *from != player);
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }
}
