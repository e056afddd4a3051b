//! Connected sessions and their intent buffers.
//!
//! The transport layer writes intents here as packets arrive; the tick loop
//! drains them once per tick. Each session carries a monotonically
//! increasing sequence number so duplicated or reordered packets are
//! discarded. Movement and target selection are last-write-wins; every
//! other intent is queued in arrival order up to a fixed depth.

use log::{debug, info};
use shared::{Intent, PlayerId};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Queued (non-movement) intents kept per session between ticks.
pub const MAX_QUEUED_INTENTS: usize = 32;

/// Why an intent was not buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentRejection {
    UnknownSession,
    Stale,
    Malformed,
    QueueFull,
}

/// One connected client bound to a player record.
#[derive(Debug)]
pub struct Session {
    pub id: u32,
    pub addr: SocketAddr,
    pub player_id: PlayerId,
    pub last_seen: Instant,
    /// Highest intent sequence accepted so far.
    pub last_sequence: u32,
    movement: Option<Intent>,
    target: Option<Intent>,
    queued: VecDeque<Intent>,
}

impl Session {
    pub fn new(id: u32, addr: SocketAddr, player_id: PlayerId) -> Self {
        Self {
            id,
            addr,
            player_id,
            last_seen: Instant::now(),
            last_sequence: 0,
            movement: None,
            target: None,
            queued: VecDeque::new(),
        }
    }

    /// Buffers an intent if its sequence is newer than anything seen.
    pub fn push_intent(&mut self, sequence: u32, intent: Intent) -> Result<(), IntentRejection> {
        self.last_seen = Instant::now();
        if sequence <= self.last_sequence {
            return Err(IntentRejection::Stale);
        }
        if !intent.is_well_formed() {
            // still consumes the sequence so a replay can't retry it
            self.last_sequence = sequence;
            return Err(IntentRejection::Malformed);
        }
        match intent {
            Intent::Input { .. } | Intent::MoveTarget { .. } => self.movement = Some(intent),
            Intent::TargetSelect { .. } => self.target = Some(intent),
            other => {
                if self.queued.len() >= MAX_QUEUED_INTENTS {
                    return Err(IntentRejection::QueueFull);
                }
                self.queued.push_back(other);
            }
        }
        self.last_sequence = sequence;
        Ok(())
    }

    /// Everything buffered since the last drain: movement, then target,
    /// then queued actions in arrival order.
    pub fn take_intents(&mut self) -> Vec<Intent> {
        let mut out = Vec::with_capacity(self.queued.len() + 2);
        out.extend(self.movement.take());
        out.extend(self.target.take());
        out.extend(self.queued.drain(..));
        out
    }

    pub fn pending(&self) -> usize {
        self.queued.len() + usize::from(self.movement.is_some()) + usize::from(self.target.is_some())
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// All live sessions, owned by the server instance.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<u32, Session>,
    next_session_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl SessionRegistry {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Opens a session for `player_id`. Returns `None` at capacity.
    pub fn add_session(&mut self, addr: SocketAddr, player_id: PlayerId) -> Option<u32> {
        if self.sessions.len() >= self.max_clients {
            return None;
        }
        let id = self.next_session_id;
        self.next_session_id = self.next_session_id.wrapping_add(1).max(1);
        info!("Session {} opened from {} for player {}", id, addr, player_id);
        self.sessions.insert(id, Session::new(id, addr, player_id));
        Some(id)
    }

    pub fn remove_session(&mut self, id: u32) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        info!("Session {} closed (player {})", id, session.player_id);
        Some(session)
    }

    pub fn get(&self, id: u32) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.sessions.values().find(|s| s.addr == addr).map(|s| s.id)
    }

    pub fn find_by_player(&self, player_id: PlayerId) -> Option<u32> {
        self.sessions
            .values()
            .find(|s| s.player_id == player_id)
            .map(|s| s.id)
    }

    pub fn push_intent(&mut self, id: u32, sequence: u32, intent: Intent) -> Result<(), IntentRejection> {
        let session = self.sessions.get_mut(&id).ok_or(IntentRejection::UnknownSession)?;
        let result = session.push_intent(sequence, intent);
        if let Err(reason) = result {
            debug!("Session {} dropped intent #{}: {:?}", id, sequence, reason);
        }
        result
    }

    pub fn touch(&mut self, id: u32) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.touch();
        }
    }

    /// Takes every buffered intent, ordered by session id so a tick is
    /// reproducible for the same arrivals.
    pub fn drain_intents(&mut self) -> Vec<(PlayerId, Intent)> {
        let mut ids: Vec<u32> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        let mut out = Vec::new();
        for id in ids {
            if let Some(session) = self.sessions.get_mut(&id) {
                let player = session.player_id;
                out.extend(session.take_intents().into_iter().map(|i| (player, i)));
            }
        }
        out
    }

    /// Removes sessions that have been silent for longer than the timeout.
    pub fn check_timeouts(&mut self) -> Vec<Session> {
        let timeout = self.timeout;
        let expired: Vec<u32> = self
            .sessions
            .values()
            .filter(|s| s.is_timed_out(timeout))
            .map(|s| s.id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.remove_session(id))
            .collect()
    }

    /// `(session, player, addr)` for every live session.
    pub fn recipients(&self) -> Vec<(u32, PlayerId, SocketAddr)> {
        self.sessions
            .values()
            .map(|s| (s.id, s.player_id, s.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{KeyState, TargetRef};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(2, Duration::from_secs(5))
    }

    fn walk_left() -> Intent {
        Intent::Input {
            keys: KeyState {
                left: true,
                ..KeyState::default()
            },
        }
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut reg = registry();
        assert_eq!(reg.add_session(addr(1), 10), Some(1));
        assert_eq!(reg.add_session(addr(2), 11), Some(2));
        assert_eq!(reg.add_session(addr(3), 12), None);
        assert_eq!(reg.len(), 2);
        assert!(reg.remove_session(1).is_some());
        assert!(reg.remove_session(1).is_none());
        assert_eq!(reg.add_session(addr(3), 12), Some(3));
    }

    #[test]
    fn test_lookup_by_addr_and_player() {
        let mut reg = registry();
        let id = reg.add_session(addr(1), 10).unwrap();
        assert_eq!(reg.find_by_addr(addr(1)), Some(id));
        assert_eq!(reg.find_by_player(10), Some(id));
        assert_eq!(reg.find_by_addr(addr(9)), None);
        assert_eq!(reg.find_by_player(99), None);
    }

    #[test]
    fn test_stale_and_duplicate_sequences_are_dropped() {
        let mut reg = registry();
        let id = reg.add_session(addr(1), 10).unwrap();
        assert_eq!(reg.push_intent(id, 5, Intent::Interact), Ok(()));
        assert_eq!(reg.push_intent(id, 5, Intent::Interact), Err(IntentRejection::Stale));
        assert_eq!(reg.push_intent(id, 3, Intent::Respawn), Err(IntentRejection::Stale));
        assert_eq!(reg.drain_intents(), vec![(10, Intent::Interact)]);
    }

    #[test]
    fn test_malformed_intent_consumes_sequence() {
        let mut reg = registry();
        let id = reg.add_session(addr(1), 10).unwrap();
        let bad = Intent::Ability {
            slot: 9,
            placement: None,
        };
        assert_eq!(reg.push_intent(id, 1, bad), Err(IntentRejection::Malformed));
        assert_eq!(reg.get(id).unwrap().last_sequence, 1);
        assert!(reg.drain_intents().is_empty());
    }

    #[test]
    fn test_movement_is_last_write_wins() {
        let mut reg = registry();
        let id = reg.add_session(addr(1), 10).unwrap();
        reg.push_intent(id, 1, walk_left()).unwrap();
        reg.push_intent(id, 2, Intent::Ability { slot: 1, placement: None }).unwrap();
        reg.push_intent(id, 3, Intent::MoveTarget { x: 1.0, y: 0.0, z: 2.0 }).unwrap();
        reg.push_intent(id, 4, Intent::TargetSelect { target: Some(TargetRef::Mob(3)) }).unwrap();
        reg.push_intent(id, 5, Intent::TargetSelect { target: None }).unwrap();
        assert_eq!(reg.get(id).unwrap().pending(), 3);

        let drained = reg.drain_intents();
        assert_eq!(
            drained,
            vec![
                (10, Intent::MoveTarget { x: 1.0, y: 0.0, z: 2.0 }),
                (10, Intent::TargetSelect { target: None }),
                (10, Intent::Ability { slot: 1, placement: None }),
            ]
        );
        assert!(reg.drain_intents().is_empty());
    }

    #[test]
    fn test_queue_is_bounded() {
        let mut reg = registry();
        let id = reg.add_session(addr(1), 10).unwrap();
        for seq in 1..=MAX_QUEUED_INTENTS as u32 {
            reg.push_intent(id, seq, Intent::Interact).unwrap();
        }
        let overflow = MAX_QUEUED_INTENTS as u32 + 1;
        assert_eq!(reg.push_intent(id, overflow, Intent::Interact), Err(IntentRejection::QueueFull));
        // movement still lands when the queue is full
        assert_eq!(reg.push_intent(id, overflow + 1, walk_left()), Ok(()));
    }

    #[test]
    fn test_drain_orders_sessions() {
        let mut reg = registry();
        let a = reg.add_session(addr(1), 20).unwrap();
        let b = reg.add_session(addr(2), 10).unwrap();
        reg.push_intent(b, 1, Intent::Respawn).unwrap();
        reg.push_intent(a, 1, Intent::Interact).unwrap();
        assert_eq!(reg.drain_intents(), vec![(20, Intent::Interact), (10, Intent::Respawn)]);
    }

    #[test]
    fn test_timeouts_remove_sessions() {
        let mut reg = SessionRegistry::new(4, Duration::from_millis(100));
        let id = reg.add_session(addr(1), 10).unwrap();
        reg.add_session(addr(2), 11).unwrap();
        if let Some(s) = reg.sessions.get_mut(&id) {
            s.last_seen = Instant::now() - Duration::from_secs(1);
        }
        let expired = reg.check_timeouts();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].player_id, 10);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_unknown_session() {
        let mut reg = registry();
        assert_eq!(reg.push_intent(42, 1, Intent::Interact), Err(IntentRejection::UnknownSession));
    }
}
