//! Player persistence: the versioned record format, the storage contract
//! and the bridge that flushes dirty players without blocking the tick.

use crate::error::PersistenceError;
use crate::game::GameState;
use crate::items::{item_def, Inventory};
use crate::player::Player;
use crate::utils::get_timestamp;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use shared::{ClassId, ItemStack, PlayerId, Vec3, EQUIPMENT_SLOTS, INVENTORY_SLOTS};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Version written by this build.
pub const RECORD_VERSION: u32 = 2;

/// Everything about a character that survives a disconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub class: ClassId,
    pub level: u32,
    pub xp: u64,
    pub position: Vec3,
    pub alive: bool,
    pub hp: u32,
    pub resource: f32,
    pub inventory: Vec<Option<ItemStack>>,
    pub equipment: Vec<Option<String>>,
    pub currency: u64,
    pub saved_at: u64,
}

/// First stored layout, before equipment and currency existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecordV1 {
    pub id: PlayerId,
    pub class: ClassId,
    pub level: u32,
    pub xp: u64,
    pub position: Vec3,
    pub alive: bool,
    pub hp: u32,
    pub resource: f32,
    pub inventory: Vec<Option<ItemStack>>,
    pub saved_at: u64,
}

impl From<PlayerRecordV1> for PlayerRecord {
    fn from(v1: PlayerRecordV1) -> Self {
        Self {
            id: v1.id,
            class: v1.class,
            level: v1.level,
            xp: v1.xp,
            position: v1.position,
            alive: v1.alive,
            hp: v1.hp,
            resource: v1.resource,
            inventory: v1.inventory,
            equipment: vec![None; EQUIPMENT_SLOTS],
            currency: 0,
            saved_at: v1.saved_at,
        }
    }
}

/// Envelope stored by a [`PlayerStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPlayer {
    pub version: u32,
    pub payload: Vec<u8>,
}

impl PlayerRecord {
    pub fn from_player(player: &Player, saved_at: u64) -> Self {
        Self {
            id: player.id,
            class: player.class,
            level: player.level,
            xp: player.xp,
            position: player.position,
            alive: player.alive,
            hp: player.hp,
            resource: player.resource,
            inventory: player.inventory.slots().to_vec(),
            equipment: player.equipment.clone(),
            currency: player.currency,
            saved_at,
        }
    }

    /// Hydrates a live player. Unknown items are dropped and every number
    /// is clamped to the current tables.
    pub fn into_player(self) -> Player {
        let mut player = Player::new(self.id, self.class, self.position);
        player.level = self.level.clamp(1, shared::MAX_LEVEL);
        player.xp = if player.level >= shared::MAX_LEVEL { 0 } else { self.xp };
        player.equipment = (0..EQUIPMENT_SLOTS)
            .map(|i| {
                self.equipment
                    .get(i)
                    .cloned()
                    .flatten()
                    .filter(|name| item_def(name).is_some())
            })
            .collect();
        player.inventory = Inventory::from_slots(INVENTORY_SLOTS, self.inventory);
        player.currency = self.currency;
        player.recompute_stats();
        player.alive = self.alive;
        player.hp = self.hp.min(player.stats.max_hp);
        if player.alive && player.hp == 0 {
            player.hp = player.stats.max_hp;
        }
        if !player.alive {
            player.hp = 0;
            player.respawn_at = 0;
        }
        player.resource = if self.resource.is_finite() {
            self.resource.clamp(0.0, player.resource_max())
        } else {
            0.0
        };
        player.dirty = false;
        player
    }

    pub fn encode(&self) -> Result<Vec<u8>, PersistenceError> {
        let payload = bincode::serialize(self).map_err(PersistenceError::Encode)?;
        bincode::serialize(&StoredPlayer {
            version: RECORD_VERSION,
            payload,
        })
        .map_err(PersistenceError::Encode)
    }

    /// Decodes any supported version, migrating older payloads forward.
    pub fn decode(bytes: &[u8]) -> Result<Self, PersistenceError> {
        let stored: StoredPlayer = bincode::deserialize(bytes).map_err(PersistenceError::Decode)?;
        match stored.version {
            1 => {
                let v1: PlayerRecordV1 = bincode::deserialize(&stored.payload).map_err(PersistenceError::Decode)?;
                debug!("Migrating player {} record from version 1", v1.id);
                Ok(v1.into())
            }
            RECORD_VERSION => bincode::deserialize(&stored.payload).map_err(PersistenceError::Decode),
            other => Err(PersistenceError::UnsupportedVersion(other)),
        }
    }
}

/// Key-value storage for serialized player state.
pub trait PlayerStore: Send + Sync {
    fn load(&self, id: PlayerId) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn save(&self, id: PlayerId, blob: &[u8], saved_at: u64) -> Result<(), PersistenceError>;
}

/// In-process store. Writes can be made to fail for exercising retries.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<PlayerId, Vec<u8>>>,
    failing: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.blobs.lock().map_or(false, |b| b.contains_key(&id))
    }

    pub fn put_raw(&self, id: PlayerId, blob: Vec<u8>) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(id, blob);
        }
    }
}

impl PlayerStore for MemoryStore {
    fn load(&self, id: PlayerId) -> Result<Option<Vec<u8>>, PersistenceError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory store poisoned".into()))?;
        Ok(blobs.get(&id).cloned())
    }

    fn save(&self, id: PlayerId, blob: &[u8], _saved_at: u64) -> Result<(), PersistenceError> {
        if self.failing.lock().map_or(true, |f| *f) {
            return Err(PersistenceError::Unavailable("writes disabled".into()));
        }
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory store poisoned".into()))?;
        blobs.insert(id, blob.to_vec());
        Ok(())
    }
}

/// One file per player under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, id: PlayerId) -> PathBuf {
        self.dir.join(format!("player_{}.bin", id))
    }
}

impl PlayerStore for FileStore {
    fn load(&self, id: PlayerId) -> Result<Option<Vec<u8>>, PersistenceError> {
        match std::fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a temp file first so a crash never leaves a torn record.
    fn save(&self, id: PlayerId, blob: &[u8], _saved_at: u64) -> Result<(), PersistenceError> {
        let path = self.path_for(id);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Orders writes to the store. Every encoded record gets a generation when
/// it is taken from the world; a write older than the newest one already
/// stored for that player is skipped.
#[derive(Debug, Default)]
struct WriteLedger {
    next: AtomicU64,
    written: Mutex<HashMap<PlayerId, u64>>,
}

impl WriteLedger {
    fn next_generation(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns `Ok(false)` when a newer record was already stored.
    fn write(
        &self,
        store: &dyn PlayerStore,
        id: PlayerId,
        blob: &[u8],
        saved_at: u64,
        generation: u64,
    ) -> Result<bool, PersistenceError> {
        // held across the store call so two writes for one player never interleave
        let mut written = self
            .written
            .lock()
            .map_err(|_| PersistenceError::Unavailable("write ledger poisoned".into()))?;
        if written.get(&id).map_or(false, |&newest| newest > generation) {
            return Ok(false);
        }
        store.save(id, blob, saved_at)?;
        written.insert(id, generation);
        Ok(true)
    }
}

/// Moves player state between the live world and a [`PlayerStore`].
///
/// Periodic flushes run on the blocking pool; failed writes come back over
/// a channel and re-mark the player dirty on the tick thread. A background
/// write that finishes after a later synchronous save of the same player
/// is dropped, so a disconnect save is never overwritten by older state.
pub struct PersistenceBridge {
    store: Arc<dyn PlayerStore>,
    ledger: Arc<WriteLedger>,
    failures_tx: mpsc::UnboundedSender<PlayerId>,
    failures_rx: mpsc::UnboundedReceiver<PlayerId>,
}

impl PersistenceBridge {
    pub fn new(store: Arc<dyn PlayerStore>) -> Self {
        let (failures_tx, failures_rx) = mpsc::unbounded_channel();
        Self {
            store,
            ledger: Arc::new(WriteLedger::default()),
            failures_tx,
            failures_rx,
        }
    }

    /// Encodes every dirty player and clears its flag.
    pub fn collect_dirty(&self, game: &mut GameState) -> Vec<(PlayerId, Vec<u8>)> {
        let saved_at = get_timestamp();
        let mut batch = Vec::new();
        for player in game.players.iter_mut().filter(|p| p.dirty) {
            match PlayerRecord::from_player(player, saved_at).encode() {
                Ok(blob) => {
                    player.dirty = false;
                    batch.push((player.id, blob));
                }
                Err(e) => warn!("Could not encode player {}: {}", player.id, e),
            }
        }
        batch
    }

    /// Writes dirty players in the background. Returns `None` when nothing
    /// was dirty.
    pub fn flush_async(&self, game: &mut GameState) -> Option<JoinHandle<()>> {
        let batch = self.collect_dirty(game);
        if batch.is_empty() {
            return None;
        }
        debug!("Flushing {} dirty players", batch.len());
        let generation = self.ledger.next_generation();
        let store = Arc::clone(&self.store);
        let ledger = Arc::clone(&self.ledger);
        let failures = self.failures_tx.clone();
        let saved_at = get_timestamp();
        Some(tokio::task::spawn_blocking(move || {
            for (id, blob) in batch {
                match ledger.write(store.as_ref(), id, &blob, saved_at, generation) {
                    Ok(true) => {}
                    Ok(false) => debug!("Skipped stale background write of player {}", id),
                    Err(e) => {
                        warn!("Saving player {} failed, will retry: {}", id, e);
                        let _ = failures.send(id);
                    }
                }
            }
        }))
    }

    /// Re-marks players whose background write failed. Returns how many.
    pub fn apply_failures(&mut self, game: &mut GameState) -> usize {
        let mut count = 0;
        while let Ok(id) = self.failures_rx.try_recv() {
            if let Some(player) = game.players.get_mut(id) {
                player.dirty = true;
            }
            count += 1;
        }
        count
    }

    /// Saves one player on the calling thread. Waits for an in-flight
    /// background write of the same player and always lands after it.
    pub fn save_player(&self, player: &Player) -> Result<(), PersistenceError> {
        let saved_at = get_timestamp();
        let blob = PlayerRecord::from_player(player, saved_at).encode()?;
        let generation = self.ledger.next_generation();
        self.ledger
            .write(self.store.as_ref(), player.id, &blob, saved_at, generation)
            .map(|_| ())
    }

    /// Saves every live player on the calling thread, dirty or not.
    /// Returns the number of failed writes.
    pub fn flush_sync(&self, game: &mut GameState) -> usize {
        let mut failed = 0;
        for player in game.players.iter_mut() {
            match self.save_player(player) {
                Ok(()) => player.dirty = false,
                Err(e) => {
                    warn!("Final save of player {} failed: {}", player.id, e);
                    player.dirty = true;
                    failed += 1;
                }
            }
        }
        info!("Flushed {} players ({} failed)", game.players.len(), failed);
        failed
    }

    pub fn load_player(&self, id: PlayerId) -> Result<Option<Player>, PersistenceError> {
        let Some(bytes) = self.store.load(id)? else {
            return Ok(None);
        };
        let record = PlayerRecord::decode(&bytes)?;
        Ok(Some(record.into_player()))
    }
}
