//! Wire types exchanged between the transport layer and the simulation.

use crate::math::Vec3;
use crate::movement::KeyState;
use serde::{Deserialize, Serialize};

pub type PlayerId = u64;
pub type MobId = u32;
pub type NodeId = u32;
pub type CorpseId = u32;
pub type VendorId = u32;
pub type PartyId = u32;

/// Protocol version accepted by the server.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassId {
    Fighter,
    Guardian,
    Ranger,
    Mage,
    Priest,
}

impl ClassId {
    pub const ALL: [ClassId; 5] = [
        ClassId::Fighter,
        ClassId::Guardian,
        ClassId::Ranger,
        ClassId::Mage,
        ClassId::Priest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClassId::Fighter => "fighter",
            ClassId::Guardian => "guardian",
            ClassId::Ranger => "ranger",
            ClassId::Mage => "mage",
            ClassId::Priest => "priest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Mana,
    Rage,
    Energy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Mob,
    Player,
}

/// Reference to a live actor of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    Mob(MobId),
    Player(PlayerId),
}

impl TargetRef {
    pub fn kind(&self) -> TargetKind {
        match self {
            TargetRef::Mob(_) => TargetKind::Mob,
            TargetRef::Player(_) => TargetKind::Player,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Weapon,
    Offhand,
    Head,
    Chest,
    Legs,
    Feet,
    Material,
    Consumable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipSlot {
    Weapon,
    Offhand,
    Head,
    Chest,
    Legs,
    Feet,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 6] = [
        EquipSlot::Weapon,
        EquipSlot::Offhand,
        EquipSlot::Head,
        EquipSlot::Chest,
        EquipSlot::Legs,
        EquipSlot::Feet,
    ];

    pub fn index(&self) -> usize {
        match self {
            EquipSlot::Weapon => 0,
            EquipSlot::Offhand => 1,
            EquipSlot::Head => 2,
            EquipSlot::Chest => 3,
            EquipSlot::Legs => 4,
            EquipSlot::Feet => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<EquipSlot> {
        Self::ALL.get(index).copied()
    }

    /// The item kind that fits this slot.
    pub fn accepts(&self) -> ItemKind {
        match self {
            EquipSlot::Weapon => ItemKind::Weapon,
            EquipSlot::Offhand => ItemKind::Offhand,
            EquipSlot::Head => ItemKind::Head,
            EquipSlot::Chest => ItemKind::Chest,
            EquipSlot::Legs => ItemKind::Legs,
            EquipSlot::Feet => ItemKind::Feet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotType {
    Inventory,
    Equipment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatChannel {
    Say,
    Party,
}

/// Decoded player intent. Field ranges are validated before the intent
/// reaches the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    Input { keys: KeyState },
    MoveTarget { x: f32, y: f32, z: f32 },
    TargetSelect { target: Option<TargetRef> },
    Interact,
    Ability { slot: u8, placement: Option<(f32, f32)> },
    ClassSelect { class: ClassId },
    InventorySwap { from: u8, to: u8 },
    EquipSwap { from_type: SlotType, from_slot: u8, to_type: SlotType, to_slot: u8 },
    VendorSell { vendor: VendorId, slot: u8 },
    VendorBuy { vendor: VendorId, item: String, count: u32 },
    Chat { channel: ChatChannel, text: String },
    PartyInvite { player: PlayerId },
    PartyAccept,
    PartyLeave,
    Craft { recipe: String, count: u32 },
    Respawn,
}

impl Intent {
    /// Rejects malformed or out-of-range fields. Rejected intents are
    /// dropped silently.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Intent::MoveTarget { x, y, z } => x.is_finite() && y.is_finite() && z.is_finite(),
            Intent::Ability { slot, placement } => {
                *slot >= 1
                    && *slot <= 4
                    && placement.map_or(true, |(x, z)| x.is_finite() && z.is_finite())
            }
            Intent::VendorBuy { item, count, .. } => !item.is_empty() && *count >= 1 && *count <= 999,
            Intent::Chat { text, .. } => !text.trim().is_empty(),
            Intent::Craft { recipe, count } => !recipe.is_empty() && *count >= 1 && *count <= 99,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiStateTag {
    Idle,
    Wander,
    Chase,
    Dead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub position: Vec3,
    pub facing: Vec3,
    pub class: ClassId,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub alive: bool,
    pub resource: u32,
    pub resource_max: u32,
    pub target: Option<TargetRef>,
    pub casting: Option<u8>,
    pub party: Option<PartyId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobView {
    pub id: MobId,
    pub position: Vec3,
    pub mob_type: String,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub state: AiStateTag,
    pub target: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceView {
    pub id: NodeId,
    pub position: Vec3,
    pub kind: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpseView {
    pub id: CorpseId,
    pub owner: PlayerId,
    pub position: Vec3,
}

/// Public world state. `full == false` means only changed entities are
/// listed and removals are reported by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub time_ms: u64,
    pub full: bool,
    pub players: Vec<PlayerView>,
    pub mobs: Vec<MobView>,
    pub resources: Vec<ResourceView>,
    pub corpses: Vec<CorpseView>,
    pub removed_players: Vec<PlayerId>,
    pub removed_corpses: Vec<CorpseId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DerivedStats {
    pub strength: f32,
    pub agility: f32,
    pub intellect: f32,
    pub stamina: f32,
    pub defense: f32,
    pub max_hp: u32,
    pub accuracy: f32,
    pub evasion: f32,
    pub crit_chance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownView {
    pub slot: u8,
    pub remaining_ms: u64,
}

/// Per-connection state that is not broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateState {
    pub level: u32,
    pub xp: u64,
    pub xp_to_next: u64,
    pub currency: u64,
    pub resource_kind: ResourceKind,
    pub resource: u32,
    pub resource_max: u32,
    pub inventory: Vec<Option<ItemStack>>,
    pub equipment: Vec<Option<String>>,
    pub cooldowns: Vec<CooldownView>,
    pub global_cooldown_ms: u64,
    pub stats: DerivedStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectShape {
    Basic,
    Single,
    Cone,
    Nova,
    Placement,
    SelfCast,
}

/// Emitted once per resolved action for client effects only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualEvent {
    pub attacker: TargetRef,
    pub target: Option<TargetRef>,
    pub ability: String,
    pub shape: EffectShape,
    pub at: Option<Vec3>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    // Client -> server
    Connect {
        client_version: u32,
        player_id: PlayerId,
    },
    Intent {
        sequence: u32,
        intent: Intent,
    },
    Disconnect,

    // Server -> client
    Connected {
        client_id: u32,
        player_id: PlayerId,
    },
    Snapshot(WorldSnapshot),
    Private(PrivateState),
    ActionFailed {
        slot: Option<u8>,
        reason: String,
    },
    Visual(VisualEvent),
    Chat {
        from: PlayerId,
        channel: ChatChannel,
        text: String,
    },
    Disconnected {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_validation() {
        assert!(Intent::Ability { slot: 1, placement: None }.is_well_formed());
        assert!(!Intent::Ability { slot: 0, placement: None }.is_well_formed());
        assert!(!Intent::Ability { slot: 2, placement: Some((f32::NAN, 1.0)) }.is_well_formed());
        assert!(!Intent::MoveTarget { x: f32::INFINITY, y: 0.0, z: 0.0 }.is_well_formed());
        assert!(!Intent::Chat { channel: ChatChannel::Say, text: "   ".into() }.is_well_formed());
        assert!(!Intent::VendorBuy { vendor: 1, item: "bandage".into(), count: 0 }.is_well_formed());
        assert!(Intent::Respawn.is_well_formed());
    }

    #[test]
    fn test_equip_slot_index_roundtrip() {
        for slot in EquipSlot::ALL {
            assert_eq!(EquipSlot::from_index(slot.index()), Some(slot));
        }
        assert_eq!(EquipSlot::from_index(6), None);
    }

    #[test]
    fn test_packet_serialization_intent() {
        let packet = Packet::Intent {
            sequence: 7,
            intent: Intent::Ability {
                slot: 3,
                placement: Some((10.0, 12.5)),
            },
        };
        let bytes = bincode::serialize(&packet).unwrap();
        let decoded: Packet = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_malformed_packet_is_rejected() {
        let bytes = bincode::serialize(&Packet::Connect {
            client_version: PROTOCOL_VERSION,
            player_id: 9,
        })
        .unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(bincode::deserialize::<Packet>(truncated).is_err());
        assert!(bincode::deserialize::<Packet>(&[]).is_err());
    }
}
