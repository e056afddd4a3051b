//! Error types surfaced by the simulation and the persistence bridge.

use thiserror::Error;

/// A valid request that the current game state does not allow.
///
/// Rejections never mutate state and are reported only to the acting
/// client, as [`ActionError::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("no ability in that slot for this class")]
    UnknownAbility,
    #[error("actor is dead")]
    Dead,
    #[error("actor is stunned")]
    Stunned,
    #[error("actor is silenced")]
    Silenced,
    #[error("ability is on cooldown")]
    Cooldown,
    #[error("global cooldown active")]
    GlobalCooldown,
    #[error("not enough resource")]
    InsufficientResource,
    #[error("ability needs a placement point")]
    NoPlacement,
    #[error("out of range")]
    OutOfRange,
    #[error("no target")]
    NoTarget,
    #[error("invalid target")]
    InvalidTarget,
    #[error("already casting")]
    Casting,
    #[error("cast interrupted")]
    Interrupted,
    #[error("inventory full")]
    InventoryFull,
    #[error("invalid slot")]
    InvalidSlot,
    #[error("not enough currency")]
    NotEnoughCurrency,
    #[error("no vendor in range")]
    NoVendor,
    #[error("item not sold here")]
    NotSold,
    #[error("unknown recipe")]
    UnknownRecipe,
    #[error("missing materials")]
    MissingMaterials,
    #[error("must be inside the base")]
    NotInBase,
    #[error("actor is not dead")]
    NotDead,
    #[error("respawn timer still running")]
    RespawnPending,
    #[error("nothing to interact with")]
    NothingToInteract,
    #[error("party is full")]
    PartyFull,
    #[error("already in a party")]
    AlreadyInParty,
    #[error("not in a party")]
    NotInParty,
    #[error("no pending invite")]
    NoInvite,
}

impl ActionError {
    /// Stable reason code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::UnknownAbility => "unknown_ability",
            ActionError::Dead => "dead",
            ActionError::Stunned => "stunned",
            ActionError::Silenced => "silenced",
            ActionError::Cooldown => "cooldown",
            ActionError::GlobalCooldown => "global_cooldown",
            ActionError::InsufficientResource => "insufficient_resource",
            ActionError::NoPlacement => "no_placement",
            ActionError::OutOfRange => "out_of_range",
            ActionError::NoTarget => "no_target",
            ActionError::InvalidTarget => "invalid_target",
            ActionError::Casting => "casting",
            ActionError::Interrupted => "interrupted",
            ActionError::InventoryFull => "inventory_full",
            ActionError::InvalidSlot => "invalid_slot",
            ActionError::NotEnoughCurrency => "not_enough_currency",
            ActionError::NoVendor => "no_vendor",
            ActionError::NotSold => "not_sold",
            ActionError::UnknownRecipe => "unknown_recipe",
            ActionError::MissingMaterials => "missing_materials",
            ActionError::NotInBase => "not_in_base",
            ActionError::NotDead => "not_dead",
            ActionError::RespawnPending => "respawn_pending",
            ActionError::NothingToInteract => "nothing_to_interact",
            ActionError::PartyFull => "party_full",
            ActionError::AlreadyInParty => "already_in_party",
            ActionError::NotInParty => "not_in_party",
            ActionError::NoInvite => "no_invite",
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode player state: {0}")]
    Encode(bincode::Error),
    #[error("failed to decode player state: {0}")]
    Decode(bincode::Error),
    #[error("stored version {0} is newer than supported")]
    UnsupportedVersion(u32),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}
