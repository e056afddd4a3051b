//! Static ability definitions. Nothing here changes at runtime.

use shared::{ClassId, EffectShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbilityId {
    Cleave,
    Pummel,
    Charge,
    Whirlwind,
    ShieldSlam,
    Taunt,
    DefensiveStance,
    Thunderclap,
    QuickShot,
    AimedShot,
    Volley,
    HuntersMark,
    Fireball,
    FrostNova,
    Blink,
    ArcaneBarrier,
    Smite,
    Heal,
    Renew,
    Sanctuary,
}

/// Who an ability may be aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Targeting {
    /// Affects the caster only.
    Caster,
    /// Hostile mob or player, resolved from the current target.
    Enemy,
    /// Hostile mob only.
    EnemyMob,
    /// Self or a party member; falls back to self.
    Ally,
    /// Centred on the caster.
    AroundCaster,
    /// Centred on a supplied ground point.
    Ground,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Single,
    Cone { angle_deg: f32 },
    Nova { radius: f32 },
    Placement { radius: f32 },
    SelfOnly,
}

impl Shape {
    pub fn effect_shape(&self) -> EffectShape {
        match self {
            Shape::Single => EffectShape::Single,
            Shape::Cone { .. } => EffectShape::Cone,
            Shape::Nova { .. } => EffectShape::Nova,
            Shape::Placement { .. } => EffectShape::Placement,
            Shape::SelfOnly => EffectShape::SelfCast,
        }
    }
}

/// Derived stat an ability's magnitude scales with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    Strength,
    Agility,
    Intellect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ability {
    pub id: AbilityId,
    pub name: &'static str,
    pub class: ClassId,
    /// 1-based action bar slot.
    pub slot: u8,
    pub cost: f32,
    pub cooldown_ms: u64,
    pub gcd_exempt: bool,
    pub targeting: Targeting,
    /// Max distance to the target or placement point.
    pub range: f32,
    pub shape: Shape,
    pub base: f32,
    pub coefficient: f32,
    pub scaling: Scaling,
    /// Zero for instant abilities.
    pub cast_ms: u64,
    /// Fraction of `cost` returned when the ability kills something.
    pub refund_on_kill: f32,
    /// Client effect length.
    pub duration_ms: u64,
}

const BASE: Ability = Ability {
    id: AbilityId::Cleave,
    name: "",
    class: ClassId::Fighter,
    slot: 1,
    cost: 0.0,
    cooldown_ms: 0,
    gcd_exempt: false,
    targeting: Targeting::Enemy,
    range: 0.0,
    shape: Shape::Single,
    base: 0.0,
    coefficient: 0.0,
    scaling: Scaling::Strength,
    cast_ms: 0,
    refund_on_kill: 0.0,
    duration_ms: 300,
};

pub static ABILITIES: [Ability; 20] = [
    // fighter
    Ability {
        id: AbilityId::Cleave,
        name: "cleave",
        slot: 1,
        cost: 20.0,
        cooldown_ms: 6_000,
        targeting: Targeting::AroundCaster,
        range: 3.5,
        shape: Shape::Cone { angle_deg: 100.0 },
        base: 8.0,
        coefficient: 0.6,
        refund_on_kill: 0.5,
        ..BASE
    },
    Ability {
        id: AbilityId::Pummel,
        name: "pummel",
        slot: 2,
        cost: 10.0,
        cooldown_ms: 10_000,
        range: 3.0,
        base: 4.0,
        coefficient: 0.3,
        ..BASE
    },
    Ability {
        id: AbilityId::Charge,
        name: "charge",
        slot: 3,
        cooldown_ms: 12_000,
        gcd_exempt: true,
        range: 12.0,
        base: 3.0,
        coefficient: 0.2,
        duration_ms: 400,
        ..BASE
    },
    Ability {
        id: AbilityId::Whirlwind,
        name: "whirlwind",
        slot: 4,
        cost: 30.0,
        cooldown_ms: 8_000,
        targeting: Targeting::AroundCaster,
        shape: Shape::Nova { radius: 4.0 },
        base: 7.0,
        coefficient: 0.5,
        refund_on_kill: 0.5,
        duration_ms: 600,
        ..BASE
    },
    // guardian
    Ability {
        id: AbilityId::ShieldSlam,
        name: "shield_slam",
        class: ClassId::Guardian,
        slot: 1,
        cost: 15.0,
        cooldown_ms: 8_000,
        range: 3.0,
        base: 6.0,
        coefficient: 0.4,
        ..BASE
    },
    Ability {
        id: AbilityId::Taunt,
        name: "taunt",
        class: ClassId::Guardian,
        slot: 2,
        cooldown_ms: 8_000,
        gcd_exempt: true,
        targeting: Targeting::EnemyMob,
        range: 10.0,
        duration_ms: 4_000,
        ..BASE
    },
    Ability {
        id: AbilityId::DefensiveStance,
        name: "defensive_stance",
        class: ClassId::Guardian,
        slot: 3,
        cost: 10.0,
        cooldown_ms: 15_000,
        targeting: Targeting::Caster,
        shape: Shape::SelfOnly,
        duration_ms: 10_000,
        ..BASE
    },
    Ability {
        id: AbilityId::Thunderclap,
        name: "thunderclap",
        class: ClassId::Guardian,
        slot: 4,
        cost: 20.0,
        cooldown_ms: 10_000,
        targeting: Targeting::AroundCaster,
        shape: Shape::Nova { radius: 5.0 },
        base: 5.0,
        coefficient: 0.3,
        duration_ms: 500,
        ..BASE
    },
    // ranger
    Ability {
        id: AbilityId::QuickShot,
        name: "quick_shot",
        class: ClassId::Ranger,
        slot: 1,
        cost: 20.0,
        cooldown_ms: 3_000,
        range: 14.0,
        base: 6.0,
        coefficient: 0.5,
        scaling: Scaling::Agility,
        ..BASE
    },
    Ability {
        id: AbilityId::AimedShot,
        name: "aimed_shot",
        class: ClassId::Ranger,
        slot: 2,
        cost: 35.0,
        cooldown_ms: 10_000,
        range: 18.0,
        base: 15.0,
        coefficient: 1.0,
        scaling: Scaling::Agility,
        cast_ms: 1_500,
        ..BASE
    },
    Ability {
        id: AbilityId::Volley,
        name: "volley",
        class: ClassId::Ranger,
        slot: 3,
        cost: 40.0,
        cooldown_ms: 12_000,
        targeting: Targeting::Ground,
        range: 16.0,
        shape: Shape::Placement { radius: 4.0 },
        base: 5.0,
        coefficient: 0.4,
        scaling: Scaling::Agility,
        duration_ms: 800,
        ..BASE
    },
    Ability {
        id: AbilityId::HuntersMark,
        name: "hunters_mark",
        class: ClassId::Ranger,
        slot: 4,
        cost: 10.0,
        cooldown_ms: 15_000,
        gcd_exempt: true,
        range: 20.0,
        scaling: Scaling::Agility,
        duration_ms: 10_000,
        ..BASE
    },
    // mage
    Ability {
        id: AbilityId::Fireball,
        name: "fireball",
        class: ClassId::Mage,
        slot: 1,
        cost: 15.0,
        cooldown_ms: 2_500,
        range: 15.0,
        base: 10.0,
        coefficient: 0.8,
        scaling: Scaling::Intellect,
        ..BASE
    },
    Ability {
        id: AbilityId::FrostNova,
        name: "frost_nova",
        class: ClassId::Mage,
        slot: 2,
        cost: 20.0,
        cooldown_ms: 12_000,
        targeting: Targeting::AroundCaster,
        shape: Shape::Nova { radius: 6.0 },
        base: 4.0,
        coefficient: 0.3,
        scaling: Scaling::Intellect,
        duration_ms: 3_000,
        ..BASE
    },
    Ability {
        id: AbilityId::Blink,
        name: "blink",
        class: ClassId::Mage,
        slot: 3,
        cost: 15.0,
        cooldown_ms: 15_000,
        gcd_exempt: true,
        targeting: Targeting::Caster,
        range: 8.0,
        shape: Shape::SelfOnly,
        scaling: Scaling::Intellect,
        duration_ms: 200,
        ..BASE
    },
    Ability {
        id: AbilityId::ArcaneBarrier,
        name: "arcane_barrier",
        class: ClassId::Mage,
        slot: 4,
        cost: 25.0,
        cooldown_ms: 20_000,
        targeting: Targeting::Caster,
        shape: Shape::SelfOnly,
        base: 20.0,
        coefficient: 1.0,
        scaling: Scaling::Intellect,
        duration_ms: 10_000,
        ..BASE
    },
    // priest
    Ability {
        id: AbilityId::Smite,
        name: "smite",
        class: ClassId::Priest,
        slot: 1,
        cost: 10.0,
        cooldown_ms: 2_000,
        range: 14.0,
        base: 8.0,
        coefficient: 0.6,
        scaling: Scaling::Intellect,
        ..BASE
    },
    Ability {
        id: AbilityId::Heal,
        name: "heal",
        class: ClassId::Priest,
        slot: 2,
        cost: 20.0,
        cooldown_ms: 3_000,
        targeting: Targeting::Ally,
        range: 14.0,
        base: 15.0,
        coefficient: 1.0,
        scaling: Scaling::Intellect,
        ..BASE
    },
    Ability {
        id: AbilityId::Renew,
        name: "renew",
        class: ClassId::Priest,
        slot: 3,
        cost: 15.0,
        cooldown_ms: 6_000,
        targeting: Targeting::Ally,
        range: 14.0,
        base: 4.0,
        coefficient: 0.2,
        scaling: Scaling::Intellect,
        duration_ms: 5_000,
        ..BASE
    },
    Ability {
        id: AbilityId::Sanctuary,
        name: "sanctuary",
        class: ClassId::Priest,
        slot: 4,
        cost: 30.0,
        cooldown_ms: 20_000,
        targeting: Targeting::Ground,
        range: 14.0,
        shape: Shape::Placement { radius: 5.0 },
        base: 10.0,
        coefficient: 0.5,
        scaling: Scaling::Intellect,
        duration_ms: 1_000,
        ..BASE
    },
];

/// The ability bound to `slot` for `class`.
pub fn ability_for(class: ClassId, slot: u8) -> Option<&'static Ability> {
    ABILITIES.iter().find(|a| a.class == class && a.slot == slot)
}

pub fn ability(id: AbilityId) -> &'static Ability {
    // the table holds exactly one entry per id
    ABILITIES.iter().find(|a| a.id == id).unwrap_or(&ABILITIES[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_class_has_four_slots() {
        for class in ClassId::ALL {
            for slot in 1..=4 {
                let a = ability_for(class, slot).unwrap();
                assert_eq!(a.class, class);
                assert_eq!(a.slot, slot);
            }
            assert!(ability_for(class, 5).is_none());
        }
    }

    #[test]
    fn test_ids_and_names_unique() {
        let ids: HashSet<_> = ABILITIES.iter().map(|a| a.id).collect();
        let names: HashSet<_> = ABILITIES.iter().map(|a| a.name).collect();
        assert_eq!(ids.len(), ABILITIES.len());
        assert_eq!(names.len(), ABILITIES.len());
        for a in ABILITIES.iter() {
            assert_eq!(ability(a.id).name, a.name);
        }
    }

    #[test]
    fn test_ground_abilities_have_placement_shape() {
        for a in ABILITIES.iter().filter(|a| a.targeting == Targeting::Ground) {
            assert!(matches!(a.shape, Shape::Placement { .. }), "{}", a.name);
            assert!(a.range > 0.0);
        }
    }

    #[test]
    fn test_only_aimed_shot_channels() {
        let channelled: Vec<_> = ABILITIES.iter().filter(|a| a.cast_ms > 0).map(|a| a.id).collect();
        assert_eq!(channelled, vec![AbilityId::AimedShot]);
    }
}
