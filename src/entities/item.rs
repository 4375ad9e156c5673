use crate::combat::damage::DamageType;
use crate::entities::inventory::InventorySlot;
use crate::entities::skills::SkillType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u16);

/// Per-damage-type percentages an equipped item grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemAbilities {
    pub absorb_percent: [i16; DamageType::COUNT],
    pub field_absorb_percent: [i16; DamageType::COUNT],
    pub reflect_percent: [i16; DamageType::COUNT],
    pub reflect_chance: [u16; DamageType::COUNT],
}

impl ItemAbilities {
    pub fn absorb(&self, damage_type: DamageType) -> i16 {
        damage_type
            .index()
            .map(|index| self.absorb_percent[index])
            .unwrap_or(0)
    }

    pub fn field_absorb(&self, damage_type: DamageType) -> i16 {
        damage_type
            .index()
            .map(|index| self.field_absorb_percent[index])
            .unwrap_or(0)
    }

    /// `(percent, chance)` of reflecting this damage type.
    pub fn reflect(&self, damage_type: DamageType) -> (i16, u16) {
        damage_type
            .index()
            .map(|index| (self.reflect_percent[index], self.reflect_chance[index]))
            .unwrap_or((0, 0))
    }

    pub fn with_absorb(mut self, damage_type: DamageType, percent: i16) -> Self {
        if let Some(index) = damage_type.index() {
            self.absorb_percent[index] = percent;
        }
        self
    }

    pub fn with_field_absorb(mut self, damage_type: DamageType, percent: i16) -> Self {
        if let Some(index) = damage_type.index() {
            self.field_absorb_percent[index] = percent;
        }
        self
    }

    pub fn with_reflect(mut self, damage_type: DamageType, percent: i16, chance: u16) -> Self {
        if let Some(index) = damage_type.index() {
            self.reflect_percent[index] = percent;
            self.reflect_chance[index] = chance;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponStats {
    pub attack: u16,
    pub skill: SkillType,
    pub element: Option<(DamageType, u16)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquippedItem {
    pub type_id: ItemTypeId,
    pub name: String,
    /// Slot the item's abilities are granted in.
    pub body_slot: Option<InventorySlot>,
    pub abilities: Option<ItemAbilities>,
    pub weapon: Option<WeaponStats>,
    /// Remaining charges; `None` means unlimited.
    pub charges: Option<u16>,
}

impl EquippedItem {
    pub fn new(type_id: ItemTypeId, name: &str) -> Self {
        Self {
            type_id,
            name: name.to_string(),
            body_slot: None,
            abilities: None,
            weapon: None,
            charges: None,
        }
    }

    pub fn worn_in(mut self, slot: InventorySlot) -> Self {
        self.body_slot = Some(slot);
        self
    }

    pub fn with_abilities(mut self, abilities: ItemAbilities) -> Self {
        self.abilities = Some(abilities);
        self
    }

    pub fn with_weapon(mut self, weapon: WeaponStats) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn with_charges(mut self, charges: u16) -> Self {
        self.charges = Some(charges);
        self
    }

    /// Spends one charge. Returns `true` when the item is used up.
    pub fn consume_charge(&mut self) -> bool {
        match self.charges.as_mut() {
            Some(charges) => {
                *charges = charges.saturating_sub(1);
                *charges == 0
            }
            None => false,
        }
    }
}
