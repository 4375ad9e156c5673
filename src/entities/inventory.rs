use crate::entities::item::{EquippedItem, WeaponStats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventorySlot {
    Head,
    Necklace,
    Backpack,
    Armor,
    RightHand,
    LeftHand,
    Legs,
    Feet,
    Ring,
    Ammo,
}

impl InventorySlot {
    const COUNT: usize = 10;

    pub fn index(self) -> usize {
        match self {
            InventorySlot::Head => 0,
            InventorySlot::Necklace => 1,
            InventorySlot::Backpack => 2,
            InventorySlot::Armor => 3,
            InventorySlot::RightHand => 4,
            InventorySlot::LeftHand => 5,
            InventorySlot::Legs => 6,
            InventorySlot::Feet => 7,
            InventorySlot::Ring => 8,
            InventorySlot::Ammo => 9,
        }
    }

    pub fn is_hand(self) -> bool {
        matches!(self, InventorySlot::RightHand | InventorySlot::LeftHand)
    }
}

pub const INVENTORY_SLOTS: [InventorySlot; 10] = [
    InventorySlot::Head,
    InventorySlot::Necklace,
    InventorySlot::Backpack,
    InventorySlot::Armor,
    InventorySlot::RightHand,
    InventorySlot::LeftHand,
    InventorySlot::Legs,
    InventorySlot::Feet,
    InventorySlot::Ring,
    InventorySlot::Ammo,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    slots: Vec<Option<EquippedItem>>,
    ability_enabled: Vec<bool>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            slots: vec![None; InventorySlot::COUNT],
            ability_enabled: vec![false; InventorySlot::COUNT],
        }
    }
}

impl Inventory {
    pub fn slot(&self, slot: InventorySlot) -> Option<&EquippedItem> {
        self.slots.get(slot.index()).and_then(|entry| entry.as_ref())
    }

    pub fn slot_mut(&mut self, slot: InventorySlot) -> Option<&mut EquippedItem> {
        self.slots
            .get_mut(slot.index())
            .and_then(|entry| entry.as_mut())
    }

    /// Equips `item`; its abilities only apply when worn in its body slot.
    pub fn set_slot(&mut self, slot: InventorySlot, item: Option<EquippedItem>) {
        let enabled = item
            .as_ref()
            .map(|item| match item.body_slot {
                Some(body_slot) => body_slot == slot || (body_slot.is_hand() && slot.is_hand()),
                None => false,
            })
            .unwrap_or(false);
        if let Some(entry) = self.slots.get_mut(slot.index()) {
            *entry = item;
        }
        if let Some(flag) = self.ability_enabled.get_mut(slot.index()) {
            *flag = enabled;
        }
    }

    pub fn is_ability_enabled(&self, slot: InventorySlot) -> bool {
        self.ability_enabled
            .get(slot.index())
            .copied()
            .unwrap_or(false)
    }

    /// First wielded weapon, right hand before left.
    pub fn weapon(&self) -> Option<(InventorySlot, WeaponStats)> {
        [InventorySlot::RightHand, InventorySlot::LeftHand]
            .into_iter()
            .find_map(|slot| {
                self.slot(slot)
                    .and_then(|item| item.weapon)
                    .map(|weapon| (slot, weapon))
            })
    }

    /// Spends a charge of the item in `slot`, removing it once used up.
    /// Returns `true` when the item was removed.
    pub fn consume_charge(&mut self, slot: InventorySlot) -> bool {
        let worn_out = match self.slot_mut(slot) {
            Some(item) => item.consume_charge(),
            None => return false,
        };
        if worn_out {
            self.set_slot(slot, None);
        }
        worn_out
    }
}
