// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Polygon register store
//!
//! Each slot is mutated only while the load-enable gate is high. A write or
//! clear that arrives with the gate low is discarded, not queued.

use super::{PolygonFields, SlotId};
use crate::core::config::SlotCount;
use serde::{Deserialize, Serialize};

/// One polygon register with its enable bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolygonSlot {
    pub fields: PolygonFields,
    pub enabled: bool,
}

/// Result of a store mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The slot was updated
    Committed,
    /// The load-enable gate was low; nothing changed
    GateClosed,
    /// The slot does not exist in this configuration; nothing changed
    NoSuchSlot,
}

/// Bank of polygon registers
///
/// # Examples
///
/// ```
/// use trigpu::core::config::SlotCount;
/// use trigpu::core::polygon::{Color, PolygonFields, PolygonStore, SlotId, Vertex, WriteOutcome};
///
/// let mut store = PolygonStore::new(SlotCount::Two);
/// let fields = PolygonFields::new(Color::RED, [Vertex::new(0, 0); 3], 2);
///
/// assert_eq!(store.write(SlotId::A, fields, false), WriteOutcome::GateClosed);
/// assert!(!store.get(SlotId::A).unwrap().enabled);
///
/// assert_eq!(store.write(SlotId::A, fields, true), WriteOutcome::Committed);
/// assert!(store.get(SlotId::A).unwrap().enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonStore {
    slots: Vec<PolygonSlot>,
}

impl PolygonStore {
    /// Create a store with all slots cleared and disabled
    pub fn new(count: SlotCount) -> Self {
        Self {
            slots: vec![PolygonSlot::default(); count.get()],
        }
    }

    /// Replace every field of a slot and enable it
    ///
    /// # Arguments
    ///
    /// * `slot` - Slot to write
    /// * `fields` - New polygon contents
    /// * `load_enable` - Current level of the load-enable gate
    pub fn write(
        &mut self,
        slot: SlotId,
        fields: PolygonFields,
        load_enable: bool,
    ) -> WriteOutcome {
        self.mutate(
            slot,
            load_enable,
            PolygonSlot {
                fields,
                enabled: true,
            },
        )
    }

    /// Zero every field of a slot and disable it
    pub fn clear(&mut self, slot: SlotId, load_enable: bool) -> WriteOutcome {
        self.mutate(slot, load_enable, PolygonSlot::default())
    }

    fn mutate(&mut self, slot: SlotId, load_enable: bool, value: PolygonSlot) -> WriteOutcome {
        let Some(entry) = self.slots.get_mut(slot.index()) else {
            return WriteOutcome::NoSuchSlot;
        };

        if !load_enable {
            return WriteOutcome::GateClosed;
        }

        *entry = value;
        WriteOutcome::Committed
    }

    pub fn get(&self, slot: SlotId) -> Option<&PolygonSlot> {
        self.slots.get(slot.index())
    }

    pub fn slots(&self) -> &[PolygonSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Enabled slots in index order
    pub fn iter_enabled(&self) -> impl Iterator<Item = (SlotId, &PolygonFields)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.enabled)
            .map(|(index, slot)| (SlotId(index as u8), &slot.fields))
    }

    /// Disable and zero every slot
    pub fn reset(&mut self) {
        self.slots.fill(PolygonSlot::default());
    }
}
