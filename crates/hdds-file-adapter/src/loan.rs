// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Slot arena backing the take / return-loan protocol.
//!
//! Every discovery record lives in a slot until the engine returns its loan.
//! A [`LoanToken`] pairs a slot index with the slot's generation, so a token
//! that outlives its slot (double return, stale token) is detected instead of
//! freeing a slot that has since been reused.

use crate::stream_info::StreamInfo;
use std::ops::Deref;
use std::sync::Arc;

/// Handle to an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoanToken {
    index: usize,
    generation: u32,
}

impl LoanToken {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Read-only view of a discovery record on loan to the engine.
///
/// Must be handed back through `return_loan`.
#[derive(Debug, Clone)]
pub struct Loan {
    token: LoanToken,
    info: Arc<StreamInfo>,
}

impl Loan {
    pub fn token(&self) -> LoanToken {
        self.token
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }
}

impl Deref for Loan {
    type Target = StreamInfo;

    fn deref(&self) -> &StreamInfo {
        &self.info
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Pending,
    Loaned,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    state: SlotState,
    info: Option<Arc<StreamInfo>>,
}

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Index outside the arena.
    UnknownSlot,
    /// Slot was freed and possibly reused since the token was issued.
    StaleGeneration,
    /// Slot is live but not on loan.
    NotLoaned,
}

/// Generation-checked slot arena.
#[derive(Debug, Default)]
pub struct LoanArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl LoanArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record as pending delivery.
    pub fn insert(&mut self, info: StreamInfo) -> LoanToken {
        let info = Some(Arc::new(info));
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.state = SlotState::Pending;
            slot.info = info;
            LoanToken {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                state: SlotState::Pending,
                info,
            });
            LoanToken {
                index: self.slots.len() - 1,
                generation: 0,
            }
        }
    }

    /// Hand a pending record out on loan.
    ///
    /// Returns `None` if the token does not name a pending slot.
    pub fn lend(&mut self, token: LoanToken) -> Option<Loan> {
        let slot = self.slots.get_mut(token.index)?;
        if slot.generation != token.generation || slot.state != SlotState::Pending {
            return None;
        }
        let info = slot.info.clone()?;
        slot.state = SlotState::Loaned;
        Some(Loan { token, info })
    }

    /// Check that a token names a slot currently on loan.
    pub fn check_loaned(&self, token: LoanToken) -> Result<(), TokenRejection> {
        let slot = self
            .slots
            .get(token.index)
            .ok_or(TokenRejection::UnknownSlot)?;
        if slot.generation != token.generation {
            return Err(TokenRejection::StaleGeneration);
        }
        if slot.state != SlotState::Loaned {
            return Err(TokenRejection::NotLoaned);
        }
        Ok(())
    }

    /// Free a loaned slot; its generation is bumped so the token goes stale.
    pub fn release(&mut self, token: LoanToken) -> Result<(), TokenRejection> {
        self.check_loaned(token)?;
        let slot = &mut self.slots[token.index];
        slot.state = SlotState::Free;
        slot.info = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(token.index);
        Ok(())
    }

    /// Number of records currently on loan.
    pub fn loaned(&self) -> usize {
        self.count(SlotState::Loaned)
    }

    /// Number of records awaiting delivery.
    pub fn pending(&self) -> usize {
        self.count(SlotState::Pending)
    }

    /// Total slots allocated (free or not).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn count(&self, state: SlotState) -> usize {
        self.slots.iter().filter(|s| s.state == state).count()
    }
}
