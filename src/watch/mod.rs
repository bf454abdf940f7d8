//! Fixed-capacity watchpoint pool
//!
//! A watchpoint is an expression the step loop re-evaluates after every
//! executed instruction; a changed value is reported back so the loop can
//! halt.  The pool owns a fixed array of slots whose ids are assigned once
//! at construction and never change — deleting a watchpoint returns its slot
//! to the free list for reuse, so an id may reappear on a later create.
//!
//! List discipline: the free list is seeded in index order and popped from
//! the front; the active list is kept newest-first, which is also the order
//! [`WatchpointPool::list`] and [`WatchpointPool::step_check`] walk it.

use crate::expr::{evaluate, ExprError};
use crate::machine::Machine;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// Number of watchpoint slots in the pool.
pub const NR_WATCHPOINTS: usize = 32;

/// Why a pool operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    /// Every slot is active; the create had no effect.
    PoolExhausted,
    /// No active watchpoint has this id; pool state is unchanged.
    NotFound(u32),
    /// The expression failed to evaluate, so no watchpoint was created.
    Expr(ExprError),
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchError::PoolExhausted => write!(
                f,
                "all {} watchpoint slots are in use",
                NR_WATCHPOINTS
            ),
            WatchError::NotFound(id) => {
                write!(f, "no watchpoint with id {}", id)
            }
            WatchError::Expr(err) => write!(f, "bad expression: {}", err),
        }
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WatchError::Expr(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ExprError> for WatchError {
    fn from(err: ExprError) -> Self {
        WatchError::Expr(err)
    }
}

/// One active watchpoint, as reported to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointInfo {
    pub id: u32,
    pub expr: String,
    pub last_value: u32,
}

/// A watchpoint whose value changed during a re-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointHit {
    pub id: u32,
    pub expr: String,
    pub old_value: u32,
    pub new_value: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    id: u32,
    expr: String,
    last_value: u32,
    active: bool,
}

/// Pool of [`NR_WATCHPOINTS`] watchpoint slots.
#[derive(Debug, Clone)]
pub struct WatchpointPool {
    slots: Vec<Slot>,
    /// Indices of inactive slots, popped from the front on create.
    free: VecDeque<usize>,
    /// Indices of active slots, newest first.
    active: Vec<usize>,
}

impl WatchpointPool {
    /// Build the pool with every slot on the free list, in index order.
    pub fn new() -> Self {
        let slots = (0..NR_WATCHPOINTS)
            .map(|i| Slot {
                id: i as u32,
                expr: String::new(),
                last_value: 0,
                active: false,
            })
            .collect();
        Self {
            slots,
            free: (0..NR_WATCHPOINTS).collect(),
            active: Vec::new(),
        }
    }

    /// Number of active watchpoints.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Create a watchpoint on `expr`, seeding its stored value with the
    /// expression's current result.
    ///
    /// Fails without touching the pool when the expression does not
    /// evaluate or no slot is free.
    pub fn create<M: Machine>(
        &mut self,
        machine: &M,
        expr: &str,
    ) -> Result<u32, WatchError> {
        if self.free.is_empty() {
            return Err(WatchError::PoolExhausted);
        }
        // Validate before claiming a slot so a bad expression is side-effect
        // free.
        let seed = evaluate(machine, expr)?;

        let index = match self.free.pop_front() {
            Some(index) => index,
            None => return Err(WatchError::PoolExhausted),
        };
        let slot = &mut self.slots[index];
        slot.expr = expr.to_string();
        slot.last_value = seed.value;
        slot.active = true;
        self.active.insert(0, index);

        debug!(id = slot.id, expr, value = seed.value, "watchpoint created");
        Ok(slot.id)
    }

    /// Delete the active watchpoint with `id`, returning its slot to the
    /// free list so it can be reused.
    pub fn delete(&mut self, id: u32) -> Result<(), WatchError> {
        let position = self
            .active
            .iter()
            .position(|&index| self.slots[index].id == id)
            .ok_or(WatchError::NotFound(id))?;

        let index = self.active.remove(position);
        let slot = &mut self.slots[index];
        slot.active = false;
        slot.expr.clear();
        self.free.push_back(index);

        debug!(id, "watchpoint deleted");
        Ok(())
    }

    /// Active watchpoints, most recently created first.
    pub fn list(&self) -> Vec<WatchpointInfo> {
        self.active
            .iter()
            .map(|&index| {
                let slot = &self.slots[index];
                WatchpointInfo {
                    id: slot.id,
                    expr: slot.expr.clone(),
                    last_value: slot.last_value,
                }
            })
            .collect()
    }

    /// Re-evaluate the watchpoint with `id`, storing the new value and
    /// reporting the change if there was one.
    pub fn recheck<M: Machine>(
        &mut self,
        machine: &M,
        id: u32,
    ) -> Result<Option<WatchpointHit>, WatchError> {
        let index = self
            .active
            .iter()
            .copied()
            .find(|&index| self.slots[index].id == id)
            .ok_or(WatchError::NotFound(id))?;
        Ok(self.recheck_slot(machine, index))
    }

    /// Re-evaluate every active watchpoint in active-list order, called by
    /// the step loop once per executed instruction.  Returns the changed
    /// ones; the loop halts when the result is non-empty.
    pub fn step_check<M: Machine>(&mut self, machine: &M) -> Vec<WatchpointHit> {
        let indices: Vec<usize> = self.active.clone();
        indices
            .into_iter()
            .filter_map(|index| self.recheck_slot(machine, index))
            .collect()
    }

    fn recheck_slot<M: Machine>(
        &mut self,
        machine: &M,
        index: usize,
    ) -> Option<WatchpointHit> {
        let slot = &mut self.slots[index];
        // The expression was validated at create time and machine reads are
        // infallible, so a failure here means the machine seam changed under
        // us; skip the slot rather than report a phantom hit.
        let eval = match evaluate(machine, &slot.expr) {
            Ok(eval) => eval,
            Err(err) => {
                warn!(id = slot.id, expr = %slot.expr, %err, "watchpoint expression stopped evaluating");
                return None;
            }
        };

        if eval.value == slot.last_value {
            return None;
        }
        let hit = WatchpointHit {
            id: slot.id,
            expr: slot.expr.clone(),
            old_value: slot.last_value,
            new_value: eval.value,
        };
        slot.last_value = eval.value;
        debug!(
            id = hit.id,
            old = hit.old_value,
            new = hit.new_value,
            "watchpoint hit"
        );
        Some(hit)
    }
}

impl Default for WatchpointPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Cpu;

    #[test]
    fn test_pool_capacity() {
        let cpu = Cpu::new();
        let mut pool = WatchpointPool::new();
        for i in 0..NR_WATCHPOINTS {
            let id = pool.create(&cpu, "1+1").unwrap();
            assert_eq!(id, i as u32);
        }
        assert_eq!(pool.len(), NR_WATCHPOINTS);
        assert_eq!(
            pool.create(&cpu, "1+1").unwrap_err(),
            WatchError::PoolExhausted
        );
    }

    #[test]
    fn test_slot_reuse_after_delete() {
        let cpu = Cpu::new();
        let mut pool = WatchpointPool::new();
        for _ in 0..NR_WATCHPOINTS {
            pool.create(&cpu, "1").unwrap();
        }
        pool.delete(5).unwrap();
        // The freed slot is allocatable again, with its old id.
        assert_eq!(pool.create(&cpu, "2").unwrap(), 5);
    }

    #[test]
    fn test_repeated_create_delete_never_exhausts() {
        let cpu = Cpu::new();
        let mut pool = WatchpointPool::new();
        for _ in 0..(NR_WATCHPOINTS * 4) {
            let id = pool.create(&cpu, "$a0").unwrap();
            pool.delete(id).unwrap();
        }
        assert!(pool.is_empty());
    }

    #[test]
    fn test_bad_expression_has_no_side_effect() {
        let cpu = Cpu::new();
        let mut pool = WatchpointPool::new();
        assert!(matches!(
            pool.create(&cpu, "(1+").unwrap_err(),
            WatchError::Expr(_)
        ));
        assert!(pool.is_empty());
        assert_eq!(pool.create(&cpu, "1").unwrap(), 0);
    }

    #[test]
    fn test_delete_unknown_id() {
        let cpu = Cpu::new();
        let mut pool = WatchpointPool::new();
        pool.create(&cpu, "1").unwrap();
        assert_eq!(pool.delete(7).unwrap_err(), WatchError::NotFound(7));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut cpu = Cpu::new();
        cpu.write_register(10, 42);
        let mut pool = WatchpointPool::new();
        pool.create(&cpu, "$a0").unwrap();
        pool.create(&cpu, "$a0+1").unwrap();

        let infos = pool.list();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].expr, "$a0+1");
        assert_eq!(infos[0].last_value, 43);
        assert_eq!(infos[1].expr, "$a0");
        assert_eq!(infos[1].last_value, 42);
    }

    #[test]
    fn test_step_check_reports_changes() {
        let mut cpu = Cpu::new();
        let mut pool = WatchpointPool::new();
        let id = pool.create(&cpu, "$sp").unwrap();

        assert!(pool.step_check(&cpu).is_empty());

        cpu.write_register(2, 0x8000_0000);
        let hits = pool.step_check(&cpu);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);
        assert_eq!(hits[0].old_value, 0);
        assert_eq!(hits[0].new_value, 0x8000_0000);

        // The new value is stored: no repeat hit while state is unchanged.
        assert!(pool.step_check(&cpu).is_empty());
    }

    #[test]
    fn test_recheck_single_watchpoint() {
        let mut cpu = Cpu::new();
        let mut pool = WatchpointPool::new();
        let id = pool.create(&cpu, "*0x100").unwrap();

        assert_eq!(pool.recheck(&cpu, id).unwrap(), None);
        cpu.write_memory_u32(0x100, 9);
        let hit = pool.recheck(&cpu, id).unwrap().unwrap();
        assert_eq!(hit.new_value, 9);

        assert_eq!(
            pool.recheck(&cpu, 31).unwrap_err(),
            WatchError::NotFound(31)
        );
    }
}
