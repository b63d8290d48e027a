use crate::constants::{NR_WP, WP_EXPR_LEN};
use crate::error::WatchError;
use crate::monitor::expr::{expr, ExprContext};
use log::debug;

/// A watched expression and the value it had when last checked
#[derive(Debug, Clone, Default)]
pub struct Watchpoint {
    pub no: usize,
    pub expr: heapless::String<WP_EXPR_LEN>,
    pub value: u32,
    next: Option<usize>,
}

/// Reported by `scan` when a watched value changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchHit {
    pub no: usize,
    pub expr: String,
    pub old: u32,
    pub new: u32,
}

/// Fixed pool of watchpoints threaded onto two index lists.
///
/// Every slot is on exactly one of the active list (`head`) or the free list
/// (`free`). Slot `i` always carries watchpoint number `i`.
pub struct WatchpointPool {
    slots: [Watchpoint; NR_WP],
    head: Option<usize>,
    free: Option<usize>,
}

impl WatchpointPool {
    pub fn new() -> Self {
        let mut slots: [Watchpoint; NR_WP] = core::array::from_fn(|_| Watchpoint::default());
        for (i, wp) in slots.iter_mut().enumerate() {
            wp.no = i;
            wp.next = if i + 1 < NR_WP { Some(i + 1) } else { None };
        }
        WatchpointPool {
            slots,
            head: None,
            free: Some(0),
        }
    }

    fn new_wp(&mut self) -> usize {
        let index = match self.free {
            Some(index) => index,
            None => panic!("watchpoint pool: allocating from an empty free list"),
        };
        self.free = self.slots[index].next;
        self.slots[index].next = self.head;
        self.head = Some(index);
        index
    }

    fn free_wp(&mut self, index: usize) {
        if self.head.is_none() {
            panic!("watchpoint pool: freeing with an empty active list");
        }

        let mut cursor = self.head;
        let mut prev: Option<usize> = None;
        while let Some(i) = cursor {
            if i == index {
                break;
            }
            prev = Some(i);
            cursor = self.slots[i].next;
        }
        if cursor.is_none() {
            panic!("watchpoint pool: slot {} is not active", index);
        }

        let next = self.slots[index].next;
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        self.slots[index].next = self.free;
        self.free = Some(index);
        self.slots[index].expr.clear();
    }

    /// Watch `e`, recording its current value
    pub fn create<C: ExprContext + ?Sized>(
        &mut self,
        e: &str,
        ctx: &C,
    ) -> Result<&Watchpoint, WatchError> {
        if self.free.is_none() {
            return Err(WatchError::PoolExhausted);
        }
        // leave room for the terminator the C layout reserved
        if e.len() >= WP_EXPR_LEN {
            return Err(WatchError::ExpressionTooLong(WP_EXPR_LEN - 1));
        }

        let index = self.new_wp();
        let value = match expr(e, ctx) {
            Ok(value) => value,
            Err(err) => {
                self.free_wp(index);
                return Err(err.into());
            }
        };

        let wp = &mut self.slots[index];
        wp.expr.clear();
        if wp.expr.push_str(e).is_err() {
            self.free_wp(index);
            return Err(WatchError::ExpressionTooLong(WP_EXPR_LEN - 1));
        }
        wp.value = value;
        debug!("watchpoint {} set on '{}' = 0x{:08x}", index, e, value);
        Ok(&self.slots[index])
    }

    /// Remove watchpoint `no`
    pub fn delete(&mut self, no: usize) -> Result<(), WatchError> {
        if self.head.is_none() {
            panic!("watchpoint pool: delete with no active watchpoints");
        }
        if !self.iter().any(|wp| wp.no == no) {
            return Err(WatchError::NotFound(no));
        }
        self.free_wp(no);
        debug!("watchpoint {} deleted", no);
        Ok(())
    }

    /// Re-evaluate every active watchpoint and report the first whose value
    /// changed. Expressions that no longer evaluate are skipped.
    pub fn scan<C: ExprContext + ?Sized>(&mut self, ctx: &C) -> Option<WatchHit> {
        let mut cursor = self.head;
        while let Some(i) = cursor {
            let wp = &mut self.slots[i];
            if let Ok(new) = expr(wp.expr.as_str(), ctx) {
                if new != wp.value {
                    let hit = WatchHit {
                        no: wp.no,
                        expr: wp.expr.as_str().to_string(),
                        old: wp.value,
                        new,
                    };
                    wp.value = new;
                    return Some(hit);
                }
            }
            cursor = wp.next;
        }
        None
    }

    /// Store the current value of every active watchpoint without firing
    pub fn refresh<C: ExprContext + ?Sized>(&mut self, ctx: &C) {
        let mut cursor = self.head;
        while let Some(i) = cursor {
            let wp = &mut self.slots[i];
            if let Ok(value) = expr(wp.expr.as_str(), ctx) {
                wp.value = value;
            }
            cursor = wp.next;
        }
    }

    /// Active watchpoints, most recently created first
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            pool: self,
            cursor: self.head,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[cfg(test)]
    fn free_len(&self) -> usize {
        let mut n = 0;
        let mut cursor = self.free;
        while let Some(i) = cursor {
            n += 1;
            cursor = self.slots[i].next;
        }
        n
    }
}

impl Default for WatchpointPool {
    fn default() -> Self {
        WatchpointPool::new()
    }
}

pub struct Iter<'a> {
    pool: &'a WatchpointPool,
    cursor: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Watchpoint;

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.cursor?;
        let wp = &self.pool.slots[i];
        self.cursor = wp.next;
        Some(wp)
    }
}
