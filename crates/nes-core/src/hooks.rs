//! Per-step hook registry
//!
//! Peripherals that live outside the core (controllers, expansion devices,
//! debuggers) observe the machine by registering a [`Hook`]. Hooks run once
//! per CPU step, after the PPU has caught up, in registration order.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::cpu::interrupt::Interrupt;

/// Callback invoked after every CPU step
pub trait Hook {
    /// `cycle` is the master clock the machine just reached
    fn execute(&mut self, cycle: u64, interrupt: &mut Interrupt);
}

/// Shared handle to a registered hook; identity is the allocation
pub type HookRef = Rc<RefCell<dyn Hook>>;

/// Ordered, de-duplicating hook list
#[derive(Default, Clone)]
pub struct Hooks {
    list: Vec<HookRef>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook`; returns false if it is already registered
    pub fn add(&mut self, hook: HookRef) -> bool {
        if self.list.iter().any(|h| Rc::ptr_eq(h, &hook)) {
            return false;
        }
        self.list.push(hook);
        true
    }

    /// Unregister `hook`; returns false if it was not registered
    pub fn remove(&mut self, hook: &HookRef) -> bool {
        match self.list.iter().position(|h| Rc::ptr_eq(h, hook)) {
            Some(index) => {
                self.list.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn execute(&self, cycle: u64, interrupt: &mut Interrupt) {
        for hook in &self.list {
            hook.borrow_mut().execute(cycle, interrupt);
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").field("len", &self.list.len()).finish()
    }
}
