//! Template-keyed object pool
//!
//! Instances live in an arena and are addressed by `Handle`. Each template id
//! owns a stack of inactive handles. An instance is always either active (rented)
//! or on exactly one template's stack.
//!
//! Double returns and returns under the wrong template are caller bugs; they
//! are caught by debug assertions and otherwise not defended against.

use serde::{Deserialize, Serialize};

/// Small integer id assigned to each template at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub u16);

impl TemplateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable index of a pooled instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle(u32);

impl Handle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_raw(index: u32) -> Self {
        Handle(index)
    }
}

/// Lifecycle hooks for pooled items
pub trait Poolable {
    /// Called every time the instance is handed out (fresh or recycled)
    fn on_rented(&mut self) {}
    /// Called when the instance goes back on its stack
    fn on_returned(&mut self) {}
}

#[derive(Debug)]
struct Slot<T> {
    template: TemplateId,
    active: bool,
    item: T,
}

#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    inactive: Vec<Vec<Handle>>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            inactive: Vec::new(),
        }
    }
}

impl<T: Poolable> Pool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop an inactive instance of `template`, or build one with `make` on a miss
    pub fn rent(&mut self, template: TemplateId, make: impl FnOnce() -> T) -> Handle {
        let recycled = self
            .inactive
            .get_mut(template.index())
            .and_then(|stack| stack.pop());

        let handle = match recycled {
            Some(handle) => {
                let slot = &mut self.slots[handle.index()];
                debug_assert!(!slot.active, "pooled instance {handle:?} was still active");
                debug_assert_eq!(slot.template, template);
                slot.active = true;
                handle
            }
            None => {
                let handle = Handle(self.slots.len() as u32);
                self.slots.push(Slot {
                    template,
                    active: true,
                    item: make(),
                });
                handle
            }
        };

        self.slots[handle.index()].item.on_rented();
        handle
    }

    /// Deactivate `handle` and push it onto `template`'s stack
    pub fn give_back(&mut self, template: TemplateId, handle: Handle) {
        let slot = &mut self.slots[handle.index()];
        debug_assert!(slot.active, "instance {handle:?} returned twice");
        debug_assert_eq!(
            slot.template, template,
            "instance {handle:?} returned under the wrong template"
        );

        slot.active = false;
        slot.item.on_returned();

        if self.inactive.len() <= template.index() {
            self.inactive.resize_with(template.index() + 1, Vec::new);
        }
        self.inactive[template.index()].push(handle);
    }

    /// Active instance behind `handle`
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.active)
            .map(|slot| &slot.item)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.active)
            .map(|slot| &mut slot.item)
    }

    /// Template an instance was created for
    pub fn template_of(&self, handle: Handle) -> Option<TemplateId> {
        self.slots.get(handle.index()).map(|slot| slot.template)
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.index())
            .is_some_and(|slot| slot.active)
    }

    /// Total instances ever constructed (pool misses)
    pub fn created(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.active).count()
    }

    /// Inactive instances waiting on `template`'s stack
    pub fn pooled_count(&self, template: TemplateId) -> usize {
        self.inactive
            .get(template.index())
            .map_or(0, |stack| stack.len())
    }

    /// Iterate active instances in handle order
    pub fn iter_active(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(i, slot)| (Handle(i as u32), &slot.item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Item {
        rented: u32,
        returned: u32,
        live: bool,
    }

    impl Poolable for Item {
        fn on_rented(&mut self) {
            self.rented += 1;
            self.live = true;
        }
        fn on_returned(&mut self) {
            self.returned += 1;
            self.live = false;
        }
    }

    const A: TemplateId = TemplateId(0);
    const B: TemplateId = TemplateId(3);

    #[test]
    fn test_rent_reuses_returned_instance() {
        let mut pool: Pool<Item> = Pool::new();
        let h = pool.rent(A, Item::default);
        pool.give_back(A, h);
        assert_eq!(pool.pooled_count(A), 1);

        let again = pool.rent(A, Item::default);
        assert_eq!(again, h);
        assert_eq!(pool.created(), 1);
        let item = pool.get(again).unwrap();
        assert_eq!(item.rented, 2);
        assert_eq!(item.returned, 1);
        assert!(item.live);
    }

    #[test]
    fn test_templates_do_not_share_stacks() {
        let mut pool: Pool<Item> = Pool::new();
        let a = pool.rent(A, Item::default);
        pool.give_back(A, a);

        let b = pool.rent(B, Item::default);
        assert_ne!(a, b);
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.template_of(b), Some(B));
        assert_eq!(pool.pooled_count(A), 1);
        assert_eq!(pool.pooled_count(B), 0);
    }

    #[test]
    fn test_inactive_instances_are_hidden() {
        let mut pool: Pool<Item> = Pool::new();
        let h = pool.rent(A, Item::default);
        assert!(pool.is_active(h));
        pool.give_back(A, h);
        assert!(!pool.is_active(h));
        assert!(pool.get(h).is_none());
        assert_eq!(pool.iter_active().count(), 0);
    }

    #[test]
    #[should_panic(expected = "returned twice")]
    #[cfg(debug_assertions)]
    fn test_double_return_asserts_in_debug() {
        let mut pool: Pool<Item> = Pool::new();
        let h = pool.rent(A, Item::default);
        pool.give_back(A, h);
        pool.give_back(A, h);
    }

    proptest! {
        #[test]
        fn prop_pool_conservation(ops in proptest::collection::vec((0u16..3, any::<bool>()), 0..300)) {
            let mut pool: Pool<Item> = Pool::new();
            let mut held: Vec<(TemplateId, Handle)> = Vec::new();
            let mut misses = 0usize;

            for (key, rent) in ops {
                let template = TemplateId(key);
                if rent || held.is_empty() {
                    if pool.pooled_count(template) == 0 {
                        misses += 1;
                    }
                    let h = pool.rent(template, Item::default);
                    prop_assert!(!held.iter().any(|&(_, other)| other == h));
                    held.push((template, h));
                } else {
                    let (template, h) = held.remove(0);
                    pool.give_back(template, h);
                }
                prop_assert_eq!(pool.created(), misses);
                prop_assert_eq!(pool.active_count(), held.len());
            }
        }
    }
}
