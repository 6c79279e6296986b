//! Storage for an island's bodies and contact manifolds
//!
//! Manifolds and broad-phase leaves refer to bodies by [`Handle`], so a body
//! removed from the island must not be reached through a handle that a
//! manifold still holds. Each slot counts its removals and a handle only
//! resolves while its count matches. The slot index doubles as the row of
//! the solver's per-body velocity delta table.

use core::marker::PhantomData;

/// Reference to a body or manifold that goes stale once the entry is removed
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Row in per-body tables sized by [`Arena::slot_count`]
    #[inline]
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    /// Number of removals from the slot before this handle was issued
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

// Handles are plain ids whatever they point at.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<T> core::hash::Hash for Handle<T> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> core::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

/// Bodies or manifolds of one island, addressed by [`Handle`]
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    /// Empty storage
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Store an entry, reusing the most recently freed slot
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            Handle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                value: Some(value),
                generation: 0,
            });
            Handle::new(index, 0)
        }
    }

    /// Take an entry out. Every outstanding handle to it stops resolving
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;

        if slot.generation != handle.generation || slot.value.is_none() {
            return None;
        }

        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.len -= 1;

        slot.value.take()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Both bodies of a contact pair, mutably, in argument order
    ///
    /// `None` when the handles name the same slot or either is stale.
    pub fn get2_mut(&mut self, a: Handle<T>, b: Handle<T>) -> Option<(&mut T, &mut T)> {
        if a.index == b.index {
            return None;
        }

        let (first, second, swapped) = if a.index < b.index {
            (a, b, false)
        } else {
            (b, a, true)
        };

        if second.index() >= self.slots.len() {
            return None;
        }

        let (head, tail) = self.slots.split_at_mut(second.index());
        let slot_first = head.get_mut(first.index())?;
        let slot_second = tail.first_mut()?;

        if slot_first.generation != first.generation || slot_second.generation != second.generation {
            return None;
        }

        let x = slot_first.value.as_mut()?;
        let y = slot_second.value.as_mut()?;

        if swapped {
            Some((y, x))
        } else {
            Some((x, y))
        }
    }

    /// Whether the handle still names a live entry
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rows needed for a table indexed by [`Handle::index`]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Live entries with their handles, in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (Handle::new(i as u32, slot.generation), v))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|v| (Handle::new(i as u32, generation), v))
        })
    }

    /// Handles of live entries, in slot order
    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        self.iter().map(|(h, _)| h)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.value.as_mut())
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_insert_get() {
        let mut arena: Arena<i32> = Arena::new();

        let a = arena.insert(42);
        let b = arena.insert(100);

        assert_eq!(arena.get(a), Some(&42));
        assert_eq!(arena.get(b), Some(&100));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut arena: Arena<i32> = Arena::new();

        let a = arena.insert(42);
        assert_eq!(arena.remove(a), Some(42));

        let b = arena.insert(100);

        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&100));
    }

    #[test]
    fn test_get2_mut_in_either_order() {
        let mut arena: Arena<i32> = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);

        if let Some((x, y)) = arena.get2_mut(b, a) {
            *x += 10;
            *y += 20;
        }

        assert_eq!(arena.get(a), Some(&21));
        assert_eq!(arena.get(b), Some(&12));
        assert!(arena.get2_mut(a, a).is_none());
    }
}
