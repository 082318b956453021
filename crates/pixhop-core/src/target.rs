#![forbid(unsafe_code)]

//! Display targets owned by the presentation layer.
//!
//! Targets live in a generational arena. A [`TargetId`] is an index plus the
//! generation of the slot at the time the target was created, so an id held
//! by a request goes stale the moment its target is removed, even if the
//! slot is later reused.
//!
//! Each live target records which request is currently assigned to it.
//! A request is only allowed to draw into a target that is both alive and
//! still assigned to that request ([`TargetArena::is_still_mine`]).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::artifact::{Artifact, ArtifactKind};
use crate::request::RequestId;

/// Generational handle to a display target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId {
    index: u32,
    generation: u32,
}

impl TargetId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// What a target is currently showing.
#[derive(Debug, Clone)]
pub struct Shown {
    pub artifact: Artifact,
    pub kind: ArtifactKind,
}

/// Mutable state of one live target.
#[derive(Debug, Default)]
pub struct Surface {
    assigned: Option<RequestId>,
    content: Option<Shown>,
}

impl Surface {
    /// The request currently assigned to this target, if any.
    #[inline]
    #[must_use]
    pub fn assigned(&self) -> Option<RequestId> {
        self.assigned
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> Option<&Shown> {
        self.content.as_ref()
    }

    /// Replace whatever the target shows.
    pub fn show(&mut self, artifact: Artifact, kind: ArtifactKind) {
        self.content = Some(Shown { artifact, kind });
    }

    /// Clear the target, releasing its artifact handle.
    pub fn clear(&mut self) -> Option<Shown> {
        self.content.take()
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    surface: Option<Surface>,
}

/// Generational arena of display targets.
#[derive(Debug, Default)]
pub struct TargetArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl TargetArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, unassigned target.
    pub fn insert(&mut self) -> TargetId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.surface = Some(Surface::default());
            return TargetId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            surface: Some(Surface::default()),
        });
        TargetId {
            index,
            generation: 0,
        }
    }

    /// Destroy a target. Ids referring to it go stale.
    ///
    /// Returns the surface that was removed, or `None` if the id was stale.
    pub fn remove(&mut self, id: TargetId) -> Option<Surface> {
        let slot = self.slot_mut(id)?;
        let surface = slot.surface.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        #[cfg(feature = "tracing")]
        tracing::trace!(index = id.index, generation = id.generation, "target removed");
        surface
    }

    /// Assign `request` to the target, returning the previously assigned request.
    ///
    /// Returns `None` without effect when the id is stale.
    pub fn assign(&mut self, id: TargetId, request: RequestId) -> Option<Option<RequestId>> {
        let surface = self.get_mut(id)?;
        let previous = surface.assigned.replace(request);
        #[cfg(feature = "tracing")]
        tracing::trace!(
            index = id.index,
            request = request.get(),
            previous = ?previous.map(RequestId::get),
            "target assigned"
        );
        Some(previous)
    }

    /// Detach whatever request is assigned to the target.
    pub fn unassign(&mut self, id: TargetId) -> Option<RequestId> {
        self.get_mut(id)?.assigned.take()
    }

    #[must_use]
    pub fn is_live(&self, id: TargetId) -> bool {
        self.get(id).is_some()
    }

    /// The staleness predicate: the target is alive and still assigned to `request`.
    #[must_use]
    pub fn is_still_mine(&self, id: TargetId, request: RequestId) -> bool {
        self.get(id)
            .is_some_and(|surface| surface.assigned == Some(request))
    }

    #[must_use]
    pub fn get(&self, id: TargetId) -> Option<&Surface> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.surface.as_ref()
    }

    pub fn get_mut(&mut self, id: TargetId) -> Option<&mut Surface> {
        self.slot_mut(id)?.surface.as_mut()
    }

    /// Number of live targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_mut(&mut self, id: TargetId) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.surface.is_none() {
            return None;
        }
        Some(slot)
    }
}

/// Shared handle to a [`TargetArena`].
///
/// The presentation layer and the delivery loop both hold one. Workers never
/// touch targets; they only carry [`TargetId`]s inside requests.
#[derive(Debug, Clone, Default)]
pub struct Targets {
    inner: Arc<Mutex<TargetArena>>,
}

impl Targets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the arena. A poisoned lock is recovered: arena operations
    /// never leave it half-updated.
    pub fn lock(&self) -> MutexGuard<'_, TargetArena> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the arena unless another caller holds it.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, TargetArena>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(err)) => Some(err.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub fn insert(&self) -> TargetId {
        self.lock().insert()
    }

    pub fn remove(&self, id: TargetId) -> Option<Surface> {
        self.lock().remove(id)
    }

    pub fn assign(&self, id: TargetId, request: RequestId) -> Option<Option<RequestId>> {
        self.lock().assign(id, request)
    }

    pub fn unassign(&self, id: TargetId) -> Option<RequestId> {
        self.lock().unassign(id)
    }

    #[must_use]
    pub fn is_still_mine(&self, id: TargetId, request: RequestId) -> bool {
        self.lock().is_still_mine(id, request)
    }

    /// Snapshot of what the target currently shows.
    #[must_use]
    pub fn content(&self, id: TargetId) -> Option<Shown> {
        self.lock().get(id).and_then(|surface| surface.content().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_lock_fails_while_arena_is_held() {
        let targets = Targets::new();
        let id = targets.insert();
        {
            let _held = targets.lock();
            assert!(targets.try_lock().is_none());
        }
        assert!(targets.try_lock().is_some_and(|arena| arena.is_live(id)));
    }

    #[test]
    fn removed_ids_go_stale_even_when_slot_is_reused() {
        let mut arena = TargetArena::new();
        let first = arena.insert();
        assert!(arena.is_live(first));

        assert!(arena.remove(first).is_some());
        assert!(!arena.is_live(first));
        assert!(arena.remove(first).is_none());

        let second = arena.insert();
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(!arena.is_live(first));
        assert!(arena.is_live(second));
    }

    #[test]
    fn still_mine_requires_matching_assignment() {
        let mut arena = TargetArena::new();
        let id = arena.insert();
        let a = RequestId::from_raw(1);
        let b = RequestId::from_raw(2);

        assert!(!arena.is_still_mine(id, a));
        assert_eq!(arena.assign(id, a), Some(None));
        assert!(arena.is_still_mine(id, a));

        assert_eq!(arena.assign(id, b), Some(Some(a)));
        assert!(!arena.is_still_mine(id, a));
        assert!(arena.is_still_mine(id, b));

        assert_eq!(arena.unassign(id), Some(b));
        assert!(!arena.is_still_mine(id, b));
    }

    #[test]
    fn assign_to_stale_id_is_rejected() {
        let mut arena = TargetArena::new();
        let id = arena.insert();
        arena.remove(id);
        assert_eq!(arena.assign(id, RequestId::from_raw(7)), None);
        assert!(!arena.is_still_mine(id, RequestId::from_raw(7)));
    }

    #[test]
    fn len_counts_live_targets() {
        let mut arena = TargetArena::new();
        assert!(arena.is_empty());
        let a = arena.insert();
        let _b = arena.insert();
        assert_eq!(arena.len(), 2);
        arena.remove(a);
        assert_eq!(arena.len(), 1);
        let _c = arena.insert();
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn surface_show_and_clear() {
        let targets = Targets::new();
        let id = targets.insert();
        assert!(targets.content(id).is_none());

        let artifact = Artifact::new("x", 1, 1, vec![0; 4]);
        if let Some(surface) = targets.lock().get_mut(id) {
            surface.show(artifact.clone(), ArtifactKind::Success);
        }
        let shown = targets.content(id).map(|s| s.artifact);
        assert!(shown.is_some_and(|a| a.ptr_eq(&artifact)));

        let cleared = targets.lock().get_mut(id).and_then(Surface::clear);
        assert!(cleared.is_some());
        assert!(targets.content(id).is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn removed_ids_never_come_back(ops in prop::collection::vec(any::<(bool, u8)>(), 0..200)) {
                let mut arena = TargetArena::new();
                let mut live: Vec<TargetId> = Vec::new();
                let mut dead: Vec<TargetId> = Vec::new();

                for (insert, pick) in ops {
                    if insert || live.is_empty() {
                        live.push(arena.insert());
                    } else {
                        let id = live.swap_remove(usize::from(pick) % live.len());
                        prop_assert!(arena.remove(id).is_some());
                        dead.push(id);
                    }
                }

                prop_assert_eq!(arena.len(), live.len());
                for id in &live {
                    prop_assert!(arena.is_live(*id));
                }
                for id in &dead {
                    prop_assert!(!arena.is_live(*id), "stale id {:?} resolved", id);
                    prop_assert!(!arena.is_still_mine(*id, RequestId::from_raw(1)));
                }
            }
        }
    }
}
