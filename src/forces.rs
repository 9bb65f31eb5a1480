//! Force rules attached to bodies by handle.
//!
//! Entries never hold a body directly; they name it by [`BodyHandle`], and
//! the registry is pruned against the scene's live handles before anything
//! is computed.

use std::collections::HashMap;

use glam::DVec2;
use slotmap::{SlotMap, new_key_type};
use tracing::trace;

use crate::math::unit;
use crate::scene::BodyHandle;

new_key_type! { pub struct ForceHandle; }

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ForceKind {
    /// Pushes the target by `F` and the partner, if any, by `-F`.
    Constant(DVec2),
    Spring { stiffness: f64, rest_length: f64 },
    AnchoredSpring { anchor: DVec2, stiffness: f64, rest_length: f64 },
    Drag { coefficient: f64 },
    Attraction { strength: f64, min_distance: f64 },
    /// Momentum change `J`. Delivered as `J / dt` over the next step with a
    /// positive `dt`, so the velocity change is `J / m` whatever the frame
    /// time. Meant to be registered as one-shot.
    Impulse(DVec2),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifetime {
    OneShot,
    Persistent,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceEntry {
    pub kind: ForceKind,
    pub target: BodyHandle,
    pub partner: Option<BodyHandle>,
    pub lifetime: Lifetime,
}

/// Kinematic state a force rule reads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub position: DVec2,
    pub velocity: DVec2,
    pub mass: f64,
}

impl ForceEntry {
    pub fn touches(&self, handle: BodyHandle) -> bool {
        self.target == handle || self.partner == Some(handle)
    }

    /// Forces on `(target, partner)`. Anything non-finite collapses to zero.
    pub fn compute(&self, target: &BodyState, partner: Option<&BodyState>) -> (DVec2, DVec2) {
        let (on_target, on_partner) = match (self.kind, partner) {
            (ForceKind::Constant(force) | ForceKind::Impulse(force), _) => (force, -force),

            (ForceKind::Spring { stiffness, rest_length }, Some(partner)) => {
                let force = spring(target.position, partner.position, stiffness, rest_length);
                (force, -force)
            }

            (
                ForceKind::AnchoredSpring {
                    anchor,
                    stiffness,
                    rest_length,
                },
                _,
            ) => (spring(target.position, anchor, stiffness, rest_length), DVec2::ZERO),

            (ForceKind::Drag { coefficient }, _) => (-coefficient * target.velocity, DVec2::ZERO),

            (ForceKind::Attraction { strength, min_distance }, Some(partner)) => {
                let offset = partner.position - target.position;
                let distance = offset.length();

                if distance < min_distance {
                    (DVec2::ZERO, DVec2::ZERO)
                } else {
                    let force = unit(offset) * strength * target.mass * partner.mass
                        / (distance * distance);
                    (force, -force)
                }
            }

            // two-body rule registered without a partner
            (ForceKind::Spring { .. } | ForceKind::Attraction { .. }, None) => {
                (DVec2::ZERO, DVec2::ZERO)
            }
        };

        (finite_or_zero(on_target), finite_or_zero(on_partner))
    }
}

/// Hooke's law pulling `position` toward `rest_length` from `other`.
fn spring(position: DVec2, other: DVec2, stiffness: f64, rest_length: f64) -> DVec2 {
    let offset = position - other;
    let stretch = offset.length() - rest_length;

    -stiffness * stretch * unit(offset)
}

fn finite_or_zero(v: DVec2) -> DVec2 {
    if v.is_finite() { v } else { DVec2::ZERO }
}

#[derive(Debug, Default)]
pub struct ForceRegistry {
    entries: SlotMap<ForceHandle, ForceEntry>,
}

impl ForceRegistry {
    pub fn register(
        &mut self,
        kind: ForceKind,
        target: BodyHandle,
        partner: Option<BodyHandle>,
        lifetime: Lifetime,
    ) -> ForceHandle {
        self.entries.insert(ForceEntry {
            kind,
            target,
            partner,
            lifetime,
        })
    }

    pub fn unregister(&mut self, handle: ForceHandle) -> Option<ForceEntry> {
        self.entries.remove(handle)
    }

    pub fn get(&self, handle: ForceHandle) -> Option<&ForceEntry> {
        self.entries.get(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry that references a body `is_live` rejects.
    /// Returns how many were dropped.
    pub fn prune(&mut self, mut is_live: impl FnMut(BodyHandle) -> bool) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| is_live(entry.target) && entry.partner.is_none_or(&mut is_live));

        before - self.entries.len()
    }

    /// Computes every entry against `states` and returns the summed force per
    /// body, in registry order. One-shot entries are consumed. Impulses wait
    /// for a step with a positive `dt`.
    pub fn accumulate(
        &mut self,
        states: &HashMap<BodyHandle, BodyState>,
        dt: f64,
    ) -> Vec<(BodyHandle, DVec2)> {
        let mut totals: Vec<(BodyHandle, DVec2)> = Vec::new();
        let mut add = |handle: BodyHandle, force: DVec2| {
            if force == DVec2::ZERO {
                return;
            }

            match totals.iter_mut().find(|(h, _)| *h == handle) {
                Some((_, total)) => *total += force,
                None => totals.push((handle, force)),
            }
        };

        let mut spent = Vec::new();
        for (key, entry) in self.entries.iter() {
            let Some(target) = states.get(&entry.target) else {
                continue;
            };
            let partner = entry.partner.and_then(|p| states.get(&p));

            let (mut on_target, mut on_partner) = entry.compute(target, partner);
            if let ForceKind::Impulse(_) = entry.kind {
                if dt <= 0.0 {
                    continue;
                }
                on_target /= dt;
                on_partner /= dt;
            }
            add(entry.target, on_target);
            if let Some(p) = entry.partner {
                add(p, on_partner);
            }

            if entry.lifetime == Lifetime::OneShot {
                spent.push(key);
            }
        }

        for key in spent {
            trace!(?key, "one-shot force consumed");
            self.entries.remove(key);
        }

        totals
    }
}
