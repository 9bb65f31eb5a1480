use glam::DVec2;

use crate::error::{Result, SimError};
use crate::math::Aabb;

/// Scene-local insertion order. Physics and snapshots iterate by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyKind {
    Player,
    Enemy,
    PlayerBullet,
    EnemyBullet,
    TileCollider,
    Pickup,
    /// Game-defined kinds the core has no built-in behaviour for.
    Other(u16),
}

impl BodyKind {
    pub fn is_tile(self) -> bool {
        self == BodyKind::TileCollider
    }

    pub fn is_bullet(self) -> bool {
        matches!(self, BodyKind::PlayerBullet | BodyKind::EnemyBullet)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AttackType {
    #[default]
    Single,
    Radial,
}

/// Health and offence for anything that can fight or be hurt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Combat {
    pub health: f64,
    pub attack: f64,
    /// Seconds between shots.
    pub cooldown: f64,
    /// Time left until the next shot is allowed.
    pub reload: f64,
    pub invulnerability_timer: f64,
    /// Value the timer is reset to after a landed hit.
    pub invulnerability_duration: f64,
    pub speed: f64,
    pub attack_type: AttackType,
}

impl Combat {
    pub fn new(health: f64, attack: f64) -> Self {
        Self {
            health,
            attack,
            cooldown: 0.0,
            reload: 0.0,
            invulnerability_timer: 0.0,
            invulnerability_duration: 0.0,
            speed: 0.0,
            attack_type: AttackType::Single,
        }
    }

    pub fn with_cooldown(mut self, cooldown: f64) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_invulnerability(mut self, duration: f64) -> Self {
        self.invulnerability_duration = duration;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_attack_type(mut self, attack_type: AttackType) -> Self {
        self.attack_type = attack_type;
        self
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability_timer > 0.0
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    pub fn ready_to_fire(&self) -> bool {
        self.reload <= 0.0
    }

    fn tick_timers(&mut self, dt: f64) {
        self.invulnerability_timer = (self.invulnerability_timer - dt).max(0.0);
        self.reload = (self.reload - dt).max(0.0);
    }
}

/// What a projectile delivers on impact.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Payload {
    pub attack: f64,
    pub knockback: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progression {
    pub level: u32,
    pub experience: f64,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickupEffect {
    Heal(f64),
    Experience(f64),
    Attack(f64),
    Speed(f64),
    CooldownScale(f64),
    InvulnerabilityScale(f64),
}

impl PickupEffect {
    /// Applies the effect to whichever facets `stats` carries. Returns
    /// `false` when the facet the effect needs is missing.
    pub fn apply(self, stats: &mut Stats) -> bool {
        match (self, stats.combat.as_mut(), stats.progression.as_mut()) {
            (PickupEffect::Heal(amount), Some(combat), _) => combat.health += amount,
            (PickupEffect::Attack(amount), Some(combat), _) => combat.attack += amount,
            (PickupEffect::Speed(amount), Some(combat), _) => combat.speed += amount,
            (PickupEffect::CooldownScale(factor), Some(combat), _) => combat.cooldown *= factor,
            (PickupEffect::InvulnerabilityScale(factor), Some(combat), _) => {
                combat.invulnerability_duration *= factor
            }
            (PickupEffect::Experience(amount), _, Some(progression)) => {
                progression.experience += amount
            }
            _ => return false,
        }

        true
    }
}

/// Capability facets. A factory attaches only what the body kind uses.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Stats {
    pub combat: Option<Combat>,
    pub payload: Option<Payload>,
    pub progression: Option<Progression>,
    pub pickup: Option<PickupEffect>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    kind: BodyKind,
    position: DVec2,
    velocity: DVec2,
    accumulated_force: DVec2,
    mass: f64,
    half_extents: DVec2,
    hitbox: Aabb,
    solid: bool,
    stats: Stats,
    marked_for_removal: bool,
}

impl Body {
    /// `mass` may be `f64::INFINITY` for bodies that never accelerate.
    pub fn new(kind: BodyKind, position: DVec2, half_extents: DVec2, mass: f64) -> Result<Self> {
        if mass.is_nan() || mass <= 0.0 {
            return Err(SimError::Configuration(format!(
                "{kind:?} needs a positive mass, got {mass}"
            )));
        }

        if !position.is_finite() {
            return Err(SimError::Configuration(format!(
                "{kind:?} spawned at non-finite position {position}"
            )));
        }

        if !half_extents.is_finite() || half_extents.min_element() < 0.0 {
            return Err(SimError::Configuration(format!(
                "{kind:?} has invalid half extents {half_extents}"
            )));
        }

        Ok(Self {
            kind,
            position,
            velocity: DVec2::ZERO,
            accumulated_force: DVec2::ZERO,
            mass,
            half_extents,
            hitbox: Aabb::from_center(position, half_extents),
            solid: true,
            stats: Stats::default(),
            marked_for_removal: false,
        })
    }

    /// Static collider covering `rect`.
    pub fn tile(rect: Aabb, solid: bool) -> Result<Self> {
        let mut body = Self::new(
            BodyKind::TileCollider,
            rect.center(),
            rect.half_extents(),
            f64::INFINITY,
        )?;
        body.solid = solid;

        Ok(body)
    }

    pub fn with_velocity(mut self, velocity: DVec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_combat(mut self, combat: Combat) -> Self {
        self.stats.combat = Some(combat);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.stats.payload = Some(payload);
        self
    }

    pub fn with_progression(mut self, progression: Progression) -> Self {
        self.stats.progression = Some(progression);
        self
    }

    pub fn with_pickup(mut self, effect: PickupEffect) -> Self {
        self.stats.pickup = Some(effect);
        self
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    pub fn accumulated_force(&self) -> DVec2 {
        self.accumulated_force
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn half_extents(&self) -> DVec2 {
        self.half_extents
    }

    pub fn hitbox(&self) -> Aabb {
        self.hitbox
    }

    pub fn is_solid(&self) -> bool {
        self.solid
    }

    pub fn is_static(&self) -> bool {
        self.mass.is_infinite()
    }

    pub fn set_velocity(&mut self, velocity: DVec2) {
        self.velocity = velocity;
    }

    pub fn set_position(&mut self, position: DVec2) {
        self.position = position;
        self.hitbox = Aabb::from_center(position, self.half_extents);
    }

    pub fn translate(&mut self, offset: DVec2) {
        self.set_position(self.position + offset);
    }

    pub fn apply_force(&mut self, force: DVec2) {
        self.accumulated_force += force;
    }

    /// Semi-implicit Euler step. Consumes the accumulated force.
    pub fn integrate(&mut self, dt: f64) {
        if !self.is_static() {
            self.velocity += self.accumulated_force / self.mass * dt;
        }

        self.set_position(self.position + self.velocity * dt);
        self.accumulated_force = DVec2::ZERO;
    }

    pub fn tick_timers(&mut self, dt: f64) {
        if let Some(combat) = self.stats.combat.as_mut() {
            combat.tick_timers(dt);
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn set_stats(&mut self, stats: Stats) {
        self.stats = stats;
    }

    pub fn combat(&self) -> Option<&Combat> {
        self.stats.combat.as_ref()
    }

    pub fn mark_for_removal(&mut self) {
        self.marked_for_removal = true;
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.marked_for_removal
    }

    /// Due for the end-of-tick sweep.
    pub fn is_expired(&self) -> bool {
        self.marked_for_removal || self.combat().is_some_and(Combat::is_dead)
    }
}
