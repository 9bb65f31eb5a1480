pub mod collision;
pub mod components;
pub mod config;
pub mod error;
pub mod forces;
pub mod math;
pub mod scene;
pub mod spatial;
pub mod spawn;
pub mod systems;

pub use collision::{CollisionEvent, CollisionHandler, CollisionTable, Interaction};
pub use components::{
    AttackType, Body, BodyKind, Combat, Payload, PickupEffect, Progression, Stats,
};
pub use config::{BulletConfig, SimConfig};
pub use error::{Result, SimError};
pub use forces::{ForceHandle, ForceKind, Lifetime};
pub use math::{Aabb, Axis};
pub use scene::{BodyHandle, RemovedBody, Scene, SceneBody, TickReport};
