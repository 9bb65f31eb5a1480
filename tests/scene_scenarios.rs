use glam::DVec2;

use tile_arena_sim::{
    Aabb, Axis, Body, BodyKind, BulletConfig, Combat, ForceKind, Interaction, Lifetime,
    PickupEffect, Scene, SimConfig, SimError, spawn,
};

fn bullet_from(
    kind: BodyKind,
    at: DVec2,
    attack: f64,
    velocity: DVec2,
    cfg: &BulletConfig,
) -> Body {
    let shooter = Body::new(kind, at, DVec2::splat(8.0), 1.0)
        .unwrap()
        .with_combat(Combat::new(1.0, attack));

    spawn::bullet(&shooter, velocity, velocity.length(), cfg).unwrap()
}

fn guarded_player(at: DVec2, health: f64) -> Body {
    spawn::player(
        at,
        DVec2::splat(8.0),
        Combat::new(health, 5.0).with_invulnerability(0.5),
    )
    .unwrap()
}

fn crate_box(at: DVec2, mass: f64) -> Body {
    Body::new(BodyKind::Other(0), at, DVec2::ONE, mass).unwrap()
}

fn grunt(at: DVec2, health: f64) -> Body {
    spawn::enemy(at, DVec2::splat(8.0), Combat::new(health, 1.0)).unwrap()
}

#[test]
fn constant_force_integrates_over_one_tick() {
    let mut scene = Scene::default();
    let boxed = scene.add_body(crate_box(DVec2::ZERO, 2.0));
    let push = ForceKind::Constant(DVec2::new(10.0, 0.0));
    scene.add_force(push, boxed, None, Lifetime::Persistent);

    scene.tick(0.1);

    let body = scene.body(boxed).unwrap();
    assert!(body.velocity().abs_diff_eq(DVec2::new(0.5, 0.0), 1e-12));
    assert!(body.position().abs_diff_eq(DVec2::new(0.05, 0.0), 1e-12));
    assert_eq!(body.accumulated_force(), DVec2::ZERO);
}

#[test]
fn infinite_mass_body_never_moves() {
    let mut scene = Scene::default();
    let anchor = scene.add_body(crate_box(DVec2::new(5.0, 5.0), f64::INFINITY));
    let shove = ForceKind::Constant(DVec2::new(1e9, -1e9));
    scene.add_force(shove, anchor, None, Lifetime::Persistent);

    for _ in 0..10 {
        scene.apply_force(anchor, DVec2::splat(1e6));
        scene.tick(0.05);
    }

    assert_eq!(scene.body(anchor).unwrap().position(), DVec2::new(5.0, 5.0));
}

#[test]
fn player_bullet_damages_enemy_and_is_removed() {
    let mut scene = Scene::default();
    let cfg = BulletConfig::default();
    let at = DVec2::new(100.0, 100.0);

    let enemy = scene.add_body(grunt(at, 10.0));
    let bullet = scene.add_body(bullet_from(BodyKind::Player, at, 5.0, DVec2::ZERO, &cfg));

    let report = scene.tick(0.016);

    assert!(report.was_removed(bullet));
    assert!(!scene.contains(bullet));
    assert_eq!(scene.stats(enemy).unwrap().combat.unwrap().health, 5.0);
    assert_eq!(report.contacts.len(), 1);
    assert_eq!(report.contacts[0].source, bullet);
    assert_eq!(report.contacts[0].target, enemy);
    assert!(matches!(
        report.contacts[0].interaction,
        Interaction::Damage { amount, .. } if amount == 5.0
    ));
}

#[test]
fn point_sized_bullet_inside_enemy_does_not_hit() {
    let mut scene = Scene::default();
    let cfg = BulletConfig {
        half_extent: 0.0,
        ..BulletConfig::default()
    };
    let at = DVec2::new(50.0, 50.0);

    let enemy = scene.add_body(grunt(at, 10.0));
    let bullet = scene.add_body(bullet_from(BodyKind::Player, at, 5.0, DVec2::ZERO, &cfg));

    let report = scene.tick(0.016);

    assert!(report.contacts.is_empty());
    assert!(scene.contains(bullet));
    assert_eq!(scene.stats(enemy).unwrap().combat.unwrap().health, 10.0);
}

#[test]
fn lethal_hit_removes_enemy_in_the_same_tick() {
    let mut scene = Scene::default();
    let cfg = BulletConfig::default();

    let enemy = scene.add_body(grunt(DVec2::ZERO, 5.0));
    scene.add_body(bullet_from(BodyKind::Player, DVec2::ZERO, 5.0, DVec2::ZERO, &cfg));

    let report = scene.tick(0.016);

    assert!(report.was_removed(enemy));
    assert_eq!(report.removed_of_kind(BodyKind::Enemy).count(), 1);
    assert!(scene.is_empty());
}

#[test]
fn invulnerability_window_gates_damage() {
    let mut scene = Scene::default();
    let cfg = BulletConfig::default();

    let mut body = guarded_player(DVec2::ZERO, 20.0);
    let mut stats = body.stats();
    stats.combat.as_mut().unwrap().invulnerability_timer = 0.2;
    body.set_stats(stats);
    let player = scene.add_body(body);

    let first = scene.add_body(bullet_from(BodyKind::Enemy, DVec2::ZERO, 5.0, DVec2::ZERO, &cfg));
    let report = scene.tick(0.016);

    assert!(report.was_removed(first));
    assert_eq!(report.contacts[0].interaction, Interaction::Deflected);
    let combat = scene.stats(player).unwrap().combat.unwrap();
    assert_eq!(combat.health, 20.0);
    assert!((combat.invulnerability_timer - 0.184).abs() < 1e-12);

    let mut stats = scene.stats(player).unwrap();
    stats.combat.as_mut().unwrap().invulnerability_timer = 0.0;
    scene.set_stats(player, stats);

    scene.add_body(bullet_from(BodyKind::Enemy, DVec2::ZERO, 5.0, DVec2::ZERO, &cfg));
    scene.tick(0.016);

    let combat = scene.stats(player).unwrap().combat.unwrap();
    assert_eq!(combat.health, 15.0);
    assert_eq!(combat.invulnerability_timer, 0.5);
}

#[test]
fn tile_push_out_is_idempotent() {
    let mut scene = Scene::default();
    scene.add_tiles([Aabb::new(0.0, 0.0, 32.0, 32.0)], true).unwrap();

    let body = spawn::player(DVec2::new(40.0, 16.0), DVec2::splat(10.0), Combat::new(10.0, 1.0))
        .unwrap()
        .with_velocity(DVec2::new(-30.0, 4.0));
    let player = scene.add_body(body);

    let first = scene.tick(0.0);
    assert_eq!(first.contacts.len(), 1);
    assert_eq!(
        first.contacts[0].interaction,
        Interaction::Blocked {
            axis: Axis::X,
            correction: 2.0
        }
    );
    let resolved = scene.body(player).unwrap();
    assert_eq!(resolved.position(), DVec2::new(42.0, 16.0));
    assert_eq!(resolved.velocity(), DVec2::new(0.0, 4.0));

    let second = scene.tick(0.0);
    assert!(second.contacts.is_empty());
    assert_eq!(scene.body(player).unwrap().position(), DVec2::new(42.0, 16.0));
}

#[test]
fn stacked_tiles_leave_no_overlap() {
    let mut scene = Scene::default();
    let upper = Aabb::new(0.0, 0.0, 32.0, 32.0);
    let lower = Aabb::new(0.0, 32.0, 32.0, 32.0);
    scene.add_tiles([upper, lower], true).unwrap();

    let buried = spawn::player(DVec2::new(19.0, 21.0), DVec2::splat(9.0), Combat::new(10.0, 1.0));
    let player = scene.add_body(buried.unwrap());

    scene.tick(0.0);

    let hitbox = scene.body(player).unwrap().hitbox();
    assert!(!hitbox.overlaps(&upper));
    assert!(!hitbox.overlaps(&lower));
}

#[test]
fn removed_tile_stops_blocking_immediately() {
    let mut scene = Scene::default();
    let tiles = scene.add_tiles([Aabb::new(0.0, 0.0, 32.0, 32.0)], true).unwrap();

    let body = spawn::player(DVec2::new(40.0, 16.0), DVec2::splat(10.0), Combat::new(10.0, 1.0));
    let player = scene.add_body(body.unwrap());

    assert!(scene.remove_body(tiles[0]));
    let report = scene.tick(0.0);

    assert!(report.contacts.is_empty());
    assert!(report.was_removed(tiles[0]));
    assert_eq!(scene.body(player).unwrap().position(), DVec2::new(40.0, 16.0));
}

#[test]
fn enemy_bullet_hits_player_end_to_end() {
    let mut scene = Scene::default();
    let cfg = BulletConfig::default();

    let player = scene.add_body(guarded_player(DVec2::ZERO, 20.0));
    let bullet = scene.add_body(bullet_from(BodyKind::Enemy, DVec2::ZERO, 5.0, DVec2::ZERO, &cfg));

    scene.tick(0.016);

    let combat = scene.stats(player).unwrap().combat.unwrap();
    assert_eq!(combat.health, 15.0);
    assert!(combat.invulnerability_timer > 0.0);
    assert!(!scene.contains(bullet));
}

#[test]
fn bullets_stop_at_solid_walls() {
    let mut scene = Scene::default();
    let cfg = BulletConfig::default();
    scene.add_tiles([Aabb::new(0.0, 0.0, 32.0, 32.0)], true).unwrap();

    let shot = bullet_from(BodyKind::Player, DVec2::new(16.0, 16.0), 1.0, DVec2::X, &cfg);
    let bullet = scene.add_body(shot);
    let report = scene.tick(0.016);

    assert!(report.was_removed(bullet));
    assert_eq!(report.contacts[0].interaction, Interaction::Absorbed);
}

#[test]
fn removal_drops_dependent_forces() {
    let mut scene = Scene::default();
    let a = scene.add_body(crate_box(DVec2::ZERO, 1.0));
    let b = scene.add_body(crate_box(DVec2::new(10.0, 0.0), 1.0));
    let spring = ForceKind::Spring {
        stiffness: 1.0,
        rest_length: 5.0,
    };
    scene.add_force(spring, a, Some(b), Lifetime::Persistent);
    scene.add_force(ForceKind::Drag { coefficient: 0.1 }, a, None, Lifetime::Persistent);

    assert!(scene.remove_body(b));
    assert!(scene.contains(b));

    let report = scene.tick(0.016);

    assert!(report.was_removed(b));
    assert!(scene.body(b).is_none());
    assert_eq!(scene.force_count(), 1);
}

#[test]
fn one_shot_impulse_changes_velocity_by_j_over_m() {
    for dt in [0.5, 0.016] {
        let mut scene = Scene::default();
        let body = scene.add_body(crate_box(DVec2::ZERO, 2.0));
        let kick = ForceKind::Impulse(DVec2::new(4.0, 0.0));
        scene.add_force(kick, body, None, Lifetime::OneShot);

        scene.tick(dt);
        let velocity = scene.body(body).unwrap().velocity();
        assert!(velocity.abs_diff_eq(DVec2::new(2.0, 0.0), 1e-9));
        assert_eq!(scene.force_count(), 0);

        scene.tick(dt);
        assert_eq!(scene.body(body).unwrap().velocity(), velocity);
    }
}

#[test]
fn impulse_waits_out_a_zero_step() {
    let mut scene = Scene::default();
    let body = scene.add_body(crate_box(DVec2::ZERO, 1.0));
    let kick = ForceKind::Impulse(DVec2::new(0.0, 3.0));
    scene.add_force(kick, body, None, Lifetime::OneShot);

    scene.tick(0.0);
    assert_eq!(scene.force_count(), 1);
    assert_eq!(scene.body(body).unwrap().velocity(), DVec2::ZERO);

    scene.tick(0.1);
    assert_eq!(scene.force_count(), 0);
    assert!(scene.body(body).unwrap().velocity().abs_diff_eq(DVec2::new(0.0, 3.0), 1e-9));
}

#[test]
fn knockback_pushes_on_the_following_tick() {
    let cfg = BulletConfig {
        knockback: 50.0,
        ..BulletConfig::default()
    };
    let mut scene = Scene::default();

    let enemy = scene.add_body(grunt(DVec2::ZERO, 10.0));
    let shot = bullet_from(BodyKind::Player, DVec2::ZERO, 5.0, DVec2::new(100.0, 0.0), &cfg);
    scene.add_body(shot);

    scene.tick(0.01);
    assert_eq!(scene.body(enemy).unwrap().velocity(), DVec2::ZERO);
    assert_eq!(scene.force_count(), 1);

    scene.tick(0.01);
    let velocity = scene.body(enemy).unwrap().velocity();
    assert!(velocity.abs_diff_eq(DVec2::new(50.0, 0.0), 1e-9));
    assert_eq!(scene.force_count(), 0);
}

#[test]
fn transfer_moves_body_and_leaves_forces_behind() {
    let mut room = Scene::default();
    let mut next_room = Scene::default();

    let player = room.add_body(guarded_player(DVec2::new(3.0, 4.0), 20.0));
    room.add_force(ForceKind::Drag { coefficient: 1.0 }, player, None, Lifetime::Persistent);

    let moved = room.transfer(player, &mut next_room).unwrap();

    assert!(!room.contains(player));
    assert_eq!(room.force_count(), 0);
    let body = next_room.body(moved).unwrap();
    assert_eq!(body.kind(), BodyKind::Player);
    assert_eq!(body.position(), DVec2::new(3.0, 4.0));
    assert!(room.transfer(player, &mut next_room).is_none());
}

#[test]
fn invalid_dt_steps_with_zero() {
    let mut scene = Scene::default();
    let body = scene.add_body(crate_box(DVec2::ZERO, 1.0).with_velocity(DVec2::new(10.0, 0.0)));

    assert_eq!(scene.tick(-1.0).dt, 0.0);
    assert_eq!(scene.tick(f64::NAN).dt, 0.0);
    assert_eq!(scene.body(body).unwrap().position(), DVec2::ZERO);
}

#[test]
fn invalid_config_is_rejected() {
    for tile_size in [0.0, -8.0, f64::NAN] {
        let config = SimConfig {
            tile_size,
            ..SimConfig::default()
        };

        assert!(matches!(Scene::new(config), Err(SimError::Configuration(_))));
    }

    assert!(Scene::new(SimConfig::default()).is_ok());
}

fn stick(a: &mut Body, b: &mut Body) -> Option<Interaction> {
    a.set_velocity(DVec2::ZERO);
    b.set_velocity(DVec2::ZERO);
    Some(Interaction::Absorbed)
}

#[test]
fn custom_handlers_can_be_registered() {
    let mut scene = Scene::default();
    scene
        .collision_table_mut()
        .register(BodyKind::Other(1), BodyKind::Other(2), stick);

    let moving = Body::new(BodyKind::Other(2), DVec2::ZERO, DVec2::ONE, 1.0)
        .unwrap()
        .with_velocity(DVec2::new(3.0, 0.0));
    let still = Body::new(BodyKind::Other(1), DVec2::new(1.0, 0.0), DVec2::ONE, 1.0).unwrap();
    let a = scene.add_body(moving);
    let b = scene.add_body(still);

    let report = scene.tick(0.01);

    assert_eq!(report.contacts.len(), 1);
    assert_eq!(report.contacts[0].source, b);
    assert_eq!(report.contacts[0].target, a);
    assert_eq!(scene.body(a).unwrap().velocity(), DVec2::ZERO);
}

#[test]
fn snapshot_is_in_insertion_order() {
    let mut scene = Scene::default();
    scene.add_tiles([Aabb::new(100.0, 100.0, 32.0, 32.0)], false).unwrap();
    scene.add_body(guarded_player(DVec2::ZERO, 10.0));
    let coin = spawn::pickup(DVec2::new(50.0, 0.0), DVec2::ONE, PickupEffect::Heal(1.0));
    scene.add_body(coin.unwrap());

    let kinds: Vec<BodyKind> = scene.bodies().into_iter().map(|b| b.body.kind()).collect();
    assert_eq!(kinds, vec![BodyKind::TileCollider, BodyKind::Player, BodyKind::Pickup]);
    assert_eq!(scene.len(), 3);
}
