//! Детерминизм-тесты
//!
//! Полная симуляция (perception → decision → FSM → physics) с одинаковым
//! seed обязана давать идентичные снепшоты мира: единственный источник
//! случайности — DeterministicRng (patrol точки, escape направления).

use bevy::prelude::*;

use nightward_simulation::*;

/// Прогоняет boss encounter и возвращает snapshot позиций + HP
fn run_encounter_and_snapshot(seed: u64, ticks: usize) -> Vec<u8> {
    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin);

    let mut commands = app.world_mut().commands();
    spawn_rampage(&mut commands, RampageConfig::default(), Vec3::ZERO, 1);
    app.world_mut().flush();

    app.world_mut().spawn((
        Actor { faction_id: 2 },
        Health::new(100),
        Transform::from_translation(Vec3::new(0.0, 0.0, -12.0)),
        PhysicsBody::default(),
        KinematicController::default(),
    ));

    for _ in 0..ticks {
        step_simulation(&mut app);
    }

    let mut snapshot = world_snapshot::<Transform>(app.world_mut());
    snapshot.extend(world_snapshot::<Health>(app.world_mut()));
    snapshot
}

#[test]
fn test_determinism_same_seed() {
    const SEED: u64 = 12345;
    const TICKS: usize = 600;

    let snapshot1 = run_encounter_and_snapshot(SEED, TICKS);
    let snapshot2 = run_encounter_and_snapshot(SEED, TICKS);

    assert_eq!(
        snapshot1, snapshot2,
        "Симуляция с одинаковым seed ({}) дала разные результаты!",
        SEED
    );
}

#[test]
fn test_determinism_multiple_runs() {
    const SEED: u64 = 42;
    const TICKS: usize = 300;

    let snapshots: Vec<_> = (0..3)
        .map(|_| run_encounter_and_snapshot(SEED, TICKS))
        .collect();

    for (run, snapshot) in snapshots.iter().enumerate().skip(1) {
        assert_eq!(
            snapshots[0], *snapshot,
            "Прогон {} дал результат отличный от прогона 0",
            run
        );
    }
}

#[test]
fn test_invariants_hold_over_long_run() {
    let mut app = create_headless_app(99);
    app.add_plugins(SimulationPlugin);

    let mut commands = app.world_mut().commands();
    let boss = spawn_rampage(&mut commands, RampageConfig::default(), Vec3::ZERO, 1);
    app.world_mut().flush();

    let survivor = app
        .world_mut()
        .spawn((
            Actor { faction_id: 2 },
            Health::new(100),
            Transform::from_translation(Vec3::new(0.0, 0.0, -8.0)),
            PhysicsBody::default(),
            KinematicController::default(),
        ))
        .id();

    for tick in 0..600 {
        step_simulation(&mut app);

        // Health инвариант: 0 <= current <= max
        for entity in [boss, survivor] {
            if let Some(health) = app.world().get::<Health>(entity) {
                assert!(
                    health.current <= health.max,
                    "Tick {}: health {} > max {}",
                    tick,
                    health.current,
                    health.max
                );
            }
        }

        // Ровно одно активное состояние: сам компонент — инвариант по
        // построению; проверяем что машина жива и не в NaN позиции
        let transform = app.world().get::<Transform>(boss).unwrap();
        assert!(
            transform.translation.is_finite(),
            "Tick {}: non-finite position {:?}",
            tick,
            transform.translation
        );
    }
}
