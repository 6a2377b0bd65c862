//! Headless симуляция NIGHTWARD
//!
//! Прогоняет scripted boss encounter без рендера: выживший подходит к
//! Rampage, тот проходит Patrol → Chase → Charge цикл. Переходы состояний
//! печатаются в консоль.

use bevy::prelude::*;
use nightward_simulation::{
    create_headless_app, spawn_rampage, step_simulation, Actor, Health, KinematicController,
    PhysicsBody, RampageConfig, SimulationPlugin, StateChanged,
};

fn main() {
    let seed = 42;
    println!("Starting NIGHTWARD headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin);

    // Rampage в центре арены
    let mut commands = app.world_mut().commands();
    spawn_rampage(&mut commands, RampageConfig::default(), Vec3::ZERO, 1);

    // Выживший в 20м строго перед агентом (forward = -Z)
    let survivor = commands
        .spawn((
            Actor { faction_id: 2 },
            Health::new(100),
            Transform::from_translation(Vec3::new(0.0, 0.0, -20.0)),
            PhysicsBody::default(),
            KinematicController::default(),
        ))
        .id();
    app.world_mut().flush();

    let mut cursor = app
        .world()
        .resource::<Events<StateChanged>>()
        .get_cursor();

    // 30 секунд симуляции; выживший медленно идёт на агента
    for tick in 0..1800 {
        if tick % 10 == 0 {
            if let Some(mut transform) = app.world_mut().get_mut::<Transform>(survivor) {
                if transform.translation.z < -4.0 {
                    transform.translation.z += 0.1;
                }
            }
        }

        step_simulation(&mut app);

        let events = app.world().resource::<Events<StateChanged>>();
        for event in cursor.read(events) {
            println!(
                "tick {:4}: {:?} {} -> {}",
                tick, event.agent, event.from, event.to
            );
        }
    }

    println!("Simulation complete!");
}
