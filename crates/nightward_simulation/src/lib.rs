//! NIGHTWARD Simulation Core
//!
//! ECS-симуляция enemy AI (strategic layer) на Bevy 0.16:
//! - ECS = game state, perception, utility decisions, FSM, combat rules
//! - Engine bridge = рендер, анимации, navmesh, collision detection
//!
//! Единственный глубокий агент — «Rampage»: charge атака с залоченным
//! вектором, panel/armor health поверх core HP, stuck recovery,
//! терминальный взрыв. Всё frame-stepped, single-threaded, FixedUpdate.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

// Публичные модули
pub mod ai;
pub mod combat;
pub mod components;
pub mod logger;
pub mod perception;
pub mod physics;
pub mod rampage;
pub mod services;

// Re-export базовых типов для удобства
pub use ai::{
    AgentState, CenterAttackRequested, DebugAction, DebugCommand, StateChanged, StateMachine,
    StuckDetected, StuckWindow,
};
pub use combat::{
    ChargeAbility, ChargeContact, ChargeState, ChargeTarget, ContactSurface, CushionImpact,
    DamageDealt, DamageRampage, DamageType, Dead, EntityDied, Exploded, ExplosionTriggered,
    PanelArray, PanelHit, PanelsDepleted,
};
pub use components::*;
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, set_sink,
    set_sink_if_needed, LogLevel, LogSink,
};
pub use perception::{
    LineOfSight, OcclusionWorld, PerceptionEvent, PerceptionSnapshot, TrackedTarget, Vision,
};
pub use physics::{KinematicController, PhysicsBody};
pub use rampage::{spawn_rampage, Rampage};
pub use services::{AudioChannel, AudioSink, NullAudio, RecordingAudio, TimeOfDay};

/// Фазы симуляционного тика — строгий порядок для детерминизма
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    Perception,
    Ai,
    Locomotion,
    Physics,
    Combat,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Fixed timestep 60Hz для simulation tick
        app.insert_resource(Time::<Fixed>::from_hz(60.0));

        // Детерминистичный RNG (seed по умолчанию)
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        // Инжектируемые сервисы — не перетираем если тест/bridge уже вставил
        app.init_resource::<services::TimeOfDay>();
        app.init_resource::<perception::OcclusionWorld>();
        if !app.world().contains_resource::<services::AudioChannel>() {
            app.insert_resource(services::AudioChannel::default());
        }

        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Perception,
                SimulationSet::Ai,
                SimulationSet::Locomotion,
                SimulationSet::Physics,
                SimulationSet::Combat,
            )
                .chain(),
        );

        // Подсистемы (ECS strategic layer)
        app.add_plugins((ai::AIPlugin, combat::CombatPlugin, physics::PhysicsPlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0));

    app
}

/// Один детерминированный шаг симуляции: продвигает Time<Fixed> ровно на
/// timestep и гоняет FixedUpdate напрямую — без real-time аккумулятора.
/// Тесты и headless runner тикают этим, не app.update().
pub fn step_simulation(app: &mut App) {
    let timestep = app.world().resource::<Time<Fixed>>().timestep();
    advance_simulation(app, timestep);
}

/// Шаг с произвольной дельтой (для ускоренной прокрутки таймеров в тестах)
pub fn advance_simulation(app: &mut App, delta: Duration) {
    app.world_mut()
        .resource_mut::<Time<Fixed>>()
        .advance_by(delta);
    app.world_mut().run_schedule(FixedUpdate);
}

/// Snapshot мира для сравнения детерминизма
/// (упрощённая версия: Debug-форматирование, сортировка по Entity ID)
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
