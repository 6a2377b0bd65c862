//! Rampage boss integration tests
//!
//! Headless прогон полного boss цикла: Patrol → Chase → ChargeWindup →
//! Charging (залоченный вектор) → PanelOpen → Disabled → Exploding,
//! плюс граничные свойства подсистем на уровне App.

use bevy::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nightward_simulation::*;

/// Helper: App с SimulationPlugin + записывающим audio sink'ом
fn create_app(seed: u64) -> (App, Arc<Mutex<Vec<String>>>) {
    let mut app = create_headless_app(seed);
    let (sink, calls) = RecordingAudio::new();
    app.insert_resource(AudioChannel::new(Box::new(sink)));
    app.add_plugins(SimulationPlugin);
    (app, calls)
}

/// Helper: спавн босса с конфигом
fn spawn_boss(app: &mut App, config: RampageConfig, position: Vec3) -> Entity {
    let mut commands = app.world_mut().commands();
    let entity = spawn_rampage(&mut commands, config, position, 1);
    app.world_mut().flush();
    entity
}

/// Helper: спавн выжившего (цель босса)
fn spawn_survivor(app: &mut App, position: Vec3) -> Entity {
    app.world_mut()
        .spawn((
            Actor { faction_id: 2 },
            Health::new(100),
            Transform::from_translation(position),
            PhysicsBody::default(),
            KinematicController::default(),
        ))
        .id()
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        step_simulation(app);
    }
}

/// Helper: вся история событий типа T с начала прогона
fn collect_events<T: Event + Clone>(app: &App) -> Vec<T> {
    let events = app.world().resource::<Events<T>>();
    let mut cursor = events.get_cursor();
    cursor.read(events).cloned().collect()
}

fn state_name(app: &App, agent: Entity) -> &'static str {
    app.world().get::<AgentState>(agent).unwrap().name()
}

fn set_position(app: &mut App, entity: Entity, position: Vec3) {
    app.world_mut()
        .get_mut::<Transform>(entity)
        .unwrap()
        .translation = position;
}

fn position_of(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

fn health_of(app: &App, entity: Entity) -> u32 {
    app.world().get::<Health>(entity).unwrap().current
}

/// Конфиг для сценариев: full-circle vision чтобы тесты не зависели от
/// текущего разворота модели
fn scenario_config() -> RampageConfig {
    let mut config = RampageConfig::default();
    config.vision.sight_angle_deg = 360.0;
    config
}

#[test]
fn test_full_boss_scenario() {
    let (mut app, _calls) = create_app(42);
    let config = scenario_config();
    let hp_loss = config.hp_loss_on_wall_hit;
    let panels_exposed = config.panels_on_wall_hit;
    let boss = spawn_boss(&mut app, config, Vec3::ZERO);

    // Выживший в 20м: вне sight_range 15 → Patrol
    let survivor = spawn_survivor(&mut app, Vec3::new(0.0, 0.0, -20.0));
    run_ticks(&mut app, 3);
    assert_eq!(state_name(&app, boss), "Patrol");

    // Цель входит в видимость (10м) → Chase
    set_position(&mut app, survivor, Vec3::new(0.0, 0.0, -10.0));
    run_ticks(&mut app, 2);
    assert_eq!(state_name(&app, boss), "Chase");

    // Цель входит в attack radius (4м) → ChargeWindup
    let boss_position = position_of(&app, boss);
    set_position(&mut app, survivor, boss_position + Vec3::new(0.0, 0.0, -4.0));
    run_ticks(&mut app, 2);
    assert_eq!(state_name(&app, boss), "ChargeWindup");

    // Casting time истекает → Charging с залоченным вектором
    advance_simulation(&mut app, Duration::from_secs_f32(1.0));
    assert_eq!(state_name(&app, boss), "Charging");

    let locked = {
        let state = app.world().get::<AgentState>(boss).unwrap();
        let AgentState::Charging { charge } = state else {
            panic!("expected Charging");
        };
        charge.target
    };

    // Commit-семантика: цель сместилась, но направление charge'а не меняется
    let survivor_pos = position_of(&app, survivor);
    set_position(&mut app, survivor, survivor_pos + Vec3::new(5.0, 0.0, 0.0));
    run_ticks(&mut app, 5);
    {
        let state = app.world().get::<AgentState>(boss).unwrap();
        let AgentState::Charging { charge } = state else {
            panic!("charge ended prematurely");
        };
        assert_eq!(charge.target.direction, locked.direction);
        assert_eq!(charge.target.target_point, locked.target_point);
    }

    // Стена без cushion: -HP, панели открываются → PanelOpen
    let hp_before_wall = health_of(&app, boss);
    let contact_point = position_of(&app, boss);
    app.world_mut().send_event(ChargeContact {
        agent: boss,
        surface: ContactSurface::Wall,
        other: None,
        point: contact_point,
    });
    run_ticks(&mut app, 1);
    assert_eq!(state_name(&app, boss), "PanelOpen");
    assert_eq!(health_of(&app, boss), hp_before_wall - hp_loss);
    assert_eq!(
        app.world().get::<PanelArray>(boss).unwrap().panel_health(),
        panels_exposed as u32
    );

    // Все панели выбиты → Disabled
    for index in 0..panels_exposed {
        app.world_mut().send_event(PanelHit {
            agent: boss,
            panel_index: index,
            amount: 1,
        });
    }
    run_ticks(&mut app, 2);
    assert_eq!(state_name(&app, boss), "Disabled");

    let depleted = collect_events::<PanelsDepleted>(&app);
    assert_eq!(depleted.len(), 1, "PanelsDepleted ровно один раз");

    // Выжившего ставим на известную дистанцию от эпицентра
    let boss_position = position_of(&app, boss);
    set_position(&mut app, survivor, boss_position + Vec3::new(3.0, 0.0, 0.0));
    let survivor_hp_before = health_of(&app, survivor);

    // Ядро уязвимо в Disabled: добиваем → Exploding + one-shot детонация
    app.world_mut().send_event(DamageRampage {
        target: boss,
        amount: 200,
        damage_type: DamageType::Direct,
    });
    run_ticks(&mut app, 2);
    assert_eq!(health_of(&app, boss), 0);
    assert_eq!(state_name(&app, boss), "Exploding");
    assert!(app.world().get::<Exploded>(boss).is_some());
    assert!(app.world().get::<Dead>(boss).is_some());

    // Урон по выжившему: lerp max→min на дистанции 3 из damage_radius 8
    let expected_damage = {
        let config = app.world().get::<RampageConfig>(boss).unwrap();
        let max = config.explosion.max_damage as f32;
        let min = config.explosion.min_damage as f32;
        (max + (min - max) * (3.0 / config.explosion.damage_radius)).round() as u32
    };
    assert_eq!(health_of(&app, survivor), survivor_hp_before - expected_damage);

    // Idempotence: форсированный повторный вход в Exploding не стреляет
    app.world_mut().send_event(DebugCommand {
        agent: boss,
        action: DebugAction::ExplodeNow,
    });
    run_ticks(&mut app, 2);
    assert_eq!(health_of(&app, survivor), survivor_hp_before - expected_damage);

    // Последовательность переходов зафиксирована событиями
    let transitions: Vec<(&str, &str)> = collect_events::<StateChanged>(&app)
        .iter()
        .map(|e| (e.from, e.to))
        .collect();
    let expected_prefix = [
        ("Idle", "Patrol"),
        ("Patrol", "Chase"),
        ("Chase", "ChargeWindup"),
        ("ChargeWindup", "Charging"),
        ("Charging", "PanelOpen"),
        ("PanelOpen", "Disabled"),
        ("Disabled", "Exploding"),
    ];
    assert!(
        transitions.starts_with(&expected_prefix),
        "unexpected transition sequence: {:?}",
        transitions
    );
}

#[test]
fn test_cushion_absorbs_charge_into_stun() {
    let (mut app, _calls) = create_app(7);
    let config = scenario_config();
    let boss = spawn_boss(&mut app, config, Vec3::ZERO);
    let _survivor = spawn_survivor(&mut app, Vec3::new(0.0, 0.0, -4.0));

    // Доводим до Charging
    run_ticks(&mut app, 3);
    advance_simulation(&mut app, Duration::from_secs_f32(1.0));
    assert_eq!(state_name(&app, boss), "Charging");

    let hp_before = health_of(&app, boss);
    let cushion = app.world_mut().spawn(Transform::default()).id();
    let boss_point = position_of(&app, boss);
    app.world_mut().send_event(ChargeContact {
        agent: boss,
        surface: ContactSurface::Cushion,
        other: Some(cushion),
        point: boss_point,
    });
    run_ticks(&mut app, 1);

    // Cushion поглотил удар: HP цел, панели закрыты, агент оглушён
    assert_eq!(state_name(&app, boss), "Stunned");
    assert_eq!(health_of(&app, boss), hp_before);
    assert_eq!(app.world().get::<PanelArray>(boss).unwrap().open_count(), 0);

    let impacts = collect_events::<CushionImpact>(&app);
    assert_eq!(impacts.len(), 1);
    assert_eq!(impacts[0].cushion, Some(cushion));

    // Stun истекает → возвращаемся к преследованию (цель всё ещё видна)
    advance_simulation(&mut app, Duration::from_secs_f32(3.0));
    assert_eq!(state_name(&app, boss), "Chase");
}

#[test]
fn test_rush_damage_applied_once_per_charge() {
    let (mut app, calls) = create_app(11);
    let config = scenario_config();
    let rush_damage = config.charge.rush_damage;
    let boss = spawn_boss(&mut app, config, Vec3::ZERO);
    let survivor = spawn_survivor(&mut app, Vec3::new(0.0, 0.0, -4.0));

    run_ticks(&mut app, 3);
    advance_simulation(&mut app, Duration::from_secs_f32(1.0));
    assert_eq!(state_name(&app, boss), "Charging");

    // Два контакта с целью за один charge — урон один, звук оба раза
    for _ in 0..2 {
        let boss_point = position_of(&app, boss);
        app.world_mut().send_event(ChargeContact {
            agent: boss,
            surface: ContactSurface::Player,
            other: Some(survivor),
            point: boss_point,
        });
        run_ticks(&mut app, 1);
    }

    assert_eq!(health_of(&app, survivor), 100 - rush_damage);

    let recorded = calls.lock().unwrap();
    let rush_sounds = recorded
        .iter()
        .filter(|c| c.contains("rush_hit"))
        .count();
    assert_eq!(rush_sounds, 2, "звук контакта — на каждый контакт");
}

#[test]
fn test_take_damage_is_noop_outside_disabled() {
    let (mut app, calls) = create_app(3);
    let boss = spawn_boss(&mut app, scenario_config(), Vec3::ZERO);
    run_ticks(&mut app, 2); // Idle → Patrol

    let hp_before = health_of(&app, boss);
    app.world_mut().send_event(DamageRampage {
        target: boss,
        amount: 50,
        damage_type: DamageType::Direct,
    });
    run_ticks(&mut app, 1);

    // Броня закрыта: HP нетронут, но звуковой cue отработал
    assert_eq!(health_of(&app, boss), hp_before);
    let recorded = calls.lock().unwrap();
    assert!(recorded.iter().any(|c| c.contains("hurt")));
}

#[test]
fn test_center_attack_overrides_and_returns_to_patrol() {
    let (mut app, _calls) = create_app(5);
    let mut config = scenario_config();
    config.center_point = [6.0, 0.0, 0.0];
    let duration = config.center_attack_duration;
    let boss = spawn_boss(&mut app, config, Vec3::ZERO);
    let _survivor = spawn_survivor(&mut app, Vec3::new(0.0, 0.0, -30.0));

    run_ticks(&mut app, 2);
    app.world_mut().send_event(CenterAttackRequested { agent: boss });
    run_ticks(&mut app, 1);
    assert_eq!(state_name(&app, boss), "CenterAttack");
    assert_eq!(
        *app.world().get::<MovementCommand>(boss).unwrap(),
        MovementCommand::MoveToPosition {
            target: Vec3::new(6.0, 0.0, 0.0)
        }
    );

    // Фиксированная длительность вышла → Patrol
    advance_simulation(&mut app, Duration::from_secs_f32(duration + 0.1));
    assert_eq!(state_name(&app, boss), "Patrol");
}

#[test]
fn test_stuck_detector_signals_once_and_recovers() {
    let (mut app, _calls) = create_app(13);
    let boss = spawn_boss(&mut app, scenario_config(), Vec3::ZERO);
    let _survivor = spawn_survivor(&mut app, Vec3::new(0.0, 0.0, -10.0));

    run_ticks(&mut app, 3);
    assert_eq!(state_name(&app, boss), "Chase");

    // Симулируем непроходимое препятствие: тело заморожено, Chase активен
    app.world_mut()
        .get_mut::<PhysicsBody>(boss)
        .unwrap()
        .set_frozen(true);

    // ~6 секунд: окно заполняется и порог времени превышается один раз
    run_ticks(&mut app, 360);

    let window = app.world().get::<StuckWindow>(boss).unwrap();
    assert_eq!(window.stuck_count, 1, "stuck сигналит ровно один раз");

    let signals = collect_events::<StuckDetected>(&app);
    assert_eq!(signals.len(), 1);
}

#[test]
fn test_charge_exhausts_without_contact() {
    let (mut app, _calls) = create_app(17);
    let config = scenario_config();
    let max_duration = config.charge.max_duration;
    let boss = spawn_boss(&mut app, config, Vec3::ZERO);
    let _survivor = spawn_survivor(&mut app, Vec3::new(0.0, 0.0, -4.0));

    run_ticks(&mut app, 3);
    advance_simulation(&mut app, Duration::from_secs_f32(1.0));
    assert_eq!(state_name(&app, boss), "Charging");

    // Никаких контактов: скорость расходуется / max duration истекает,
    // управление возвращается state machine
    let mut ticks = 0;
    while state_name(&app, boss) == "Charging" {
        step_simulation(&mut app);
        ticks += 1;
        assert!(
            (ticks as f32) / 60.0 <= max_duration + 1.0,
            "charge обязан завершиться по таймеру"
        );
    }
    assert!(matches!(state_name(&app, boss), "Chase" | "Patrol"));
}
