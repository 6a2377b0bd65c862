//! State machine core: единая точка переходов
//!
//! Все смены состояния идут через change_state() — Exit(старое) и
//! Enter(новое) срабатывают ровно по разу, в этом порядке, синхронно.
//! Никакой переход не может прервать другой: функция полностью
//! завершает side effects до возврата.

use bevy::prelude::*;

use crate::ai::components::{AgentState, StateMachine};
use crate::ai::events::StateChanged;
use crate::ai::stuck::StuckWindow;
use crate::combat::panels::PanelArray;
use crate::components::{NavigationAgent, RampageConfig};
use crate::physics::PhysicsBody;
use crate::services::{cues, AudioChannel};

/// Атомарный переход состояния: Exit(old) → Enter(new) → swap.
///
/// Бампает generation (инвалидация отложенных шагов), сбрасывает stuck
/// окно, шлёт StateChanged. Вызывается только из FixedUpdate систем —
/// single-threaded, реентерабельность исключена по построению.
#[allow(clippy::too_many_arguments)]
pub fn change_state(
    entity: Entity,
    state: &mut AgentState,
    next: AgentState,
    machine: &mut StateMachine,
    body: &mut PhysicsBody,
    nav: &mut NavigationAgent,
    panels: &mut PanelArray,
    stuck: &mut StuckWindow,
    config: &RampageConfig,
    audio: &AudioChannel,
    position: Vec3,
    events: &mut Events<StateChanged>,
) {
    let from = state.name();
    let to = next.name();

    exit_effects(entity, state, body, nav, panels, audio);
    enter_effects(entity, &next, body, nav, panels, config, audio, position);

    machine.generation = machine.generation.wrapping_add(1);
    machine.time_in_state = 0.0;
    stuck.reset();

    crate::log(&format!(
        "FSM: {:?} {} -> {} (gen {})",
        entity, from, to, machine.generation
    ));

    events.send(StateChanged {
        agent: entity,
        from,
        to,
        generation: machine.generation,
    });

    *state = next;
}

/// Side effects выхода из состояния (ровно один раз на переход)
fn exit_effects(
    entity: Entity,
    state: &AgentState,
    body: &mut PhysicsBody,
    nav: &mut NavigationAgent,
    panels: &mut PanelArray,
    audio: &AudioChannel,
) {
    match state {
        AgentState::ChargeWindup { .. } => {
            audio.stop_loop(entity, cues::CHARGE_WINDUP_LOOP);
            nav.is_stopped = false;
        }
        AgentState::Charging { .. } => {
            audio.stop_loop(entity, cues::CHARGE_LOOP);
            body.velocity = Vec3::ZERO;
            nav.enabled = true;
        }
        AgentState::Stunned { .. } => {
            body.set_frozen(false);
        }
        AgentState::PanelOpen { .. } => {
            audio.stop_loop(entity, cues::PANEL_ALARM_LOOP);
            panels.close_all();
            body.set_frozen(false);
        }
        AgentState::Disabled { .. } => {
            body.set_frozen(false);
            nav.enabled = true;
        }
        AgentState::Idle
        | AgentState::Patrol { .. }
        | AgentState::Chase { .. }
        | AgentState::Exploding
        | AgentState::CenterAttack { .. } => {}
    }
}

/// Side effects входа в состояние (ровно один раз на переход)
#[allow(clippy::too_many_arguments)]
fn enter_effects(
    entity: Entity,
    next: &AgentState,
    body: &mut PhysicsBody,
    nav: &mut NavigationAgent,
    panels: &mut PanelArray,
    config: &RampageConfig,
    audio: &AudioChannel,
    position: Vec3,
) {
    match next {
        AgentState::Idle => {
            nav.clear_destination();
        }
        AgentState::Patrol { .. } => {
            nav.enabled = true;
            nav.is_stopped = false;
            nav.speed = config.move_speed;
        }
        AgentState::Chase { .. } => {
            nav.enabled = true;
            nav.is_stopped = false;
            nav.speed = config.chase_speed;
        }
        AgentState::ChargeWindup { .. } => {
            nav.is_stopped = true;
            body.velocity = Vec3::ZERO;
            audio.start_loop(entity, cues::CHARGE_WINDUP_LOOP);
        }
        AgentState::Charging { .. } => {
            // Charge ведёт тело сам, navigation agent выключаем
            nav.enabled = false;
            audio.start_loop(entity, cues::CHARGE_LOOP);
        }
        AgentState::Stunned { .. } => {
            body.set_frozen(true);
            audio.one_shot(cues::STUN, position);
        }
        AgentState::PanelOpen { .. } => {
            body.set_frozen(true);
            panels.reset(config.panels_on_wall_hit);
            audio.start_loop(entity, cues::PANEL_ALARM_LOOP);
        }
        AgentState::Disabled { .. } => {
            body.set_frozen(true);
            nav.enabled = false;
            audio.one_shot(cues::SHUTDOWN, position);
        }
        AgentState::Exploding => {
            body.set_frozen(true);
            nav.enabled = false;
        }
        AgentState::CenterAttack { .. } => {
            nav.enabled = true;
            nav.is_stopped = false;
            nav.speed = config.chase_speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::charge::{begin_charge, ChargeState};
    use crate::services::RecordingAudio;

    fn fixture() -> (
        AgentState,
        StateMachine,
        PhysicsBody,
        NavigationAgent,
        PanelArray,
        StuckWindow,
        RampageConfig,
        Events<StateChanged>,
    ) {
        let config = RampageConfig::default();
        (
            AgentState::default(),
            StateMachine::default(),
            PhysicsBody::default(),
            NavigationAgent::new(config.move_speed),
            PanelArray::new(config.panels_total),
            StuckWindow::default(),
            config,
            Events::default(),
        )
    }

    #[test]
    fn test_exit_before_enter_ordering() {
        let (mut state, mut machine, mut body, mut nav, mut panels, mut stuck, config, mut events) =
            fixture();
        let (sink, calls) = RecordingAudio::new();
        let audio = AudioChannel::new(Box::new(sink));

        // Idle → Charging → PanelOpen: stop лупа charge обязан идти до
        // start лупа panel alarm
        let charge = ChargeState::new(begin_charge(Vec3::ZERO, Vec3::NEG_Z, &config.charge));
        change_state(
            Entity::PLACEHOLDER,
            &mut state,
            AgentState::Charging { charge },
            &mut machine,
            &mut body,
            &mut nav,
            &mut panels,
            &mut stuck,
            &config,
            &audio,
            Vec3::ZERO,
            &mut events,
        );
        change_state(
            Entity::PLACEHOLDER,
            &mut state,
            AgentState::PanelOpen {
                elapsed: 0.0,
                duration: config.panel_open_duration,
            },
            &mut machine,
            &mut body,
            &mut nav,
            &mut panels,
            &mut stuck,
            &config,
            &audio,
            Vec3::ZERO,
            &mut events,
        );

        let recorded = calls.lock().unwrap().clone();
        let stop_index = recorded
            .iter()
            .position(|c| c == &format!("stop_loop:{}", cues::CHARGE_LOOP))
            .expect("charge loop must stop on exit");
        let start_index = recorded
            .iter()
            .position(|c| c == &format!("start_loop:{}", cues::PANEL_ALARM_LOOP))
            .expect("panel alarm must start on enter");
        assert!(stop_index < start_index, "Exit must precede Enter");
    }

    #[test]
    fn test_transition_bumps_generation_and_resets_stuck() {
        let (mut state, mut machine, mut body, mut nav, mut panels, mut stuck, config, mut events) =
            fixture();
        let audio = AudioChannel::default();

        change_state(
            Entity::PLACEHOLDER,
            &mut state,
            AgentState::Patrol {
                repath_timer: 0.0,
                target_position: None,
            },
            &mut machine,
            &mut body,
            &mut nav,
            &mut panels,
            &mut stuck,
            &config,
            &audio,
            Vec3::ZERO,
            &mut events,
        );

        assert_eq!(machine.generation, 1);
        assert_eq!(machine.time_in_state, 0.0);
        assert!(matches!(state, AgentState::Patrol { .. }));
    }

    #[test]
    fn test_panel_open_enter_opens_panels_exit_closes() {
        let (mut state, mut machine, mut body, mut nav, mut panels, mut stuck, config, mut events) =
            fixture();
        let audio = AudioChannel::default();

        change_state(
            Entity::PLACEHOLDER,
            &mut state,
            AgentState::PanelOpen {
                elapsed: 0.0,
                duration: config.panel_open_duration,
            },
            &mut machine,
            &mut body,
            &mut nav,
            &mut panels,
            &mut stuck,
            &config,
            &audio,
            Vec3::ZERO,
            &mut events,
        );
        assert_eq!(panels.panel_health(), config.panels_on_wall_hit as u32);
        assert!(body.frozen);

        change_state(
            Entity::PLACEHOLDER,
            &mut state,
            AgentState::Disabled { elapsed: 0.0 },
            &mut machine,
            &mut body,
            &mut nav,
            &mut panels,
            &mut stuck,
            &config,
            &audio,
            Vec3::ZERO,
            &mut events,
        );
        assert_eq!(panels.open_count(), 0);
    }
}
