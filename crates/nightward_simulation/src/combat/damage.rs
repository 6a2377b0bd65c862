//! Damage pipeline: события урона + смерть + внешний TakeDamage контракт

use bevy::prelude::*;

use crate::ai::components::AgentState;
use crate::components::{Health, NavigationAgent};
use crate::physics::PhysicsBody;
use crate::rampage::Rampage;
use crate::services::{cues, AudioChannel};

/// Тип урона (для модификаторов и звуковых cue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum DamageType {
    /// Таран charge'ом
    Charge,
    /// Терминальный взрыв
    Explosion,
    /// Обычное оружие выживших
    Direct,
}

/// Событие: урон нанесен
///
/// Генерируется после применения damage к Health.
/// Используется для UI, звуков, эффектов.
#[derive(Event, Debug, Clone)]
pub struct DamageDealt {
    pub attacker: Entity,
    pub target: Entity,
    pub damage: u32,
    pub damage_type: DamageType,
    pub target_died: bool,
}

/// Событие: entity умер (health == 0 или детонация)
#[derive(Event, Debug, Clone)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Компонент-маркер: entity мертв
///
/// AI системы фильтруют Without<Dead>; труп остаётся на месте.
#[derive(Component, Debug)]
pub struct Dead;

/// Внешний TakeDamage контракт по Rampage агенту
///
/// Агент immune к прямому урону кроме окна Disabled — но звуковой cue
/// проигрывается всегда.
#[derive(Event, Debug, Clone)]
pub struct DamageRampage {
    pub target: Entity,
    pub amount: u32,
    pub damage_type: DamageType,
}

/// Система: применение DamageRampage событий
pub fn apply_rampage_damage(
    mut events: EventReader<DamageRampage>,
    mut agents: Query<(&AgentState, &mut Health, &Transform), With<Rampage>>,
    audio: Res<AudioChannel>,
) {
    for event in events.read() {
        let Ok((state, mut health, transform)) = agents.get_mut(event.target) else {
            crate::log_warning(&format!(
                "Damage: DamageRampage for unknown agent {:?} dropped",
                event.target
            ));
            continue;
        };

        // Cue всегда — даже когда урон не проходит
        audio.one_shot(cues::HURT, transform.translation);

        if matches!(state, AgentState::Disabled { .. }) {
            health.take_damage(event.amount);
            crate::log(&format!(
                "Damage: {:?} core hit for {} ({:?}), HP {}",
                event.target, event.amount, event.damage_type, health.current
            ));
        } else {
            crate::log(&format!(
                "Damage: {:?} is armored ({}), {} {:?} damage no-op",
                event.target,
                state.name(),
                event.amount,
                event.damage_type
            ));
        }
    }
}

/// Система: обработка смерти (Dead marker + остановка тела)
///
/// Деспавн не автоматический — трупы остаются для визуальных эффектов.
pub fn handle_entity_death(
    mut commands: Commands,
    mut death_events: EventReader<EntityDied>,
    mut bodies: Query<(&mut PhysicsBody, Option<&mut NavigationAgent>)>,
) {
    for event in death_events.read() {
        if let Ok((mut body, nav)) = bodies.get_mut(event.entity) {
            body.velocity = Vec3::ZERO;
            if let Some(mut nav) = nav {
                nav.enabled = false;
            }
        }

        if let Ok(mut entity_commands) = commands.get_entity(event.entity) {
            entity_commands.insert(Dead);
            crate::log_info(&format!(
                "Death: {:?} killed by {:?}",
                event.entity, event.killer
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_dealt_event() {
        let event = DamageDealt {
            attacker: Entity::PLACEHOLDER,
            target: Entity::PLACEHOLDER,
            damage: 25,
            damage_type: DamageType::Charge,
            target_died: false,
        };
        assert_eq!(event.damage, 25);
        assert!(!event.target_died);
    }
}
