//! Panel health subsystem: однохитовые броневые сегменты
//!
//! Панель гейтит core HP: пока panel_health > 0, ядро закрыто. Каждая
//! панель закрывается ровно один раз за окно экспозиции (damage латч
//! защищает агрегат от двойного декремента в одном тике).

use bevy::prelude::*;

use crate::ai::components::AgentState;
use crate::rampage::Rampage;
use crate::services::{cues, AudioChannel};

/// Один броневой сегмент (leaf entity агента)
#[derive(Debug, Clone, Copy, Default)]
pub struct Panel {
    /// 0 или 1
    pub hp: u8,
    pub is_open: bool,
    /// Латч: панель уже отработала закрытие в этом окне
    damage_latch: bool,
}

/// Исход damage_panel()
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelDamage {
    /// Панель закрылась (единственный валидный декремент агрегата)
    Closed,
    /// Латч уже стоит — no-op
    AlreadyClosed,
    /// Панель не открыта — урон не проходит
    NotOpen,
    /// Невалидный индекс
    OutOfRange,
}

/// Массив панелей агента. Инварианты держим за методами.
#[derive(Component, Debug, Clone, Default)]
pub struct PanelArray {
    panels: Vec<Panel>,
}

impl PanelArray {
    pub fn new(count: usize) -> Self {
        Self {
            panels: vec![Panel::default(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// PanelHealth агрегат: открытые панели с hp > 0
    pub fn panel_health(&self) -> u32 {
        self.panels
            .iter()
            .filter(|p| p.is_open && p.hp > 0)
            .count() as u32
    }

    pub fn open_count(&self) -> usize {
        self.panels.iter().filter(|p| p.is_open).count()
    }

    /// Начало окна экспозиции: открыть n панелей (hp=1, латчи сняты)
    pub fn reset(&mut self, n: usize) {
        let n = n.min(self.panels.len());
        for (index, panel) in self.panels.iter_mut().enumerate() {
            if index < n {
                *panel = Panel {
                    hp: 1,
                    is_open: true,
                    damage_latch: false,
                };
            } else {
                *panel = Panel::default();
            }
        }
    }

    /// Конец окна экспозиции: все панели закрываются
    pub fn close_all(&mut self) {
        for panel in self.panels.iter_mut() {
            panel.is_open = false;
            panel.hp = 0;
        }
    }

    /// Урон по панели. Закрытая/залатченная панель — тихий no-op
    /// (инвариант агрегата), вызывающий логирует диагностику.
    pub fn damage_panel(&mut self, index: usize, amount: u32) -> PanelDamage {
        let Some(panel) = self.panels.get_mut(index) else {
            return PanelDamage::OutOfRange;
        };

        if !panel.is_open {
            return PanelDamage::NotOpen;
        }
        if panel.damage_latch || panel.hp == 0 {
            return PanelDamage::AlreadyClosed;
        }
        if amount == 0 {
            return PanelDamage::AlreadyClosed;
        }

        panel.hp = 0;
        panel.damage_latch = true;
        PanelDamage::Closed
    }
}

/// Событие от trigger volume: попадание по панели
#[derive(Event, Debug, Clone)]
pub struct PanelHit {
    pub agent: Entity,
    pub panel_index: usize,
    pub amount: u32,
}

/// Событие: последняя открытая панель закрылась
#[derive(Event, Debug, Clone)]
pub struct PanelsDepleted {
    pub agent: Entity,
}

/// Система: применение PanelHit событий
///
/// Панели уязвимы только в окне экспозиции (PanelOpen) — хиты вне окна
/// логируются и игнорируются.
pub fn process_panel_hits(
    mut hits: EventReader<PanelHit>,
    mut agents: Query<(&AgentState, &mut PanelArray, &Transform), With<Rampage>>,
    audio: Res<AudioChannel>,
    mut depleted_events: EventWriter<PanelsDepleted>,
) {
    for hit in hits.read() {
        let Ok((state, mut panels, transform)) = agents.get_mut(hit.agent) else {
            crate::log_warning(&format!(
                "Panels: hit for unknown agent {:?} dropped",
                hit.agent
            ));
            continue;
        };

        if !matches!(state, AgentState::PanelOpen { .. }) {
            crate::log(&format!(
                "Panels: hit on {:?} outside exposure window ({}), no-op",
                hit.agent,
                state.name()
            ));
            continue;
        }

        match panels.damage_panel(hit.panel_index, hit.amount) {
            PanelDamage::Closed => {
                audio.one_shot(cues::PANEL_BREAK, transform.translation);
                crate::log(&format!(
                    "Panels: {:?} panel {} closed, {} remaining",
                    hit.agent,
                    hit.panel_index,
                    panels.panel_health()
                ));

                if panels.panel_health() == 0 {
                    depleted_events.write(PanelsDepleted { agent: hit.agent });
                    crate::log(&format!("Panels: {:?} armor depleted", hit.agent));
                }
            }
            outcome => {
                crate::log(&format!(
                    "Panels: hit on {:?} panel {} ignored ({:?})",
                    hit.agent, hit.panel_index, outcome
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_latch_prevents_double_decrement() {
        let mut panels = PanelArray::new(8);
        panels.reset(4);
        assert_eq!(panels.panel_health(), 4);

        assert_eq!(panels.damage_panel(0, 1), PanelDamage::Closed);
        assert_eq!(panels.panel_health(), 3);

        // Повторный урон по той же панели в том же тике — no-op
        assert_eq!(panels.damage_panel(0, 1), PanelDamage::AlreadyClosed);
        assert_eq!(panels.panel_health(), 3);
    }

    #[test]
    fn test_closed_panel_rejects_damage() {
        let mut panels = PanelArray::new(8);
        panels.reset(2);

        // Панель 5 не открыта в этом окне
        assert_eq!(panels.damage_panel(5, 1), PanelDamage::NotOpen);
        assert_eq!(panels.damage_panel(42, 1), PanelDamage::OutOfRange);
        assert_eq!(panels.panel_health(), 2);
    }

    #[test]
    fn test_reset_reopens_and_clears_latches() {
        let mut panels = PanelArray::new(4);
        panels.reset(4);
        for index in 0..4 {
            assert_eq!(panels.damage_panel(index, 1), PanelDamage::Closed);
        }
        assert_eq!(panels.panel_health(), 0);

        // Новое окно экспозиции — латчи сняты, панели снова бьются
        panels.reset(4);
        assert_eq!(panels.panel_health(), 4);
        assert_eq!(panels.damage_panel(0, 1), PanelDamage::Closed);
    }

    #[test]
    fn test_close_all() {
        let mut panels = PanelArray::new(4);
        panels.reset(3);
        panels.close_all();
        assert_eq!(panels.open_count(), 0);
        assert_eq!(panels.panel_health(), 0);
    }
}
