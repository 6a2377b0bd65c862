//! Utility decision engine
//!
//! Stateless scoring кандидатов поведения: линейная взвешенная сумма по
//! каждому кандидату, победитель по максимуму, при почти равном счёте —
//! гистерезис к текущему состоянию (анти-осцилляция). Вызывается только
//! в decision points (Idle/Patrol/Chase update), не каждый physics шаг.

use crate::perception::PerceptionSnapshot;

/// Тег кандидата поведения (результат оценки)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTag {
    Patrol,
    Chase,
    Charge,
}

/// Статус агента, влияющий на оценку
#[derive(Debug, Clone, Copy)]
pub struct AgentStatus {
    /// Charge cooldown готов
    pub charge_ready: bool,
    /// Attack radius == proximity ring
    pub attack_radius: f32,
}

/// Веса utility функции
#[derive(Debug, Clone, Copy)]
pub struct UtilityWeights {
    pub chase_visible: f32,
    pub chase_range: f32,
    pub charge_near: f32,
    pub charge_ready: f32,
    pub patrol_base: f32,
    /// Ниже порога никто не выигрывает — Patrol по умолчанию
    pub min_threshold: f32,
    /// Допуск гистерезиса: почти равный счёт удерживает текущее состояние
    pub hysteresis: f32,
}

impl Default for UtilityWeights {
    fn default() -> Self {
        Self {
            chase_visible: 0.5,
            chase_range: 0.3,
            charge_near: 0.4,
            charge_ready: 0.6,
            patrol_base: 0.2,
            min_threshold: 0.3,
            hysteresis: 0.05,
        }
    }
}

/// Счёт кандидата Chase: видим цель, она вне attack radius
pub fn score_chase(
    snapshot: &PerceptionSnapshot,
    status: &AgentStatus,
    weights: &UtilityWeights,
) -> f32 {
    if !snapshot.target_visible {
        return 0.0;
    }
    let mut score = weights.chase_visible;
    if snapshot.distance > status.attack_radius {
        score += weights.chase_range;
    }
    score
}

/// Счёт кандидата Charge: видим цель внутри attack radius, cooldown готов
pub fn score_charge(
    snapshot: &PerceptionSnapshot,
    status: &AgentStatus,
    weights: &UtilityWeights,
) -> f32 {
    if !snapshot.target_visible || snapshot.distance > status.attack_radius {
        return 0.0;
    }
    let mut score = weights.charge_near;
    if status.charge_ready {
        score += weights.charge_ready;
    }
    score
}

/// Выбор поведения: argmax по кандидатам + гистерезис + порог
pub fn select_state(
    snapshot: &PerceptionSnapshot,
    status: &AgentStatus,
    current: StateTag,
    weights: &UtilityWeights,
) -> StateTag {
    let chase = score_chase(snapshot, status, weights);
    let charge = score_charge(snapshot, status, weights);

    let (best_tag, best_score) = if charge > chase {
        (StateTag::Charge, charge)
    } else {
        (StateTag::Chase, chase)
    };

    if best_score < weights.min_threshold {
        return StateTag::Patrol;
    }

    if current != best_tag {
        let current_score = match current {
            StateTag::Chase => chase,
            StateTag::Charge => charge,
            StateTag::Patrol => weights.patrol_base,
        };
        if best_score - current_score <= weights.hysteresis {
            return current;
        }
    }

    best_tag
}
