//! Perception: sight cone + proximity ring
//!
//! Чистая геометрия без mutable state — evaluate() пересчитывается каждый
//! тик. Occlusion query делегируется collision collaborator'у через
//! LineOfSight; headless биндинг — OcclusionWorld (AABB блокеры).
//!
//! Edge events (TargetSpotted/TargetLost) генерируются сравнением с
//! предыдущим snapshot'ом — тот же poll-based паттерн что в engine bridge.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{Actor, Health};

/// Vision конфигурация агента (immutable после спавна)
///
/// Инварианты: sight_range >= 0, 0 <= sight_angle_deg <= 360.
#[derive(Component, Debug, Clone, Serialize, Deserialize, Reflect)]
#[reflect(Component)]
pub struct Vision {
    /// Дальность sight cone (метры)
    pub sight_range: f32,
    /// Полный угол cone (градусы, симметрично вокруг forward)
    pub sight_angle_deg: f32,
    /// Радиус proximity ring — 360°, игнорирует facing (метры)
    pub proximity_range: f32,
    /// Включён ли proximity ring
    pub proximity_enabled: bool,
}

impl Default for Vision {
    fn default() -> Self {
        Self {
            sight_range: 15.0,
            sight_angle_deg: 120.0,
            proximity_range: 5.0,
            proximity_enabled: true,
        }
    }
}

/// Результат perception за тик. Никогда не персистится.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct PerceptionSnapshot {
    pub target_visible: bool,
    pub target_in_proximity: bool,
    pub distance: f32,
    pub angle_from_forward: f32,
}

impl PerceptionSnapshot {
    /// Агрегат «цель обнаружена» — cone ИЛИ proximity ring
    pub fn detected(&self) -> bool {
        self.target_visible || self.target_in_proximity
    }
}

/// Текущая отслеживаемая цель (ближайший живой враг другой фракции)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct TrackedTarget(pub Option<Entity>);

/// Occlusion контракт: есть ли чистая линия от from до to.
///
/// Engine bridge реализует raycast'ом; headless — OcclusionWorld.
pub trait LineOfSight: Send + Sync {
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool;
}

/// Headless occlusion: список AABB блокеров (стены арены)
#[derive(Resource, Debug, Clone, Default)]
pub struct OcclusionWorld {
    /// (min, max) углы каждого блокера
    pub blockers: Vec<(Vec3, Vec3)>,
}

impl LineOfSight for OcclusionWorld {
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        !self
            .blockers
            .iter()
            .any(|&(min, max)| segment_hits_aabb(from, to, min, max))
    }
}

/// Slab-тест: пересекает ли отрезок from→to бокс [min, max]
fn segment_hits_aabb(from: Vec3, to: Vec3, min: Vec3, max: Vec3) -> bool {
    let dir = to - from;
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;

    for axis in 0..3 {
        let origin = from[axis];
        let delta = dir[axis];

        if delta.abs() < 1e-6 {
            // Параллельно slab'у — origin обязан лежать внутри
            if origin < min[axis] || origin > max[axis] {
                return false;
            }
        } else {
            let inv = 1.0 / delta;
            let mut t0 = (min[axis] - origin) * inv;
            let mut t1 = (max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
    }

    true
}

/// Чистая функция perception: дистанция + cone + proximity + LOS.
///
/// Edge cases:
/// - target == observer: угол не определён → считаем видимым (distance 0
///   тривиально проходит оба теста), angle = 0
/// - нулевой forward: angle = 0, никогда не NaN
pub fn evaluate(
    observer_position: Vec3,
    observer_forward: Vec3,
    target_position: Vec3,
    vision: &Vision,
    los: &dyn LineOfSight,
) -> PerceptionSnapshot {
    let to_target = target_position - observer_position;
    let distance = to_target.length();

    let target_in_proximity = vision.proximity_enabled && distance <= vision.proximity_range;

    // Совпадающие точки: угол не определён, оба теста проходят тривиально
    if distance == 0.0 {
        return PerceptionSnapshot {
            target_visible: true,
            target_in_proximity,
            distance,
            angle_from_forward: 0.0,
        };
    }

    // Угол считаем в горизонтальной плоскости (Y обнуляем)
    let flat_forward = Vec3::new(observer_forward.x, 0.0, observer_forward.z).normalize_or_zero();
    let flat_to_target = Vec3::new(to_target.x, 0.0, to_target.z).normalize_or_zero();

    let angle_from_forward = if flat_forward == Vec3::ZERO || flat_to_target == Vec3::ZERO {
        0.0
    } else {
        flat_forward
            .dot(flat_to_target)
            .clamp(-1.0, 1.0)
            .acos()
            .to_degrees()
    };

    let in_cone =
        distance <= vision.sight_range && angle_from_forward <= vision.sight_angle_deg * 0.5;
    let target_visible = in_cone && los.is_clear(observer_position, target_position);

    PerceptionSnapshot {
        target_visible,
        target_in_proximity,
        distance,
        angle_from_forward,
    }
}

/// Perception события (edge-triggered, для AI и внешних подписчиков)
#[derive(Event, Debug, Clone)]
pub enum PerceptionEvent {
    /// Цель обнаружена (вошла в cone или proximity ring)
    TargetSpotted { observer: Entity, target: Entity },
    /// Цель потеряна (вышла из обеих зон или умерла)
    TargetLost { observer: Entity, target: Entity },
}

/// Система: пересчёт snapshot'ов + spotted/lost edge events
///
/// Выбор цели: ближайший живой актор другой фракции. Snapshot считается
/// против него; смена цели логируется.
pub fn update_perception(
    mut observers: Query<(
        Entity,
        &Actor,
        &Transform,
        &Vision,
        &mut PerceptionSnapshot,
        &mut TrackedTarget,
    )>,
    targets: Query<(Entity, &Actor, &Transform, &Health)>,
    occlusion: Res<OcclusionWorld>,
    mut events: EventWriter<PerceptionEvent>,
) {
    for (observer, actor, transform, vision, mut snapshot, mut tracked) in observers.iter_mut() {
        let nearest = find_nearest_hostile(observer, actor.faction_id, transform, &targets);

        let new_snapshot = match nearest {
            Some((target, target_position)) => {
                if tracked.0 != Some(target) {
                    crate::log(&format!(
                        "Perception: {:?} now tracking {:?}",
                        observer, target
                    ));
                }
                evaluate(
                    transform.translation,
                    *transform.forward(),
                    target_position,
                    vision,
                    occlusion.as_ref(),
                )
            }
            None => PerceptionSnapshot::default(),
        };

        let was_detected = snapshot.detected();
        let now_detected = new_snapshot.detected();
        let new_target = nearest.map(|(entity, _)| entity);

        if !was_detected && now_detected {
            if let Some(target) = new_target {
                events.write(PerceptionEvent::TargetSpotted { observer, target });
            }
        } else if was_detected && !now_detected {
            if let Some(target) = tracked.0.or(new_target) {
                events.write(PerceptionEvent::TargetLost { observer, target });
            }
        }

        *snapshot = new_snapshot;
        tracked.0 = new_target;
    }
}

/// Helper: найти ближайшего живого врага (другая фракция)
fn find_nearest_hostile(
    observer: Entity,
    observer_faction: u64,
    observer_transform: &Transform,
    targets: &Query<(Entity, &Actor, &Transform, &Health)>,
) -> Option<(Entity, Vec3)> {
    let mut nearest: Option<(Entity, Vec3, f32)> = None;

    for (target, target_actor, target_transform, target_health) in targets.iter() {
        if target == observer {
            continue;
        }
        if target_actor.faction_id == observer_faction {
            continue;
        }
        if !target_health.is_alive() {
            continue;
        }

        let distance = observer_transform
            .translation
            .distance(target_transform.translation);

        match nearest {
            Some((_, _, best)) if distance >= best => {}
            _ => nearest = Some((target, target_transform.translation, distance)),
        }
    }

    nearest.map(|(entity, position, _)| (entity, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysClear;

    impl LineOfSight for AlwaysClear {
        fn is_clear(&self, _from: Vec3, _to: Vec3) -> bool {
            true
        }
    }

    fn vision() -> Vision {
        Vision {
            sight_range: 15.0,
            sight_angle_deg: 120.0,
            proximity_range: 5.0,
            proximity_enabled: true,
        }
    }

    #[test]
    fn test_range_boundary_inclusive() {
        let v = vision();
        let forward = Vec3::NEG_Z;

        // Ровно на границе дальности — видим
        let at_range = evaluate(Vec3::ZERO, forward, Vec3::new(0.0, 0.0, -15.0), &v, &AlwaysClear);
        assert!(at_range.target_visible);

        // Чуть дальше — нет
        let beyond = evaluate(Vec3::ZERO, forward, Vec3::new(0.0, 0.0, -15.01), &v, &AlwaysClear);
        assert!(!beyond.target_visible);
    }

    #[test]
    fn test_angle_boundary() {
        let v = vision();
        let forward = Vec3::NEG_Z;

        // Ровно на половине угла (60°) — видим (с f32 допуском чуть внутри)
        let angle = 59.99f32.to_radians();
        let at_edge = Vec3::new(angle.sin() * 5.0, 0.0, -angle.cos() * 5.0);
        let snapshot = evaluate(Vec3::ZERO, forward, at_edge, &v, &AlwaysClear);
        assert!(snapshot.target_visible, "angle = {}", snapshot.angle_from_forward);

        // За границей — нет
        let angle = 61.0f32.to_radians();
        let outside = Vec3::new(angle.sin() * 5.0, 0.0, -angle.cos() * 5.0);
        let snapshot = evaluate(Vec3::ZERO, forward, outside, &v, &AlwaysClear);
        assert!(!snapshot.target_visible);
    }

    #[test]
    fn test_proximity_ignores_facing() {
        let v = vision();
        // Цель ЗА спиной, но в proximity ring
        let behind = Vec3::new(0.0, 0.0, 4.0);
        let snapshot = evaluate(Vec3::ZERO, Vec3::NEG_Z, behind, &v, &AlwaysClear);

        assert!(!snapshot.target_visible);
        assert!(snapshot.target_in_proximity);
        assert!(snapshot.detected());
    }

    #[test]
    fn test_proximity_disabled() {
        let mut v = vision();
        v.proximity_enabled = false;

        let behind = Vec3::new(0.0, 0.0, 4.0);
        let snapshot = evaluate(Vec3::ZERO, Vec3::NEG_Z, behind, &v, &AlwaysClear);
        assert!(!snapshot.target_in_proximity);
    }

    #[test]
    fn test_coincident_points_visible() {
        let v = vision();
        let snapshot = evaluate(Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO, &v, &AlwaysClear);

        assert!(snapshot.target_visible);
        assert_eq!(snapshot.angle_from_forward, 0.0);
        assert_eq!(snapshot.distance, 0.0);
    }

    #[test]
    fn test_zero_forward_never_nan() {
        let v = vision();
        let snapshot = evaluate(Vec3::ZERO, Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), &v, &AlwaysClear);
        assert!(!snapshot.angle_from_forward.is_nan());
    }

    #[test]
    fn test_occlusion_blocks_sight_not_proximity() {
        let v = vision();
        let world = OcclusionWorld {
            blockers: vec![(Vec3::new(-1.0, -1.0, -3.0), Vec3::new(1.0, 1.0, -2.0))],
        };

        // Стена между наблюдателем и целью на -Z
        let snapshot = evaluate(Vec3::ZERO, Vec3::NEG_Z, Vec3::new(0.0, 0.0, -4.0), &v, &world);
        assert!(!snapshot.target_visible);
        assert!(snapshot.target_in_proximity); // ring работает сквозь стены
    }

    #[test]
    fn test_segment_aabb_miss() {
        let min = Vec3::new(-1.0, -1.0, -3.0);
        let max = Vec3::new(1.0, 1.0, -2.0);

        // Отрезок в стороне от бокса
        assert!(!segment_hits_aabb(
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, -10.0),
            min,
            max
        ));
        // Отрезок сквозь бокс
        assert!(segment_hits_aabb(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -10.0),
            min,
            max
        ));
    }
}
