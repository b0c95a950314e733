//! Arena boundary shapes and the clamp applied after every predicted step.

use arena_core::{isqrt_u64, Fixed, PLAYER_RADIUS};

/// Points closer than this to an axis count as lying on it.
const AXIS_EPSILON: f32 = 1e-6;

/// Circular obstacle centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    /// Obstacle radius.
    pub radius: Fixed,
}

impl Obstacle {
    /// Build an obstacle from a world-unit radius.
    pub fn from_world(radius: f32) -> Self {
        Self {
            radius: Fixed::from_world(radius),
        }
    }
}

/// Playable area the predicted position is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArenaGeometry {
    /// No walls known (map not loaded yet, or an unsupported wall shape).
    #[default]
    Unbounded,
    /// Axis-aligned square `[-half_extent, half_extent]` on both axes.
    Box {
        /// Distance from the origin to each wall.
        half_extent: Fixed,
        /// Optional central obstacle.
        obstacle: Option<Obstacle>,
    },
    /// Square rotated 45°, i.e. `|x| + |y| <= half_extent`.
    Diamond {
        /// L1 distance from the origin to the walls.
        half_extent: Fixed,
        /// Optional central obstacle.
        obstacle: Option<Obstacle>,
    },
}

impl ArenaGeometry {
    /// Square arena from a world-unit half size.
    pub fn square(half_size: f32) -> Self {
        ArenaGeometry::Box {
            half_extent: Fixed::from_world(half_size),
            obstacle: None,
        }
    }

    /// Diamond arena from four polygon points, each lying on an axis.
    ///
    /// Returns `None` when the polygon is not such a diamond.
    pub fn diamond_from_points(points: &[[f32; 2]]) -> Option<Self> {
        if points.len() != 4 {
            return None;
        }
        let on_axis = points
            .iter()
            .all(|[x, y]| x.abs() < AXIS_EPSILON || y.abs() < AXIS_EPSILON);
        if !on_axis {
            return None;
        }
        let extent = points
            .iter()
            .map(|[x, y]| x.abs() + y.abs())
            .fold(0.0f32, f32::max);
        Some(ArenaGeometry::Diamond {
            half_extent: Fixed::from_world(extent),
            obstacle: None,
        })
    }

    /// Attach a central obstacle (no effect on an unbounded arena).
    pub fn with_obstacle(self, obstacle: Obstacle) -> Self {
        match self {
            ArenaGeometry::Unbounded => self,
            ArenaGeometry::Box { half_extent, .. } => ArenaGeometry::Box {
                half_extent,
                obstacle: Some(obstacle),
            },
            ArenaGeometry::Diamond { half_extent, .. } => ArenaGeometry::Diamond {
                half_extent,
                obstacle: Some(obstacle),
            },
        }
    }

    /// Central obstacle, if any.
    pub fn obstacle(&self) -> Option<Obstacle> {
        match self {
            ArenaGeometry::Unbounded => None,
            ArenaGeometry::Box { obstacle, .. } | ArenaGeometry::Diamond { obstacle, .. } => {
                *obstacle
            }
        }
    }

    /// Largest coordinate (box) or L1 norm (diamond) a player centre may reach.
    pub fn limit(&self) -> Option<Fixed> {
        match self {
            ArenaGeometry::Unbounded => None,
            ArenaGeometry::Box { half_extent, .. } | ArenaGeometry::Diamond { half_extent, .. } => {
                Some(inner_limit(*half_extent))
            }
        }
    }

    /// Clamp a candidate player position into the arena.
    pub fn clamp(&self, x: Fixed, y: Fixed) -> (Fixed, Fixed) {
        let (x, y) = match self {
            ArenaGeometry::Unbounded => return (x, y),
            ArenaGeometry::Box { half_extent, .. } => {
                let limit = inner_limit(*half_extent).raw();
                (
                    Fixed(x.raw().clamp(-limit, limit)),
                    Fixed(y.raw().clamp(-limit, limit)),
                )
            }
            ArenaGeometry::Diamond { half_extent, .. } => {
                clamp_l1(x, y, inner_limit(*half_extent))
            }
        };
        match self.obstacle() {
            Some(obstacle) => push_out_of_obstacle(x, y, obstacle),
            None => (x, y),
        }
    }
}

fn player_radius() -> Fixed {
    Fixed::from_world(PLAYER_RADIUS)
}

fn inner_limit(half_extent: Fixed) -> Fixed {
    let inner = half_extent.raw() as i64 - player_radius().raw() as i64;
    Fixed(inner.clamp(0, i32::MAX as i64) as i32)
}

fn clamp_l1(x: Fixed, y: Fixed, limit: Fixed) -> (Fixed, Fixed) {
    let sum = x.unsigned_abs() as i64 + y.unsigned_abs() as i64;
    let limit_raw = limit.raw() as i64;
    if sum <= limit_raw {
        return (x, y);
    }
    if sum == 0 {
        return (limit, Fixed::ZERO);
    }
    (x.mul_div(limit_raw, sum), y.mul_div(limit_raw, sum))
}

/// Move a point inside the exclusion radius out to its edge.
///
/// The scaled distance rounds up on purpose: truncating (or rounding to nearest)
/// can leave the result a unit inside the radius. A point exactly at the origin
/// goes to `(+min_r, 0)`.
fn push_out_of_obstacle(x: Fixed, y: Fixed, obstacle: Obstacle) -> (Fixed, Fixed) {
    let min_r = obstacle.radius.raw() as i64 + player_radius().raw() as i64;
    if min_r <= 0 {
        return (x, y);
    }
    let ax = x.unsigned_abs() as u64;
    let ay = y.unsigned_abs() as u64;
    let d2 = ax * ax + ay * ay;
    let min_r2 = (min_r * min_r) as u64;
    if d2 >= min_r2 {
        return (x, y);
    }
    if d2 == 0 {
        return (Fixed(min_r as i32), Fixed::ZERO);
    }
    let d = isqrt_u64(d2.max(1)).max(1) as i64;
    (scale_away(x, min_r, d), scale_away(y, min_r, d))
}

/// `v * num / den`, rounding the magnitude up so the pushed point never lands inside.
fn scale_away(v: Fixed, num: i64, den: i64) -> Fixed {
    let magnitude = v.unsigned_abs() as i64 * num;
    let scaled = (magnitude + den - 1) / den;
    Fixed((scaled as i32).wrapping_mul(v.raw().signum()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond_100() -> ArenaGeometry {
        ArenaGeometry::diamond_from_points(&[
            [0.0, 100.0],
            [100.0, 0.0],
            [0.0, -100.0],
            [-100.0, 0.0],
        ])
        .expect("axis-aligned diamond")
    }

    #[test]
    fn box_clamps_each_axis() {
        let arena = ArenaGeometry::square(100.0);
        let (x, y) = arena.clamp(Fixed(200_000), Fixed(-90_000));
        assert_eq!((x, y), (Fixed(85_000), Fixed(-85_000)));
    }

    #[test]
    fn box_smaller_than_player_pins_to_origin() {
        let arena = ArenaGeometry::square(10.0);
        assert_eq!(arena.limit(), Some(Fixed::ZERO));
        assert_eq!(arena.clamp(Fixed(5_000), Fixed(-5_000)), (Fixed(0), Fixed(0)));
    }

    #[test]
    fn box_obstacle_pushes_radially() {
        let arena = ArenaGeometry::square(500.0).with_obstacle(Obstacle::from_world(40.0));
        // Inside the pillar on +X: pushed out to exactly 55 world units.
        let (x, y) = arena.clamp(Fixed(10_000), Fixed::ZERO);
        assert_eq!((x, y), (Fixed(55_000), Fixed::ZERO));

        // Diagonal: result stays on the ray and just outside the minimum radius.
        let (x, y) = arena.clamp(Fixed(-3_000), Fixed(4_000));
        assert!(x.raw() < 0 && y.raw() > 0);
        let d2 = (x.raw() as i64).pow(2) + (y.raw() as i64).pow(2);
        assert!(d2 >= 55_000i64 * 55_000);
        assert_eq!((x, y), (Fixed(-33_000), Fixed(44_000)));
    }

    #[test]
    fn obstacle_at_origin_pushes_along_positive_x() {
        let arena = ArenaGeometry::square(500.0).with_obstacle(Obstacle::from_world(40.0));
        assert_eq!(arena.clamp(Fixed::ZERO, Fixed::ZERO), (Fixed(55_000), Fixed::ZERO));
    }

    #[test]
    fn pillar_wider_than_arena_wins_over_walls() {
        // limit 15 < exclusion radius 55: no point satisfies both, the pillar takes priority
        let arena = ArenaGeometry::square(30.0).with_obstacle(Obstacle::from_world(40.0));
        assert_eq!(arena.limit(), Some(Fixed(15_000)));
        assert_eq!(arena.clamp(Fixed(90_000), Fixed::ZERO), (Fixed(55_000), Fixed::ZERO));
    }

    #[test]
    fn diamond_extent_uses_l1_norm() {
        assert_eq!(diamond_100().limit(), Some(Fixed(85_000)));
    }

    #[test]
    fn diamond_scales_to_limit() {
        let (x, y) = diamond_100().clamp(Fixed(90_000), Fixed(90_000));
        assert_eq!((x, y), (Fixed(42_500), Fixed(42_500)));
    }

    #[test]
    fn diamond_truncates_toward_zero() {
        let (x, y) = diamond_100().clamp(Fixed(-100_000), Fixed(1));
        assert_eq!((x, y), (Fixed(-84_999), Fixed(0)));
    }

    #[test]
    fn diamond_leaves_inside_points_alone() {
        assert_eq!(
            diamond_100().clamp(Fixed(40_000), Fixed(-45_000)),
            (Fixed(40_000), Fixed(-45_000))
        );
    }

    #[test]
    fn non_diamond_polygons_are_rejected() {
        let skewed = [[10.0, 10.0], [100.0, 0.0], [0.0, -100.0], [-100.0, 0.0]];
        assert!(ArenaGeometry::diamond_from_points(&skewed).is_none());
        let triangle = [[0.0, 100.0], [100.0, 0.0], [0.0, -100.0]];
        assert!(ArenaGeometry::diamond_from_points(&triangle).is_none());
    }

    #[test]
    fn unbounded_never_moves_points() {
        let arena = ArenaGeometry::Unbounded.with_obstacle(Obstacle::from_world(40.0));
        assert_eq!(arena.clamp(Fixed(1), Fixed(2)), (Fixed(1), Fixed(2)));
    }
}
