//! Flocking Force Model
//!
//! Cohesion, alignment and separation over peer positions, each gated by
//! its own Euclidean radius.  Stateless: the swarm has no velocity, so
//! "alignment" uses relative position offsets, and nothing carries over
//! between ticks.

use crate::core::config::FlockingConfig;
use crate::swarm::grid::Position;
use serde::{Deserialize, Serialize};

/// Continuous (row, col) vector used while combining forces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub row: f64,
    pub col: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { row: 0.0, col: 0.0 };

    pub fn new(row: f64, col: f64) -> Self {
        Vector2 { row, col }
    }

    pub fn magnitude(&self) -> f64 {
        (self.row * self.row + self.col * self.col).sqrt()
    }

    /// Drop the fractional part of each axis (toward zero).
    pub fn trunc(&self) -> Vector2 {
        Vector2::new(self.row.trunc(), self.col.trunc())
    }

    /// Cell reached by truncating both axes.  Saturates at the `i32` range,
    /// which is far outside any grid.
    pub fn to_cell(&self) -> Position {
        Position::new(self.row.trunc() as i32, self.col.trunc() as i32)
    }
}

impl From<Position> for Vector2 {
    fn from(p: Position) -> Self {
        Vector2::new(p.row as f64, p.col as f64)
    }
}

impl std::ops::Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl std::ops::Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.row - rhs.row, self.col - rhs.col)
    }
}

/// Breakdown of one steering decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Steering {
    /// Truncated centroid of cohesion neighbors, or the goal when there are none
    pub cohesion: Vector2,
    /// Truncated mean offset toward alignment neighbors
    pub alignment: Vector2,
    pub separation: Vector2,
    pub cohesion_neighbors: usize,
    /// Proposed next cell
    pub target: Position,
    /// `target - current`, saturating
    pub displacement: (i32, i32),
}

#[derive(Clone, Debug)]
pub struct FlockingModel {
    config: FlockingConfig,
}

impl FlockingModel {
    pub fn new(config: FlockingConfig) -> Self {
        FlockingModel { config }
    }

    pub fn config(&self) -> &FlockingConfig {
        &self.config
    }

    /// Compute the proposed next cell for a drone at `me` believing in `goal`,
    /// given the positions of every other drone.
    pub fn steer(&self, me: Position, goal: Position, peers: &[Position]) -> Steering {
        let cohesion_set: Vec<(Position, f64)> = peers
            .iter()
            .map(|p| (*p, me.distance_to(p)))
            .filter(|(_, d)| *d <= self.config.cohesion_radius)
            .collect();

        // Cohesion: centroid of neighbors, otherwise head for the goal
        let cohesion = if cohesion_set.is_empty() {
            Vector2::from(goal)
        } else {
            mean(cohesion_set.iter().map(|(p, _)| Vector2::from(*p))).trunc()
        };

        // Alignment: mean offset of the closer subset, a stand-in for heading
        let origin = Vector2::from(me);
        let alignment_offsets: Vec<Vector2> = cohesion_set
            .iter()
            .filter(|(_, d)| *d <= self.config.alignment_radius)
            .map(|(p, _)| Vector2::from(*p) - origin)
            .collect();
        let alignment = if alignment_offsets.is_empty() {
            Vector2::ZERO
        } else {
            mean(alignment_offsets.into_iter()).trunc()
        };

        let separation = self.separation_force(me, peers);

        // Cohesion and alignment are whole cells; the separation push only
        // moves the target once it crosses a cell boundary.
        let target = (cohesion + alignment + separation).to_cell();
        Steering {
            cohesion,
            alignment,
            separation,
            cohesion_neighbors: cohesion_set.len(),
            target,
            displacement: (
                target.row.saturating_sub(me.row),
                target.col.saturating_sub(me.col),
            ),
        }
    }

    /// Repulsion from every peer within the separation radius.  Each peer
    /// contributes a unit vector away from it scaled by `1 / distance`; the
    /// sum is normalized to `separation_force`.  Co-located peers are skipped.
    pub fn separation_force(&self, me: Position, peers: &[Position]) -> Vector2 {
        let mut sum = Vector2::ZERO;
        for peer in peers {
            let d = me.distance_to(peer);
            if d == 0.0 || d > self.config.separation_radius {
                continue;
            }
            let away = Vector2::from(me) - Vector2::from(*peer);
            sum.row += away.row / d / d;
            sum.col += away.col / d / d;
        }

        let mag = sum.magnitude();
        if mag > 0.0 {
            let scale = self.config.separation_force / mag;
            Vector2::new(sum.row * scale, sum.col * scale)
        } else {
            Vector2::ZERO
        }
    }
}

fn mean(vectors: impl Iterator<Item = Vector2>) -> Vector2 {
    let (sum, n) = vectors.fold((Vector2::ZERO, 0usize), |(acc, n), v| (acc + v, n + 1));
    if n == 0 {
        return Vector2::ZERO;
    }
    Vector2::new(sum.row / n as f64, sum.col / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn model(c: f64, a: f64, s: f64, f: f64) -> FlockingModel {
        FlockingModel::new(FlockingConfig {
            cohesion_radius: c,
            alignment_radius: a,
            separation_radius: s,
            separation_force: f,
        })
    }

    #[test]
    fn lone_drone_targets_goal() {
        let m = FlockingModel::new(FlockingConfig::default());
        let s = m.steer(Position::new(0, 0), Position::new(9, 9), &[]);
        assert_eq!(s.target, Position::new(9, 9));
        assert_eq!(s.displacement, (9, 9));
        assert_eq!(s.cohesion_neighbors, 0);
        assert_eq!(s.separation, Vector2::ZERO);
    }

    #[test]
    fn cohesion_uses_centroid_and_alignment_adds_offset() {
        // No separation (radius 0), alignment covers everything.
        let m = model(10.0, 10.0, 0.0, 1.0);
        let me = Position::new(0, 0);
        let peers = [Position::new(2, 0), Position::new(0, 2)];
        let s = m.steer(me, Position::new(9, 9), &peers);
        assert_eq!(s.cohesion, Vector2::new(1.0, 1.0));
        assert_eq!(s.alignment, Vector2::new(1.0, 1.0));
        assert_eq!(s.target, Position::new(2, 2));
    }

    #[test]
    fn alignment_limited_to_its_radius() {
        let m = model(10.0, 1.5, 0.0, 1.0);
        let me = Position::new(5, 5);
        let peers = [Position::new(5, 6), Position::new(5, 13)];
        let s = m.steer(me, Position::new(0, 0), &peers);
        assert_eq!(s.cohesion_neighbors, 2);
        // Only the adjacent peer counts for alignment.
        assert_eq!(s.alignment, Vector2::new(0.0, 1.0));
    }

    #[test]
    fn peers_outside_cohesion_fall_back_to_goal() {
        let m = model(2.0, 1.0, 0.0, 1.0);
        let s = m.steer(Position::new(0, 0), Position::new(4, 3), &[Position::new(7, 7)]);
        assert_eq!(s.cohesion_neighbors, 0);
        assert_eq!(s.target, Position::new(4, 3));
    }

    #[test]
    fn separation_points_away_and_is_normalized() {
        let m = model(0.0, 0.0, 5.0, 1.0);
        let sep = m.separation_force(Position::new(3, 3), &[Position::new(3, 4)]);
        assert!((sep.row - 0.0).abs() < 1e-12);
        assert!((sep.col + 1.0).abs() < 1e-12);
    }

    #[test]
    fn separation_skips_colocated_and_distant_peers() {
        let m = model(0.0, 0.0, 2.0, 1.0);
        let me = Position::new(1, 1);
        assert_eq!(m.separation_force(me, &[me]), Vector2::ZERO);
        assert_eq!(m.separation_force(me, &[Position::new(8, 8)]), Vector2::ZERO);
    }

    #[test]
    fn closer_peers_dominate_separation() {
        let m = model(0.0, 0.0, 10.0, 1.0);
        let me = Position::new(5, 5);
        // One peer right above at distance 1, one right below at distance 4.
        let sep = m.separation_force(me, &[Position::new(4, 5), Position::new(9, 5)]);
        assert!(sep.row > 0.0, "should be pushed away from the nearer peer: {:?}", sep);
    }

    #[test]
    fn separation_magnitude_never_exceeds_cap() {
        let mut rng = StdRng::seed_from_u64(11);
        for cap in [0.5, 1.0, 3.0] {
            let m = model(0.0, 0.0, 8.0, cap);
            for _ in 0..200 {
                let me = Position::new(rng.gen_range(0..20), rng.gen_range(0..20));
                let peers: Vec<Position> = (0..rng.gen_range(0..6))
                    .map(|_| Position::new(rng.gen_range(0..20), rng.gen_range(0..20)))
                    .collect();
                let mag = m.separation_force(me, &peers).magnitude();
                assert!(mag <= cap + 1e-9, "magnitude {} over cap {}", mag, cap);
            }
        }
    }

    #[test]
    fn cells_truncate_toward_zero() {
        assert_eq!(Vector2::new(8.9, -0.5).to_cell(), Position::new(8, 0));
        assert_eq!(Vector2::new(-1.2, 9.99).to_cell(), Position::new(-1, 9));
        assert_eq!(Vector2::new(2.5, -2.5).trunc(), Vector2::new(2.0, -2.0));
    }

    #[test]
    fn half_cell_centroid_truncates() {
        let m = model(10.0, 0.0, 0.0, 1.0);
        let s = m.steer(Position::new(0, 0), Position::new(9, 9), &[Position::new(0, 1), Position::new(0, 2)]);
        assert_eq!(s.cohesion, Vector2::new(0.0, 1.0));
        assert_eq!(s.target, Position::new(0, 1));
    }

    #[test]
    fn alignment_offset_truncates_separately() {
        // Centroid (0, 1.5) -> 1, mean offset (0, 1.5) -> 1: target (0, 2).
        // Summed before truncation it would be (0, 3).
        let m = model(10.0, 10.0, 0.0, 1.0);
        let s = m.steer(Position::new(0, 0), Position::new(9, 9), &[Position::new(0, 1), Position::new(0, 2)]);
        assert_eq!(s.alignment, Vector2::new(0.0, 1.0));
        assert_eq!(s.target, Position::new(0, 2));
    }

    #[test]
    fn sub_cell_separation_truncates_with_the_target() {
        // Push of (-0.6, 0) against an integer goal: 8.4 truncates to 8.
        let m = model(0.0, 0.0, 5.0, 0.6);
        let s = m.steer(Position::new(5, 5), Position::new(9, 9), &[Position::new(6, 5)]);
        assert!((s.separation.row + 0.6).abs() < 1e-12);
        assert_eq!(s.target, Position::new(8, 9));

        // Pushed the other way, 9.6 truncates back to the goal row.
        let s = m.steer(Position::new(5, 5), Position::new(9, 9), &[Position::new(4, 5)]);
        assert_eq!(s.target, Position::new(9, 9));
    }

    #[test]
    fn huge_separation_force_saturates_instead_of_overflowing() {
        let m = model(0.0, 0.0, 5.0, 1e12);
        let s = m.steer(Position::new(5, 5), Position::new(9, 9), &[Position::new(6, 5)]);
        assert_eq!(s.target.row, i32::MIN);
        assert_eq!(s.displacement.0, i32::MIN);
        assert_eq!(s.displacement.1, 4);

        let s = m.steer(Position::new(-5, 5), Position::new(9, 9), &[Position::new(-6, 5)]);
        assert_eq!(s.target.row, i32::MAX);
        assert_eq!(s.displacement.0, i32::MAX);
    }
}
