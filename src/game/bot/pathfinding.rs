//! Coarse-grid A* with hazard fields
//!
//! The arena is divided into square cells. Cells whose center lies inside a
//! hazard's hard radius are impassable; cells inside its influence radius pay
//! an extra cost that fades linearly to zero at the influence edge.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use bitvec::prelude::*;
use rustc_hash::FxHashMap;

use crate::game::constants::pathfinding::{
    DIAGONAL_COST, HAZARD_COST, INFLUENCE_FACTOR, STRAIGHT_COST,
};
use crate::game::state::Bounds;
use crate::util::vec2::Vec2;

/// Grid coordinates (column, row)
pub type Cell = (i32, i32);

/// Something the path should keep away from
#[derive(Debug, Clone, Copy)]
pub struct Hazard {
    pub position: Vec2,
    /// Cells closer than this are blocked
    pub hard_radius: f32,
}

impl Hazard {
    pub fn influence_radius(&self) -> f32 {
        self.hard_radius * INFLUENCE_FACTOR
    }
}

const NEIGHBOURS: [(i32, i32, u32); 8] = [
    (1, 0, STRAIGHT_COST),
    (-1, 0, STRAIGHT_COST),
    (0, 1, STRAIGHT_COST),
    (0, -1, STRAIGHT_COST),
    (1, 1, DIAGONAL_COST),
    (1, -1, DIAGONAL_COST),
    (-1, 1, DIAGONAL_COST),
    (-1, -1, DIAGONAL_COST),
];

/// Per-decision navigation grid
#[derive(Debug, Clone)]
pub struct NavGrid {
    cols: i32,
    rows: i32,
    cell_size: f32,
    blocked: BitVec,
    extra_cost: Vec<u32>,
}

impl NavGrid {
    pub fn build(bounds: Bounds, cell_size: f32, hazards: &[Hazard]) -> Self {
        let cols = (bounds.width / cell_size).ceil().max(1.0) as i32;
        let rows = (bounds.height / cell_size).ceil().max(1.0) as i32;
        let len = (cols * rows) as usize;
        let mut grid = Self {
            cols,
            rows,
            cell_size,
            blocked: bitvec![0; len],
            extra_cost: vec![0; len],
        };

        for hazard in hazards {
            grid.stamp(hazard);
        }
        grid
    }

    fn stamp(&mut self, hazard: &Hazard) {
        let influence = hazard.influence_radius();
        let (min_c, min_r) = self.cell_of(hazard.position - Vec2::new(influence, influence));
        let (max_c, max_r) = self.cell_of(hazard.position + Vec2::new(influence, influence));

        for row in min_r..=max_r {
            for col in min_c..=max_c {
                let idx = self.index((col, row));
                let d = self.center_of((col, row)).distance_to(hazard.position);
                if d < hazard.hard_radius {
                    self.blocked.set(idx, true);
                } else if d < influence {
                    let falloff = 1.0 - (d - hazard.hard_radius) / (influence - hazard.hard_radius);
                    self.extra_cost[idx] += (HAZARD_COST as f32 * falloff).round() as u32;
                }
            }
        }
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    #[inline]
    fn index(&self, (col, row): Cell) -> usize {
        (row * self.cols + col) as usize
    }

    #[inline]
    pub fn in_bounds(&self, (col, row): Cell) -> bool {
        col >= 0 && row >= 0 && col < self.cols && row < self.rows
    }

    /// Cell containing `position`, clamped to the grid
    pub fn cell_of(&self, position: Vec2) -> Cell {
        let col = (position.x / self.cell_size).floor() as i32;
        let row = (position.y / self.cell_size).floor() as i32;
        (col.clamp(0, self.cols - 1), row.clamp(0, self.rows - 1))
    }

    pub fn center_of(&self, (col, row): Cell) -> Vec2 {
        Vec2::new(
            (col as f32 + 0.5) * self.cell_size,
            (row as f32 + 0.5) * self.cell_size,
        )
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.blocked[self.index(cell)]
    }

    pub fn extra_cost(&self, cell: Cell) -> u32 {
        self.extra_cost[self.index(cell)]
    }
}

/// Octile distance in cost units
fn heuristic(a: Cell, b: Cell) -> u32 {
    let dx = (a.0 - b.0).unsigned_abs();
    let dy = (a.1 - b.1).unsigned_abs();
    STRAIGHT_COST * dx.max(dy) + (DIAGONAL_COST - STRAIGHT_COST) * dx.min(dy)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    /// Cells from start to the last reached cell, inclusive
    pub cells: Vec<Cell>,
    pub reached_goal: bool,
    pub expanded: usize,
}

impl PathResult {
    /// The cell to steer toward next
    pub fn next_waypoint(&self) -> Option<Cell> {
        self.cells.get(1).or_else(|| self.cells.first()).copied()
    }
}

fn reconstruct(came_from: &FxHashMap<Cell, Cell>, start: Cell, end: Cell) -> Vec<Cell> {
    let mut cells = vec![end];
    let mut current = end;
    while current != start {
        match came_from.get(&current) {
            Some(&prev) => {
                cells.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    cells.reverse();
    cells
}

/// A* from `start` to `goal`. The start and goal cells are always passable.
///
/// When the expansion budget runs out the path to the cell closest to the
/// goal is returned with `reached_goal == false`. `None` means the goal is
/// unreachable or no progress could be made.
pub fn find_path(grid: &NavGrid, start: Cell, goal: Cell, max_expansions: usize) -> Option<PathResult> {
    if start == goal {
        return Some(PathResult {
            cells: vec![start],
            reached_goal: true,
            expanded: 0,
        });
    }

    let len = (grid.cols * grid.rows) as usize;
    let mut closed = bitvec![0; len];
    let mut g_scores: FxHashMap<Cell, u32> = FxHashMap::default();
    let mut came_from: FxHashMap<Cell, Cell> = FxHashMap::default();
    let mut open = BinaryHeap::new();

    let mut best_cell = start;
    let mut best_h = heuristic(start, goal);

    g_scores.insert(start, 0);
    open.push((Reverse(best_h), Reverse(0u32), start));

    let mut expanded = 0usize;
    let mut exhausted_budget = false;

    while let Some((_, Reverse(g_cost), cell)) = open.pop() {
        let idx = grid.index(cell);
        if closed[idx] {
            continue;
        }
        closed.set(idx, true);

        if cell == goal {
            return Some(PathResult {
                cells: reconstruct(&came_from, start, goal),
                reached_goal: true,
                expanded,
            });
        }

        let h = heuristic(cell, goal);
        if h < best_h {
            best_h = h;
            best_cell = cell;
        }

        expanded += 1;
        if expanded > max_expansions {
            exhausted_budget = true;
            break;
        }

        for (dc, dr, step_cost) in NEIGHBOURS {
            let next = (cell.0 + dc, cell.1 + dr);
            if !grid.in_bounds(next) || closed[grid.index(next)] {
                continue;
            }
            if next != goal && grid.is_blocked(next) {
                continue;
            }
            // No corner cutting past blocked cells
            if dc != 0 && dr != 0 && (grid.is_blocked((cell.0 + dc, cell.1)) || grid.is_blocked((cell.0, cell.1 + dr))) {
                continue;
            }

            let tentative = g_cost + step_cost + grid.extra_cost(next);
            if tentative >= g_scores.get(&next).copied().unwrap_or(u32::MAX) {
                continue;
            }
            g_scores.insert(next, tentative);
            came_from.insert(next, cell);
            open.push((Reverse(tentative + heuristic(next, goal)), Reverse(tentative), next));
        }
    }

    if exhausted_budget && best_cell != start {
        return Some(PathResult {
            cells: reconstruct(&came_from, start, best_cell),
            reached_goal: false,
            expanded,
        });
    }
    None
}

/// Unit steering vector from `from` toward `to`, taken from the step to the
/// path's second waypoint rather than the goal itself.
pub fn steer(grid: &NavGrid, from: Vec2, to: Vec2, max_expansions: usize) -> Option<Vec2> {
    let start = grid.cell_of(from);
    let goal = grid.cell_of(to);
    let path = find_path(grid, start, goal, max_expansions)?;

    let heading = match path.next_waypoint() {
        Some(cell) if cell != start => {
            Vec2::new((cell.0 - start.0) as f32, (cell.1 - start.1) as f32).normalize()
        }
        // Same cell: head straight for the target
        _ => (to - from).normalize(),
    };
    if heading.is_zero(1e-6) {
        None
    } else {
        Some(heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::pathfinding::{CELL_SIZE, MAX_EXPANSIONS};

    fn bounds() -> Bounds {
        Bounds {
            width: 1000.0,
            height: 600.0,
        }
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = NavGrid::build(bounds(), CELL_SIZE, &[]);
        assert_eq!(grid.cols(), 20);
        assert_eq!(grid.rows(), 12);
        assert_eq!(grid.cell_of(Vec2::new(-10.0, 5000.0)), (0, 11));
        assert_eq!(grid.center_of((0, 0)), Vec2::new(25.0, 25.0));
    }

    #[test]
    fn test_straight_path() {
        let grid = NavGrid::build(bounds(), CELL_SIZE, &[]);
        let path = find_path(&grid, (1, 5), (8, 5), MAX_EXPANSIONS).unwrap();
        assert!(path.reached_goal);
        assert_eq!(path.cells.first(), Some(&(1, 5)));
        assert_eq!(path.cells.last(), Some(&(8, 5)));
        assert_eq!(path.cells.len(), 8);
        assert_eq!(path.next_waypoint(), Some((2, 5)));
    }

    #[test]
    fn test_diagonal_path_uses_diagonals() {
        let grid = NavGrid::build(bounds(), CELL_SIZE, &[]);
        let path = find_path(&grid, (0, 0), (4, 4), MAX_EXPANSIONS).unwrap();
        assert_eq!(path.cells.len(), 5);
    }

    #[test]
    fn test_hazard_blocks_and_detours() {
        let hazard = Hazard {
            position: Vec2::new(275.0, 275.0),
            hard_radius: 60.0,
        };
        let grid = NavGrid::build(bounds(), CELL_SIZE, &[hazard]);
        assert!(grid.is_blocked((5, 5)));
        assert!(grid.extra_cost((5, 7)) > 0);

        let path = find_path(&grid, (1, 5), (9, 5), MAX_EXPANSIONS).unwrap();
        assert!(path.reached_goal);
        for cell in &path.cells {
            assert!(!grid.is_blocked(*cell), "path crosses blocked cell {:?}", cell);
        }
    }

    #[test]
    fn test_influence_cost_fades() {
        let hazard = Hazard {
            position: Vec2::new(525.0, 325.0),
            hard_radius: 50.0,
        };
        let grid = NavGrid::build(bounds(), CELL_SIZE, &[hazard]);
        let near = grid.extra_cost((10, 8));
        let far = grid.extra_cost((10, 9));
        assert!(near > far);
        assert_eq!(grid.extra_cost((0, 0)), 0);
    }

    #[test]
    fn test_enclosed_goal_is_unreachable() {
        // Ring of hazards around the goal
        let goal = Vec2::new(525.0, 325.0);
        let hazards: Vec<Hazard> = (0..16)
            .map(|i| {
                let angle = std::f32::consts::TAU * i as f32 / 16.0;
                Hazard {
                    position: goal + Vec2::from_angle(angle) * 150.0,
                    hard_radius: 60.0,
                }
            })
            .collect();
        let grid = NavGrid::build(bounds(), CELL_SIZE, &hazards);
        let start = grid.cell_of(Vec2::new(50.0, 50.0));
        assert!(find_path(&grid, start, grid.cell_of(goal), 10_000).is_none());
    }

    #[test]
    fn test_budget_returns_partial_progress() {
        let grid = NavGrid::build(bounds(), CELL_SIZE, &[]);
        let path = find_path(&grid, (0, 0), (19, 11), 3).unwrap();
        assert!(!path.reached_goal);
        assert!(path.cells.len() > 1);
    }

    #[test]
    fn test_steer_points_toward_second_waypoint() {
        let grid = NavGrid::build(bounds(), CELL_SIZE, &[]);
        let heading = steer(&grid, Vec2::new(75.0, 275.0), Vec2::new(475.0, 275.0), MAX_EXPANSIONS).unwrap();
        assert!(heading.approx_eq(Vec2::new(1.0, 0.0), 1e-4));
    }

    #[test]
    fn test_steer_same_cell_aims_at_target() {
        let grid = NavGrid::build(bounds(), CELL_SIZE, &[]);
        let heading = steer(&grid, Vec2::new(60.0, 60.0), Vec2::new(60.0, 90.0), MAX_EXPANSIONS).unwrap();
        assert!(heading.approx_eq(Vec2::new(0.0, 1.0), 1e-4));
    }
}
