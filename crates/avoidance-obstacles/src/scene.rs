//! Obstacle container with pairwise proximity caches
//!
//! The [`Scene`] owns all obstacles of an environment. Obstacles are addressed
//! by their insertion index, which stays stable for the lifetime of the scene.
//! Next to the obstacles it keeps the caches written by the proximity
//! resolver: pairwise distances, the closest surface point of each obstacle
//! with respect to every other one, intersection points and clusters.

use std::collections::HashMap;

use avoidance_common::{ensure_dimension, Error, Result, Vector};
use log::debug;

use crate::config::ObstacleConfig;
use crate::obstacle::Obstacle;

/// Symmetric storage for values attached to unordered obstacle pairs.
///
/// Only the strict upper triangle is stored; `(i, j)` and `(j, i)` address the
/// same cell and the diagonal has no storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PairMatrix<T> {
    len: usize,
    cells: Vec<T>,
}

impl<T: Clone> PairMatrix<T> {
    pub fn new() -> Self {
        Self {
            len: 0,
            cells: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Adds a row/column for one more element, filled with `fill`
    pub fn push_row(&mut self, fill: T) {
        self.cells.extend(std::iter::repeat(fill).take(self.len));
        self.len += 1;
    }

    fn index(&self, i: usize, j: usize) -> Option<usize> {
        if i == j || i >= self.len || j >= self.len {
            return None;
        }
        let (low, high) = if i < j { (i, j) } else { (j, i) };
        Some(high * (high - 1) / 2 + low)
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        let index = self.index(i, j)?;
        Some(&self.cells[index])
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> Option<&mut T> {
        let index = self.index(i, j)?;
        Some(&mut self.cells[index])
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) -> bool {
        match self.get_mut(i, j) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, value: T) {
        self.cells.iter_mut().for_each(|cell| *cell = value.clone());
    }
}

impl<T: Clone> Default for PairMatrix<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Set of obstacles sharing one dimension
#[derive(Debug, Clone, Default)]
pub struct Scene {
    obstacles: Vec<Obstacle>,
    distances: PairMatrix<Option<f64>>,
    /// `boundary_reference_points[i][j]`: closest point of `i` w.r.t. `j`, local to `i`
    boundary_reference_points: Vec<Vec<Vector>>,
    intersections: HashMap<(usize, usize), Vector>,
    clusters: Vec<Vec<usize>>,
}

fn pair_key(i: usize, j: usize) -> (usize, usize) {
    if i < j {
        (i, j)
    } else {
        (j, i)
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an obstacle and returns its index.
    ///
    /// The new pairs start unresolved.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> Result<usize> {
        if let Some(dim) = self.dimension() {
            if obstacle.dimension() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: obstacle.dimension(),
                });
            }
        }

        let dim = obstacle.dimension();
        let index = self.obstacles.len();

        for row in &mut self.boundary_reference_points {
            row.push(Vector::zeros(dim));
        }
        self.boundary_reference_points.push(vec![Vector::zeros(dim); index + 1]);
        self.distances.push_row(None);
        self.obstacles.push(obstacle);

        debug!("added obstacle {index} to scene ({} total)", self.obstacles.len());
        Ok(index)
    }

    pub fn add_from_config(&mut self, config: &ObstacleConfig) -> Result<usize> {
        self.add_obstacle(Obstacle::from_config(config)?)
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Dimension shared by all obstacles, `None` for an empty scene
    pub fn dimension(&self) -> Option<usize> {
        self.obstacles.first().map(Obstacle::dimension)
    }

    pub fn obstacle(&self, index: usize) -> Option<&Obstacle> {
        self.obstacles.get(index)
    }

    pub fn obstacle_mut(&mut self, index: usize) -> Option<&mut Obstacle> {
        self.obstacles.get_mut(index)
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacles_mut(&mut self) -> &mut [Obstacle] {
        &mut self.obstacles
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.obstacles.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.obstacles.len(),
            });
        }
        Ok(())
    }

    /// Cached distance between two obstacles; -1 when unresolved or `i == j`
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances.get(i, j).copied().flatten().unwrap_or(-1.0)
    }

    /// Cached distance, `None` when unresolved
    pub fn resolved_distance(&self, i: usize, j: usize) -> Option<f64> {
        self.distances.get(i, j).copied().flatten()
    }

    pub fn set_distance(&mut self, i: usize, j: usize, distance: f64) -> Result<()> {
        self.check_index(i)?;
        self.check_index(j)?;
        if !self.distances.set(i, j, Some(distance)) {
            return Err(Error::Configuration(format!("no distance between obstacle {i} and itself")));
        }
        Ok(())
    }

    /// Closest point of obstacle `i` with respect to obstacle `j`, global frame
    pub fn boundary_reference_point(&self, i: usize, j: usize) -> Result<Vector> {
        let local = self.boundary_reference_point_local(i, j)?;
        Ok(self.obstacles[i].to_global(local))
    }

    /// Closest point of obstacle `i` with respect to obstacle `j`, local frame of `i`
    pub fn boundary_reference_point_local(&self, i: usize, j: usize) -> Result<&Vector> {
        self.check_index(i)?;
        self.check_index(j)?;
        Ok(&self.boundary_reference_points[i][j])
    }

    pub fn set_boundary_reference_point(&mut self, i: usize, j: usize, point: &Vector) -> Result<()> {
        self.check_index(i)?;
        self.check_index(j)?;
        ensure_dimension(point, self.obstacles[i].dimension())?;
        self.boundary_reference_points[i][j] = self.obstacles[i].to_local(point);
        Ok(())
    }

    pub fn intersection(&self, i: usize, j: usize) -> Option<&Vector> {
        self.intersections.get(&pair_key(i, j))
    }

    pub fn set_intersection(&mut self, i: usize, j: usize, point: Option<Vector>) {
        match point {
            Some(point) => {
                self.intersections.insert(pair_key(i, j), point);
            }
            None => {
                self.intersections.remove(&pair_key(i, j));
            }
        }
    }

    /// Pairs currently recorded as intersecting, in ascending order
    pub fn intersecting_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<_> = self.intersections.keys().copied().collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn clusters(&self) -> &[Vec<usize>] {
        &self.clusters
    }

    /// Stores the clusters and tags each member obstacle with its cluster id.
    ///
    /// Obstacles in no cluster are untagged.
    pub fn set_clusters(&mut self, clusters: Vec<Vec<usize>>) {
        for obstacle in &mut self.obstacles {
            obstacle.set_cluster(None);
        }
        for (id, members) in clusters.iter().enumerate() {
            for &index in members {
                if let Some(obstacle) = self.obstacles.get_mut(index) {
                    obstacle.set_cluster(Some(id));
                }
            }
        }
        self.clusters = clusters;
    }

    pub fn any_obstacle_moved(&self) -> bool {
        self.obstacles.iter().any(Obstacle::has_moved)
    }

    /// Integrates all obstacles over `dt`
    pub fn move_obstacles(&mut self, dt: f64) -> Result<()> {
        for obstacle in &mut self.obstacles {
            obstacle.move_by_velocity(dt)?;
        }
        Ok(())
    }

    /// Puts every reference point back at its obstacle center
    pub fn reset_reference_points(&mut self) -> Result<()> {
        for obstacle in &mut self.obstacles {
            let dim = obstacle.dimension();
            obstacle.set_reference_point(Vector::zeros(dim))?;
        }
        Ok(())
    }

    /// Forgets every cached pair so the next resolution starts over
    pub fn invalidate_proximity(&mut self) {
        self.distances.fill(None);
        self.intersections.clear();
        for obstacle in &mut self.obstacles {
            obstacle.set_cluster(None);
        }
        self.clusters.clear();
    }
}
