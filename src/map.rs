use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::InstanceError;

#[derive(Debug, Clone)]
pub struct Tile {
    passable: bool,
    pub neighbors: Vec<(usize, usize)>, // Stores coordinates of accessible neighbors
}

impl Tile {
    pub fn is_passable(&self) -> bool {
        self.passable
    }
}

/// Grid addressed as `(row, column)`.
#[derive(Debug, Clone)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    pub grid: Vec<Vec<Tile>>,
}

impl Map {
    /// `.` is free, `@`, `T` and `O` are obstacles.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, InstanceError> {
        let height = rows.len();
        let width = rows
            .first()
            .map(|row| row.as_ref().chars().count())
            .ok_or(InstanceError::EmptyMap)?;
        if width == 0 {
            return Err(InstanceError::EmptyMap);
        }

        let mut grid = Vec::with_capacity(height);
        for (x, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != width {
                return Err(InstanceError::RaggedRow {
                    row: x,
                    found,
                    expected: width,
                });
            }

            let tiles_row = row
                .chars()
                .enumerate()
                .map(|(y, ch)| match ch {
                    '.' => Ok(true),
                    '@' | 'T' | 'O' => Ok(false),
                    tile => Err(InstanceError::UnknownTile {
                        tile,
                        row: x,
                        column: y,
                    }),
                })
                .map(|passable| {
                    passable.map(|passable| Tile {
                        passable,
                        neighbors: Vec::new(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            grid.push(tiles_row);
        }

        let mut map = Map {
            height,
            width,
            grid,
        };
        map.initialize_neighbors();

        Ok(map)
    }

    fn initialize_neighbors(&mut self) {
        for x in 0..self.height {
            for y in 0..self.width {
                if self.grid[x][y].passable {
                    self.grid[x][y].neighbors = self.get_neighbors(x, y);
                }
            }
        }
    }

    pub fn get_neighbors(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let directions = [(-1, 0), (1, 0), (0, -1), (0, 1), (0, 0)]; // Up, down, left, right, stay
        let mut neighbors = Vec::new();

        for &(dx, dy) in &directions {
            let new_x = x as i64 + dx;
            let new_y = y as i64 + dy;
            if new_x >= 0
                && new_y >= 0
                && new_x < self.height as i64
                && new_y < self.width as i64
                && self.grid[new_x as usize][new_y as usize].passable
            {
                neighbors.push((new_x as usize, new_y as usize));
            }
        }

        neighbors
    }

    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.height && y < self.width
    }

    pub fn is_passable(&self, x: usize, y: usize) -> bool {
        self.grid[x][y].is_passable()
    }

    /// Row-major.
    pub fn passable_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height)
            .flat_map(move |x| (0..self.width).map(move |y| (x, y)))
            .filter(|&(x, y)| self.is_passable(x, y))
    }

    /// Shortest step counts from `source`, `usize::MAX` where unreachable.
    pub fn distances_from(&self, source: (usize, usize)) -> Vec<Vec<usize>> {
        let mut distances = vec![vec![usize::MAX; self.width]; self.height];
        let mut heap = BinaryHeap::new();

        distances[source.0][source.1] = 0;
        heap.push((Reverse(0), source));

        while let Some((Reverse(cost), (x, y))) = heap.pop() {
            if cost > distances[x][y] {
                continue;
            }

            for &(new_x, new_y) in &self.grid[x][y].neighbors {
                let next_cost = cost + 1;
                if next_cost < distances[new_x][new_y] {
                    heap.push((Reverse(next_cost), (new_x, new_y)));
                    distances[new_x][new_y] = next_cost;
                }
            }
        }

        distances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_rows() {
        let map = Map::from_rows(&["@@@@", "@..@", "@.@@", "@@@@"]).unwrap();

        assert_eq!(map.height, 4);
        assert_eq!(map.width, 4);

        assert!(!map.is_passable(0, 0));
        assert!(!map.is_passable(1, 0));
        assert!(!map.is_passable(0, 1));
        assert!(map.is_passable(1, 1));

        let neighbors = map.get_neighbors(1, 1);
        assert_eq!(neighbors.len(), 3);
        assert!(neighbors.contains(&(2, 1)));
        assert!(neighbors.contains(&(1, 2)));
        assert!(neighbors.contains(&(1, 1)));

        assert_eq!(
            map.passable_cells().collect::<Vec<_>>(),
            vec![(1, 1), (1, 2), (2, 1)]
        );
    }

    #[test]
    fn test_rejects_bad_rows() {
        assert_eq!(
            Map::from_rows::<&str>(&[]).unwrap_err(),
            InstanceError::EmptyMap
        );
        assert_eq!(
            Map::from_rows(&["...", ".."]).unwrap_err(),
            InstanceError::RaggedRow {
                row: 1,
                found: 2,
                expected: 3
            }
        );
        assert_eq!(
            Map::from_rows(&["..x"]).unwrap_err(),
            InstanceError::UnknownTile {
                tile: 'x',
                row: 0,
                column: 2
            }
        );
    }

    #[test]
    fn test_distances_around_wall() {
        let map = Map::from_rows(&["...", "@@.", "..."]).unwrap();
        let distances = map.distances_from((0, 0));
        assert_eq!(distances[0][2], 2);
        assert_eq!(distances[2][0], 6);
        assert_eq!(distances[1][0], usize::MAX);
    }
}
