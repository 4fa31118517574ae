/// Row-major flat grid with toroidal addressing: both axes wrap, so every cell has
/// exactly eight neighbors and maps tile seamlessly.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    pub data: Vec<T>,
    pub w: usize,
    pub h: usize,
}

impl<T: Copy + Default> Grid<T> {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            data: vec![T::default(); w * h],
            w,
            h,
        }
    }
}

impl<T> Grid<T> {
    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.w && y < self.h);
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let i = self.idx(x, y);
        &mut self.data[i]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Offsets of the 8-neighborhood, in a fixed order shared by every sweep.
pub const OFFSETS8: [(i32, i32); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0),           (1, 0),
    (-1, 1),  (0, 1),  (1, 1),
];

/// Index into `OFFSETS8` of the direction pointing back. The table is point-symmetric.
#[inline]
pub const fn opposite(dir: usize) -> usize {
    7 - dir
}

/// Wrap a signed coordinate pair onto the torus.
#[inline]
pub fn wrap_xy(x: i64, y: i64, w: usize, h: usize) -> (usize, usize) {
    (x.rem_euclid(w as i64) as usize, y.rem_euclid(h as i64) as usize)
}

/// Neighbor of `(x, y)` in direction `dir` of `OFFSETS8`.
#[inline]
pub fn neighbor(x: usize, y: usize, dir: usize, w: usize, h: usize) -> (usize, usize) {
    let (dx, dy) = OFFSETS8[dir];
    wrap_xy(x as i64 + dx as i64, y as i64 + dy as i64, w, h)
}

/// 8-connected neighbors with wrapping on both axes.
pub fn neighbors8_wrap(
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) -> impl Iterator<Item = (usize, usize)> {
    (0..8).map(move |dir| neighbor(x, y, dir, w, h))
}

/// Shorter of the direct and edge-wrapping separations along one axis.
#[inline]
pub fn wrapped_delta(a: f64, b: f64, extent: f64) -> f64 {
    let d = (a - b).abs();
    d.min(extent - d)
}

/// Squared Euclidean distance on the torus.
#[inline]
pub fn wrapped_dist_sq(x: f64, y: f64, sx: f64, sy: f64, w: f64, h: f64) -> f64 {
    let dx = wrapped_delta(x, sx, w);
    let dy = wrapped_delta(y, sy, h);
    dx * dx + dy * dy
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrustType {
    Oceanic,
    Continental,
    #[default]
    Unset,
}

/// Per-cell simulation state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub height: f64,
    /// -1 until plate assignment.
    pub plate_id: i32,
    pub crust_type: CrustType,
    pub crust_thickness: f64,
    /// Only meaningful after finalization.
    pub is_water: bool,
    pub water: f64,
    pub sediment: f64,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            height: 0.0,
            plate_id: -1,
            crust_type: CrustType::Unset,
            crust_thickness: 0.0,
            is_water: false,
            water: 0.0,
            sediment: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_both_axes() {
        assert_eq!(wrap_xy(-1, -1, 4, 3), (3, 2));
        assert_eq!(wrap_xy(4, 3, 4, 3), (0, 0));
        let corner: Vec<_> = neighbors8_wrap(0, 0, 4, 3).collect();
        assert_eq!(corner.len(), 8);
        assert!(corner.contains(&(3, 2)));
        assert!(corner.contains(&(1, 1)));
    }

    #[test]
    fn opposite_directions_cancel() {
        for dir in 0..8 {
            let (dx, dy) = OFFSETS8[dir];
            let (ox, oy) = OFFSETS8[opposite(dir)];
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn wrapped_distance_takes_short_way_round() {
        assert_eq!(wrapped_delta(9.0, 0.5, 10.0), 1.5);
        assert_eq!(wrapped_dist_sq(0.0, 0.0, 9.0, 9.0, 10.0, 10.0), 2.0);
    }

    #[test]
    fn new_cells_are_unassigned() {
        let grid = Grid::<Cell>::new(3, 2);
        assert_eq!(grid.len(), 6);
        assert!(grid.data.iter().all(|c| c.plate_id == -1 && c.crust_type == CrustType::Unset));
    }
}
