use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[inline]
fn smootherstep(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[inline]
fn grad(hash: u8, dx: f64, dy: f64) -> f64 {
    // 16 evenly-spaced unit gradients (every 22.5°).
    match hash & 15 {
        0  =>  dx,
        1  =>  0.924 * dx + 0.383 * dy,
        2  =>  0.707 * (dx + dy),
        3  =>  0.383 * dx + 0.924 * dy,
        4  =>  dy,
        5  => -0.383 * dx + 0.924 * dy,
        6  =>  0.707 * (-dx + dy),
        7  => -0.924 * dx + 0.383 * dy,
        8  => -dx,
        9  => -0.924 * dx - 0.383 * dy,
        10 =>  0.707 * (-dx - dy),
        11 => -0.383 * dx - 0.924 * dy,
        12 => -dy,
        13 =>  0.383 * dx - 0.924 * dy,
        14 =>  0.707 * (dx - dy),
        _  =>  0.924 * dx - 0.383 * dy,
    }
}

/// Seeded gradient-noise sampler.
///
/// The permutation table is the only state and is fixed at construction, so a context can be
/// shared freely across threads and two contexts built from the same seed agree bit for bit.
#[derive(Clone)]
pub struct NoiseContext {
    perm: [u8; 512],
}

impl NoiseContext {
    pub fn new(seed: u64) -> Self {
        let mut table: Vec<u8> = (0..=255).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        table.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        for (i, p) in perm.iter_mut().enumerate() {
            *p = table[i & 255];
        }
        Self { perm }
    }

    #[inline]
    fn hash(&self, ix: i64, iy: i64) -> u8 {
        let xi = (ix & 255) as usize;
        let yi = (iy & 255) as usize;
        self.perm[self.perm[xi] as usize + yi]
    }

    /// 2D gradient noise in [-1, 1].
    pub fn noise2d(&self, x: f64, y: f64) -> f64 {
        let fx0 = x.floor();
        let fy0 = y.floor();
        let ix = fx0 as i64;
        let iy = fy0 as i64;
        let fx = x - fx0;
        let fy = y - fy0;
        let sx = smootherstep(fx);
        let sy = smootherstep(fy);

        let v00 = grad(self.hash(ix, iy), fx, fy);
        let v10 = grad(self.hash(ix + 1, iy), fx - 1.0, fy);
        let v01 = grad(self.hash(ix, iy + 1), fx, fy - 1.0);
        let v11 = grad(self.hash(ix + 1, iy + 1), fx - 1.0, fy - 1.0);

        let a = lerp(v00, v10, sx);
        let b = lerp(v01, v11, sx);
        // Raw range is ~[-0.7, 0.7]
        (lerp(a, b, sy) * std::f64::consts::SQRT_2).clamp(-1.0, 1.0)
    }

    /// Fractal Brownian motion, normalized by the summed amplitude.
    pub fn fbm(
        &self,
        x: f64,
        y: f64,
        octaves: u32,
        persistence: f64,
        lacunarity: f64,
        base_frequency: f64,
    ) -> f64 {
        let mut sum = 0.0;
        let mut amp = 1.0;
        let mut freq = base_frequency;
        let mut norm = 0.0;
        for _ in 0..octaves {
            sum += self.noise2d(x * freq, y * freq) * amp;
            norm += amp;
            amp *= persistence;
            freq *= lacunarity;
        }
        if norm > 0.0 { sum / norm } else { 0.0 }
    }
}
