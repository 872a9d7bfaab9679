//! CPU fluid backend
//!
//! Runs the same kernels as the WGSL passes on plain grids. Rows are stored
//! bottom-up so texture coordinates from the input tracker index directly.
//! Sampling is bilinear with clamp-to-edge addressing, matching a linearly
//! filtered texture. Each pass is parallel over rows with rayon.

use std::ops::{Add, Mul};

use glam::{Vec2, Vec3, Vec4};
use rayon::prelude::*;

use crate::fluid::{CompositeOptions, FieldSize, FluidBackend, PingPong, Splat, SplatShape};

/// Velocity components are clamped to this magnitude after vorticity confinement
pub const VELOCITY_LIMIT: f32 = 1000.0;

/// Anything a field can store: interpolable by scalar weights
pub trait Texel: Copy + Default + Send + Sync + Add<Output = Self> + Mul<f32, Output = Self> {}

impl<T> Texel for T where T: Copy + Default + Send + Sync + Add<Output = T> + Mul<f32, Output = T> {}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    size: FieldSize,
    data: Vec<T>,
}

impl<T: Texel> Grid<T> {
    pub fn new(size: FieldSize) -> Self {
        Self::filled(size, T::default())
    }

    pub fn filled(size: FieldSize, value: T) -> Self {
        Self {
            size,
            data: vec![value; size.texel_count()],
        }
    }

    pub fn size(&self) -> FieldSize {
        self.size
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|texel| *texel = value);
    }

    /// Texel at integer coordinates, clamped to the edge
    pub fn fetch(&self, x: i64, y: i64) -> T {
        let x = x.clamp(0, self.size.width as i64 - 1) as usize;
        let y = y.clamp(0, self.size.height as i64 - 1) as usize;
        self.data[y * self.size.width as usize + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if x < self.size.width as usize && y < self.size.height as usize {
            self.data[y * self.size.width as usize + x] = value;
        }
    }

    /// Bilinear sample at a texture coordinate
    pub fn sample(&self, uv: Vec2) -> T {
        let st = uv * Vec2::new(self.size.width as f32, self.size.height as f32) - 0.5;
        let base = st.floor();
        let frac = st - base;
        let (x, y) = (base.x as i64, base.y as i64);

        let bottom = lerp(self.fetch(x, y), self.fetch(x + 1, y), frac.x);
        let top = lerp(self.fetch(x, y + 1), self.fetch(x + 1, y + 1), frac.x);
        lerp(bottom, top, frac.y)
    }

    /// Copy of this field at another size
    pub fn resampled(&self, size: FieldSize) -> Self {
        let mut out = Self::new(size);
        out.fill_with(|_, _, uv| self.sample(uv));
        out
    }

    /// Evaluate `kernel(x, y, uv)` for every texel, one rayon task per row
    pub fn fill_with<F>(&mut self, kernel: F)
    where
        F: Fn(i64, i64, Vec2) -> T + Sync,
    {
        let size = self.size;
        let width = size.width as usize;
        self.data
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, texel) in row.iter_mut().enumerate() {
                    let uv = Vec2::new(
                        (x as f32 + 0.5) / size.width as f32,
                        (y as f32 + 0.5) / size.height as f32,
                    );
                    *texel = kernel(x as i64, y as i64, uv);
                }
            });
    }
}

fn lerp<T: Texel>(a: T, b: T, t: f32) -> T {
    a * (1.0 - t) + b * t
}

fn gaussian(uv: Vec2, splat: &Splat, shape: SplatShape) -> f32 {
    let mut p = uv - splat.point;
    p.x *= shape.aspect_ratio;
    (-p.dot(p) / shape.radius).exp()
}

fn double_grid<T: Texel>(size: FieldSize) -> PingPong<Grid<T>> {
    PingPong::new(Grid::new(size), Grid::new(size))
}

pub struct CpuBackend {
    sim: FieldSize,
    velocity: PingPong<Grid<Vec2>>,
    dye: PingPong<Grid<Vec3>>,
    pressure: PingPong<Grid<f32>>,
    divergence: Grid<f32>,
    curl: Grid<f32>,
    frame: Grid<Vec4>,
}

impl CpuBackend {
    pub fn new(sim: FieldSize, dye: FieldSize) -> Self {
        log::debug!(
            "[CpuBackend::new] sim {}x{}, dye {}x{}",
            sim.width,
            sim.height,
            dye.width,
            dye.height
        );
        Self {
            sim,
            velocity: double_grid(sim),
            dye: double_grid(dye),
            pressure: double_grid(sim),
            divergence: Grid::new(sim),
            curl: Grid::new(sim),
            frame: Grid::new(dye),
        }
    }

    pub fn sim_size(&self) -> FieldSize {
        self.sim
    }

    pub fn dye_size(&self) -> FieldSize {
        self.dye.read().size()
    }

    pub fn velocity_field(&self) -> &Grid<Vec2> {
        self.velocity.read()
    }

    pub fn dye_field(&self) -> &Grid<Vec3> {
        self.dye.read()
    }

    pub fn pressure_field(&self) -> &Grid<f32> {
        self.pressure.read()
    }

    pub fn divergence_field(&self) -> &Grid<f32> {
        &self.divergence
    }

    pub fn curl_field(&self) -> &Grid<f32> {
        &self.curl
    }

    /// Premultiplied RGBA output of the last composite
    pub fn frame(&self) -> &Grid<Vec4> {
        &self.frame
    }

    pub fn kinetic_energy(&self) -> f32 {
        self.velocity
            .read()
            .values()
            .par_iter()
            .map(|v| 0.5 * v.length_squared())
            .sum()
    }

    /// Brightest dye channel anywhere in the field
    pub fn max_dye(&self) -> f32 {
        self.dye
            .read()
            .values()
            .iter()
            .fold(0.0f32, |max, color| max.max(color.max_element()))
    }
}

impl FluidBackend for CpuBackend {
    fn resize(&mut self, sim: FieldSize, dye: FieldSize) {
        if sim != self.sim {
            let velocity = self.velocity.read().resampled(sim);
            self.velocity = PingPong::new(velocity, Grid::new(sim));
            self.pressure = double_grid(sim);
            self.divergence = Grid::new(sim);
            self.curl = Grid::new(sim);
            self.sim = sim;
        }
        if dye != self.dye_size() {
            let colors = self.dye.read().resampled(dye);
            self.dye = PingPong::new(colors, Grid::new(dye));
            self.frame = Grid::new(dye);
        }
    }

    fn splat(&mut self, splat: &Splat, shape: SplatShape) {
        {
            let (source, target) = self.velocity.split_mut();
            target.fill_with(|x, y, uv| source.fetch(x, y) + splat.force * gaussian(uv, splat, shape));
        }
        self.velocity.swap();

        {
            let (source, target) = self.dye.split_mut();
            target.fill_with(|x, y, uv| source.fetch(x, y) + splat.color * gaussian(uv, splat, shape));
        }
        self.dye.swap();
    }

    fn curl(&mut self) {
        let velocity = self.velocity.read();
        self.curl.fill_with(|x, y, _| {
            let l = velocity.fetch(x - 1, y).y;
            let r = velocity.fetch(x + 1, y).y;
            let t = velocity.fetch(x, y + 1).x;
            let b = velocity.fetch(x, y - 1).x;
            0.5 * (r - l - t + b)
        });
    }

    fn vorticity(&mut self, strength: f32, dt: f32) {
        let curl = &self.curl;
        let (source, target) = self.velocity.split_mut();
        target.fill_with(|x, y, _| {
            let l = curl.fetch(x - 1, y);
            let r = curl.fetch(x + 1, y);
            let t = curl.fetch(x, y + 1);
            let b = curl.fetch(x, y - 1);
            let c = curl.fetch(x, y);

            let mut force = 0.5 * Vec2::new(t.abs() - b.abs(), r.abs() - l.abs());
            force /= force.length() + 0.0001;
            force *= strength * c;
            force.y = -force.y;

            (source.fetch(x, y) + force * dt).clamp(Vec2::splat(-VELOCITY_LIMIT), Vec2::splat(VELOCITY_LIMIT))
        });
        self.velocity.swap();
    }

    fn divergence(&mut self) {
        let velocity = self.velocity.read();
        let size = velocity.size();
        let (last_x, last_y) = (size.width as i64 - 1, size.height as i64 - 1);

        self.divergence.fill_with(|x, y, _| {
            let c = velocity.fetch(x, y);
            // reflect velocity at the walls
            let l = if x == 0 { -c.x } else { velocity.fetch(x - 1, y).x };
            let r = if x == last_x { -c.x } else { velocity.fetch(x + 1, y).x };
            let t = if y == last_y { -c.y } else { velocity.fetch(x, y + 1).y };
            let b = if y == 0 { -c.y } else { velocity.fetch(x, y - 1).y };
            0.5 * (r - l + t - b)
        });
    }

    fn seed_pressure(&mut self, value: f32) {
        self.pressure.read_mut().fill(value);
    }

    fn relax_pressure(&mut self) {
        let divergence = &self.divergence;
        let (source, target) = self.pressure.split_mut();
        target.fill_with(|x, y, _| {
            let l = source.fetch(x - 1, y);
            let r = source.fetch(x + 1, y);
            let t = source.fetch(x, y + 1);
            let b = source.fetch(x, y - 1);
            (l + r + b + t - divergence.fetch(x, y)) * 0.25
        });
        self.pressure.swap();
    }

    fn subtract_gradient(&mut self) {
        let pressure = self.pressure.read();
        let (source, target) = self.velocity.split_mut();
        target.fill_with(|x, y, _| {
            let l = pressure.fetch(x - 1, y);
            let r = pressure.fetch(x + 1, y);
            let t = pressure.fetch(x, y + 1);
            let b = pressure.fetch(x, y - 1);
            source.fetch(x, y) - Vec2::new(r - l, t - b)
        });
        self.velocity.swap();
    }

    fn advect_velocity(&mut self, dt: f32, dissipation: f32) {
        let texel = Vec2::from(self.sim.texel_size());
        let decay = 1.0 / (1.0 + dissipation * dt);
        let (source, target) = self.velocity.split_mut();
        target.fill_with(|_, _, uv| {
            let coord = uv - dt * source.sample(uv) * texel;
            source.sample(coord) * decay
        });
        self.velocity.swap();
    }

    fn advect_dye(&mut self, dt: f32, dissipation: f32) {
        let texel = Vec2::from(self.sim.texel_size());
        let decay = 1.0 / (1.0 + dissipation * dt);
        let velocity = self.velocity.read();
        let (source, target) = self.dye.split_mut();
        target.fill_with(|_, _, uv| {
            let coord = uv - dt * velocity.sample(uv) * texel;
            source.sample(coord) * decay
        });
        self.dye.swap();
    }

    fn composite(&mut self, options: &CompositeOptions) {
        let dye = self.dye.read();
        let texel = Vec2::from(dye.size().texel_size());
        let options = *options;

        self.frame.fill_with(|x, y, _| {
            let mut color = dye.fetch(x, y);
            if options.shading {
                let dx = dye.fetch(x + 1, y).length() - dye.fetch(x - 1, y).length();
                let dy = dye.fetch(x, y + 1).length() - dye.fetch(x, y - 1).length();
                let normal = Vec3::new(dx, dy, texel.length()).normalize();
                let diffuse = (normal.z + 0.7).clamp(0.7, 1.0);
                color *= diffuse;
            }

            let alpha = color.max_element();
            let src = color.extend(alpha);
            if options.transparent {
                src
            } else {
                // premultiplied "over" onto an opaque background
                src + options.back_color.extend(1.0) * (1.0 - alpha)
            }
        });
    }
}
