//! CPU mirrors of the fragment-stage formulas.
//!
//! Each function here evaluates the same expression as the GLSL in
//! `src/shaders/`, with the same constants, so the effects' numeric behaviour
//! can be checked without a GPU.

pub type Vec2 = [f32; 2];
pub type Rgb = [f32; 3];

pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

pub fn mix3(a: Rgb, b: Rgb, t: f32) -> Rgb {
    [mix(a[0], b[0], t), mix(a[1], b[1], t), mix(a[2], b[2], t)]
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn length(v: Vec2) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

pub const RANDOM_DOT: Vec2 = [12.9898, 78.233];
pub const RANDOM_SCALE: f32 = 43_758.547;

/// `fract(sin(dot(st, RANDOM_DOT)) * RANDOM_SCALE)`, the pixelate effect's
/// white noise.
pub fn random(st: Vec2) -> f32 {
    fract((st[0] * RANDOM_DOT[0] + st[1] * RANDOM_DOT[1]).sin() * RANDOM_SCALE)
}

pub const HASH_SCALE: f32 = 50.0;
pub const HASH_FREQUENCY: f32 = 0.318_309_9;
pub const HASH_OFFSET: Vec2 = [0.71, 0.113];

/// Lattice hash used by the smoke noise, in `[-1, 1)`.
pub fn hash(p: Vec2) -> f32 {
    let px = HASH_SCALE * fract(p[0] * HASH_FREQUENCY + HASH_OFFSET[0]);
    let py = HASH_SCALE * fract(p[1] * HASH_FREQUENCY + HASH_OFFSET[1]);
    -1.0 + 2.0 * fract(px * py * (px + py))
}

/// Smoothly interpolated lattice noise.
pub fn noise(p: Vec2) -> f32 {
    let i = [p[0].floor(), p[1].floor()];
    let f = [fract(p[0]), fract(p[1])];
    let u = [f[0] * f[0] * (3.0 - 2.0 * f[0]), f[1] * f[1] * (3.0 - 2.0 * f[1])];
    let bottom = mix(hash(i), hash([i[0] + 1.0, i[1]]), u[0]);
    let top = mix(hash([i[0], i[1] + 1.0]), hash([i[0] + 1.0, i[1] + 1.0]), u[0]);
    mix(bottom, top, u[1])
}

pub const FBM_WEIGHTS: [f32; 4] = [0.5, 0.25, 0.125, 0.0625];
pub const FBM_LACUNARITY: [f32; 3] = [2.02, 2.03, 2.01];
pub const FBM_NORMALIZER: f32 = 0.9375;

pub fn fbm(p: Vec2) -> f32 {
    let mut p = p;
    let mut f = 0.0;
    for (octave, weight) in FBM_WEIGHTS.iter().enumerate() {
        f += weight * noise(p);
        if let Some(scale) = FBM_LACUNARITY.get(octave) {
            p = [p[0] * scale, p[1] * scale];
        }
    }
    f / FBM_NORMALIZER
}

pub mod refraction {
    use super::{length, Vec2};

    pub const CENTER: Vec2 = [0.5, 0.5];
    /// `(frequency, speed, amplitude)` of each ripple layer.
    pub const RIPPLES: [(f32, f32, f32); 3] =
        [(25.0, 4.0, 0.015), (15.0, 2.5, 0.01), (35.0, 6.0, 0.008)];
    pub const LENS_STRENGTH: f32 = 0.2;
    /// `(frequency, speed, amplitude)` of the secondary x and y warps.
    pub const WARP: [(f32, f32, f32); 2] = [(12.0, 3.0, 0.012), (12.0, 2.5, 0.012)];
    pub const CHROMATIC_OFFSET: f32 = 0.003;
    pub const CAUSTICS_FREQUENCY: f32 = 20.0;
    /// x and y phase speeds of the caustics pattern.
    pub const CAUSTICS_SPEED: [f32; 2] = [1.5, 1.8];
    pub const CAUSTICS_STRENGTH: f32 = 0.05;

    pub fn total_ripple(dist: f32, time: f32) -> f32 {
        RIPPLES
            .iter()
            .map(|&(freq, speed, amp)| (dist * freq - time * speed).sin() * amp)
            .sum()
    }

    pub fn distorted_uv(uv: Vec2, time: f32) -> Vec2 {
        let offset = [uv[0] - CENTER[0], uv[1] - CENTER[1]];
        let dist = length(offset);
        let lens = 1.0 + dist * dist * LENS_STRENGTH;
        let mut out = [CENTER[0] + offset[0] * lens, CENTER[1] + offset[1] * lens];
        let [(fx, sx, ax), (fy, sy, ay)] = WARP;
        out[0] += (uv[1] * fx + time * sx).sin() * ax;
        out[1] += (uv[0] * fy + time * sy).cos() * ay;
        if dist > 0.0 {
            let ripple = total_ripple(dist, time);
            out[0] += offset[0] / dist * ripple;
            out[1] += offset[1] / dist * ripple;
        }
        out
    }

    /// Texture coordinates for the red, green, blue and alpha samples.
    pub fn channel_samples(distorted: Vec2) -> [Vec2; 4] {
        [
            [distorted[0] + CHROMATIC_OFFSET, distorted[1]],
            distorted,
            [distorted[0] - CHROMATIC_OFFSET, distorted[1]],
            distorted,
        ]
    }

    pub fn caustics(uv: Vec2, time: f32) -> f32 {
        let x = (uv[0] * CAUSTICS_FREQUENCY + time * CAUSTICS_SPEED[0]).sin();
        let y = (uv[1] * CAUSTICS_FREQUENCY + time * CAUSTICS_SPEED[1]).cos();
        x * y * CAUSTICS_STRENGTH + 1.0
    }
}

pub mod smoke {
    use super::{fbm, mix3, noise, smoothstep, Rgb, Vec2};

    /// `(scale, speed)` of the vertical and horizontal flow fields.
    pub const FLOW: [(f32, f32); 2] = [(2.0, 0.8), (3.0, 0.6)];
    pub const FLOW_STRENGTH: f32 = 0.1;
    pub const FLAME_HEIGHT: f32 = 2.0;
    /// `(frequency, speed, amplitude)` of the sideways flicker.
    pub const FLAME_WAVE: (f32, f32, f32) = (8.0, 4.0, 0.02);
    /// `(scale, speed, amplitude)` of the upward noise push.
    pub const FLAME_NOISE: (f32, f32, f32) = (4.0, 1.0, 0.03);
    /// `(scale, speed)` of the two dissolve layers; the second runs backwards.
    pub const DISSOLVE: [(f32, f32); 2] = [(3.0, 0.5), (5.0, 0.3)];
    pub const HEIGHT_EXPONENT: f32 = 1.5;
    pub const HEIGHT_WEIGHT: f32 = 0.7;
    pub const MASK_EDGES: (f32, f32) = (0.2, 0.8);

    pub const FLAME_CORE: Rgb = [1.0, 0.8, 0.2];
    pub const FLAME_MID: Rgb = [1.0, 0.4, 0.0];
    pub const FLAME_EDGE: Rgb = [0.6, 0.1, 0.0];
    pub const SMOKE: Rgb = [0.3, 0.3, 0.35];
    /// Burn ranges blending core to mid, mid to edge, and edge to smoke.
    pub const BURN_STOPS: [(f32, f32); 3] = [(0.3, 0.6), (0.6, 0.8), (0.8, 0.95)];
    /// `alpha = source * (mask * ALPHA.0 + ALPHA.1)`.
    pub const ALPHA: (f32, f32) = (0.9, 0.1);

    pub const EMBER: Rgb = [1.0, 0.6, 0.0];
    pub const EMBER_SCALE: f32 = 20.0;
    pub const EMBER_SPEED: f32 = 3.0;
    pub const EMBER_THRESHOLD: f32 = 0.85;
    pub const EMBER_MAX_MASK: f32 = 0.5;
    pub const EMBER_GLOW: f32 = 0.5;

    pub fn distorted_uv(uv: Vec2, time: f32) -> Vec2 {
        let [(vx, vs), (hx, hs)] = FLOW;
        let flow = [
            fbm([uv[0] * vx, uv[1] * vx + time * vs]) * FLOW_STRENGTH,
            fbm([uv[0] * hx + time * hs, uv[1] * hx]) * FLOW_STRENGTH,
        ];
        let height = (1.0 - uv[1]) * FLAME_HEIGHT;
        let (wave_freq, wave_speed, wave_amp) = FLAME_WAVE;
        let (noise_scale, noise_speed, noise_amp) = FLAME_NOISE;
        let flame = [
            (uv[1] * wave_freq + time * wave_speed).sin() * wave_amp * height,
            fbm([
                uv[0] * noise_scale + time * noise_speed,
                uv[1] * noise_scale + time * noise_speed,
            ]) * noise_amp
                * height,
        ];
        [uv[0] + flow[0] + flame[0], uv[1] + flow[1] + flame[1]]
    }

    /// 1 keeps the source pixel, 0 is fully burnt away.
    pub fn dissolve_mask(uv: Vec2, time: f32) -> f32 {
        let [(sa, ta), (sb, tb)] = DISSOLVE;
        let a = fbm([uv[0] * sa + time * ta, uv[1] * sa + time * ta]);
        let b = fbm([uv[0] * sb - time * tb, uv[1] * sb - time * tb]);
        let height = (1.0 - uv[1]).max(0.0).powf(HEIGHT_EXPONENT);
        smoothstep(MASK_EDGES.0, MASK_EDGES.1, (a + b) * 0.5 + height * HEIGHT_WEIGHT)
    }

    pub fn fire_color(mask: f32) -> Rgb {
        let burn = 1.0 - mask;
        let [core_mid, mid_edge, edge_smoke] = BURN_STOPS;
        let color = mix3(FLAME_CORE, FLAME_MID, smoothstep(core_mid.0, core_mid.1, burn));
        let color = mix3(color, FLAME_EDGE, smoothstep(mid_edge.0, mid_edge.1, burn));
        mix3(color, SMOKE, smoothstep(edge_smoke.0, edge_smoke.1, burn))
    }

    pub fn alpha(source_alpha: f32, mask: f32) -> f32 {
        source_alpha * (mask * ALPHA.0 + ALPHA.1)
    }

    pub fn ember(uv: Vec2, time: f32, mask: f32) -> bool {
        let p = [
            uv[0] * EMBER_SCALE + time * EMBER_SPEED,
            uv[1] * EMBER_SCALE + time * EMBER_SPEED,
        ];
        noise(p) > EMBER_THRESHOLD && mask < EMBER_MAX_MASK
    }

    /// Final color for a source texel already sampled at `distorted_uv`.
    pub fn shade(source: [f32; 4], uv: Vec2, time: f32) -> [f32; 4] {
        let mask = dissolve_mask(uv, time);
        let mut rgb = mix3(fire_color(mask), [source[0], source[1], source[2]], mask);
        if ember(uv, time, mask) {
            for (channel, glow) in rgb.iter_mut().zip(EMBER) {
                *channel += glow * EMBER_GLOW;
            }
        }
        [rgb[0], rgb[1], rgb[2], alpha(source[3], mask)]
    }
}

pub mod pixelate {
    use super::{mix, random, Vec2};

    pub const MIN_BLOCK: f32 = 2.0;
    pub const MAX_BLOCK: f32 = 32.0;
    pub const PHASE_SPEED: f32 = 0.8;
    /// `intensity = |sin(t * PHASE_SPEED)| * SWING + FLOOR`.
    pub const INTENSITY_SWING: f32 = 0.7;
    pub const INTENSITY_FLOOR: f32 = 0.3;
    /// `(speed, frequency)` of the secondary size wave.
    pub const WAVE: (f32, f32) = (2.0, 10.0);
    pub const WAVE_GAIN: f32 = 0.5;
    pub const GLITCH_THRESHOLD: f32 = 0.98;
    /// `(frequency, speed)` of the glitch line pattern.
    pub const GLITCH_LINES: (f32, f32) = (800.0, 20.0);
    /// `(rows, speed)` of the per-row glitch shift.
    pub const GLITCH_ROWS: (f32, f32) = (100.0, 5.0);
    pub const GLITCH_SHIFT: f32 = 0.05;
    pub const SEPARATION: f32 = 0.01;
    /// Weight of the unseparated color in the final blend.
    pub const PIXEL_MIX: f32 = 0.7;
    /// `(time scale, amplitude)` of the grain.
    pub const GRAIN: (f32, f32) = (0.1, 0.05);
    /// `(lines per pixel row, amplitude)` of the scanlines.
    pub const SCANLINES: (f32, f32) = (2.0, 0.02);
    pub const LEVELS: f32 = 16.0;

    pub fn intensity(time: f32) -> f32 {
        (time * PHASE_SPEED).sin().abs() * INTENSITY_SWING + INTENSITY_FLOOR
    }

    pub fn base_pixel_size(time: f32) -> f32 {
        mix(MIN_BLOCK, MAX_BLOCK, intensity(time))
    }

    pub fn pixel_size(time: f32, uv_x: f32) -> f32 {
        let wave = (time * WAVE.0 + uv_x * WAVE.1).sin() * 0.5 + 0.5;
        base_pixel_size(time) * (1.0 + wave * WAVE_GAIN)
    }

    /// Quantizes `uv` to the block grid and returns the block center.
    pub fn snap(uv: Vec2, size: f32) -> Vec2 {
        [
            (uv[0] * size).floor() / size + 0.5 / size,
            (uv[1] * size).floor() / size + 0.5 / size,
        ]
    }

    pub fn is_glitch_line(uv_y: f32, time: f32) -> bool {
        (uv_y * GLITCH_LINES.0 + time * GLITCH_LINES.1).sin() >= GLITCH_THRESHOLD
    }

    pub fn glitch_shift(uv_y: f32, time: f32) -> f32 {
        let row = (uv_y * GLITCH_ROWS.0 + time * GLITCH_ROWS.1).floor();
        random([row, row]) * GLITCH_SHIFT
    }

    pub fn separation(time: f32) -> f32 {
        intensity(time) * SEPARATION
    }

    /// Blends the channel-separated sample back toward the plain block color.
    pub fn combine(separated: f32, pixelated: f32) -> f32 {
        mix(separated, pixelated, PIXEL_MIX)
    }

    pub fn grain(uv: Vec2, time: f32) -> f32 {
        let t = time * GRAIN.0;
        random([uv[0] + t, uv[1] + t]) * GRAIN.1
    }

    pub fn scanline(uv_y: f32, resolution_y: f32) -> f32 {
        (uv_y * resolution_y * SCANLINES.0).sin() * SCANLINES.1
    }

    pub fn quantize(channel: f32) -> f32 {
        (channel * LEVELS).floor() / LEVELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const EPS: f32 = 1e-4;

    fn grid() -> impl Iterator<Item = Vec2> {
        (0..=10).flat_map(|x| (0..=10).map(move |y| [x as f32 / 10.0, y as f32 / 10.0]))
    }

    #[test]
    fn base_pixel_size_is_periodic() {
        let period = 2.0 * PI / pixelate::PHASE_SPEED;
        for step in 0..50 {
            let t = step as f32 * 0.37;
            let a = pixelate::base_pixel_size(t);
            let b = pixelate::base_pixel_size(t + period);
            assert!((a - b).abs() < EPS, "t={t} a={a} b={b}");
            // |sin| halves the period.
            let c = pixelate::base_pixel_size(t + period / 2.0);
            assert!((a - c).abs() < EPS, "t={t} a={a} c={c}");
        }
    }

    #[test]
    fn base_pixel_size_stays_in_block_range() {
        for step in 0..2000 {
            let size = pixelate::base_pixel_size(step as f32 * 0.013 - 5.0);
            assert!((pixelate::MIN_BLOCK..=pixelate::MAX_BLOCK).contains(&size), "{size}");
        }
    }

    #[test]
    fn quantize_bands_to_sixteenths() {
        for step in 0..=1000 {
            let q = pixelate::quantize(step as f32 / 1000.0 * 1.2 - 0.1);
            let scaled = q * 16.0;
            assert!((scaled - scaled.round()).abs() < 1e-5, "{q}");
        }
        assert_eq!(pixelate::quantize(0.999), 15.0 / 16.0);
        assert_eq!(pixelate::quantize(1.0), 1.0);
    }

    #[test]
    fn snap_returns_block_centers() {
        let snapped = pixelate::snap([0.26, 0.74], 4.0);
        assert!((snapped[0] - 0.375).abs() < EPS);
        assert!((snapped[1] - 0.625).abs() < EPS);
    }

    #[test]
    fn chromatic_offsets_are_fixed() {
        for t in [0.0, 1.5, 42.0] {
            for uv in grid() {
                let distorted = refraction::distorted_uv(uv, t);
                let [red, green, blue, alpha] = refraction::channel_samples(distorted);
                assert_eq!(green, distorted);
                assert_eq!(alpha, distorted);
                assert_eq!(red[1], distorted[1]);
                assert_eq!(blue[1], distorted[1]);
                assert!((red[0] - distorted[0] - 0.003).abs() < 1e-6);
                assert!((distorted[0] - blue[0] - 0.003).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn refraction_center_is_finite() {
        let uv = refraction::distorted_uv([0.5, 0.5], 3.0);
        assert!(uv[0].is_finite() && uv[1].is_finite());
    }

    #[test]
    fn caustics_stay_within_five_percent() {
        for uv in grid() {
            let c = refraction::caustics(uv, 7.25);
            assert!((0.95 - EPS..=1.05 + EPS).contains(&c));
        }
    }

    #[test]
    fn dissolve_mask_is_clamped() {
        for t in [0.0, 0.5, 3.0, 120.0] {
            for uv in grid() {
                let mask = smoke::dissolve_mask(uv, t);
                assert!((0.0..=1.0).contains(&mask), "uv={uv:?} t={t} mask={mask}");
            }
        }
    }

    #[test]
    fn fire_color_runs_from_core_to_smoke() {
        assert_eq!(smoke::fire_color(1.0), smoke::FLAME_CORE);
        let burnt = smoke::fire_color(0.0);
        for (got, want) in burnt.iter().zip(smoke::SMOKE) {
            assert!((got - want).abs() < EPS);
        }
    }

    #[test]
    fn smoke_alpha_never_fully_vanishes() {
        assert!((smoke::alpha(1.0, 0.0) - 0.1).abs() < EPS);
        assert!((smoke::alpha(1.0, 1.0) - 1.0).abs() < EPS);
        let shaded = smoke::shade([0.2, 0.4, 0.6, 1.0], [0.5, 0.9], 1.0);
        assert!(shaded[3] >= 0.1 - EPS);
    }

    #[test]
    fn fbm_is_normalized() {
        let total: f32 = FBM_WEIGHTS.iter().sum();
        assert!((total - FBM_NORMALIZER).abs() < f32::EPSILON);
        for uv in grid() {
            let v = fbm([uv[0] * 7.0, uv[1] * 7.0]);
            assert!((-1.0 - EPS..=1.0 + EPS).contains(&v), "{v}");
        }
    }

    #[test]
    fn random_is_unit_interval() {
        for uv in grid() {
            let r = random(uv);
            assert!((0.0..=1.0).contains(&r));
        }
        let shift = pixelate::glitch_shift(0.42, 1.0);
        assert!((0.0..=0.05).contains(&shift));
    }

    #[test]
    fn pixelate_finish_stays_subtle() {
        assert!((pixelate::combine(1.0, 0.0) - 0.3).abs() < EPS);
        assert!((pixelate::combine(0.4, 0.4) - 0.4).abs() < EPS);
        for uv in grid() {
            let grain = pixelate::grain(uv, 2.5);
            assert!((0.0..=0.05 + EPS).contains(&grain), "{grain}");
            let scan = pixelate::scanline(uv[1], 240.0);
            assert!(scan.abs() <= 0.02 + EPS, "{scan}");
        }
    }
}
