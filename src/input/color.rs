use glam::Vec3;
use rand::Rng;

/// Scale applied to generated colors so repeated splats don't saturate the dye
pub const COLOR_INTENSITY: f32 = 0.15;

/// HSV to RGB, all components in [0, 1]
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let h = h.rem_euclid(1.0);
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    match i as u32 % 6 {
        0 => Vec3::new(v, t, p),
        1 => Vec3::new(q, v, p),
        2 => Vec3::new(p, v, t),
        3 => Vec3::new(p, q, v),
        4 => Vec3::new(t, p, v),
        _ => Vec3::new(v, p, q),
    }
}

/// Random fully saturated hue, dimmed to [`COLOR_INTENSITY`]
pub fn generate_color<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    hsv_to_rgb(rng.gen::<f32>(), 1.0, 1.0) * COLOR_INTENSITY
}
