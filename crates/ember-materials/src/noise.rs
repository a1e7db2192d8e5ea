//! Simplex noise in 3 and 4 dimensions (Ashima Arts / Stefan Gustavson).
//!
//! The arithmetic matches `NOISE_WGSL` operation for operation, so the CPU
//! results are the reference for what the shaders compute. Kernel radius is
//! `r^2 = 0.5`, which keeps both functions continuous; the 4-D output is
//! rescaled to roughly `[-1, 1]`.

use glam::{Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

/// Output scale of [`snoise3`].
pub const NOISE3_SCALE: f32 = 105.0;
/// Output scale of [`snoise4`].
pub const NOISE4_SCALE: f32 = 108.0;

const F4: f32 = 0.309_017;
const G4: Vec4 = Vec4::new(0.138_196_6, 0.276_393_2, 0.414_589_8, -0.447_213_6);

#[inline]
fn step(edge: f32, x: f32) -> f32 {
    if x < edge { 0.0 } else { 1.0 }
}

#[inline]
fn fract(x: f32) -> f32 {
    x - x.floor()
}

#[inline]
fn mod289(x: f32) -> f32 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn mod289_v4(x: Vec4) -> Vec4 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn permute(x: f32) -> f32 {
    mod289((x * 34.0 + 10.0) * x)
}

#[inline]
fn permute_v4(x: Vec4) -> Vec4 {
    mod289_v4((x * 34.0 + 10.0) * x)
}

#[inline]
fn taylor_inv_sqrt(r: f32) -> f32 {
    1.792_842_9 - 0.853_734_7 * r
}

#[inline]
fn taylor_inv_sqrt_v4(r: Vec4) -> Vec4 {
    Vec4::splat(1.792_842_9) - 0.853_734_7 * r
}

/// 3-D simplex noise in roughly `[-1, 1]`.
pub fn snoise3(v: Vec3) -> f32 {
    const CX: f32 = 1.0 / 6.0;
    const CY: f32 = 1.0 / 3.0;

    // First corner
    let i = (v + Vec3::splat(v.dot(Vec3::splat(CY)))).floor();
    let x0 = v - i + Vec3::splat(i.dot(Vec3::splat(CX)));

    // Other corners
    // Strict on z so an x == y == z tie still ranks into a valid simplex.
    let g = Vec3::new(
        step(x0.y, x0.x),
        step(x0.z, x0.y),
        if x0.z > x0.x { 1.0 } else { 0.0 },
    );
    let l = Vec3::ONE - g;
    let i1 = g.min(l.zxy());
    let i2 = g.max(l.zxy());

    let x1 = x0 - i1 + Vec3::splat(CX);
    let x2 = x0 - i2 + Vec3::splat(CY);
    let x3 = x0 - Vec3::splat(0.5);

    // Permutations
    let i = Vec3::new(mod289(i.x), mod289(i.y), mod289(i.z));
    let p = permute_v4(
        permute_v4(
            permute_v4(Vec4::splat(i.z) + Vec4::new(0.0, i1.z, i2.z, 1.0))
                + Vec4::splat(i.y)
                + Vec4::new(0.0, i1.y, i2.y, 1.0),
        ) + Vec4::splat(i.x)
            + Vec4::new(0.0, i1.x, i2.x, 1.0),
    );

    // Gradients: 7x7 points over a square, mapped onto an octahedron.
    let ns = Vec3::new(2.0 / 7.0, 0.5 / 7.0 - 1.0, 1.0 / 7.0);
    let j = p - 49.0 * (p * ns.z * ns.z).floor();
    let x_ = (j * ns.z).floor();
    let y_ = (j - 7.0 * x_).floor();
    let x = x_ * ns.x + Vec4::splat(ns.y);
    let y = y_ * ns.x + Vec4::splat(ns.y);
    let h = Vec4::ONE - x.abs() - y.abs();

    let b0 = Vec4::new(x.x, x.y, y.x, y.y);
    let b1 = Vec4::new(x.z, x.w, y.z, y.w);
    let s0 = b0.floor() * 2.0 + Vec4::ONE;
    let s1 = b1.floor() * 2.0 + Vec4::ONE;
    let sh = -Vec4::new(step(h.x, 0.0), step(h.y, 0.0), step(h.z, 0.0), step(h.w, 0.0));

    let a0 = b0.xzyw() + s0.xzyw() * sh.xxyy();
    let a1 = b1.xzyw() + s1.xzyw() * sh.zzww();

    let mut p0 = Vec3::new(a0.x, a0.y, h.x);
    let mut p1 = Vec3::new(a0.z, a0.w, h.y);
    let mut p2 = Vec3::new(a1.x, a1.y, h.z);
    let mut p3 = Vec3::new(a1.z, a1.w, h.w);

    let norm = taylor_inv_sqrt_v4(Vec4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    // Mix final noise value
    let m = (Vec4::splat(0.5) - Vec4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3)))
        .max(Vec4::ZERO);
    let m = m * m;
    NOISE3_SCALE * (m * m).dot(Vec4::new(p0.dot(x0), p1.dot(x1), p2.dot(x2), p3.dot(x3)))
}

fn grad4(j: f32, ip: Vec4) -> Vec4 {
    let pxyz = Vec3::new(
        (fract(j * ip.x) * 7.0).floor() * ip.z - 1.0,
        (fract(j * ip.y) * 7.0).floor() * ip.z - 1.0,
        (fract(j * ip.z) * 7.0).floor() * ip.z - 1.0,
    );
    let pw = 1.5 - pxyz.abs().dot(Vec3::ONE);
    let p = pxyz.extend(pw);
    let s = Vec4::select(p.cmplt(Vec4::ZERO), Vec4::ONE, Vec4::ZERO);
    (pxyz + (s.xyz() * 2.0 - Vec3::ONE) * s.w).extend(pw)
}

/// 4-D simplex noise in roughly `[-1, 1]`.
pub fn snoise4(v: Vec4) -> f32 {
    // First corner
    let i = (v + Vec4::splat(v.dot(Vec4::splat(F4)))).floor();
    let x0 = v - i + Vec4::splat(i.dot(Vec4::splat(G4.x)));

    // Rank sorting gives each corner a unique 0..=3 per channel.
    let is_x = Vec3::new(step(x0.y, x0.x), step(x0.z, x0.x), step(x0.w, x0.x));
    let is_yz = Vec3::new(step(x0.z, x0.y), step(x0.w, x0.y), step(x0.w, x0.z));
    let mut i0 = Vec4::new(
        is_x.x + is_x.y + is_x.z,
        1.0 - is_x.x,
        1.0 - is_x.y,
        1.0 - is_x.z,
    );
    i0.y += is_yz.x + is_yz.y;
    i0.z += 1.0 - is_yz.x;
    i0.w += 1.0 - is_yz.y;
    i0.z += is_yz.z;
    i0.w += 1.0 - is_yz.z;

    let i3 = i0.clamp(Vec4::ZERO, Vec4::ONE);
    let i2 = (i0 - Vec4::ONE).clamp(Vec4::ZERO, Vec4::ONE);
    let i1 = (i0 - Vec4::splat(2.0)).clamp(Vec4::ZERO, Vec4::ONE);

    let x1 = x0 - i1 + Vec4::splat(G4.x);
    let x2 = x0 - i2 + Vec4::splat(G4.y);
    let x3 = x0 - i3 + Vec4::splat(G4.z);
    let x4 = x0 + Vec4::splat(G4.w);

    // Permutations
    let i = mod289_v4(i);
    let j0 = permute(permute(permute(permute(i.w) + i.z) + i.y) + i.x);
    let j1 = permute_v4(
        permute_v4(
            permute_v4(
                permute_v4(Vec4::splat(i.w) + Vec4::new(i1.w, i2.w, i3.w, 1.0))
                    + Vec4::splat(i.z)
                    + Vec4::new(i1.z, i2.z, i3.z, 1.0),
            ) + Vec4::splat(i.y)
                + Vec4::new(i1.y, i2.y, i3.y, 1.0),
        ) + Vec4::splat(i.x)
            + Vec4::new(i1.x, i2.x, i3.x, 1.0),
    );

    // Gradients: 7x7x6 points over a cube, mapped onto a 4-cross polytope.
    let ip = Vec4::new(1.0 / 294.0, 1.0 / 49.0, 1.0 / 7.0, 0.0);
    let mut p0 = grad4(j0, ip);
    let mut p1 = grad4(j1.x, ip);
    let mut p2 = grad4(j1.y, ip);
    let mut p3 = grad4(j1.z, ip);
    let mut p4 = grad4(j1.w, ip);

    let norm = taylor_inv_sqrt_v4(Vec4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;
    p4 *= taylor_inv_sqrt(p4.dot(p4));

    // Mix contributions from the five corners
    let m0 = (Vec3::splat(0.5) - Vec3::new(x0.dot(x0), x1.dot(x1), x2.dot(x2))).max(Vec3::ZERO);
    let m1x = (0.5 - x3.dot(x3)).max(0.0);
    let m1y = (0.5 - x4.dot(x4)).max(0.0);
    let m0 = m0 * m0;
    let (m1x, m1y) = (m1x * m1x, m1y * m1y);

    NOISE4_SCALE
        * ((m0 * m0).dot(Vec3::new(p0.dot(x0), p1.dot(x1), p2.dot(x2)))
            + m1x * m1x * p3.dot(x3)
            + m1y * m1y * p4.dot(x4))
}
