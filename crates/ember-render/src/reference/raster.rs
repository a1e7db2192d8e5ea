//! Small triangle rasterizer: perspective-correct attributes, reverse-Z.
//!
//! Triangles with a vertex at or behind the eye plane are dropped rather
//! than clipped.

use glam::{Vec2, Vec3, Vec4};

use crate::target::TargetSize;

const MIN_W: f32 = 1e-5;

/// A vertex after the vertex stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipVertex {
    pub clip: Vec4,
    /// Undisplaced object-space position.
    pub object_position: Vec3,
    pub world_position: Vec3,
    pub world_normal: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cull {
    None,
    /// Drop clockwise triangles (front faces are counter-clockwise).
    Back,
    Front,
}

/// One covered pixel with interpolated attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterFragment {
    pub x: u32,
    pub y: u32,
    /// Reverse-Z depth in [0, 1], larger is nearer.
    pub depth: f32,
    pub object_position: Vec3,
    pub world_position: Vec3,
    pub world_normal: Vec3,
}

/// NDC to pixel coordinates; y points down.
pub fn ndc_to_pixel(ndc: Vec2, size: TargetSize) -> Vec2 {
    Vec2::new(
        (ndc.x * 0.5 + 0.5) * size.width as f32,
        (0.5 - ndc.y * 0.5) * size.height as f32,
    )
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Visit every pixel center covered by the triangle.
pub fn rasterize_triangle(
    tri: &[ClipVertex; 3],
    size: TargetSize,
    cull: Cull,
    mut visit: impl FnMut(RasterFragment),
) {
    if tri.iter().any(|v| v.clip.w <= MIN_W) {
        return;
    }
    let inv_w = tri.map(|v| 1.0 / v.clip.w);
    let ndc = [0, 1, 2].map(|i| tri[i].clip.truncate() * inv_w[i]);
    let screen = ndc.map(|n| ndc_to_pixel(n.truncate(), size));

    // Counter-clockwise in NDC is clockwise once y points down.
    let area = edge(screen[0], screen[1], screen[2]);
    if area == 0.0 {
        return;
    }
    let front_facing = area < 0.0;
    match cull {
        Cull::Back if !front_facing => return,
        Cull::Front if front_facing => return,
        _ => {}
    }

    let min = screen[0].min(screen[1]).min(screen[2]);
    let max = screen[0].max(screen[1]).max(screen[2]);
    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil() as i64).clamp(0, size.width as i64) as u32;
    let y1 = (max.y.ceil() as i64).clamp(0, size.height as i64) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let b = [
                edge(screen[1], screen[2], p) / area,
                edge(screen[2], screen[0], p) / area,
                edge(screen[0], screen[1], p) / area,
            ];
            if b.iter().any(|&w| w < 0.0) {
                continue;
            }
            let depth = b[0] * ndc[0].z + b[1] * ndc[1].z + b[2] * ndc[2].z;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }
            let pw = [b[0] * inv_w[0], b[1] * inv_w[1], b[2] * inv_w[2]];
            let norm = 1.0 / (pw[0] + pw[1] + pw[2]);
            let lerp = |f: fn(&ClipVertex) -> Vec3| {
                (f(&tri[0]) * pw[0] + f(&tri[1]) * pw[1] + f(&tri[2]) * pw[2]) * norm
            };
            visit(RasterFragment {
                x,
                y,
                depth,
                object_position: lerp(|v| v.object_position),
                world_position: lerp(|v| v.world_position),
                world_normal: lerp(|v| v.world_normal),
            });
        }
    }
}

/// Reverse-Z depth buffer: cleared to 0, a fragment passes when its depth
/// is greater than or equal to the stored value.
#[derive(Clone, Debug)]
pub struct DepthImage {
    size: TargetSize,
    depths: Vec<f32>,
}

impl DepthImage {
    /// Cleared to the far plane.
    pub fn new(size: TargetSize) -> Self {
        Self {
            size,
            depths: vec![0.0; size.pixel_count()],
        }
    }

    /// Reverse-Z greater-or-equal test.
    pub fn passes(&self, x: u32, y: u32, depth: f32) -> bool {
        depth >= self.depths[(y * self.size.width + x) as usize]
    }

    /// Store a depth without testing it.
    pub fn write(&mut self, x: u32, y: u32, depth: f32) {
        self.depths[(y * self.size.width + x) as usize] = depth;
    }
}
