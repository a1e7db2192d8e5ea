//! WGSL sources for the color and depth variants.
//!
//! Both variants are built from a base template plus the same hook bodies,
//! so a fragment discarded in the color pass is also missing from the shadow
//! map. Noise here mirrors [`crate::noise`].

use ember_lighting::pbr::PBR_WGSL;
use ember_lighting::shadow::SHADOW_WGSL;

use crate::template::{HookPoint, ShaderTemplate, TemplateError};

/// Bind group of per-mesh data in the color variant.
pub const COLOR_MESH_GROUP: u32 = 3;
/// Bind group of per-mesh data in the depth variant.
pub const DEPTH_MESH_GROUP: u32 = 1;

/// Binding of [`crate::ShadingUniform`] inside the mesh group.
pub const SHADING_BINDING: u32 = 2;

/// Simplex noise in WGSL. Mirrors [`crate::noise`] operation for operation.
pub const NOISE_WGSL: &str = r#"
fn mod289_f(x: f32) -> f32 {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_v3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_v4(x: vec4<f32>) -> vec4<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute_f(x: f32) -> f32 {
    return mod289_f((x * 34.0 + 10.0) * x);
}

fn permute_v4(x: vec4<f32>) -> vec4<f32> {
    return mod289_v4((x * 34.0 + 10.0) * x);
}

fn taylor_inv_sqrt_f(r: f32) -> f32 {
    return 1.7928429 - 0.8537347 * r;
}

fn taylor_inv_sqrt_v4(r: vec4<f32>) -> vec4<f32> {
    return 1.7928429 - 0.8537347 * r;
}

fn snoise3(v: vec3<f32>) -> f32 {
    let cx = 1.0 / 6.0;
    let cy = 1.0 / 3.0;

    var i = floor(v + dot(v, vec3<f32>(cy)));
    let x0 = v - i + dot(i, vec3<f32>(cx));

    // Strict on z so an x == y == z tie still ranks into a valid simplex.
    let g = vec3<f32>(step(x0.y, x0.x), step(x0.z, x0.y), select(0.0, 1.0, x0.z > x0.x));
    let l = 1.0 - g;
    let i1 = min(g.xyz, l.zxy);
    let i2 = max(g.xyz, l.zxy);

    let x1 = x0 - i1 + cx;
    let x2 = x0 - i2 + cy;
    let x3 = x0 - 0.5;

    i = mod289_v3(i);
    let p = permute_v4(permute_v4(permute_v4(
        i.z + vec4<f32>(0.0, i1.z, i2.z, 1.0))
        + i.y + vec4<f32>(0.0, i1.y, i2.y, 1.0))
        + i.x + vec4<f32>(0.0, i1.x, i2.x, 1.0));

    let ns = vec3<f32>(2.0 / 7.0, 0.5 / 7.0 - 1.0, 1.0 / 7.0);
    let j = p - 49.0 * floor(p * ns.z * ns.z);
    let x_ = floor(j * ns.z);
    let y_ = floor(j - 7.0 * x_);
    let x = x_ * ns.x + ns.y;
    let y = y_ * ns.x + ns.y;
    let h = 1.0 - abs(x) - abs(y);

    let b0 = vec4<f32>(x.xy, y.xy);
    let b1 = vec4<f32>(x.zw, y.zw);
    let s0 = floor(b0) * 2.0 + 1.0;
    let s1 = floor(b1) * 2.0 + 1.0;
    let sh = -step(h, vec4<f32>(0.0));

    let a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    let a1 = b1.xzyw + s1.xzyw * sh.zzww;

    var p0 = vec3<f32>(a0.xy, h.x);
    var p1 = vec3<f32>(a0.zw, h.y);
    var p2 = vec3<f32>(a1.xy, h.z);
    var p3 = vec3<f32>(a1.zw, h.w);

    let norm = taylor_inv_sqrt_v4(vec4<f32>(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 = p0 * norm.x;
    p1 = p1 * norm.y;
    p2 = p2 * norm.z;
    p3 = p3 * norm.w;

    let r2 = vec4<f32>(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3));
    var m = max(0.5 - r2, vec4<f32>(0.0));
    m = m * m;
    return 105.0 * dot(m * m, vec4<f32>(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}

fn grad4(j: f32, ip: vec4<f32>) -> vec4<f32> {
    let pxyz = floor(fract(vec3<f32>(j) * ip.xyz) * 7.0) * ip.z - 1.0;
    let pw = 1.5 - dot(abs(pxyz), vec3<f32>(1.0));
    let s = select(vec4<f32>(0.0), vec4<f32>(1.0), vec4<f32>(pxyz, pw) < vec4<f32>(0.0));
    return vec4<f32>(pxyz + (s.xyz * 2.0 - 1.0) * s.w, pw);
}

fn snoise4(v: vec4<f32>) -> f32 {
    let f4 = 0.309017;
    let g4 = vec4<f32>(0.1381966, 0.2763932, 0.4145898, -0.4472136);

    var i = floor(v + dot(v, vec4<f32>(f4)));
    let x0 = v - i + dot(i, vec4<f32>(g4.x));

    let is_x = step(x0.yzw, x0.xxx);
    let is_yz = step(x0.zww, x0.yyz);
    var i0 = vec4<f32>(is_x.x + is_x.y + is_x.z, 1.0 - is_x);
    i0.y += is_yz.x + is_yz.y;
    i0.z += 1.0 - is_yz.x;
    i0.w += 1.0 - is_yz.y;
    i0.z += is_yz.z;
    i0.w += 1.0 - is_yz.z;

    let i3 = clamp(i0, vec4<f32>(0.0), vec4<f32>(1.0));
    let i2 = clamp(i0 - 1.0, vec4<f32>(0.0), vec4<f32>(1.0));
    let i1 = clamp(i0 - 2.0, vec4<f32>(0.0), vec4<f32>(1.0));

    let x1 = x0 - i1 + g4.x;
    let x2 = x0 - i2 + g4.y;
    let x3 = x0 - i3 + g4.z;
    let x4 = x0 + g4.w;

    i = mod289_v4(i);
    let j0 = permute_f(permute_f(permute_f(permute_f(i.w) + i.z) + i.y) + i.x);
    let j1 = permute_v4(permute_v4(permute_v4(permute_v4(
        i.w + vec4<f32>(i1.w, i2.w, i3.w, 1.0))
        + i.z + vec4<f32>(i1.z, i2.z, i3.z, 1.0))
        + i.y + vec4<f32>(i1.y, i2.y, i3.y, 1.0))
        + i.x + vec4<f32>(i1.x, i2.x, i3.x, 1.0));

    let ip = vec4<f32>(1.0 / 294.0, 1.0 / 49.0, 1.0 / 7.0, 0.0);
    var p0 = grad4(j0, ip);
    var p1 = grad4(j1.x, ip);
    var p2 = grad4(j1.y, ip);
    var p3 = grad4(j1.z, ip);
    var p4 = grad4(j1.w, ip);

    let norm = taylor_inv_sqrt_v4(vec4<f32>(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 = p0 * norm.x;
    p1 = p1 * norm.y;
    p2 = p2 * norm.z;
    p3 = p3 * norm.w;
    p4 = p4 * taylor_inv_sqrt_f(dot(p4, p4));

    var m0 = max(0.5 - vec3<f32>(dot(x0, x0), dot(x1, x1), dot(x2, x2)), vec3<f32>(0.0));
    var m1 = max(0.5 - vec2<f32>(dot(x3, x3), dot(x4, x4)), vec2<f32>(0.0));
    m0 = m0 * m0;
    m1 = m1 * m1;
    return 108.0 * (dot(m0 * m0, vec3<f32>(dot(p0, x0), dot(p1, x1), dot(p2, x2)))
        + dot(m1 * m1, vec2<f32>(dot(p3, x3), dot(p4, x4))));
}
"#;

const DISSOLVE_FUNCTIONS_WGSL: &str = r#"
struct ShadingUniforms {
    process_frequency_displacement_drift: vec4<f32>,
    edge_color_strength: vec4<f32>,
    edge_width_roughness_extent: vec4<f32>,
};

fn dissolve_displace(position: vec3<f32>, normal: vec3<f32>) -> vec3<f32> {
    let params = shading.process_frequency_displacement_drift;
    return position + normal * (snoise3(position * params.y) * params.z);
}

fn dissolve_value(position: vec3<f32>) -> f32 {
    let params = shading.process_frequency_displacement_drift;
    let n = snoise4(vec4<f32>(position * params.y, params.w));
    return clamp(n, -1.0, 1.0) * shading.edge_width_roughness_extent.z;
}
"#;

/// Vertex hook shared by both variants.
pub const DISPLACEMENT_HOOK: &str = "    position = dissolve_displace(position, normal);";

/// Fragment discard shared by both variants. Binds `dissolve` for later hooks.
pub const DISCARD_HOOK: &str = "    let dissolve = dissolve_value(object_position);
    if dissolve < shading.process_frequency_displacement_drift.x {
        discard;
    }";

/// Edge override, color variant only.
pub const EDGE_GLOW_HOOK: &str = "\
    let edge_limit = shading.process_frequency_displacement_drift.x
        + shading.edge_width_roughness_extent.x;
    if dissolve < edge_limit {
        surface.emissive = shading.edge_color_strength.xyz * shading.edge_color_strength.w;
        surface.metallic = 0.0;
        surface.roughness = shading.edge_width_roughness_extent.y;
    }";

/// Module-scope dissolve items for a variant whose mesh data lives in `group`.
pub fn dissolve_declarations(group: u32) -> String {
    format!(
        "{DISSOLVE_FUNCTIONS_WGSL}\n\
         @group({group}) @binding({SHADING_BINDING}) var<uniform> shading: ShadingUniforms;\n\
         {NOISE_WGSL}"
    )
}

const COMMON_WGSL: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
    position: vec4<f32>,
};

struct MeshUniforms {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
};

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};
"#;

const SURFACE_BINDINGS_WGSL: &str = r#"
struct DirectionalLight {
    direction_intensity: vec4<f32>,
    color_padding: vec4<f32>,
};

struct EnvironmentUniform {
    color_intensity: vec4<f32>,
    flags: vec4<u32>,
};

struct PbrMaterial {
    albedo_metallic: vec4<f32>,
    roughness_pad: vec4<f32>,
    emissive: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: CameraUniform;

@group(1) @binding(0) var<uniform> sun: DirectionalLight;
@group(1) @binding(1) var<uniform> environment: EnvironmentUniform;
@group(1) @binding(2) var environment_map: texture_cube<f32>;
@group(1) @binding(3) var environment_sampler: sampler;

@group(2) @binding(0) var<uniform> shadow_uniforms: ShadowUniforms;
@group(2) @binding(1) var shadow_map_texture: texture_depth_2d;
@group(2) @binding(2) var shadow_sampler: sampler_comparison;

@group(3) @binding(0) var<uniform> mesh_uniforms: MeshUniforms;
@group(3) @binding(1) var<uniform> material: PbrMaterial;
"#;

const SURFACE_BODY_WGSL: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) object_position: vec3<f32>,
};

//!hook:declarations

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var position = in.position;
    let normal = in.normal;
    //!hook:vertex_position
    let world = mesh_uniforms.model * vec4<f32>(position, 1.0);

    var out: VertexOutput;
    out.clip_position = camera.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (mesh_uniforms.normal_matrix * vec4<f32>(normal, 0.0)).xyz;
    out.object_position = in.position;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let object_position = in.object_position;
    //!hook:fragment_discard

    var surface: SurfaceSample;
    surface.position = in.world_position;
    surface.normal = in.world_normal;
    surface.albedo = material.albedo_metallic.xyz;
    surface.metallic = material.albedo_metallic.w;
    surface.roughness = material.roughness_pad.x;
    surface.emissive = material.emissive.xyz;
    //!hook:fragment_surface

    let view_dir = normalize(camera.position.xyz - in.world_position);
    let normal = facing_normal(surface.normal, view_dir);
    let light_dir = -sun.direction_intensity.xyz;
    let light_radiance = sun.color_padding.xyz * sun.direction_intensity.w;
    let shadow = shadow_factor(in.world_position);

    let env_diffuse = environment.color_intensity.xyz * environment.color_intensity.w;
    var env_specular = env_diffuse;
    if environment.flags.x != 0u {
        let r = reflect(-view_dir, normal);
        env_specular = textureSampleLevel(environment_map, environment_sampler, r, 0.0).rgb
            * environment.color_intensity.w;
    }

    let color = shade(
        surface, view_dir, normal, light_dir, light_radiance, shadow, env_diffuse, env_specular
    );
    return vec4<f32>(color, 1.0);
}
"#;

const DEPTH_BODY_WGSL: &str = r#"
@group(0) @binding(0) var<uniform> camera: CameraUniform;
@group(1) @binding(0) var<uniform> mesh_uniforms: MeshUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) object_position: vec3<f32>,
};

//!hook:declarations

@vertex
fn vs_depth(in: VertexInput) -> VertexOutput {
    var position = in.position;
    let normal = in.normal;
    //!hook:vertex_position

    var out: VertexOutput;
    out.clip_position = camera.view_proj * mesh_uniforms.model * vec4<f32>(position, 1.0);
    out.object_position = in.position;
    return out;
}

@fragment
fn fs_depth(in: VertexOutput) {
    let object_position = in.object_position;
    //!hook:fragment_discard
}
"#;

/// Lit surface template: PBR base with all four hook points.
pub fn surface_template() -> ShaderTemplate {
    ShaderTemplate::new(
        "surface",
        [COMMON_WGSL, SHADOW_WGSL, SURFACE_BINDINGS_WGSL, PBR_WGSL, SURFACE_BODY_WGSL].concat(),
    )
}

/// Depth-only template; no surface hook.
pub fn depth_template() -> ShaderTemplate {
    ShaderTemplate::new("depth", [COMMON_WGSL, DEPTH_BODY_WGSL].concat())
}

/// Which hooks a mesh's shaders carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceVariant {
    /// The base material alone.
    Plain,
    /// Displacement, dissolve and edge glow.
    Dissolve,
}

impl SurfaceVariant {
    /// Suffix used in pipeline and shader labels.
    pub fn label(self) -> &'static str {
        match self {
            SurfaceVariant::Plain => "plain",
            SurfaceVariant::Dissolve => "dissolve",
        }
    }

    /// Whether the variant reads a shading uniform.
    pub fn uses_shading_uniform(self) -> bool {
        matches!(self, SurfaceVariant::Dissolve)
    }
}

/// Color variant source.
pub fn color_shader_source(variant: SurfaceVariant) -> Result<String, TemplateError> {
    let template = surface_template();
    match variant {
        SurfaceVariant::Plain => template.inject(&[]),
        SurfaceVariant::Dissolve => {
            let declarations = dissolve_declarations(COLOR_MESH_GROUP);
            template.inject(&[
                (HookPoint::Declarations.name(), declarations.as_str()),
                (HookPoint::VertexPosition.name(), DISPLACEMENT_HOOK),
                (HookPoint::FragmentDiscard.name(), DISCARD_HOOK),
                (HookPoint::FragmentSurface.name(), EDGE_GLOW_HOOK),
            ])
        }
    }
}

/// Depth variant source: same displacement and discard, nothing else.
pub fn depth_shader_source(variant: SurfaceVariant) -> Result<String, TemplateError> {
    let template = depth_template();
    match variant {
        SurfaceVariant::Plain => template.inject(&[]),
        SurfaceVariant::Dissolve => {
            let declarations = dissolve_declarations(DEPTH_MESH_GROUP);
            template.inject(&[
                (HookPoint::Declarations.name(), declarations.as_str()),
                (HookPoint::VertexPosition.name(), DISPLACEMENT_HOOK),
                (HookPoint::FragmentDiscard.name(), DISCARD_HOOK),
            ])
        }
    }
}
