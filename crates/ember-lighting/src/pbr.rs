//! Physically-based material model and Cook-Torrance BRDF.
//!
//! [`PbrMaterial`] is the CPU-side material, [`PbrMaterialUniform`] its GPU
//! upload. [`PBR_WGSL`] holds the shader-side BRDF; the `*_cpu` functions and
//! [`shade_cpu`] reproduce it term for term.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::directional::DirectionalLight;
use crate::environment::EnvironmentLighting;

/// Roughness floor applied before BRDF evaluation. GGX degenerates at 0.
pub const MIN_ROUGHNESS: f32 = 0.045;

/// PBR material parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PbrMaterial {
    /// Base color (linear RGB).
    pub albedo: Vec3,
    /// \[0, 1\]. 0 = dielectric, 1 = metal.
    pub metallic: f32,
    /// \[0, 1\]. 0 = mirror, 1 = fully rough.
    pub roughness: f32,
    /// Emissive color (linear RGB).
    pub emissive_color: Vec3,
    /// Values > 1 produce HDR output.
    pub emissive_intensity: f32,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            albedo: Vec3::ONE,
            metallic: 0.0,
            roughness: 1.0,
            emissive_color: Vec3::ZERO,
            emissive_intensity: 0.0,
        }
    }
}

impl PbrMaterial {
    /// Mirror-polished white metal.
    pub fn polished_metal() -> Self {
        Self {
            albedo: Vec3::ONE,
            metallic: 1.0,
            roughness: 0.0,
            ..Default::default()
        }
    }

    /// Rough dielectric of the given color.
    pub fn matte(albedo: Vec3) -> Self {
        Self {
            albedo,
            ..Default::default()
        }
    }

    /// Black surface that only emits light.
    pub fn emissive(color: Vec3, intensity: f32) -> Self {
        Self {
            albedo: Vec3::ZERO,
            emissive_color: color,
            emissive_intensity: intensity,
            ..Default::default()
        }
    }

    /// Whether the material emits any light.
    pub fn is_emissive(&self) -> bool {
        self.emissive_intensity > 0.0 && self.emissive_color.length_squared() > 0.0
    }

    /// Total emissive contribution = color x intensity.
    pub fn emissive_output(&self) -> Vec3 {
        self.emissive_color * self.emissive_intensity
    }

    /// Surface sample at a point with this material's inputs.
    pub fn sample(&self, position: Vec3, normal: Vec3) -> SurfaceSample {
        SurfaceSample {
            position,
            normal,
            albedo: self.albedo,
            metallic: self.metallic,
            roughness: self.roughness,
            emissive: self.emissive_output(),
        }
    }

    pub fn to_uniform(&self) -> PbrMaterialUniform {
        let emissive = self.emissive_output();
        PbrMaterialUniform {
            albedo_metallic: [self.albedo.x, self.albedo.y, self.albedo.z, self.metallic],
            roughness_pad: [self.roughness, 0.0, 0.0, 0.0],
            emissive: [emissive.x, emissive.y, emissive.z, 0.0],
        }
    }
}

/// GPU-side PBR material uniform, 48 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PbrMaterialUniform {
    /// xyz = albedo (linear RGB), w = metallic.
    pub albedo_metallic: [f32; 4],
    /// x = roughness, yzw = padding.
    pub roughness_pad: [f32; 4],
    /// xyz = emissive color x intensity, w = padding.
    pub emissive: [f32; 4],
}

/// Lighting inputs at one surface point, in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: Vec3,
}

// ---------------------------------------------------------------------------
// CPU-side BRDF reference implementation
// ---------------------------------------------------------------------------

/// GGX/Trowbridge-Reitz normal distribution function.
pub fn distribution_ggx_cpu(n_dot_h: f32, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (std::f32::consts::PI * denom * denom)
}

/// Schlick-GGX geometry term for a single direction.
pub fn geometry_schlick_ggx_cpu(n_dot: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = (r * r) / 8.0;
    n_dot / (n_dot * (1.0 - k) + k)
}

/// Smith's method combining view and light occlusion.
pub fn geometry_smith_cpu(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    geometry_schlick_ggx_cpu(n_dot_v, roughness) * geometry_schlick_ggx_cpu(n_dot_l, roughness)
}

/// Schlick Fresnel approximation.
pub fn fresnel_schlick_cpu(cos_theta: f32, f0: Vec3) -> Vec3 {
    f0 + (Vec3::ONE - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powf(5.0)
}

/// BRDF x N.L for one light direction.
pub fn evaluate_brdf_cpu(
    light_dir: Vec3,
    view_dir: Vec3,
    normal: Vec3,
    albedo: Vec3,
    metallic: f32,
    roughness: f32,
) -> Vec3 {
    let half_vec = (view_dir + light_dir).normalize_or_zero();
    let n_dot_l = normal.dot(light_dir).max(0.0);
    let n_dot_v = normal.dot(view_dir).max(0.0);
    let n_dot_h = normal.dot(half_vec).max(0.0);
    let h_dot_v = half_vec.dot(view_dir).max(0.0);

    let f0 = Vec3::splat(0.04).lerp(albedo, metallic);
    let d = distribution_ggx_cpu(n_dot_h, roughness);
    let g = geometry_smith_cpu(n_dot_v, n_dot_l, roughness);
    let f = fresnel_schlick_cpu(h_dot_v, f0);

    let specular = (d * g * f) / (4.0 * n_dot_v * n_dot_l + 0.0001);
    let k_d = (Vec3::ONE - f) * (1.0 - metallic);
    let diffuse = k_d * albedo / std::f32::consts::PI;

    (diffuse + specular) * n_dot_l
}

/// Full surface shading: direct light (attenuated by `shadow`), environment
/// ambient and reflection, plus emission. Mirrors `shade` in [`PBR_WGSL`].
///
/// Normals facing away from the viewer are flipped so both sides of a
/// surface shade alike.
pub fn shade_cpu(
    surface: &SurfaceSample,
    view_position: Vec3,
    light: &DirectionalLight,
    shadow: f32,
    environment: &EnvironmentLighting,
) -> Vec3 {
    let view_dir = (view_position - surface.position).normalize_or_zero();
    let mut normal = surface.normal.normalize_or_zero();
    if normal.dot(view_dir) < 0.0 {
        normal = -normal;
    }
    let roughness = surface.roughness.max(MIN_ROUGHNESS);
    let light_dir = -light.direction();

    let direct = evaluate_brdf_cpu(
        light_dir,
        view_dir,
        normal,
        surface.albedo,
        surface.metallic,
        roughness,
    ) * light.radiance()
        * shadow;

    let f0 = Vec3::splat(0.04).lerp(surface.albedo, surface.metallic);
    let f_env = fresnel_schlick_cpu(normal.dot(view_dir).max(0.0), f0);
    let k_d = (Vec3::ONE - f_env) * (1.0 - surface.metallic);
    let ambient = environment.radiance() * (k_d * surface.albedo + f_env);

    direct + ambient + surface.emissive
}

/// WGSL twin of the CPU functions above.
///
/// `shade` takes environment diffuse and specular radiance separately so the
/// caller can feed it a cube-map lookup or a flat color.
pub const PBR_WGSL: &str = r#"
const PI: f32 = 3.14159265359;
const MIN_ROUGHNESS: f32 = 0.045;

fn distribution_ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    return a2 / (PI * denom * denom);
}

fn geometry_schlick_ggx(n_dot: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = (r * r) / 8.0;
    return n_dot / (n_dot * (1.0 - k) + k);
}

fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    return geometry_schlick_ggx(n_dot_v, roughness) * geometry_schlick_ggx(n_dot_l, roughness);
}

fn fresnel_schlick(cos_theta: f32, f0: vec3<f32>) -> vec3<f32> {
    return f0 + (1.0 - f0) * pow(clamp(1.0 - cos_theta, 0.0, 1.0), 5.0);
}

fn evaluate_brdf(
    light_dir: vec3<f32>,
    view_dir: vec3<f32>,
    normal: vec3<f32>,
    albedo: vec3<f32>,
    metallic: f32,
    roughness: f32,
) -> vec3<f32> {
    var half_vec = view_dir + light_dir;
    if dot(half_vec, half_vec) > 0.0 {
        half_vec = normalize(half_vec);
    }
    let n_dot_l = max(dot(normal, light_dir), 0.0);
    let n_dot_v = max(dot(normal, view_dir), 0.0);
    let n_dot_h = max(dot(normal, half_vec), 0.0);
    let h_dot_v = max(dot(half_vec, view_dir), 0.0);

    let f0 = mix(vec3<f32>(0.04), albedo, metallic);
    let d = distribution_ggx(n_dot_h, roughness);
    let g = geometry_smith(n_dot_v, n_dot_l, roughness);
    let f = fresnel_schlick(h_dot_v, f0);

    let specular = (d * g * f) / (4.0 * n_dot_v * n_dot_l + 0.0001);
    let k_d = (vec3<f32>(1.0) - f) * (1.0 - metallic);
    let diffuse = k_d * albedo / PI;

    return (diffuse + specular) * n_dot_l;
}

struct SurfaceSample {
    position: vec3<f32>,
    normal: vec3<f32>,
    albedo: vec3<f32>,
    metallic: f32,
    roughness: f32,
    emissive: vec3<f32>,
};

fn facing_normal(normal: vec3<f32>, view_dir: vec3<f32>) -> vec3<f32> {
    let n = normalize(normal);
    return select(n, -n, dot(n, view_dir) < 0.0);
}

fn shade(
    s: SurfaceSample,
    view_dir: vec3<f32>,
    normal: vec3<f32>,
    light_dir: vec3<f32>,
    light_radiance: vec3<f32>,
    shadow: f32,
    env_diffuse: vec3<f32>,
    env_specular: vec3<f32>,
) -> vec3<f32> {
    let roughness = max(s.roughness, MIN_ROUGHNESS);
    let direct = evaluate_brdf(light_dir, view_dir, normal, s.albedo, s.metallic, roughness)
        * light_radiance * shadow;

    let f0 = mix(vec3<f32>(0.04), s.albedo, s.metallic);
    let f_env = fresnel_schlick(max(dot(normal, view_dir), 0.0), f0);
    let k_d = (vec3<f32>(1.0) - f_env) * (1.0 - s.metallic);
    let ambient = env_diffuse * k_d * s.albedo + env_specular * f_env;

    return direct + ambient + s.emissive;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbr_material_uniform_size() {
        assert_eq!(std::mem::size_of::<PbrMaterialUniform>(), 48);
    }

    #[test]
    fn test_to_uniform_packs_correctly() {
        let mat = PbrMaterial {
            albedo: Vec3::new(1.0, 0.5, 0.25),
            metallic: 0.8,
            roughness: 0.3,
            emissive_color: Vec3::new(0.0, 0.5, 1.0),
            emissive_intensity: 4.0,
        };
        let u = mat.to_uniform();
        assert_eq!(u.albedo_metallic, [1.0, 0.5, 0.25, 0.8]);
        assert!((u.roughness_pad[0] - 0.3).abs() < 1e-6);
        assert_eq!(u.emissive, [0.0, 2.0, 4.0, 0.0]);
    }

    #[test]
    fn test_pure_metal_has_no_diffuse() {
        let view = Vec3::new(0.0, 1.0, 1.0).normalize();
        let albedo = Vec3::new(1.0, 0.8, 0.2);
        let metal = evaluate_brdf_cpu(Vec3::Y, view, Vec3::Y, albedo, 1.0, 0.5);
        let dielectric = evaluate_brdf_cpu(Vec3::Y, view, Vec3::Y, albedo, 0.0, 0.5);
        assert!(
            dielectric.length() > metal.length(),
            "dielectric ({dielectric:?}) should outshine metal ({metal:?}) off-specular",
        );
    }

    #[test]
    fn test_roughness_zero_gives_sharp_specular() {
        let smooth = evaluate_brdf_cpu(Vec3::Y, Vec3::Y, Vec3::Y, Vec3::ONE, 0.5, 0.05);
        let rough = evaluate_brdf_cpu(Vec3::Y, Vec3::Y, Vec3::Y, Vec3::ONE, 0.5, 0.99);
        assert!(
            smooth.length() > rough.length(),
            "smooth ({smooth:?}) should peak above rough ({rough:?})",
        );
    }

    #[test]
    fn test_energy_conservation_for_rough_dielectric() {
        let result = evaluate_brdf_cpu(Vec3::Y, Vec3::Y, Vec3::Y, Vec3::ONE, 0.0, 1.0);
        assert!(result.max_element() <= 1.0 + 1e-6, "result {result:?}");
        assert!(result.x > 0.2);
    }

    #[test]
    fn test_emissive_outputs_hdr_values() {
        let mat = PbrMaterial::emissive(Vec3::new(1.0, 0.3, 0.0), 5.0);
        assert!(mat.is_emissive());
        assert!((mat.emissive_output() - Vec3::new(5.0, 1.5, 0.0)).length() < 1e-6);
        assert!(!PbrMaterial::polished_metal().is_emissive());
    }

    #[test]
    fn test_shade_zero_roughness_is_finite() {
        let mat = PbrMaterial::polished_metal();
        let sample = mat.sample(Vec3::new(0.0, 0.0, -2.0), Vec3::NEG_Z);
        let light = DirectionalLight::default();
        let env = EnvironmentLighting::default();
        let c = shade_cpu(&sample, Vec3::new(0.0, 0.0, -5.0), &light, 1.0, &env);
        assert!(c.is_finite(), "color {c:?}");
        assert!(c.max_element() > 0.0);
    }

    #[test]
    fn test_shadow_only_scales_direct_term() {
        let sample = PbrMaterial::matte(Vec3::ONE).sample(Vec3::ZERO, Vec3::NEG_Z);
        let light = DirectionalLight::default();
        let env = EnvironmentLighting::new(Vec3::splat(0.2), 1.0);
        let eye = Vec3::new(0.0, 0.0, -5.0);
        let lit = shade_cpu(&sample, eye, &light, 1.0, &env);
        let shadowed = shade_cpu(&sample, eye, &light, 0.0, &env);
        assert!(lit.x > shadowed.x);
        assert!(shadowed.x > 0.0, "ambient should survive shadowing");
    }

    #[test]
    fn test_back_face_shades_like_front() {
        let light = DirectionalLight::default();
        let env = EnvironmentLighting::default();
        let eye = Vec3::new(0.0, 0.0, -5.0);
        let front = PbrMaterial::matte(Vec3::ONE).sample(Vec3::ZERO, Vec3::NEG_Z);
        let back = PbrMaterial::matte(Vec3::ONE).sample(Vec3::ZERO, Vec3::Z);
        let a = shade_cpu(&front, eye, &light, 1.0, &env);
        let b = shade_cpu(&back, eye, &light, 1.0, &env);
        assert!((a - b).length() < 1e-6);
    }

    #[test]
    fn test_emission_adds_linearly() {
        let light = DirectionalLight::default();
        let env = EnvironmentLighting::default();
        let eye = Vec3::new(0.0, 0.0, -5.0);
        let mut sample = PbrMaterial::matte(Vec3::ONE).sample(Vec3::ZERO, Vec3::NEG_Z);
        let base = shade_cpu(&sample, eye, &light, 1.0, &env);
        sample.emissive = Vec3::new(3.0, 0.0, 0.0);
        let glowing = shade_cpu(&sample, eye, &light, 1.0, &env);
        assert!(((glowing - base) - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
    }
}
