//! The objects a frame draws and their layer membership.

use std::sync::Arc;

use ember_config::{Config, MaterialConfig, SceneConfig};
use ember_lighting::{DirectionalLight, EnvironmentLighting, PbrMaterial};
use ember_materials::{ShadingParams, SharedShadingParams, SurfaceVariant};
use ember_mesh::{MeshData, plane};
use glam::{Mat4, Vec3};

use crate::layers::{BLOOM_LAYER, Layers};
use crate::skybox::Skybox;
use crate::texture::{CubeFaces, TextureError};

/// Stable handle to an object in a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Raw index, stable for the lifetime of the scene.
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("no object with id {0:?}")]
    UnknownObject(ObjectId),
}

/// A mesh with its material, placement and layer membership.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub label: String,
    pub mesh: Arc<MeshData>,
    pub transform: Mat4,
    pub material: PbrMaterial,
    /// Dissolve parameters; `None` renders the base material alone.
    pub dissolve: Option<SharedShadingParams>,
    pub layers: Layers,
    /// Draw back faces too.
    pub double_sided: bool,
    pub casts_shadow: bool,
}

impl SceneObject {
    /// Opaque object on the default layer that casts and receives shadows.
    pub fn new(label: impl Into<String>, mesh: Arc<MeshData>, material: PbrMaterial) -> Self {
        Self {
            label: label.into(),
            mesh,
            transform: Mat4::IDENTITY,
            material,
            dissolve: None,
            layers: Layers::default(),
            double_sided: false,
            casts_shadow: true,
        }
    }

    /// Place the object with a model transform.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Attach dissolve shading. Holes expose the interior, so the object
    /// becomes double-sided.
    pub fn with_dissolve(mut self, params: SharedShadingParams) -> Self {
        self.dissolve = Some(params);
        self.double_sided = true;
        self
    }

    /// Replace the layer mask.
    pub fn with_layers(mut self, layers: Layers) -> Self {
        self.layers = layers;
        self
    }

    /// Pipeline variant this object needs.
    pub fn variant(&self) -> SurfaceVariant {
        if self.dissolve.is_some() {
            SurfaceVariant::Dissolve
        } else {
            SurfaceVariant::Plain
        }
    }

    /// Shading values for this frame, if the object dissolves.
    pub fn shading_snapshot(&self) -> Option<ShadingParams> {
        self.dissolve.as_ref().map(SharedShadingParams::snapshot)
    }

    /// Inverse-transpose of the model matrix, for normals.
    pub fn normal_matrix(&self) -> Mat4 {
        self.transform.inverse().transpose()
    }
}

/// Objects plus the lights that shade them.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<(ObjectId, SceneObject)>,
    next_id: u32,
    pub light: DirectionalLight,
    pub environment: EnvironmentLighting,
    /// Base pass background, linear RGB. Covered by the skybox when set.
    pub clear_color: Vec3,
    pub skybox: Option<Skybox>,
}

impl Scene {
    /// Empty scene with the default environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `faces` as the background and for reflections. The flat
    /// environment color becomes the faces' average.
    pub fn set_environment(&mut self, faces: Arc<CubeFaces>) -> Result<(), TextureError> {
        faces.validate()?;
        self.environment.color = faces.average_color();
        self.environment.has_cube_map = true;
        self.skybox = Some(Skybox::new(faces));
        Ok(())
    }

    /// Insert an object and return its id. Ids are never reused.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        log::debug!("Scene: added '{}' as {:?}", object.label, id);
        self.objects.push((id, object));
        id
    }

    /// Remove an object and hand it back.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|(i, _)| *i == id)?;
        Some(self.objects.remove(index).1)
    }

    /// Object by id, if still in the scene.
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|(i, _)| *i == id).map(|(_, o)| o)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|(i, _)| *i == id).map(|(_, o)| o)
    }

    fn layers_mut(&mut self, id: ObjectId) -> Result<&mut Layers, SceneError> {
        self.get_mut(id)
            .map(|o| &mut o.layers)
            .ok_or(SceneError::UnknownObject(id))
    }

    /// Replace an object's layer mask.
    pub fn set_mask(&mut self, id: ObjectId, layers: Layers) -> Result<(), SceneError> {
        *self.layers_mut(id)? = layers;
        Ok(())
    }

    /// Fails with [`SceneError::UnknownObject`] for a removed id.
    pub fn enable_layer(&mut self, id: ObjectId, bit: u32) -> Result<(), SceneError> {
        self.layers_mut(id)?.enable(bit);
        Ok(())
    }

    /// Fails with [`SceneError::UnknownObject`] for a removed id.
    pub fn disable_layer(&mut self, id: ObjectId, bit: u32) -> Result<(), SceneError> {
        self.layers_mut(id)?.disable(bit);
        Ok(())
    }

    /// Whether a pass with `camera_mask` draws the object. Unknown ids are
    /// never visible.
    pub fn is_visible(&self, id: ObjectId, camera_mask: Layers) -> bool {
        self.get(id).is_some_and(|o| o.layers.test(camera_mask))
    }

    /// Draw list for a pass, taken once at pass start.
    pub fn visible(&self, camera_mask: Layers) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.layers.test(camera_mask))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Objects in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, o)| (*id, o))
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|(id, _)| *id).collect()
    }

    /// Number of objects in the scene.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Shading parameters from the `material` config section.
pub fn shading_params(material: &MaterialConfig) -> ShadingParams {
    ShadingParams {
        process: material.process,
        frequency: material.frequency,
        displacement: material.displacement,
        drift: material.drift,
        edge_width: material.edge_width,
        edge_color: Vec3::from(material.edge_color),
        strength: material.strength,
        edge_roughness: material.edge_roughness,
    }
    .clamped()
}

/// The dissolving object's base material.
pub fn dissolve_base_material(material: &MaterialConfig) -> PbrMaterial {
    PbrMaterial {
        albedo: Vec3::from(material.albedo),
        metallic: material.metalness,
        roughness: material.roughness,
        ..PbrMaterial::default()
    }
}

/// Dissolving object: default and bloom layers, double-sided.
pub fn dissolve_object(
    mesh: Arc<MeshData>,
    material: &MaterialConfig,
    params: SharedShadingParams,
) -> SceneObject {
    let mut layers = Layers::default();
    layers.enable(BLOOM_LAYER);
    SceneObject::new("dissolve", mesh, dissolve_base_material(material))
        .with_dissolve(params)
        .with_layers(layers)
}

/// White matte plane behind the object, facing the light.
pub fn shadow_plane(config: &SceneConfig) -> SceneObject {
    let mesh = plane(config.plane_size, config.plane_size, config.plane_segments);
    let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, config.plane_offset))
        * Mat4::from_rotation_y(std::f32::consts::PI);
    let mut object = SceneObject::new("plane", Arc::new(mesh), PbrMaterial::matte(Vec3::ONE))
        .with_transform(transform);
    object.casts_shadow = false;
    object
}

/// Lights, environment and the plane. The dissolving object arrives later
/// from the loader.
pub fn base_scene(config: &Config) -> Scene {
    let mut scene = Scene::new();
    scene.light = DirectionalLight::new(
        Vec3::from(config.scene.light_position),
        Vec3::from(config.scene.light_color),
        config.scene.light_intensity,
    );
    scene.environment = EnvironmentLighting::new(
        Vec3::from(config.render.environment_color),
        config.render.environment_intensity,
    );
    scene.clear_color = Vec3::from(config.render.clear_color);
    scene.add(shadow_plane(&config.scene));
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::DEFAULT_LAYER;
    use ember_mesh::icosphere;

    fn sphere() -> Arc<MeshData> {
        Arc::new(icosphere(1.0, 1))
    }

    fn scene_with_two() -> (Scene, ObjectId, ObjectId) {
        let mut scene = Scene::new();
        let a = scene.add(SceneObject::new("a", sphere(), PbrMaterial::default()));
        let b = scene.add(SceneObject::new("b", sphere(), PbrMaterial::default()));
        (scene, a, b)
    }

    #[test]
    fn test_ids_are_unique_and_stable() {
        let (mut scene, a, b) = scene_with_two();
        assert_ne!(a, b);
        scene.remove(a);
        let c = scene.add(SceneObject::new("c", sphere(), PbrMaterial::default()));
        assert_ne!(c, a);
        assert_eq!(scene.get(b).map(|o| o.label.as_str()), Some("b"));
    }

    #[test]
    fn test_visible_filters_by_mask() {
        let (mut scene, a, b) = scene_with_two();
        scene.enable_layer(a, BLOOM_LAYER).unwrap();
        let bloom = Layers::layer(BLOOM_LAYER);
        assert_eq!(scene.visible(bloom), vec![a]);
        assert_eq!(scene.visible(Layers::default()), vec![a, b]);
        assert!(scene.is_visible(a, bloom));
        assert!(!scene.is_visible(b, bloom));
    }

    #[test]
    fn test_snapshot_unaffected_by_later_toggle() {
        let (mut scene, a, _) = scene_with_two();
        scene.enable_layer(a, BLOOM_LAYER).unwrap();
        let bloom = Layers::layer(BLOOM_LAYER);
        let draw_list = scene.visible(bloom);
        scene.disable_layer(a, BLOOM_LAYER).unwrap();
        assert_eq!(draw_list, vec![a]);
        assert!(scene.visible(bloom).is_empty());
    }

    #[test]
    fn test_set_mask_replaces_layers() {
        let (mut scene, a, _) = scene_with_two();
        scene.set_mask(a, Layers::layer(BLOOM_LAYER)).unwrap();
        assert!(!scene.is_visible(a, Layers::layer(DEFAULT_LAYER)));
    }

    #[test]
    fn test_unknown_object_errors() {
        let (mut scene, a, _) = scene_with_two();
        scene.remove(a);
        assert_eq!(
            scene.enable_layer(a, BLOOM_LAYER),
            Err(SceneError::UnknownObject(a))
        );
        assert!(!scene.is_visible(a, Layers::ALL));
    }

    #[test]
    fn test_dissolve_object_setup() {
        let config = Config::default();
        let params = SharedShadingParams::new(shading_params(&config.material));
        let object = dissolve_object(sphere(), &config.material, params.clone());
        assert!(object.double_sided);
        assert!(object.layers.contains(DEFAULT_LAYER));
        assert!(object.layers.contains(BLOOM_LAYER));
        assert_eq!(object.variant(), SurfaceVariant::Dissolve);
        params.update(|p| p.process = 4.0);
        assert_eq!(object.shading_snapshot().map(|p| p.process), Some(4.0));
    }

    #[test]
    fn test_plane_faces_negative_z() {
        let config = Config::default();
        let plane = shadow_plane(&config.scene);
        let n = plane.normal_matrix().transform_vector3(Vec3::Z).normalize();
        assert!((n - Vec3::NEG_Z).length() < 1e-5, "normal {n:?}");
        let center = plane.transform.transform_point3(Vec3::ZERO);
        assert!((center.z - 5.0).abs() < 1e-6);
        assert!(!plane.casts_shadow);
        assert_eq!(plane.variant(), SurfaceVariant::Plain);
    }

    #[test]
    fn test_set_environment_installs_skybox() {
        let mut scene = Scene::new();
        scene
            .set_environment(Arc::new(CubeFaces::solid([255, 255, 255, 255])))
            .unwrap();
        assert!(scene.environment.has_cube_map);
        assert!((scene.environment.color - Vec3::ONE).length() < 1e-6);
        let sky = scene.skybox.as_ref().unwrap();
        assert!(sky.is_visible(Layers::default()));
        assert!(!sky.is_visible(Layers::layer(BLOOM_LAYER)));
    }

    #[test]
    fn test_invalid_environment_leaves_scene_unchanged() {
        let mut scene = Scene::new();
        let mut faces = CubeFaces::solid([0, 0, 0, 255]);
        faces.faces[0].clear();
        assert!(scene.set_environment(Arc::new(faces)).is_err());
        assert!(scene.skybox.is_none());
        assert!(!scene.environment.has_cube_map);
    }

    #[test]
    fn test_shading_params_from_config_are_clamped() {
        let material = MaterialConfig {
            process: 99.0,
            strength: 0.0,
            ..Default::default()
        };
        let params = shading_params(&material);
        assert_eq!(params.process, 20.0);
        assert_eq!(params.strength, 1.0);
    }
}
