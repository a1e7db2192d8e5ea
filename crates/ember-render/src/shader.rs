//! Shader module compilation and caching.
//!
//! Modules are compiled inside a validation error scope so a broken shader
//! surfaces as an error value instead of tearing down the device.

use std::{collections::HashMap, sync::Arc};

use log::{debug, info};
use thiserror::Error;
use wgpu::{ShaderModuleDescriptor, ShaderSource};

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader '{label}' failed to compile: {message}")]
    CompilationFailed { label: String, message: String },

    #[error("shader '{label}' not found in library")]
    NotLoaded { label: String },
}

/// Compiled shader modules keyed by label.
pub struct ShaderLibrary {
    modules: HashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Compile `source` and cache it under `label`. A label that is already
    /// cached returns the existing module without recompiling.
    pub fn compile(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
    ) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        if let Some(module) = self.modules.get(label) {
            return Ok(module.clone());
        }
        debug!("Compiling shader '{}' ({} bytes)", label, source.len());

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(label),
            source: ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(ShaderError::CompilationFailed {
                label: label.to_string(),
                message: error.to_string(),
            });
        }

        let module = Arc::new(module);
        self.modules.insert(label.to_string(), module.clone());
        info!("Compiled shader '{}'", label);
        Ok(module)
    }

    /// A previously compiled module by label.
    pub fn get(&self, label: &str) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        self.modules
            .get(label)
            .cloned()
            .ok_or_else(|| ShaderError::NotLoaded {
                label: label.to_string(),
            })
    }

    /// Number of compiled modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::create_test_device;

    const VALID_SHADER: &str = r#"
        @vertex
        fn vs_main(@builtin(vertex_index) idx: u32) -> @builtin(position) vec4<f32> {
            return vec4<f32>(0.0, 0.0, 0.0, 1.0);
        }

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.0, 0.0, 1.0);
        }
    "#;

    const INVALID_SHADER: &str = r#"
        @vertex
        fn vs_main() -> @builtin(position) vec4<f32> {
            return undeclared_variable;
        }
    "#;

    #[test]
    fn test_compile_valid_shader() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        assert!(library.compile(&device, "valid", VALID_SHADER).is_ok());
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_invalid_shader_reports_label() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        let err = library.compile(&device, "broken", INVALID_SHADER).unwrap_err();
        match err {
            ShaderError::CompilationFailed { label, .. } => assert_eq!(label, "broken"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(library.is_empty());
    }

    #[test]
    fn test_cached_module_is_shared() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        let a = library.compile(&device, "shared", VALID_SHADER).unwrap();
        let b = library.get("shared").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_get_missing_shader() {
        let library = ShaderLibrary::new();
        assert!(matches!(
            library.get("missing"),
            Err(ShaderError::NotLoaded { .. })
        ));
    }
}
