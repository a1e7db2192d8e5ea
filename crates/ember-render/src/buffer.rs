//! Vertex, index and uniform buffer creation.

use bytemuck::Pod;
use ember_mesh::MeshData;
use wgpu::util::DeviceExt;

/// A mesh uploaded to the GPU, drawn with 32-bit indices.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    /// Upload vertices and indices.
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        let allocator = BufferAllocator::new(device);
        Self {
            vertex_buffer: allocator.create_vertex_buffer(
                &format!("{label}-vertices"),
                bytemuck::cast_slice(&mesh.vertices),
            ),
            index_buffer: allocator.create_index_buffer(&format!("{label}-indices"), &mesh.indices),
            index_count: mesh.indices.len() as u32,
        }
    }

    /// Bind vertex and index buffers and draw every triangle.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Creates buffers on one device.
pub struct BufferAllocator<'a> {
    device: &'a wgpu::Device,
}

impl<'a> BufferAllocator<'a> {
    /// Allocator creating buffers on `device`.
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    /// Vertex buffer initialized with `data`.
    pub fn create_vertex_buffer(&self, label: &str, data: &[u8]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Index buffer of `u32` indices.
    pub fn create_index_buffer(&self, label: &str, data: &[u32]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// A uniform buffer initialized with `value` and writable every frame.
    pub fn create_uniform_buffer<T: Pod>(&self, label: &str, value: &T) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(value),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }
}
