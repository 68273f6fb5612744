use wgpu::util::DeviceExt;

/// Bytes per seed point on the GPU (vec4<f32>, w unused).
pub(crate) const POINT_STRIDE: u64 = 16;

/// Bytes per distance value.
pub(crate) const DISTANCE_STRIDE: u64 = 4;

/// Seed point as laid out in the `points` storage buffer. Must match
/// `array<vec4<f32>>` in worley.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct GpuPoint {
    pub position: [f32; 3],
    pub _pad: f32,
}

impl From<glam::Vec3> for GpuPoint {
    fn from(p: glam::Vec3) -> Self {
        Self {
            position: p.to_array(),
            _pad: 0.0,
        }
    }
}

/// Uniform block of the Worley kernel (16 bytes). Must match WorleyParams in worley.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct WorleyParams {
    pub cell_count: u32,
    pub resolution: u32,
    pub point_count: u32,
    pub _pad: u32,
}

/// Transient buffers for a single distance dispatch.
///
/// Lives for exactly one `compute_distances` call. Dropping the guard
/// destroys every buffer, so early returns release GPU memory too.
pub(crate) struct DispatchBuffers {
    pub points: wgpu::Buffer,
    pub distances: wgpu::Buffer,
    pub staging: wgpu::Buffer,
    pub params: wgpu::Buffer,
    pub distance_bytes: u64,
}

impl DispatchBuffers {
    /// Upload the points and params, allocate `voxel_count` distances plus a
    /// MAP_READ staging copy.
    pub fn new(
        device: &wgpu::Device,
        points: &[GpuPoint],
        params: &WorleyParams,
        voxel_count: u64,
    ) -> Self {
        let distance_bytes = voxel_count * DISTANCE_STRIDE;

        let points = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("worley-points"),
            contents: bytemuck::cast_slice(points),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let distances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("worley-distances"),
            size: distance_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("worley-staging"),
            size: distance_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("worley-params"),
            contents: bytemuck::bytes_of(params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        Self {
            points,
            distances,
            staging,
            params,
            distance_bytes,
        }
    }

    /// Record the distances → staging copy.
    pub fn copy_to_staging(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_buffer_to_buffer(&self.distances, 0, &self.staging, 0, self.distance_bytes);
    }

    /// Map the staging buffer and block until the distances are readable.
    pub fn read_distances(&self, device: &wgpu::Device) -> Result<Vec<f32>, String> {
        let slice = self.staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.to_string()),
            Err(e) => return Err(e.to_string()),
        }

        let data = slice.get_mapped_range();
        let values: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        self.staging.unmap();
        Ok(values)
    }
}

impl Drop for DispatchBuffers {
    fn drop(&mut self) {
        self.points.destroy();
        self.distances.destroy();
        self.staging.destroy();
        self.params.destroy();
    }
}

/// Byte sizes of the point and distance buffers for a dispatch.
pub(crate) fn dispatch_sizes(point_count: usize, voxel_count: usize) -> (u64, u64) {
    (
        point_count as u64 * POINT_STRIDE,
        voxel_count as u64 * DISTANCE_STRIDE,
    )
}
