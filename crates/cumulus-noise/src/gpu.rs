use cumulus_core::constants::WORKGROUP_SIZE;
use cumulus_core::{CloudError, Resolution};

use crate::buffers::{dispatch_sizes, DispatchBuffers, GpuPoint, WorleyParams};
use crate::compute::{DistanceRequest, WorleyCompute};
use crate::field::NoiseField;
use crate::texture::NoiseTexture;

/// wgpu implementation of the Worley distance pass.
///
/// The pipeline and bind group layout are built once; every dispatch
/// allocates its buffers through a scoped [`DispatchBuffers`] guard.
pub struct GpuWorley {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl GpuWorley {
    /// Build the Worley pipeline on an existing device.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        // 2 storage + 1 uniform
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("worley-bind-group-layout"),
            entries: &[
                // binding 0: seed points (storage, read)
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // binding 1: distances (storage, read_write)
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // binding 2: params
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let constants_preamble = format!("const WORKGROUP_SIZE: u32 = {}u;\n", WORKGROUP_SIZE);
        let worley_wgsl = include_str!("../../../shaders/noise/worley.wgsl");
        let shader_source = format!("{constants_preamble}\n{worley_wgsl}");

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("worley-shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("worley-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("worley-pipeline"),
            layout: Some(&layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        log::info!("GpuWorley: pipeline ready (workgroup {0}x{0}x{0})", WORKGROUP_SIZE);

        Self {
            device,
            queue,
            bind_group_layout,
            pipeline,
        }
    }

    /// Acquire a headless adapter and device and build the pipeline.
    /// Blocks on the async adapter request.
    pub fn request_headless() -> Result<Self, CloudError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            CloudError::ResourceUnavailable("no compute-capable GPU adapter found".to_string())
        })?;

        log::info!("GpuWorley adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("cumulus-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| CloudError::ResourceUnavailable(e.to_string()))?;

        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Upload a generated field as a sampleable 3D texture on this device.
    pub fn upload_texture(&self, field: &NoiseField) -> NoiseTexture {
        NoiseTexture::upload(&self.device, &self.queue, field)
    }

    fn check_limits(&self, resolution: Resolution, point_count: usize) -> Result<(), CloudError> {
        let limits = self.device.limits();
        let binding_limit = limits.max_storage_buffer_binding_size as u64;
        let (point_bytes, distance_bytes) = dispatch_sizes(point_count, resolution.voxel_count());
        for requested in [point_bytes, distance_bytes] {
            if requested > binding_limit || requested > limits.max_buffer_size {
                return Err(CloudError::BufferTooLarge {
                    requested,
                    limit: binding_limit.min(limits.max_buffer_size),
                });
            }
        }
        if resolution.workgroups_per_axis() > limits.max_compute_workgroups_per_dimension {
            return Err(CloudError::ResourceUnavailable(format!(
                "{} work-groups per axis exceeds device limit {}",
                resolution.workgroups_per_axis(),
                limits.max_compute_workgroups_per_dimension
            )));
        }
        Ok(())
    }
}

impl WorleyCompute for GpuWorley {
    fn label(&self) -> &str {
        "gpu"
    }

    fn compute_distances(&mut self, request: &DistanceRequest<'_>) -> Result<Vec<f32>, CloudError> {
        if request.points.is_empty() {
            return Err(CloudError::ResourceUnavailable(
                "empty point set cannot be bound".to_string(),
            ));
        }
        self.check_limits(request.resolution, request.points.len())?;

        let side = request.resolution.side();
        let gpu_points: Vec<GpuPoint> = request.points.iter().copied().map(GpuPoint::from).collect();
        let params = WorleyParams {
            cell_count: request.cell_count,
            resolution: side,
            point_count: gpu_points.len() as u32,
            _pad: 0,
        };

        let buffers = DispatchBuffers::new(
            &self.device,
            &gpu_points,
            &params,
            request.resolution.voxel_count() as u64,
        );

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("worley-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.points.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.distances.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.params.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("worley-encoder"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("worley-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let [x, y, z] = request.workgroups();
            pass.dispatch_workgroups(x, y, z);
        }
        buffers.copy_to_staging(&mut encoder);

        self.queue.submit(std::iter::once(encoder.finish()));

        let distances = buffers
            .read_distances(&self.device)
            .map_err(CloudError::ReadbackFailed)?;

        log::debug!(
            "GpuWorley: {} points -> {} distances",
            request.points.len(),
            distances.len()
        );
        Ok(distances)
    }
}
