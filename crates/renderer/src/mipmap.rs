//! GPU mip chain generation by successive linear downsampling.
//! Each level is rendered from the one above it with a fullscreen triangle.

use wgpu::{
    BindGroupDescriptor, BindGroupEntry, BindingResource, CommandEncoderDescriptor, Device,
    FragmentState, LoadOp, Operations, Queue, RenderPassColorAttachment, RenderPassDescriptor,
    RenderPipeline, RenderPipelineDescriptor, Sampler, ShaderModuleDescriptor, ShaderSource,
    StoreOp, Texture, TextureFormat, TextureViewDescriptor, VertexState,
};

/// Blit pipeline for one color format.
pub struct MipmapGenerator {
    format: TextureFormat,
    pipeline: RenderPipeline,
    sampler: Sampler,
}

impl MipmapGenerator {
    pub fn new(device: &Device, format: TextureFormat) -> Self {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Mipmap Blit WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Mipmap Blit Pipeline"),
            layout: None,
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(format.into())],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Mipmap Blit Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            format,
            pipeline,
            sampler,
        }
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Render levels `1..mip_count` of `texture` from level 0.
    /// The texture needs `TEXTURE_BINDING | RENDER_ATTACHMENT` usage.
    pub fn generate(&self, device: &Device, queue: &Queue, texture: &Texture, mip_count: u32) {
        if mip_count < 2 {
            return;
        }

        let views: Vec<_> = (0..mip_count)
            .map(|mip| {
                texture.create_view(&TextureViewDescriptor {
                    label: Some("Mip View"),
                    base_mip_level: mip,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        let layout = self.pipeline.get_bind_group_layout(0);
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("MipmapEncoder"),
        });

        for target in 1..views.len() {
            let bind_group = device.create_bind_group(&BindGroupDescriptor {
                label: Some("Mipmap Blit BG"),
                layout: &layout,
                entries: &[
                    BindGroupEntry {
                        binding: 0,
                        resource: BindingResource::TextureView(&views[target - 1]),
                    },
                    BindGroupEntry {
                        binding: 1,
                        resource: BindingResource::Sampler(&self.sampler),
                    },
                ],
            });

            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MipmapPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &views[target],
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }

        queue.submit(Some(encoder.finish()));
    }
}
