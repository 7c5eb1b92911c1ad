use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::device::DeviceContext;
use crate::texture::{PixelFormat, TextureResource};

/// Background used when no clear colour is configured (dark grey).
pub const DEFAULT_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.2,
    b: 0.2,
    a: 1.0,
};

/// Fixed validation geometry: red apex, green bottom-left, blue bottom-right.
pub const TRIANGLE_VERTICES: [TriangleVertex; 3] = [
    TriangleVertex { position: [0.0, 0.8], color: [1.0, 0.0, 0.0] },
    TriangleVertex { position: [-0.8, -0.8], color: [0.0, 1.0, 0.0] },
    TriangleVertex { position: [0.8, -0.8], color: [0.0, 0.0, 1.0] },
];

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct TriangleVertex {
    pub position: [f32; 2],
    pub color: [f32; 3],
}

impl TriangleVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x3  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TriangleVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Single-triangle scene used to validate the render → readback pipeline.
pub struct TriangleScene {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    clear: wgpu::Color,
}

impl TriangleScene {
    /// Compiles both shader stages and builds the vertex buffer and pipeline.
    pub fn new(ctx: &DeviceContext, format: PixelFormat, clear: wgpu::Color) -> Result<Self> {
        Self::with_shaders(
            ctx,
            include_str!("shaders/triangle_vs.wgsl"),
            include_str!("shaders/triangle_fs.wgsl"),
            format,
            clear,
        )
    }

    /// Builds the scene from custom WGSL stages.
    ///
    /// The stages must expose `vs_main` and `fs_main` and agree on their
    /// inter-stage interface; a pipeline wgpu rejects is an error.
    pub fn with_shaders(
        ctx: &DeviceContext,
        vertex_src: &str,
        fragment_src: &str,
        format: PixelFormat,
        clear: wgpu::Color,
    ) -> Result<Self> {
        let vertex_shader = ctx.load_shader(vertex_src, "triangle_vs")?;
        let fragment_shader = ctx.load_shader(fragment_src, "triangle_fs")?;

        let device = ctx.device();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("conduit triangle vbo"),
            contents: bytemuck::cast_slice(&TRIANGLE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("conduit triangle pipeline layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        let pipeline = ctx.validated("triangle pipeline", |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("conduit triangle pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &vertex_shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[TriangleVertex::layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &fragment_shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: format.to_wgpu(),
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        })?;

        Ok(Self {
            pipeline,
            vertex_buffer,
            clear,
        })
    }

    /// Clears `target` and draws the triangle into it, then submits.
    pub fn render(&self, ctx: &DeviceContext, target: &TextureResource) {
        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("conduit triangle encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("conduit triangle pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            rpass.draw(0..3, 0..1);
        }

        ctx.queue().submit(std::iter::once(encoder.finish()));
    }
}
