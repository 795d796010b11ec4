use crate::drawable::DrawCommand;
use crate::image::ImageEntry;
use crate::sprite::{InstanceData, SpriteRenderer};
use crate::texture::Texture;
use crate::Context;
use crate::Image;
use crate::Pt;

const FONT_COLS: u32 = 16;
const FONT_ROWS: u32 = 6;
const FONT_GLYPH: u32 = 8;

/// Which texture the current instance batch samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchKey {
    Image(u32),
    Font,
    White,
}

pub struct Graphics {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: SpriteRenderer,
    pipeline: wgpu::RenderPipeline,
    images: Vec<ImageEntry>,
    // The bind groups sample these; AnyTexture's Drop destroys the GPU
    // resource, so they must outlive every frame.
    #[allow(dead_code)]
    font_texture: Texture,
    font_bind_group: wgpu::BindGroup,
    #[allow(dead_code)]
    white_texture: Texture,
    white_bind_group: wgpu::BindGroup,
    batch: Vec<InstanceData>,
}

fn flush_batch(
    batch: &mut Vec<InstanceData>,
    rpass: &mut wgpu::RenderPass<'_>,
    renderer: &mut SpriteRenderer,
    queue: &wgpu::Queue,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    if batch.is_empty() {
        return;
    }
    if let Ok(range) = renderer.upload_instances(queue, batch.as_slice()) {
        renderer.draw_batch(rpass, pipeline, bind_group, range);
    }
    batch.clear();
}

/// Bakes the 8x8 ASCII glyph set into one RGBA atlas, white on transparent.
fn bake_font_atlas() -> (u32, u32, Vec<u8>) {
    let width = FONT_COLS * FONT_GLYPH;
    let height = FONT_ROWS * FONT_GLYPH;
    let mut rgba = vec![0u8; (width * height * 4) as usize];
    for (slot, glyph) in font8x8::legacy::BASIC_LEGACY[0x20..0x80].iter().enumerate() {
        let cell_x = (slot as u32 % FONT_COLS) * FONT_GLYPH;
        let cell_y = (slot as u32 / FONT_COLS) * FONT_GLYPH;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..FONT_GLYPH {
                if (bits & (1 << col)) != 0 {
                    let x = cell_x + col;
                    let y = cell_y + row as u32;
                    let i = ((y * width + x) * 4) as usize;
                    rgba[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
                }
            }
        }
    }
    (width, height, rgba)
}

fn glyph_uv(ch: char) -> [f32; 4] {
    let code = ch as u32;
    let slot = if (0x20..0x80).contains(&code) {
        code - 0x20
    } else {
        b'?' as u32 - 0x20
    };
    let col = slot % FONT_COLS;
    let row = slot / FONT_COLS;
    [
        col as f32 / FONT_COLS as f32,
        row as f32 / FONT_ROWS as f32,
        1.0 / FONT_COLS as f32,
        1.0 / FONT_ROWS as f32,
    ]
}

impl Graphics {
    pub async fn new(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await?;

        let adapter_limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: adapter_limits,
                experimental_features: wgpu::ExperimentalFeatures::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            // The frame loop is paced by the display.
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = SpriteRenderer::new(&device, 4096);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[
                &renderer.texture_bind_group_layout,
                &renderer.globals_bind_group_layout,
            ],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[InstanceData::layout()],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview_mask: None,
            cache: None,
        });

        let (fw, fh, font_rgba) = bake_font_atlas();
        let font_texture = Texture::from_rgba8(&device, &queue, fw, fh, &font_rgba)?;
        let font_bind_group = renderer.create_texture_bind_group(&device, &font_texture.0.view);

        let white_texture = Texture::from_rgba8(&device, &queue, 1, 1, &[255, 255, 255, 255])?;
        let white_bind_group = renderer.create_texture_bind_group(&device, &white_texture.0.view);

        Ok(Self {
            device,
            queue,
            config,
            renderer,
            pipeline,
            images: Vec::new(),
            font_texture,
            font_bind_group,
            white_texture,
            white_bind_group,
            batch: Vec::with_capacity(256),
        })
    }

    pub fn resize(&mut self, surface: &wgpu::Surface<'_>, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        surface.configure(&self.device, &self.config);
    }

    pub(crate) fn create_image(
        &mut self,
        width: Pt,
        height: Pt,
        rgba: &[u8],
    ) -> anyhow::Result<Image> {
        let w = width.to_u32_clamped();
        let h = height.to_u32_clamped();
        let texture = Texture::from_rgba8(&self.device, &self.queue, w, h, rgba)?;
        let bind_group = self
            .renderer
            .create_texture_bind_group(&self.device, &texture.0.view);

        let id = self.images.len() as u32;
        self.images.push(ImageEntry {
            texture,
            bind_group,
            width,
            height,
        });
        Ok(Image { id, width, height })
    }

    pub fn draw_context(
        &mut self,
        surface: &wgpu::Surface<'_>,
        context: &Context,
    ) -> Result<(), wgpu::SurfaceError> {
        let (lw, lh) = context.window_logical_size();
        let sf = context.scale_factor();
        let sf = if sf.is_finite() && sf > 0.0 { sf } else { 1.0 };
        let expected_w = ((lw.as_f32() as f64) * sf).round().max(1.0) as u32;
        let expected_h = ((lh.as_f32() as f64) * sf).round().max(1.0) as u32;
        if expected_w != self.config.width || expected_h != self.config.height {
            self.resize(surface, expected_w, expected_h);
        }

        let frame = surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("graphics_encoder"),
            });

        self.renderer
            .begin_frame(&self.queue, lw.as_f32(), lh.as_f32());

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("graphics_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let mut batch = std::mem::take(&mut self.batch);
            batch.clear();
            let renderer = &mut self.renderer;
            let queue = &self.queue;
            let pipeline = &self.pipeline;
            let images = &self.images;
            let font_bind_group = &self.font_bind_group;
            let white_bind_group = &self.white_bind_group;

            let mut current: Option<BatchKey> = None;

            for command in context.draw_list() {
                let key = match command {
                    DrawCommand::Image(id, _) => BatchKey::Image(*id),
                    DrawCommand::Rect(..) => BatchKey::White,
                    DrawCommand::Text(..) => BatchKey::Font,
                };

                if current != Some(key) {
                    if let Some(prev) = current.take() {
                        let bind_group = match prev {
                            BatchKey::Image(id) => {
                                images.get(id as usize).map(|e| &e.bind_group)
                            }
                            BatchKey::Font => Some(font_bind_group),
                            BatchKey::White => Some(white_bind_group),
                        };
                        match bind_group {
                            Some(bg) => {
                                flush_batch(&mut batch, &mut rpass, renderer, queue, pipeline, bg)
                            }
                            None => batch.clear(),
                        }
                    }
                    current = Some(key);
                }

                match command {
                    DrawCommand::Image(id, opts) => {
                        let Some(entry) = images.get(*id as usize) else {
                            continue;
                        };
                        let pos = opts.position();
                        let scale = opts.scale();
                        batch.push(InstanceData {
                            pos: [pos[0].as_f32(), pos[1].as_f32()],
                            size: [
                                entry.width.as_f32() * scale[0],
                                entry.height.as_f32() * scale[1],
                            ],
                            uv_rect: [0.0, 0.0, 1.0, 1.0],
                            tint: [1.0, 1.0, 1.0, 1.0],
                        });
                    }
                    DrawCommand::Rect(rect, color) => {
                        let (x, y) = (rect[0].as_f32(), rect[1].as_f32());
                        let (w, h) = (rect[2].as_f32(), rect[3].as_f32());
                        let edges = [
                            [x, y, w, 1.0],
                            [x, y + h - 1.0, w, 1.0],
                            [x, y, 1.0, h],
                            [x + w - 1.0, y, 1.0, h],
                        ];
                        for e in edges {
                            batch.push(InstanceData {
                                pos: [e[0], e[1]],
                                size: [e[2], e[3]],
                                uv_rect: [0.0, 0.0, 1.0, 1.0],
                                tint: *color,
                            });
                        }
                    }
                    DrawCommand::Text(line, opts) => {
                        let size = line.size.as_f32() * opts.scale()[0];
                        let pos = opts.position();
                        let mut x = pos[0].as_f32();
                        let y = pos[1].as_f32();
                        for ch in line.content.chars() {
                            if ch != ' ' {
                                batch.push(InstanceData {
                                    pos: [x, y],
                                    size: [size, size],
                                    uv_rect: glyph_uv(ch),
                                    tint: line.color,
                                });
                            }
                            x += size;
                        }
                    }
                }
            }

            if let Some(prev) = current.take() {
                let bind_group = match prev {
                    BatchKey::Image(id) => images.get(id as usize).map(|e| &e.bind_group),
                    BatchKey::Font => Some(font_bind_group),
                    BatchKey::White => Some(white_bind_group),
                };
                match bind_group {
                    Some(bg) => flush_batch(&mut batch, &mut rpass, renderer, queue, pipeline, bg),
                    None => batch.clear(),
                }
            }

            self.batch = batch;
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_atlas_covers_printable_ascii() {
        let (w, h, rgba) = bake_font_atlas();
        assert_eq!((w, h), (128, 48));
        assert_eq!(rgba.len(), (w * h * 4) as usize);
        // 'A' must rasterize at least one opaque pixel.
        let uv = glyph_uv('A');
        let cell_x = (uv[0] * w as f32) as u32;
        let cell_y = (uv[1] * h as f32) as u32;
        let mut any = false;
        for y in cell_y..cell_y + FONT_GLYPH {
            for x in cell_x..cell_x + FONT_GLYPH {
                any |= rgba[((y * w + x) * 4 + 3) as usize] != 0;
            }
        }
        assert!(any);
    }

    #[test]
    fn glyph_uv_falls_back_for_non_ascii() {
        assert_eq!(glyph_uv('é'), glyph_uv('?'));
        assert_eq!(glyph_uv('\u{7}'), glyph_uv('?'));
    }
}
