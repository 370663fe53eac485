//! Opens a window and draws a single model file.
//!
//! ```sh
//! cargo run --example viewer -- path/to/model.gltf
//! ```

use std::{
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
};

use anyhow::Context;
use cgmath::{EuclideanSpace, Matrix4, Point3, Vector3};
use futures::executor::block_on;
use resmodel::{
    data_structures::texture::Texture, FormatImporter, Model, ModelConfig, WgpuBackend,
};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

struct Viewer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    is_surface_configured: bool,
    depth: Texture,
    backend: Rc<WgpuBackend>,
    model: Model<WgpuBackend>,
}

impl Viewer {
    async fn new(window: Arc<Window>, path: &Path) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("viewer device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
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
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let backend = Rc::new(WgpuBackend::new(
            &device,
            &queue,
            surface_format,
            Some(Texture::DEPTH_FORMAT),
        ));
        let depth = backend.create_depth_texture([config.width, config.height]);
        let mut model = Model::new(
            Rc::clone(&backend),
            Rc::new(FormatImporter),
            ModelConfig::default().with_label("viewer"),
        );
        model
            .load(path)
            .with_context(|| format!("loading {}", path.display()))?;

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            is_surface_configured: false,
            depth,
            backend,
            model,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = self.backend.create_depth_texture([width, height]);
        self.is_surface_configured = true;
    }

    /// Places the camera so the whole model is in view.
    fn update_camera(&self) {
        let (center, radius) = match self.model.bounding_box() {
            Some(bounds) => (bounds.center(), bounds.largest_extent().max(f32::EPSILON)),
            None => (Point3::origin(), 1.0),
        };
        let eye = center + Vector3::new(0.0, radius * 0.5, radius * 1.5);
        let aspect = self.config.width as f32 / self.config.height as f32;
        let view = Matrix4::look_at_rh(eye, center, Vector3::unit_y());
        let proj = cgmath::perspective(cgmath::Deg(45.0), aspect, radius * 0.01, radius * 10.0);
        self.backend.set_camera(proj * view, eye);
        self.backend.set_light(eye + Vector3::new(radius, radius, 0.0), [1.0, 1.0, 1.0]);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }
        self.update_camera();

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Viewer Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Viewer Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.12,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.model.render(&mut pass);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

struct App {
    path: PathBuf,
    viewer: Option<Viewer>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        let attributes = Window::default_attributes().with_title("resmodel viewer");
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Unable to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        match block_on(Viewer::new(window.clone(), &self.path)) {
            Ok(mut viewer) => {
                let size = window.inner_size();
                viewer.resize(size.width, size.height);
                window.request_redraw();
                self.viewer = Some(viewer);
            }
            Err(e) => {
                log::error!("{e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(viewer) = &mut self.viewer else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => viewer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                match viewer.render() {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = viewer.window.inner_size();
                        viewer.resize(size.width, size.height);
                    }
                    Err(e) => log::error!("Unable to render {e}"),
                }
                viewer.window.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: viewer <model file>")?;

    let event_loop = EventLoop::new()?;
    let mut app = App { path, viewer: None };
    event_loop.run_app(&mut app)?;
    Ok(())
}
