use std::cell::RefCell;
use std::rc::Rc;

use clipstage_gpu_shared::math::Frustum;
use clipstage_gpu_shared::uniforms::LightUniforms;
use clipstage_wgpu::wgpu::SurfaceTarget;
use clipstage_wgpu::{FrameDesc, RenderBackend};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, HtmlCanvasElement, HtmlElement, HtmlInputElement, KeyboardEvent, PointerEvent, WheelEvent};

use crate::camera::PerspectiveCamera;
use crate::config::StageConfig;
use crate::controls::OrbitControls;
use crate::dispatcher::CommandLine;
use crate::dom;
use crate::environment::{load_environment, EnvironmentImage};
use crate::gltf_import::{import_model, ModelAsset};
use crate::input::InputState;
use crate::io::FetchReader;
use crate::lights::light_uniforms;
use crate::pending::PendingLoad;
use crate::registry::ModelId;
use crate::scene::ModelInstance;
use crate::session::Session;
use crate::stats::FrameStats;

/// Everything the frame loop and the DOM listeners share.
struct Stage {
    config: StageConfig,
    renderer: RenderBackend,
    session: Session,
    command_line: CommandLine,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    input: InputState,
    lights: LightUniforms,
    stats: FrameStats,
    stats_panel: HtmlElement,
    canvas: HtmlCanvasElement,
    environment: Option<PendingLoad<EnvironmentImage>>,
    models: Vec<(ModelId, PendingLoad<ModelAsset>)>,
    last_time: f64,
}

impl Stage {
    fn frame(&mut self, time: f64) {
        let dt_ms = if self.last_time > 0.0 {
            time - self.last_time
        } else {
            1000.0 / 60.0 // ~60fps first frame
        };
        self.last_time = time;
        let dt = (dt_ms / 1000.0) as f32;

        self.poll_loads();

        self.controls.update(&mut self.camera, &self.input, dt);
        self.input.end_frame();

        self.session.update(dt);
        self.session.upload_skinned(&mut self.renderer);

        let view_proj = self.camera.view_proj();
        let draws = self.session.draw_list(&Frustum::from_view_proj(&view_proj));
        let frame = FrameDesc {
            view_proj,
            camera_position: self.camera.position,
            lights: self.lights,
            exposure: self.config.renderer.exposure,
            environment_intensity: self.config.renderer.environment_intensity,
            clear_color: self.config.renderer.clear_color,
            draws: &draws,
        };
        if let Err(e) = self.renderer.render(&frame) {
            log::error!("Render failed: {e}");
        }

        if self.stats.record(dt_ms).is_some() {
            self.stats_panel.set_text_content(Some(&self.stats.label()));
        }
    }

    /// Install whatever finished loading since the last frame.
    fn poll_loads(&mut self) {
        if let Some(pending) = &mut self.environment {
            match pending.poll_ready() {
                Some(Ok(image)) => self.renderer.set_environment(image.width, image.height, &image.rgba),
                Some(Err(e)) => log::error!("Environment failed to load: {e}"),
                None => {}
            }
            if pending.is_settled() {
                self.environment = None;
            }
        }

        for (id, pending) in &mut self.models {
            match pending.poll_ready() {
                Some(Ok(asset)) => {
                    let placement = match id {
                        ModelId::Primary => &self.config.primary,
                        ModelId::Secondary => &self.config.secondary,
                    };
                    let model = ModelInstance::instantiate(*id, asset, placement, &mut self.renderer);
                    self.session.install(*id, model);
                }
                Some(Err(e)) => {
                    log::error!("{id} failed to load: {e}");
                    self.session.mark_failed(*id, e.to_string());
                }
                None => {}
            }
        }
        self.models.retain(|(_, pending)| !pending.is_settled());
    }

    fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.renderer.resize(width, height);
        self.camera.set_aspect(width, height);
        self.input.resize(width as f32, height as f32);
    }

    fn cancel_loads(&mut self) {
        if let Some(pending) = &mut self.environment {
            pending.cancel();
        }
        for (_, pending) in &mut self.models {
            pending.cancel();
        }
    }
}

/// DOM callbacks, kept alive for as long as the app.
struct Listeners {
    _keypress: Closure<dyn FnMut(KeyboardEvent)>,
    _resize: Closure<dyn FnMut(Event)>,
    _pointer_down: Closure<dyn FnMut(PointerEvent)>,
    _pointer_move: Closure<dyn FnMut(PointerEvent)>,
    _pointer_up: Closure<dyn FnMut(PointerEvent)>,
    _wheel: Closure<dyn FnMut(WheelEvent)>,
    _context_menu: Closure<dyn FnMut(Event)>,
}

/// Main application state for the WASM runtime.
#[wasm_bindgen]
pub struct App {
    stage: Rc<RefCell<Stage>>,
    _listeners: Listeners,
}

impl App {
    /// Set up the renderer and DOM, then start the three asset loads.
    pub async fn new(canvas_id: &str, config: StageConfig) -> Result<App, JsValue> {
        let document = dom::document()?;
        let canvas = dom::canvas_by_id(&document, canvas_id)?;
        let (width, height) = dom::viewport_size()?;
        canvas.set_width(width);
        canvas.set_height(height);

        let renderer = RenderBackend::new(SurfaceTarget::Canvas(canvas.clone()), width, height)
            .await
            .map_err(|e| JsValue::from_str(&format!("Failed to create renderer: {e}")))?;

        let camera = PerspectiveCamera::from_config(&config.camera, width, height);
        let controls = OrbitControls::new(&config.controls, &camera);
        let command_input = dom::create_command_box(&document, &config.command_box.placeholder)?;
        let stats_panel = dom::create_stats_panel(&document)?;

        let environment = spawn_environment_load(&config.assets.environment_url);
        let models = vec![
            (ModelId::Primary, spawn_model_load(ModelId::Primary, &config.assets.primary_model_url)),
            (ModelId::Secondary, spawn_model_load(ModelId::Secondary, &config.assets.secondary_model_url)),
        ];

        let stage = Rc::new(RefCell::new(Stage {
            lights: light_uniforms(&config.lights),
            renderer,
            session: Session::new(),
            command_line: CommandLine::default(),
            camera,
            controls,
            input: InputState::new(width as f32, height as f32),
            stats: FrameStats::new(),
            stats_panel,
            canvas: canvas.clone(),
            environment: Some(environment),
            models,
            last_time: 0.0,
            config,
        }));

        let listeners = attach_listeners(&stage, &canvas, &command_input)?;
        log::info!("Clipstage ready on #{canvas_id} ({width}x{height})");

        Ok(App {
            stage,
            _listeners: listeners,
        })
    }
}

#[wasm_bindgen]
impl App {
    /// Run one frame. Called from requestAnimationFrame with its timestamp.
    pub fn frame(&mut self, time: f64) {
        self.stage.borrow_mut().frame(time);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.stage.borrow_mut().resize(width, height);
    }

    /// Dispatch `text` as if typed into the command box. True if a clip played.
    pub fn submit_command(&mut self, text: String) -> bool {
        let mut stage = self.stage.borrow_mut();
        let stage = &mut *stage;
        stage.command_line.set_value(text);
        stage.command_line.submit(&mut stage.session).is_played()
    }

    /// Clip names currently reachable from the command box.
    pub fn clip_names(&self) -> Vec<String> {
        self.stage.borrow().session.clip_names()
    }

    /// Abandon loads still in flight. Their slots stay empty.
    pub fn cancel_loads(&mut self) {
        self.stage.borrow_mut().cancel_loads();
    }
}

fn spawn_environment_load(url: &str) -> PendingLoad<EnvironmentImage> {
    let url = url.to_string();
    let (pending, task) = PendingLoad::new("environment", async move {
        load_environment(&FetchReader, &url).await
    });
    spawn_local(task);
    pending
}

fn spawn_model_load(id: ModelId, url: &str) -> PendingLoad<ModelAsset> {
    log::info!("Loading {id} from {url}");
    let url = url.to_string();
    let (pending, task) = PendingLoad::new(id.label(), async move { import_model(&FetchReader, &url).await });
    spawn_local(task);
    pending
}

fn attach_listeners(
    stage: &Rc<RefCell<Stage>>,
    canvas: &HtmlCanvasElement,
    command_input: &HtmlInputElement,
) -> Result<Listeners, JsValue> {
    let window = web_sys::window().ok_or("No window")?;

    let keypress = {
        let stage = stage.clone();
        let input = command_input.clone();
        Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
            let Ok(mut stage) = stage.try_borrow_mut() else {
                return;
            };
            let stage = &mut *stage;
            stage.command_line.set_value(input.value());
            if stage.command_line.handle_key(&event.key(), &mut stage.session).is_some() {
                input.set_value(stage.command_line.value());
            }
        })
    };
    command_input.add_event_listener_with_callback("keypress", keypress.as_ref().unchecked_ref())?;

    let resize = {
        let stage = stage.clone();
        Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let Ok((width, height)) = dom::viewport_size() else {
                return;
            };
            if let Ok(mut stage) = stage.try_borrow_mut() {
                stage.resize(width, height);
            }
        })
    };
    window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())?;

    let pointer_down = {
        let stage = stage.clone();
        let canvas = canvas.clone();
        Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            let _ = canvas.set_pointer_capture(event.pointer_id());
            if let Ok(mut stage) = stage.try_borrow_mut() {
                stage
                    .input
                    .pointer_down(event.button(), event.client_x() as f32, event.client_y() as f32);
            }
        })
    };
    canvas.add_event_listener_with_callback("pointerdown", pointer_down.as_ref().unchecked_ref())?;

    let pointer_move = {
        let stage = stage.clone();
        Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            if let Ok(mut stage) = stage.try_borrow_mut() {
                stage.input.pointer_move(event.client_x() as f32, event.client_y() as f32);
            }
        })
    };
    canvas.add_event_listener_with_callback("pointermove", pointer_move.as_ref().unchecked_ref())?;

    let pointer_up = {
        let stage = stage.clone();
        Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            if let Ok(mut stage) = stage.try_borrow_mut() {
                stage.input.pointer_up(event.button());
            }
        })
    };
    canvas.add_event_listener_with_callback("pointerup", pointer_up.as_ref().unchecked_ref())?;

    let wheel = {
        let stage = stage.clone();
        Closure::<dyn FnMut(WheelEvent)>::new(move |event: WheelEvent| {
            event.prevent_default();
            if let Ok(mut stage) = stage.try_borrow_mut() {
                stage.input.wheel(event.delta_y() as f32);
            }
        })
    };
    canvas.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;

    // Secondary-button drag pans; keep the browser menu out of the way
    let context_menu = Closure::<dyn FnMut(Event)>::new(|event: Event| event.prevent_default());
    canvas.add_event_listener_with_callback("contextmenu", context_menu.as_ref().unchecked_ref())?;

    Ok(Listeners {
        _keypress: keypress,
        _resize: resize,
        _pointer_down: pointer_down,
        _pointer_move: pointer_move,
        _pointer_up: pointer_up,
        _wheel: wheel,
        _context_menu: context_menu,
    })
}
