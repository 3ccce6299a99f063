//! Interactive venation viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns a [`Venation`] simulation
//! and implements [`eframe::App`] to render it and control it through an
//! egui UI. The simulation is only read between completed steps.

use eframe::App;
use glam::DVec2;
use rand::rng;
use tracing::{info, warn};
use venation_core::{
    Config, ConfigError, Venation, VenationMode,
    mask::{ImageMask, MaskSampler},
    types::NodeId,
};

/// Largest side of the generated leaf mask, in pixels.
const MASK_MAX_SIZE: u32 = 512;

/// What a click on the canvas spawns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpawnTool {
    /// Plants a new root at the cursor.
    #[default]
    Seed,
    /// Scatters a rectangle of attractors centered on the cursor.
    AttractorRect,
}

/// Main application state for the interactive viewer.
///
/// The typical per-frame update is:
/// 1. Handle UI interactions and key presses.
/// 2. If `running` is `true` and enough time has passed, call [`Viewer::step_once`].
/// 3. Render the branches, attractors and tool hints.
///
/// ### Fields
/// - `sim` - The growth engine being displayed.
/// - `cfg_draft` - Configuration edited in the side panel, applied on demand.
/// - `cfg_error` - Validation error from the last apply, if any.
///
/// - `rng` - Random number generator for setup, seeds and spawned clouds.
///
/// - `running` - Whether the simulation is currently auto-advancing.
/// - `run_started` - egui time at which auto-run was last started.
/// - `timeout_secs` - Auto-run stops after this many seconds (0 disables).
/// - `zoom` - Pixels per world unit.
/// - `pan` - Screen-space pan offset in pixels.
/// - `show_attractors` - Whether attractors are drawn.
/// - `leaf_mask` - Whether setup thins attractors with a leaf-shaped mask.
/// - `stroke_scale` - Pixels of stroke per unit of node width.
///
/// - `spawn_tool`, `spawn_count`, `spawn_half_extents` - Click tool settings.
/// - `last_new_ids` - Node ids created in the last step (for highlighting).
///
/// - `step_interval` - Target time between automatic steps (seconds).
/// - `last_step_time` - Time stamp of the last step (egui time).
/// - `last_step_dt` - Actual time delta between the last two steps.
pub struct Viewer {
    sim: Venation,
    cfg_draft: Config,
    cfg_error: Option<String>,

    rng: rand::rngs::ThreadRng,

    running: bool,
    run_started: f64,
    timeout_secs: f64,
    zoom: f32,
    pan: egui::Vec2,
    show_attractors: bool,
    leaf_mask: bool,
    stroke_scale: f64,

    spawn_tool: SpawnTool,
    spawn_count: usize,
    spawn_half_extents: DVec2,
    last_new_ids: Vec<NodeId>,

    step_interval: f64,
    last_step_time: f64,
    last_step_dt: f64,
}

impl Viewer {
    /// Creates a viewer running the default configuration.
    ///
    /// ### Returns
    /// A fully-initialized [`Viewer`] ready to be passed to `eframe::run_native`,
    /// or the validation error if the default configuration is rejected.
    pub fn new() -> Result<Self, ConfigError> {
        let cfg = Config::default();
        let mut rng = rng();
        let mut sim = Venation::new(cfg.clone())?;
        sim.setup(&mut rng, None);

        Ok(Self {
            sim,
            cfg_draft: cfg,
            cfg_error: None,
            rng,
            running: false,
            run_started: 0.0,
            timeout_secs: 60.0,
            zoom: 250.0,
            pan: egui::vec2(0.0, 0.0),
            show_attractors: true,
            leaf_mask: false,
            stroke_scale: 10.0,
            spawn_tool: SpawnTool::default(),
            spawn_count: 200,
            spawn_half_extents: DVec2::new(0.2, 0.2),
            last_new_ids: Vec::with_capacity(16),
            step_interval: 0.02,
            last_step_time: 0.0,
            last_step_dt: 0.0,
        })
    }

    /// Re-runs setup with the current configuration and stops auto-running.
    fn reset(&mut self) {
        let mask = self.build_mask().unwrap_or_else(|err| {
            warn!(%err, "leaf mask rejected");
            self.cfg_error = Some(err.to_string());
            None
        });
        self.sim
            .setup(&mut self.rng, mask.as_ref().map(|m| m as &dyn MaskSampler));
        self.last_new_ids.clear();
        self.running = false;
    }

    /// Builds the leaf mask for the current configuration, if enabled.
    ///
    /// The mask is rendered at the field's aspect ratio (at most
    /// [`MASK_MAX_SIZE`] per side), quantized to `mask_shades`, and its size
    /// is adopted by the simulation.
    fn build_mask(&mut self) -> Result<Option<ImageMask>, ConfigError> {
        if !self.leaf_mask {
            return Ok(None);
        }

        let mut cfg = self.sim.config().clone();
        cfg.fit_within(MASK_MAX_SIZE, MASK_MAX_SIZE);
        let (width, height) = (cfg.width, cfg.height);
        let mask = cfg.mask_from_rgb8(width, height, &leaf_silhouette(width, height))?;
        self.sim.set_config(cfg)?;
        Ok(Some(mask))
    }

    /// Removes every node and attractor, leaving a blank canvas for
    /// manual spawning.
    fn clear(&mut self) {
        self.sim.clear();
        self.last_new_ids.clear();
    }

    /// Validates the edited configuration and hands it to the simulation.
    ///
    /// On error the simulation keeps its previous configuration and the
    /// message is shown in the config panel.
    fn apply_config(&mut self) {
        match self.sim.set_config(self.cfg_draft.clone()) {
            Ok(()) => self.cfg_error = None,
            Err(err) => {
                warn!(%err, "config rejected");
                self.cfg_error = Some(err.to_string());
            }
        }
    }

    /// Advances the simulation by a single step and records the nodes it
    /// created so they can be highlighted in the next frame.
    fn step_once(&mut self) {
        let before = self.sim.nodes().len();
        self.sim.step();

        let forest = self.sim.nodes();
        self.last_new_ids = (before..forest.len())
            .filter(|&id| !forest.node(id).retired)
            .collect();
    }

    fn toggle_running(&mut self, now: f64) {
        self.running = !self.running;
        if self.running {
            self.run_started = now;
        }
    }

    /// Steps if auto-run is on and `step_interval` has elapsed, and stops
    /// auto-run once `timeout_secs` is exceeded.
    fn auto_step(&mut self, now: f64) {
        if !self.running {
            return;
        }

        if self.timeout_secs > 0.0 && now - self.run_started >= self.timeout_secs {
            info!(
                steps = self.sim.step_count(),
                timeout_secs = self.timeout_secs,
                "run timed out"
            );
            self.running = false;
            return;
        }

        let elapsed = now - self.last_step_time;
        if elapsed >= self.step_interval {
            if self.last_step_time > 0.0 {
                self.last_step_dt = elapsed;
            }
            self.step_once();
            self.last_step_time = now;
        }
    }

    /// Converts a world-space position to screen-space.
    ///
    /// World coordinates are scaled by `zoom`, offset by `pan`, and then
    /// centered inside the given `rect`. The y-axis is flipped so that
    /// positive y goes up in world space.
    fn world_to_screen(&self, p: DVec2, rect: egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        egui::pos2(
            center.x + p.x as f32 * self.zoom + self.pan.x,
            center.y - p.y as f32 * self.zoom + self.pan.y,
        )
    }

    /// Converts a screen-space position back to world-space.
    ///
    /// This is the inverse of [`Viewer::world_to_screen`] up to floating
    /// point rounding.
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> DVec2 {
        let center = rect.center();
        let x = (p.x - center.x - self.pan.x) / self.zoom;
        let y = (center.y - p.y + self.pan.y) / self.zoom;
        DVec2::new(f64::from(x), f64::from(y))
    }

    /// Helper to draw a labeled `usize` [`egui::DragValue`].
    fn labeled_drag_usize(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut usize,
        range: std::ops::RangeInclusive<usize>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Helper to draw a labeled `f64` [`egui::DragValue`].
    fn labeled_drag_f64(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut f64,
        range: std::ops::RangeInclusive<f64>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }

        let (toggle_attractors, toggle_play, now) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::A),
                i.key_pressed(egui::Key::P),
                i.time,
            )
        });
        if toggle_attractors {
            self.show_attractors = !self.show_attractors;
        }
        if toggle_play {
            self.toggle_running(now);
        }
    }

    /// Builds the top panel UI (run controls, stepping, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .button(if self.running { "⏸ Pause" } else { "▶ Run" })
                    .clicked()
                {
                    let now = ctx.input(|i| i.time);
                    self.toggle_running(now);
                }

                ui.add(
                    egui::DragValue::new(&mut self.step_interval)
                        .prefix("dt target = ")
                        .range(0.0..=1.0)
                        .speed(0.01),
                );

                if ui.button("Step").clicked() {
                    let now = ctx.input(|i| i.time);
                    if self.last_step_time > 0.0 {
                        self.last_step_dt = now - self.last_step_time;
                    }
                    self.step_once();
                    self.last_step_time = now;
                }

                if ui.button("Reset").clicked() {
                    self.reset();
                }

                if ui.button("Clear").clicked() {
                    self.clear();
                }

                ui.separator();
                ui.checkbox(&mut self.show_attractors, "Attractors (A)");
                ui.add(egui::Slider::new(&mut self.zoom, 10.0..=5000.0).logarithmic(true).text("Zoom"));
            });
        });
    }

    /// Builds the bottom status bar.
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("dt last = {:.3} s", self.last_step_dt));
                ui.separator();
                ui.label(format!("step = {}", self.sim.step_count()));
                ui.label(format!("no growth = {}", self.sim.no_growth_count()));
                ui.label(format!("attractors = {}", self.sim.attractor_count()));
                ui.label(format!(
                    "nodes = {} ({} live)",
                    self.sim.nodes().len(),
                    self.sim.live_node_count()
                ));
                ui.label(format!("mode = {}", self.sim.config().mode));
            });
        });
    }

    /// Builds the right-hand configuration panel.
    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Config");

                ui.separator();
                egui::ComboBox::from_label("mode")
                    .selected_text(self.cfg_draft.mode.to_string())
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.cfg_draft.mode, VenationMode::Open, "open");
                        ui.selectable_value(
                            &mut self.cfg_draft.mode,
                            VenationMode::Closed,
                            "closed",
                        );
                    });
                Self::labeled_drag_usize(
                    ui,
                    "num_attractors:",
                    &mut self.cfg_draft.num_attractors,
                    0..=100_000,
                    10.0,
                );

                ui.separator();
                ui.label("Growth");
                Self::labeled_drag_f64(
                    ui,
                    "growth_radius:",
                    &mut self.cfg_draft.growth_radius,
                    0.0001..=2.0,
                    0.001,
                );
                Self::labeled_drag_f64(
                    ui,
                    "growth_rate:",
                    &mut self.cfg_draft.growth_rate,
                    0.0001..=0.1,
                    0.0001,
                );
                Self::labeled_drag_f64(
                    ui,
                    "consume_radius:",
                    &mut self.cfg_draft.consume_radius,
                    0.0001..=0.1,
                    0.0001,
                );
                Self::labeled_drag_f64(
                    ui,
                    "base_width:",
                    &mut self.cfg_draft.base_width,
                    0.001..=10.0,
                    0.01,
                );
                ui.horizontal(|ui| {
                    ui.label("mask_shades:");
                    ui.add(
                        egui::DragValue::new(&mut self.cfg_draft.mask_shades)
                            .range(1..=256)
                            .speed(1.0),
                    );
                });
                ui.checkbox(&mut self.leaf_mask, "Leaf mask (on reset)");

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        self.apply_config();
                    }
                    if ui.button("Apply + Reset").clicked() {
                        self.apply_config();
                        if self.cfg_error.is_none() {
                            self.reset();
                        }
                    }
                });
                if ui.button("Reset cfg to default").clicked() {
                    self.cfg_draft = Config::default();
                }
                if let Some(err) = &self.cfg_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }

                ui.separator();
                ui.label("View");
                Self::labeled_drag_f64(ui, "stroke_scale:", &mut self.stroke_scale, 0.0..=100.0, 0.5);
                Self::labeled_drag_f64(ui, "timeout (s):", &mut self.timeout_secs, 0.0..=3600.0, 1.0);

                ui.separator();
                ui.label("Spawning");
                Self::labeled_drag_usize(ui, "spawn_count:", &mut self.spawn_count, 1..=5000, 1.0);
                Self::labeled_drag_f64(
                    ui,
                    "hx:",
                    &mut self.spawn_half_extents.x,
                    0.0..=2.0,
                    0.005,
                );
                Self::labeled_drag_f64(
                    ui,
                    "hy:",
                    &mut self.spawn_half_extents.y,
                    0.0..=2.0,
                    0.005,
                );
            });
    }

    /// Builds the small floating toolbar for choosing the spawn tool.
    fn ui_toolbar(&mut self, ctx: &egui::Context) {
        egui::Area::new("toolbar".into())
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 100.0))
            .movable(false)
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(0, 0, 0, 32))
                    .show(ui, |ui| {
                        ui.vertical(|ui| {
                            ui.selectable_value(&mut self.spawn_tool, SpawnTool::Seed, "◎ Seed");
                            ui.selectable_value(
                                &mut self.spawn_tool,
                                SpawnTool::AttractorRect,
                                "■ Attractors",
                            );
                        });
                    });
            });
    }

    /// Draws a visual hint for the current spawn tool at the hovered world position.
    fn ui_tool_hint(&self, painter: &egui::Painter, rect: egui::Rect, hover_world: Option<DVec2>) {
        let Some(center) = hover_world else {
            return;
        };

        match self.spawn_tool {
            SpawnTool::Seed => {
                let p_screen = self.world_to_screen(center, rect);
                painter.circle_filled(p_screen, 4.0, egui::Color32::GREEN);
            }

            SpawnTool::AttractorRect => {
                let h = self.spawn_half_extents;
                let corners = [
                    DVec2::new(-h.x, -h.y),
                    DVec2::new(h.x, -h.y),
                    DVec2::new(h.x, h.y),
                    DVec2::new(-h.x, h.y),
                ];
                let points: Vec<egui::Pos2> = corners
                    .iter()
                    .map(|&off| self.world_to_screen(center + off, rect))
                    .collect();
                painter.add(egui::Shape::closed_line(
                    points,
                    egui::Stroke::new(1.5, egui::Color32::YELLOW),
                ));
            }
        }
    }

    fn spawn_at(&mut self, center: DVec2) {
        match self.spawn_tool {
            SpawnTool::Seed => {
                let id = self.sim.add_seed(center, &mut self.rng);
                self.last_new_ids.clear();
                self.last_new_ids.push(id);
            }
            SpawnTool::AttractorRect => {
                self.sim.attractor_field_mut().scatter_in_rect(
                    center,
                    self.spawn_half_extents,
                    self.spawn_count,
                    &mut self.rng,
                );
            }
        }
    }

    /// Draws every live branch, with stroke width following node width.
    fn draw_forest(&self, painter: &egui::Painter, rect: egui::Rect) {
        let forest = self.sim.nodes();
        for &root in forest.roots() {
            for id in forest.descendants(root) {
                let node = forest.node(id);
                let a = self.world_to_screen(node.position, rect);
                for &child in &node.children {
                    let child = forest.node(child);
                    let b = self.world_to_screen(child.position, rect);
                    let width = ((child.width * self.stroke_scale) as f32).max(1.0);
                    let color = if child.joins.is_some() {
                        egui::Color32::LIGHT_BLUE
                    } else {
                        egui::Color32::LIGHT_GREEN
                    };
                    painter.line_segment([a, b], egui::Stroke::new(width, color));
                }
            }
        }

        for &id in &self.last_new_ids {
            if id < forest.len() {
                let p = self.world_to_screen(forest.node(id).position, rect);
                painter.circle_filled(p, 2.0, egui::Color32::RED);
            }
        }
    }

    /// Builds the central panel where the venation is drawn and interacted with.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            if response.dragged() {
                self.pan += response.drag_delta();
            }

            let hover_world = response.hover_pos().map(|p| self.screen_to_world(p, rect));

            if response.clicked()
                && let Some(center) = hover_world
            {
                self.spawn_at(center);
            }

            // Zoom around the mouse cursor.
            let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let pointer_screen = response.hover_pos().unwrap_or(rect.center());
                let world_before = self.screen_to_world(pointer_screen, rect);

                let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                self.zoom = (self.zoom * factor).clamp(10.0, 5000.0);

                let screen_after = self.world_to_screen(world_before, rect);
                self.pan += pointer_screen - screen_after;
            }

            // Field outline.
            let aspect = self.sim.config().aspect_ratio();
            let outline: Vec<egui::Pos2> = [
                DVec2::new(-aspect, -1.0),
                DVec2::new(aspect, -1.0),
                DVec2::new(aspect, 1.0),
                DVec2::new(-aspect, 1.0),
            ]
            .iter()
            .map(|&p| self.world_to_screen(p, rect))
            .collect();
            painter.add(egui::Shape::closed_line(
                outline,
                egui::Stroke::new(1.0, egui::Color32::DARK_GRAY),
            ));

            if self.show_attractors {
                for p in self.sim.attractors() {
                    let p = self.world_to_screen(p, rect);
                    painter.circle_filled(p, 1.0, egui::Color32::LIGHT_RED);
                }
            }

            self.draw_forest(&painter, rect);
            self.ui_tool_hint(&painter, rect, hover_world);

            if self.running {
                let now = ctx.input(|i| i.time);
                self.auto_step(now);
                ctx.request_repaint();
            }
        });
    }
}

/// Packed RGB8 pixels of an elliptical leaf, bright at the midrib and
/// fading to black at the margin. Row 0 is the top of the image.
fn leaf_silhouette(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for row in 0..height {
        let v = 1.0 - (f64::from(row) + 0.5) / f64::from(height) * 2.0;
        for col in 0..width {
            let u = (f64::from(col) + 0.5) / f64::from(width) * 2.0 - 1.0;
            let d = (u / 0.6).powi(2) + (v / 0.95).powi(2);
            let level = ((1.0 - d).clamp(0.0, 1.0) * 255.0).round() as u8;
            pixels.extend([level; 3]);
        }
    }
    pixels
}

impl App for Viewer {
    /// eframe callback that builds all UI panels for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
        self.ui_toolbar(ctx);
    }
}
