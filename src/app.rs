use crate::camera::MapCamera;
use crate::coordinate::Coordinate;
use crate::graticule::Graticule;
use crate::marker::{MarkerId, MarkerRecord};
use crate::screen::{MapView, ScreenEvent, ScreenState, View};
use crate::services::{
    permission_prompt, ConfiguredLocation, FixedPermission, LocationService, PermissionPrompt,
    PermissionService, PermissionStatus,
};
use crate::settings::Settings;
use crate::startup::StartupTask;
use crate::ui::UiState;
use egui::{Align2, Color32, Context, FontId, Painter, PointerButton, Pos2, Rect, Stroke, Ui};
use std::time::Duration;
use tracing::debug;

const LOADING_COLOR: Color32 = Color32::from_rgb(0, 0, 255);
const LAND_COLOR: Color32 = Color32::from_rgb(236, 232, 222);
const GRATICULE_COLOR: Color32 = Color32::from_rgb(200, 194, 180);
const LABEL_COLOR: Color32 = Color32::from_rgb(110, 104, 92);
const USER_DOT_COLOR: Color32 = Color32::from_rgb(26, 115, 232);
const PIN_COLOR: Color32 = Color32::from_rgb(219, 68, 55);
const PIN_HOVER_COLOR: Color32 = Color32::from_rgb(165, 39, 20);

const PIN_HEIGHT: f32 = 26.0;
const PIN_RADIUS: f32 = 9.0;
const PIN_HIT_RADIUS: f32 = 12.0;
const GRATICULE_MIN_SPACING: f32 = 90.0;
const PRESS_REPAINT_INTERVAL: Duration = Duration::from_millis(30);

pub struct MapScreenApp {
    screen: ScreenState,
    startup: Option<StartupTask>,
    prompt: Option<PermissionPrompt>,
    camera: Option<MapCamera>,
    graticule: Graticule,
    ui_state: UiState,
    settings: Settings,
}

impl MapScreenApp {
    // Mount the screen and kick off the permission/location chain
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        let mut style = (*cc.egui_ctx.style()).clone();
        style.visuals = egui::Visuals::light();
        style.spacing.item_spacing = egui::vec2(10.0, 10.0);
        cc.egui_ctx.set_style(style);

        let (permission, prompt): (Box<dyn PermissionService>, Option<PermissionPrompt>) =
            match settings.permission.preset() {
                Some(status) => (Box::new(FixedPermission(status)), None),
                None => {
                    let (requester, prompt) = permission_prompt();
                    (Box::new(requester), Some(prompt))
                }
            };
        let location: Box<dyn LocationService> = Box::new(ConfiguredLocation::new(
            settings.location.fix(),
            settings.location.acquire_delay(),
            settings.location.available,
        ));

        let ctx = cc.egui_ctx.clone();
        let startup = StartupTask::spawn(permission, location, move || ctx.request_repaint());

        Self {
            screen: ScreenState::new(settings.map.span),
            startup: Some(startup),
            prompt,
            camera: None,
            graticule: Graticule::new(GRATICULE_MIN_SPACING, settings.map.show_graticule),
            ui_state: UiState::default(),
            settings,
        }
    }

    fn poll_startup(&mut self) {
        let Some(task) = self.startup.as_mut() else {
            return;
        };
        if let Some(result) = task.poll() {
            self.startup = None;
            self.prompt = None;
            if let Some(message) = self.screen.finish_startup(result) {
                self.ui_state.alert = Some(message);
            }
        }
    }

    // Centered activity indicator and nothing else
    fn show_loading(ctx: &Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.centered_and_justified(|ui| {
                ui.add(egui::Spinner::new().size(48.0).color(LOADING_COLOR));
            });
        });
    }

    fn show_permission_prompt(&mut self, ctx: &Context) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        if !prompt.poll() {
            return;
        }

        let mut answer = None;
        egui::Window::new("Location Permission")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("Allow Pin Drop to access this device's location while you are using the app?");
                ui.horizontal(|ui| {
                    if ui.button("Allow").clicked() {
                        answer = Some(PermissionStatus::Granted);
                    }
                    if ui.button("Don't Allow").clicked() {
                        answer = Some(PermissionStatus::Denied);
                    }
                });
            });

        if let Some(status) = answer {
            prompt.answer(status);
        }
    }

    fn show_alert(&mut self, ctx: &Context) {
        let Some(message) = self.ui_state.alert.as_deref() else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new("Alert")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });

        if dismissed {
            self.ui_state.alert = None;
        }
    }
}

// Handle pointer input on the map and paint it, returning the gestures
// the screen state should apply
fn show_map(
    ui: &mut Ui,
    map: &MapView<'_>,
    camera: &mut MapCamera,
    graticule: &Graticule,
    ui_state: &mut UiState,
    hold: f64,
) -> Vec<ScreenEvent> {
    let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
    let rect = response.rect;
    camera.ensure_fitted(rect);
    let mut events = Vec::new();

    if response.dragged_by(PointerButton::Primary) || response.dragged_by(PointerButton::Middle) {
        camera.pan(response.drag_delta());
    }

    if response.hovered() {
        let (scroll, pinch, hover) =
            ui.input(|i| (i.scroll_delta.y, i.zoom_delta(), i.pointer.hover_pos()));
        if let Some(pos) = hover {
            if scroll != 0.0 {
                let factor = if scroll > 0.0 { 1.1 } else { 1.0 / 1.1 };
                camera.zoom_at(factor, pos, rect);
            }
            if pinch != 1.0 {
                camera.zoom_at(pinch as f64, pos, rect);
            }
        }
    }

    let (now, primary_down, pointer) =
        ui.input(|i| (i.time, i.pointer.primary_down(), i.pointer.interact_pos()));
    let down = primary_down && response.is_pointer_button_down_on();
    if let Some(origin) = ui_state.press.update(down, pointer, now, hold) {
        events.extend(long_press_event(map.pins, camera, rect, origin));
    }
    if down && !ui_state.press.consumed() {
        // keep frames coming while the pointer is held still
        ui.ctx().request_repaint_after(PRESS_REPAINT_INTERVAL);
    }

    if response.clicked() && !ui_state.press.consumed() {
        if let Some(pos) = response.interact_pointer_pos() {
            match tap_event(map.pins, camera, rect, pos) {
                Some(event) => events.push(event),
                None => debug!("tap on empty map"),
            }
        }
    }

    ui_state.cursor_coordinate = response
        .hover_pos()
        .map(|pos| camera.screen_to_coordinate(pos, rect));
    let hovered_pin = response
        .hover_pos()
        .and_then(|pos| pin_at(map.pins, camera, rect, pos));

    painter.rect_filled(rect, 0.0, LAND_COLOR);
    if graticule.is_visible() {
        draw_graticule(&painter, camera, graticule, rect);
    }
    if map.show_user_location {
        draw_user_location(&painter, camera.coordinate_to_screen(map.initial_region.center(), rect));
    }
    for pin in map.pins {
        let tip = camera.coordinate_to_screen(pin.coordinate, rect);
        draw_pin(&painter, tip, hovered_pin == Some(pin.id));
    }
    draw_status(&painter, rect, ui_state.cursor_coordinate, map.pins.len(), camera.zoom_level());

    events
}

// Topmost pin whose head is under `pos`
fn pin_at(pins: &[MarkerRecord], camera: &MapCamera, rect: Rect, pos: Pos2) -> Option<MarkerId> {
    pins.iter().rev().find_map(|pin| {
        let head = camera.coordinate_to_screen(pin.coordinate, rect) - egui::vec2(0.0, PIN_HEIGHT);
        ((pos - head).length() <= PIN_HIT_RADIUS).then_some(pin.id)
    })
}

// A long-press drops a pin unless it started on an existing one
fn long_press_event(
    pins: &[MarkerRecord],
    camera: &MapCamera,
    rect: Rect,
    origin: Pos2,
) -> Option<ScreenEvent> {
    match pin_at(pins, camera, rect, origin) {
        Some(_) => None,
        None => Some(ScreenEvent::LongPress(camera.screen_to_coordinate(origin, rect))),
    }
}

// A tap only means something when it lands on a pin
fn tap_event(pins: &[MarkerRecord], camera: &MapCamera, rect: Rect, pos: Pos2) -> Option<ScreenEvent> {
    pin_at(pins, camera, rect, pos).map(ScreenEvent::MarkerTap)
}

fn draw_graticule(painter: &Painter, camera: &MapCamera, graticule: &Graticule, rect: Rect) {
    let pixels_per_degree = camera.scale() / 360.0;
    let step = graticule.step_for(pixels_per_degree);
    let (north_west, south_east) = camera.visible_bounds(rect);
    let stroke = Stroke::new(1.0, GRATICULE_COLOR);
    let font = FontId::proportional(11.0);

    for longitude in Graticule::lines(north_west.longitude, south_east.longitude, step) {
        let x = camera
            .coordinate_to_screen(Coordinate::new(camera.center().latitude, longitude), rect)
            .x;
        painter.line_segment([egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)], stroke);
        painter.text(
            egui::pos2(x + 4.0, rect.min.y + 4.0),
            Align2::LEFT_TOP,
            Graticule::label(longitude, step, 'E', 'W'),
            font.clone(),
            LABEL_COLOR,
        );
    }

    for latitude in Graticule::lines(south_east.latitude, north_west.latitude, step) {
        let y = camera
            .coordinate_to_screen(Coordinate::new(latitude, camera.center().longitude), rect)
            .y;
        painter.line_segment([egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)], stroke);
        painter.text(
            egui::pos2(rect.min.x + 4.0, y - 2.0),
            Align2::LEFT_BOTTOM,
            Graticule::label(latitude, step, 'N', 'S'),
            font.clone(),
            LABEL_COLOR,
        );
    }
}

fn draw_user_location(painter: &Painter, pos: Pos2) {
    painter.circle_filled(pos, 16.0, Color32::from_rgba_unmultiplied(26, 115, 232, 50));
    painter.circle_filled(pos, 7.0, USER_DOT_COLOR);
    painter.circle_stroke(pos, 7.0, Stroke::new(2.0, Color32::WHITE));
}

fn draw_pin(painter: &Painter, tip: Pos2, hovered: bool) {
    let color = if hovered { PIN_HOVER_COLOR } else { PIN_COLOR };
    let head = tip - egui::vec2(0.0, PIN_HEIGHT);
    painter.add(egui::Shape::convex_polygon(
        vec![
            tip,
            head + egui::vec2(PIN_RADIUS * 0.8, PIN_RADIUS * 0.5),
            head + egui::vec2(-PIN_RADIUS * 0.8, PIN_RADIUS * 0.5),
        ],
        color,
        Stroke::NONE,
    ));
    painter.circle_filled(head, PIN_RADIUS, color);
    painter.circle_filled(head, 3.0, Color32::WHITE);
}

fn draw_status(
    painter: &Painter,
    rect: Rect,
    cursor: Option<Coordinate>,
    pin_count: usize,
    zoom: f64,
) {
    let cursor_text = cursor
        .map(|c| c.to_string())
        .unwrap_or_else(|| "—".to_owned());
    let pins_text = if pin_count == 1 {
        "1 pin".to_owned()
    } else {
        format!("{pin_count} pins")
    };
    painter.text(
        rect.left_bottom() + egui::vec2(8.0, -8.0),
        Align2::LEFT_BOTTOM,
        format!("{cursor_text}   {pins_text}   z{zoom:.1}"),
        FontId::monospace(12.0),
        LABEL_COLOR,
    );
    painter.text(
        rect.center_top() + egui::vec2(0.0, 8.0),
        Align2::CENTER_TOP,
        "Long-press to drop a pin, click a pin to remove it",
        FontId::proportional(13.0),
        LABEL_COLOR,
    );
}

impl eframe::App for MapScreenApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.poll_startup();

        let mut events = Vec::new();
        let mut recenter = false;
        match self.screen.view(self.settings.map.options()) {
            View::Loading => Self::show_loading(ctx),
            View::Map(map) => {
                let camera = self
                    .camera
                    .get_or_insert_with(|| MapCamera::new(map.initial_region));
                let graticule = &self.graticule;
                let ui_state = &mut self.ui_state;
                let hold = self.settings.map.long_press_secs();

                let panel = egui::CentralPanel::default()
                    .frame(egui::Frame::none())
                    .show(ctx, |ui| {
                        events = show_map(ui, &map, camera, graticule, ui_state, hold);
                        ui.max_rect()
                    });

                if map.show_recenter_control {
                    egui::Area::new("recenter_control")
                        .anchor(Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
                        .show(ctx, |ui| {
                            if ui.button("Recenter").clicked() {
                                recenter = true;
                            }
                        });
                }
                if recenter {
                    camera.recenter(panel.inner);
                }
            }
        }

        for event in events {
            self.screen.apply(event);
        }

        self.show_permission_prompt(ctx);
        self.show_alert(ctx);
    }
}
