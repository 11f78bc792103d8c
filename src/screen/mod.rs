//! State of the map screen and the pure functions that drive it.

use crate::coordinate::{Coordinate, ViewportRegion};
use crate::marker::{MarkerId, MarkerIdGenerator, MarkerRecord};
use crate::startup::StartupResult;
use tracing::{debug, error, info, warn};


/// Input gestures coming off the map surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScreenEvent {
    LongPress(Coordinate),
    MarkerTap(MarkerId),
}

/// Platform decorations the map shows besides the pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOptions {
    pub show_user_location: bool,
    pub show_recenter_control: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            show_user_location: true,
            show_recenter_control: true,
        }
    }
}

/// What the map surface is asked to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView<'a> {
    pub initial_region: ViewportRegion,
    pub show_user_location: bool,
    pub show_recenter_control: bool,
    pub pins: &'a [MarkerRecord],
}

#[derive(Debug, Clone, PartialEq)]
pub enum View<'a> {
    Loading,
    Map(MapView<'a>),
}

pub struct ScreenState {
    loading: bool,
    region: Option<ViewportRegion>,
    markers: Vec<MarkerRecord>,
    ids: MarkerIdGenerator,
    span: f64,
}

impl ScreenState {
    pub fn new(span: f64) -> Self {
        Self {
            loading: true,
            region: None,
            markers: Vec::new(),
            ids: MarkerIdGenerator::new(),
            span,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn region(&self) -> Option<ViewportRegion> {
        self.region
    }

    pub fn markers(&self) -> &[MarkerRecord] {
        &self.markers
    }

    /// Applies the outcome of the startup chain and returns the alert to show,
    /// if any. A failed startup leaves the region absent for good.
    pub fn finish_startup(&mut self, result: StartupResult) -> Option<String> {
        if !self.loading {
            warn!("startup finished twice, ignoring the second result");
            return None;
        }
        self.loading = false;

        match result {
            Ok(fix) => {
                let region = ViewportRegion::around(fix, self.span);
                info!(?region, "map region initialized");
                self.region = Some(region);
                None
            }
            Err(err) => {
                error!(%err, "map startup failed");
                err.alert_message()
            }
        }
    }

    pub fn apply(&mut self, event: ScreenEvent) {
        if self.region.is_none() {
            debug!(?event, "no map shown, ignoring gesture");
            return;
        }
        match event {
            ScreenEvent::LongPress(coordinate) => {
                let id = self.ids.next_id();
                self.add_marker(MarkerRecord::new(id, coordinate));
            }
            ScreenEvent::MarkerTap(id) => self.remove_marker(id),
        }
    }

    pub fn add_marker(&mut self, marker: MarkerRecord) {
        info!(id = %marker.id, coordinate = %marker.coordinate, "marker dropped");
        self.markers.push(marker);
    }

    pub fn remove_marker(&mut self, id: MarkerId) {
        let before = self.markers.len();
        self.markers.retain(|marker| marker.id != id);
        if self.markers.len() < before {
            info!(%id, "marker removed");
        } else {
            debug!(%id, "no marker with that id");
        }
    }

    pub fn view(&self, options: MapOptions) -> View<'_> {
        match (self.loading, self.region) {
            (false, Some(region)) => View::Map(MapView {
                initial_region: region,
                show_user_location: options.show_user_location,
                show_recenter_control: options.show_recenter_control,
                pins: &self.markers,
            }),
            _ => View::Loading,
        }
    }
}
