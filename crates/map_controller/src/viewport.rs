use shared::domain::{Coordinates, Memo};

pub const DEFAULT_CENTER: Coordinates = Coordinates::new(45.6789, -111.0517);
pub const DEFAULT_ZOOM: f64 = 12.0;
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 22.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub default_center: Coordinates,
    pub default_zoom: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPosition {
    pub center: Coordinates,
    pub zoom: f64,
}

pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return DEFAULT_ZOOM;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Initial camera placement. Computed on the first mount and then frozen; later
/// collection changes never move the camera.
#[derive(Debug, Default)]
pub struct ViewportController {
    config: ViewportConfig,
    initial: Option<CameraPosition>,
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            initial: None,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn mount(&mut self, memos: &[Memo]) -> CameraPosition {
        let config = self.config;
        *self.initial.get_or_insert_with(|| {
            let center = memos
                .first()
                .and_then(Memo::map_position)
                .unwrap_or(config.default_center);
            CameraPosition {
                center,
                zoom: clamp_zoom(config.default_zoom),
            }
        })
    }

    pub fn initial(&self) -> Option<CameraPosition> {
        self.initial
    }

    /// Camera for a marker-click pan, keeping the zoom the user is at.
    pub fn focus(&self, position: Coordinates, current_zoom: f64) -> CameraPosition {
        CameraPosition {
            center: position,
            zoom: clamp_zoom(current_zoom),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapStyle {
    #[default]
    Outdoors,
    Satellite,
    Streets,
}

impl MapStyle {
    pub const ALL: [MapStyle; 3] = [Self::Outdoors, Self::Satellite, Self::Streets];

    pub fn style_url(self) -> &'static str {
        match self {
            Self::Outdoors => "mapbox://styles/mapbox/outdoors-v12",
            Self::Satellite => "mapbox://styles/mapbox/satellite-streets-v12",
            Self::Streets => "mapbox://styles/mapbox/streets-v12",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Outdoors => "Outdoors",
            Self::Satellite => "Satellite",
            Self::Streets => "Streets",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Outdoors => "Parks & trails highlighted",
            Self::Satellite => "Aerial view with labels",
            Self::Streets => "Standard street map",
        }
    }

    /// Only the outdoors style carries the parks/trails legend.
    pub fn shows_legend(self) -> bool {
        self == Self::Outdoors
    }
}
