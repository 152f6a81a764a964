use crate::outline::COASTLINES;
use iced::{
    mouse,
    widget::canvas::{self, Frame, Geometry, Path, Stroke},
    Color, Point, Rectangle, Renderer, Size, Theme,
};
use pulsemap::model::{PlacedMarker, Severity};
use pulsemap::surface::MapView;
use std::time::{Duration, Instant};

const BASE_RADIUS: f32 = 4.0;
const PULSE_GROWTH: f32 = 14.0;

struct Palette {
    water: Color,
    land: Color,
    coast: Color,
    grid: Color,
}

fn palette(style_name: &str) -> Palette {
    if style_name.starts_with("dark") {
        Palette {
            water: Color::from_rgb(0.09, 0.10, 0.12),
            land: Color::from_rgb(0.17, 0.18, 0.20),
            coast: Color::from_rgb(0.32, 0.34, 0.38),
            grid: Color::from_rgba(1.0, 1.0, 1.0, 0.05),
        }
    } else {
        Palette {
            water: Color::from_rgb(0.83, 0.87, 0.89),
            land: Color::from_rgb(0.96, 0.96, 0.94),
            coast: Color::from_rgb(0.70, 0.72, 0.72),
            grid: Color::from_rgba(0.0, 0.0, 0.0, 0.06),
        }
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Green => Color::from_rgb(0.18, 0.75, 0.35),
        Severity::Yellow => Color::from_rgb(0.96, 0.76, 0.13),
        Severity::Red => Color::from_rgb(0.90, 0.22, 0.21),
    }
}

/// Equirectangular projection of the world for a given view and canvas size.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    scale: f32,
    center_lng: f32,
    center_lat: f32,
    size: Size,
}

impl Projection {
    pub fn new(view: &MapView, size: Size) -> Self {
        let scale = size.width / 360.0 * 2f32.powf(view.zoom as f32);
        // Keep the poles inside the frame whenever the world is taller than it.
        let half_height_deg = size.height / 2.0 / scale;
        let center_lat = if half_height_deg >= 90.0 {
            0.0
        } else {
            (view.center.lat as f32).clamp(-90.0 + half_height_deg, 90.0 - half_height_deg)
        };
        Self {
            scale,
            center_lng: view.center.lng as f32,
            center_lat,
            size,
        }
    }

    pub fn project(&self, lng: f32, lat: f32) -> Point {
        Point::new(
            self.size.width / 2.0 + (lng - self.center_lng) * self.scale,
            self.size.height / 2.0 - (lat - self.center_lat) * self.scale,
        )
    }

    /// Longitude shifts (multiples of 360) needed to cover the frame.
    fn wraps(&self) -> Vec<f32> {
        let span = 360.0 * self.scale;
        let copies = (self.size.width / span).ceil() as i32 + 1;
        (-copies..=copies).map(|k| k as f32 * 360.0).collect()
    }
}

/// Canvas program drawing the world and the live markers.
pub struct WorldMap {
    pub view: MapView,
    pub markers: Vec<PlacedMarker>,
    pub lifetime: Duration,
    pub now: Instant,
}

impl<Message> canvas::Program<Message> for WorldMap {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let colors = palette(self.view.style_name());
        let projection = Projection::new(&self.view, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), colors.water);

        let graticule = Path::new(|builder| {
            for shift in projection.wraps() {
                for lng in (-180..=180).step_by(30) {
                    builder.move_to(projection.project(lng as f32 + shift, 90.0));
                    builder.line_to(projection.project(lng as f32 + shift, -90.0));
                }
            }
            for lat in (-60..=60).step_by(30) {
                builder.move_to(Point::new(0.0, projection.project(0.0, lat as f32).y));
                builder.line_to(Point::new(bounds.width, projection.project(0.0, lat as f32).y));
            }
        });
        frame.stroke(&graticule, Stroke::default().with_color(colors.grid).with_width(1.0));

        for shift in projection.wraps() {
            for outline in COASTLINES {
                let shape = Path::new(|builder| {
                    for (idx, (lng, lat)) in outline.iter().enumerate() {
                        let point = projection.project(lng + shift, *lat);
                        if idx == 0 {
                            builder.move_to(point);
                        } else {
                            builder.line_to(point);
                        }
                    }
                    builder.close();
                });
                frame.fill(&shape, colors.land);
                frame.stroke(&shape, Stroke::default().with_color(colors.coast).with_width(1.0));
            }
        }

        for marker in &self.markers {
            let progress = marker.progress(self.now, self.lifetime);
            let color = severity_color(marker.spec.severity);
            let lng = marker.spec.coordinate.lng as f32;
            let lat = marker.spec.coordinate.lat as f32;

            for shift in projection.wraps() {
                let center = projection.project(lng + shift, lat);
                if !(-PULSE_GROWTH..=bounds.width + PULSE_GROWTH).contains(&center.x) {
                    continue;
                }
                let ring = Path::circle(center, BASE_RADIUS + PULSE_GROWTH * progress);
                frame.fill(&ring, Color { a: 0.45 * (1.0 - progress), ..color });
                let dot = Path::circle(center, BASE_RADIUS);
                frame.fill(&dot, Color { a: 1.0 - 0.6 * progress, ..color });
            }
        }

        vec![frame.into_geometry()]
    }
}
