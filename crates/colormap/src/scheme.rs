//! Color schemes and multi-stop interpolation

/// RGB color with components in 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Available color schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Blue -> White -> Red, for diverging data like the change raster
    BlueWhiteRed,
    /// Black -> White
    Grayscale,
}

impl ColorScheme {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BlueWhiteRed => "Blue-White-Red",
            Self::Grayscale => "Grayscale",
        }
    }
}

const BLUE_WHITE_RED_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 33, 102, 172),
    ColorStop::new(0.25, 103, 169, 207),
    ColorStop::new(0.50, 247, 247, 247),
    ColorStop::new(0.75, 239, 138, 98),
    ColorStop::new(1.00, 178, 24, 43),
];

const GRAYSCALE_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 0, 0, 0),
    ColorStop::new(1.0, 255, 255, 255),
];

/// Evaluate a scheme at normalized position `t` (clamped to [0, 1])
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    let stops = match scheme {
        ColorScheme::BlueWhiteRed => BLUE_WHITE_RED_STOPS,
        ColorScheme::Grayscale => GRAYSCALE_STOPS,
    };

    let t = t.clamp(0.0, 1.0);

    let mut prev = stops[0];
    for &stop in stops {
        if t <= stop.t {
            let span = stop.t - prev.t;
            let frac = if span > f64::EPSILON {
                (t - prev.t) / span
            } else {
                0.0
            };
            return lerp(prev.color, stop.color, frac);
        }
        prev = stop;
    }
    stops[stops.len() - 1].color
}

fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    Rgb::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
}
