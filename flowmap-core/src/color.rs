use std::fmt;

use serde::Serialize;

/// Hue used when there is no maximum to compare against: the low-volume end.
pub const FALLBACK_HUE: f64 = 120.0;
pub const LIGHTNESS: f64 = 70.0;
/// Volume at which the saturation heuristic bottoms out.
const SATURATION_PIVOT: f64 = 75.0;
const SATURATION_DIVISOR: f64 = 20.0;

/// HSL color; hue in degrees, saturation and lightness in percent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({},{}%,{}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };
    pub const MARKER: Rgb = Rgb {
        r: 0x44,
        g: 0x44,
        b: 0x44,
    };
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl Hsl {
    /// Same conversion browsers and d3 use, rounded to whole channels.
    pub fn to_rgb(&self) -> Rgb {
        let h = self.hue.rem_euclid(360.0);
        let s = (self.saturation / 100.0).clamp(0.0, 1.0);
        let l = (self.lightness / 100.0).clamp(0.0, 1.0);
        let m2 = l + (if l < 0.5 { l } else { 1.0 - l }) * s;
        let m1 = 2.0 * l - m2;
        let channel = |h: f64| {
            let v = if h < 60.0 {
                m1 + (m2 - m1) * h / 60.0
            } else if h < 180.0 {
                m2
            } else if h < 240.0 {
                m1 + (m2 - m1) * (240.0 - h) / 60.0
            } else {
                m1
            };
            (v * 255.0).round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: channel(if h >= 240.0 { h - 240.0 } else { h + 120.0 }),
            g: channel(h),
            b: channel(if h < 120.0 { h + 240.0 } else { h - 120.0 }),
        }
    }
}

/// Encode a transport volume relative to the largest volume on screen.
///
/// Hue runs from 120 (nothing moved) down to 0 (the busiest edge).
/// Saturation is `|value - 75| / 20` percent, so it dips near 75 items no
/// matter how large the maximum is. Edges, table swatches and legend entries
/// all go through here so they always agree.
pub fn color_for(value: f64, max_value: f64) -> Hsl {
    let saturation = (value - SATURATION_PIVOT).abs() / SATURATION_DIVISOR;
    let hue = if max_value > 0.0 && max_value.is_finite() {
        ((max_value - value) * 120.0 / max_value)
            .floor()
            .clamp(0.0, 120.0)
    } else {
        FALLBACK_HUE
    };
    Hsl {
        hue,
        saturation: if saturation.is_finite() { saturation } else { 0.0 },
        lightness: LIGHTNESS,
    }
}

/// Convenience over integer volumes.
pub fn volume_color(quantity: u64, max_quantity: u64) -> Rgb {
    color_for(quantity as f64, max_quantity as f64).to_rgb()
}
