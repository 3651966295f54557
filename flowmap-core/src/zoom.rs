use std::fmt;

use crate::projector::Viewport;

pub const MIN_SCALE: f64 = 1.0;
pub const MAX_SCALE: f64 = 10.0;
pub const ZOOM_IN_FACTOR: f64 = 1.5;
pub const ZOOM_OUT_FACTOR: f64 = 0.66;
pub const RESET_DURATION_MS: f64 = 750.0;

/// Uniform scale followed by a translation, applied to the diagram group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    fn invert(&self, p: (f64, f64)) -> (f64, f64) {
        ((p.0 - self.x) / self.k, (p.1 - self.y) / self.k)
    }

    fn translated(&self, dx: f64, dy: f64) -> ZoomTransform {
        ZoomTransform {
            k: self.k,
            x: self.x + self.k * dx,
            y: self.y + self.k * dy,
        }
    }
}

impl Default for ZoomTransform {
    fn default() -> Self {
        ZoomTransform::IDENTITY
    }
}

impl fmt::Display for ZoomTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "translate({},{}) scale({})", self.x, self.y, self.k)
    }
}

/// Pan/zoom state of one diagram. Transforms live in view-box user units;
/// the view may never be zoomed out past 1x nor panned so that the view box
/// leaves the viewport rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomState {
    pub transform: ZoomTransform,
    viewport: Viewport,
    view_box: (f64, f64),
}

impl ZoomState {
    pub fn new(viewport: Viewport, view_box: (f64, f64)) -> Self {
        ZoomState {
            transform: ZoomTransform::IDENTITY,
            viewport,
            view_box,
        }
    }

    fn center(&self) -> (f64, f64) {
        (self.view_box.0 / 2.0, self.view_box.1 / 2.0)
    }

    /// Pixels per user unit and the letterbox offset, as `xMidYMid meet`
    /// lays the view box into the viewport.
    fn fit(&self) -> (f64, (f64, f64)) {
        let (bw, bh) = self.view_box;
        if bw <= 0.0 || bh <= 0.0 {
            return (1.0, (0.0, 0.0));
        }
        let s = (self.viewport.width / bw).min(self.viewport.height / bh);
        let ox = (self.viewport.width - bw * s) / 2.0;
        let oy = (self.viewport.height - bh * s) / 2.0;
        (s, (ox, oy))
    }

    /// Container-relative pixel position to view-box user units.
    pub fn to_user(&self, px: (f64, f64)) -> (f64, f64) {
        let (s, (ox, oy)) = self.fit();
        ((px.0 - ox) / s, (px.1 - oy) / s)
    }

    /// Pixel distance to user units.
    pub fn to_user_delta(&self, d: (f64, f64)) -> (f64, f64) {
        let (s, _) = self.fit();
        (d.0 / s, d.1 / s)
    }

    /// Keep the view box, once transformed, inside `[0, 0] - [width, height]`
    /// of the viewport.
    fn constrain(&self, t: ZoomTransform) -> ZoomTransform {
        let (w, h) = (self.viewport.width, self.viewport.height);
        let (ix0, iy0) = t.invert((0.0, 0.0));
        let (ix1, iy1) = t.invert(self.view_box);
        let dx0 = ix0;
        let dx1 = ix1 - w;
        let dy0 = iy0;
        let dy1 = iy1 - h;
        let axis = |d0: f64, d1: f64| {
            if d1 > d0 {
                (d0 + d1) / 2.0
            } else {
                let lo = d0.min(0.0);
                if lo != 0.0 { lo } else { d1.max(0.0) }
            }
        };
        t.translated(axis(dx0, dx1), axis(dy0, dy1))
    }

    /// Multiply the scale, keeping the user-space point `anchor` fixed.
    pub fn scale_at(&mut self, factor: f64, anchor: (f64, f64)) {
        let t = self.transform;
        let k = (t.k * factor).clamp(MIN_SCALE, MAX_SCALE);
        let p = t.invert(anchor);
        let next = ZoomTransform {
            k,
            x: anchor.0 - p.0 * k,
            y: anchor.1 - p.1 * k,
        };
        self.transform = self.constrain(next);
    }

    /// Button zoom around the view box center.
    pub fn scale_by(&mut self, factor: f64) {
        self.scale_at(factor, self.center());
    }

    pub fn zoom_in(&mut self) {
        self.scale_by(ZOOM_IN_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.scale_by(ZOOM_OUT_FACTOR);
    }

    /// Drag by a delta in user units.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let t = self.transform;
        let next = ZoomTransform {
            k: t.k,
            x: t.x + dx,
            y: t.y + dy,
        };
        self.transform = self.constrain(next);
    }

    /// Start an eased return to the identity transform.
    pub fn reset(&self, now_ms: f64) -> ZoomTransition {
        ZoomTransition {
            from: self.transform,
            to: ZoomTransform::IDENTITY,
            start_ms: now_ms,
            duration_ms: RESET_DURATION_MS,
        }
    }
}

/// Scale factor for one wheel event, as browsers report `deltaY`.
/// `delta_mode` 0 is pixels, 1 lines, 2 pages.
pub fn wheel_factor(delta_y: f64, delta_mode: u32) -> f64 {
    let unit = match delta_mode {
        0 => 0.002,
        1 => 0.05,
        _ => 1.0,
    };
    2f64.powf(-delta_y * unit)
}

fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// Time-based interpolation between two transforms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomTransition {
    pub from: ZoomTransform,
    pub to: ZoomTransform,
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl ZoomTransition {
    /// Transform at `now_ms` and whether the transition has finished.
    pub fn sample(&self, now_ms: f64) -> (ZoomTransform, bool) {
        let raw = if self.duration_ms > 0.0 {
            ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };
        if raw >= 1.0 {
            return (self.to, true);
        }
        let e = ease_cubic_in_out(raw);
        let lerp = |a: f64, b: f64| a + (b - a) * e;
        (
            ZoomTransform {
                k: lerp(self.from.k, self.to.k),
                x: lerp(self.from.x, self.to.x),
                y: lerp(self.from.y, self.to.y),
            },
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp() -> Viewport {
        Viewport {
            width: 800.0,
            height: 600.0,
        }
    }

    fn state() -> ZoomState {
        ZoomState::new(vp(), (800.0, 600.0))
    }

    #[test]
    fn zoom_in_keeps_center_fixed() {
        let mut z = state();
        z.zoom_in();
        let t = z.transform;
        assert_eq!(t.k, 1.5);
        assert!((t.x - (400.0 - 400.0 * 1.5)).abs() < 1e-9);
        assert!((t.y - (300.0 - 300.0 * 1.5)).abs() < 1e-9);
    }

    #[test]
    fn zoom_in_keeps_view_box_center_fixed() {
        let view = Viewport {
            width: 1000.0,
            height: 800.0,
        };
        let mut z = ZoomState::new(view, (945.0, 756.0));
        z.zoom_in();
        let t = z.transform;
        assert!((t.x - (472.5 - 472.5 * 1.5)).abs() < 1e-9);
        assert!((t.y - (378.0 - 378.0 * 1.5)).abs() < 1e-9);
    }

    #[test]
    fn pixels_map_into_view_box_units() {
        let view = Viewport {
            width: 1000.0,
            height: 800.0,
        };
        let mut z = ZoomState::new(view, (945.0, 756.0));
        let (dx, dy) = z.to_user_delta((100.0, 0.0));
        assert!((dx - 94.5).abs() < 1e-9);
        assert_eq!(dy, 0.0);
        let (ux, uy) = z.to_user((500.0, 400.0));
        assert!((ux - 472.5).abs() < 1e-9);
        assert!((uy - 378.0).abs() < 1e-9);

        // a drag moves the content exactly as far as the pointer on screen
        z.scale_by(2.0);
        let before = z.transform.x;
        z.pan_by(dx, dy);
        let moved_px = (z.transform.x - before) * 1000.0 / 945.0;
        assert!((moved_px - 100.0).abs() < 1e-9);
    }

    #[test]
    fn scale_is_clamped_to_extent() {
        let mut z = state();
        z.zoom_out();
        assert_eq!(z.transform, ZoomTransform::IDENTITY);
        for _ in 0..20 {
            z.zoom_in();
        }
        assert_eq!(z.transform.k, MAX_SCALE);
    }

    #[test]
    fn pan_cannot_leave_viewport() {
        let mut z = state();
        z.pan_by(100.0, -50.0);
        assert_eq!(z.transform, ZoomTransform::IDENTITY);

        z.scale_by(2.0);
        z.pan_by(10_000.0, 10_000.0);
        assert_eq!(z.transform.x, 0.0);
        assert_eq!(z.transform.y, 0.0);
        z.pan_by(-10_000.0, -10_000.0);
        assert_eq!(z.transform.x, -800.0);
        assert_eq!(z.transform.y, -600.0);
    }

    #[test]
    fn reset_eases_back_to_identity() {
        let mut z = state();
        z.scale_by(4.0);
        let tr = z.reset(1_000.0);
        let (start, done) = tr.sample(1_000.0);
        assert!(!done);
        assert_eq!(start, z.transform);
        let (mid, _) = tr.sample(1_375.0);
        assert!((mid.k - 2.5).abs() < 1e-9);
        let (end, done) = tr.sample(1_750.0);
        assert!(done);
        assert_eq!(end, ZoomTransform::IDENTITY);
    }

    #[test]
    fn wheel_direction() {
        assert!(wheel_factor(-100.0, 0) > 1.0);
        assert!(wheel_factor(100.0, 0) < 1.0);
        assert_eq!(wheel_factor(0.0, 1), 1.0);
    }

    #[test]
    fn transform_attribute_text() {
        let t = ZoomTransform {
            k: 1.5,
            x: -200.0,
            y: -150.0,
        };
        assert_eq!(t.to_string(), "translate(-200,-150) scale(1.5)");
    }
}
