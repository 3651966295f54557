use crate::model::Point;

/// Linear map from a numeric domain onto a pixel range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        LinearScale { domain, range }
    }

    pub fn apply(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let span = d1 - d0;
        // a degenerate domain maps onto the middle of the range
        let t = if span != 0.0 { (v - d0) / span } else { 0.5 };
        let (r0, r1) = self.range;
        r0 * (1.0 - t) + r1 * t
    }
}

/// Viewport size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 1200.0,
            height: 800.0,
        }
    }
}

/// Facility coordinates to screen coordinates, one independent scale per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateProjector {
    pub x: LinearScale,
    pub y: LinearScale,
    extent: (f64, f64),
    fill: f64,
}

impl CoordinateProjector {
    /// Map `[0, extent]` onto `[margin * size, (1 - margin) * size]` for both axes.
    pub fn build(extent_x: f64, extent_y: f64, viewport: Viewport, margin_fraction: f64) -> Self {
        let axis = |extent: f64, size: f64| {
            LinearScale::new(
                (0.0, extent),
                (margin_fraction * size, (1.0 - margin_fraction) * size),
            )
        };
        CoordinateProjector {
            x: axis(extent_x, viewport.width),
            y: axis(extent_y, viewport.height),
            extent: (extent_x, extent_y),
            fill: 1.0 - margin_fraction,
        }
    }

    pub fn scale_x(&self, v: f64) -> f64 {
        self.x.apply(v)
    }

    pub fn scale_y(&self, v: f64) -> f64 {
        self.y.apply(v)
    }

    /// Final drawing position: projected, then shrunk once more by the fill
    /// factor so outlines clear the view box edge.
    pub fn place(&self, p: Point) -> Point {
        Point {
            x: self.scale_x(p.x) * self.fill,
            y: self.scale_y(p.y) * self.fill,
        }
    }

    /// Width and height of the SVG view box.
    pub fn view_box(&self) -> (f64, f64) {
        (self.scale_x(self.extent.0), self.scale_y(self.extent.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MARGIN: f64 = 1.0 - 0.945;

    #[rstest]
    #[case(800.0, 600.0, 120.0, 45.0)]
    #[case(1920.0, 1080.0, 7.5, 3000.0)]
    #[case(333.0, 211.0, 1.0, 1.0)]
    fn range_ends_are_exact(
        #[case] width: f64,
        #[case] height: f64,
        #[case] ex: f64,
        #[case] ey: f64,
    ) {
        let p = CoordinateProjector::build(ex, ey, Viewport { width, height }, MARGIN);
        assert_eq!(p.scale_x(0.0), MARGIN * width);
        assert_eq!(p.scale_x(ex), (1.0 - MARGIN) * width);
        assert_eq!(p.scale_y(0.0), MARGIN * height);
        assert_eq!(p.scale_y(ey), (1.0 - MARGIN) * height);
    }

    #[test]
    fn interior_points_stay_inside_margins() {
        let vp = Viewport {
            width: 1000.0,
            height: 500.0,
        };
        let p = CoordinateProjector::build(80.0, 40.0, vp, MARGIN);
        for i in 0..=80 {
            let v = p.scale_x(i as f64);
            assert!(v >= MARGIN * vp.width && v <= (1.0 - MARGIN) * vp.width);
        }
        assert!((p.scale_x(40.0) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn zero_extent_does_not_produce_nan() {
        let p = CoordinateProjector::build(0.0, 0.0, Viewport::default(), MARGIN);
        assert!((p.scale_x(0.0) - 600.0).abs() < 1e-9);
        assert!(p.scale_y(5.0).is_finite());
    }

    #[test]
    fn place_applies_fill_factor() {
        let vp = Viewport {
            width: 200.0,
            height: 100.0,
        };
        let p = CoordinateProjector::build(10.0, 10.0, vp, MARGIN);
        let placed = p.place(Point { x: 10.0, y: 0.0 });
        assert!((placed.x - 0.945 * 0.945 * 200.0).abs() < 1e-9);
        assert!((placed.y - MARGIN * 0.945 * 100.0).abs() < 1e-9);
        assert_eq!(p.view_box(), (p.scale_x(10.0), p.scale_y(10.0)));
    }
}
