//! Control-point curves over a normalized 1-D domain.
//!
//! A curve maps time in [0,1] to a value, nominally in [0,1] (overshoot is
//! allowed). Each point carries an interpolation mode for the span to its
//! right: cubic Bezier shaped by tangent offsets, plain linear, or stepped
//! hold. Editing operations clamp instead of erroring: they are driven by
//! continuous drag gestures where transient out-of-range deltas are normal.

use serde::{Deserialize, Serialize};

/// 2D point or offset in curve space (time on x, value on y).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Interpolation mode for the span starting at a point.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CurveInterp {
    #[default]
    Bezier,
    Linear,
    Stepped,
}

/// Which tangent of a point is being edited.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TanSide {
    In,
    Out,
}

/// A single control point: position plus in/out tangent offsets.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CurvePoint {
    pub pos: Vec2,
    /// Tangent offset arriving at this point (x <= 0).
    pub in_tan: Vec2,
    /// Tangent offset leaving this point (x >= 0).
    pub out_tan: Vec2,
    #[serde(default)]
    pub interp: CurveInterp,
    /// When set, moving one tangent mirrors the other.
    #[serde(default = "default_true")]
    pub tangents_aligned: bool,
}

fn default_true() -> bool {
    true
}

impl CurvePoint {
    pub fn new(pos: Vec2, in_tan: Vec2, out_tan: Vec2) -> Self {
        Self {
            pos,
            in_tan,
            out_tan,
            interp: CurveInterp::Bezier,
            tangents_aligned: true,
        }
    }
}

const DEFAULT_TAN_OFFSET: f32 = 0.1;

/// Minimum time gap kept between neighboring points during edits.
const MIN_TIME_DELTA: f32 = 1e-4;

/// Ordered control points; first point pinned at time 0, last at time 1.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Curve {
    pub points: Vec<CurvePoint>,
}

impl Default for Curve {
    fn default() -> Self {
        Self {
            points: vec![
                CurvePoint::new(
                    Vec2::new(0.0, 0.0),
                    Vec2::new(-DEFAULT_TAN_OFFSET, 0.0),
                    Vec2::new(DEFAULT_TAN_OFFSET, 0.0),
                ),
                CurvePoint::new(
                    Vec2::new(1.0, 1.0),
                    Vec2::new(-DEFAULT_TAN_OFFSET, 0.0),
                    Vec2::new(DEFAULT_TAN_OFFSET, 0.0),
                ),
            ],
        }
    }
}

/// Cubic Bezier basis function
#[inline]
fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Evaluate one Bezier span between `a` and `b` at absolute time x.
/// Control-point x coordinates are clamped into the span so x(t) stays
/// monotonic and invertible by bisection.
fn bezier_segment(a: &CurvePoint, b: &CurvePoint, x: f32) -> f32 {
    let x0 = a.pos.x;
    let x3 = b.pos.x;
    let x1 = (x0 + a.out_tan.x).clamp(x0, x3);
    let x2 = (x3 + b.in_tan.x).clamp(x0, x3);
    let y0 = a.pos.y;
    let y1 = y0 + a.out_tan.y;
    let y2 = b.pos.y + b.in_tan.y;
    let y3 = b.pos.y;

    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut mid = if x3 > x0 { (x - x0) / (x3 - x0) } else { 0.0 };
    for _ in 0..24 {
        let xt = cubic_bezier(x0, x1, x2, x3, mid);
        if (xt - x).abs() < 1e-6 {
            break;
        }
        if xt < x {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    cubic_bezier(y0, y1, y2, y3, mid)
}

impl Curve {
    /// Evaluate the curve at time x. Out-of-range input is clamped; the
    /// value at 0 and 1 is exactly the first/last point's value.
    pub fn evaluate(&self, x: f32) -> f32 {
        let points = &self.points;
        let n = points.len();
        if n == 0 {
            return 0.0;
        }
        if n == 1 || x <= points[0].pos.x {
            return points[0].pos.y;
        }
        if x >= points[n - 1].pos.x {
            return points[n - 1].pos.y;
        }
        for i in 0..(n - 1) {
            let a = &points[i];
            let b = &points[i + 1];
            if x >= a.pos.x && x <= b.pos.x {
                let span = b.pos.x - a.pos.x;
                if span <= f32::EPSILON {
                    return b.pos.y;
                }
                return match a.interp {
                    CurveInterp::Stepped => a.pos.y,
                    CurveInterp::Linear => {
                        let t = (x - a.pos.x) / span;
                        a.pos.y + (b.pos.y - a.pos.y) * t
                    }
                    CurveInterp::Bezier => bezier_segment(a, b, x),
                };
            }
        }
        points[n - 1].pos.y
    }

    /// Insert a new point at time x, taking the curve's current value
    /// there and zero tangents. Returns the new point's index so the
    /// caller can keep dragging it. No-op unless x lies strictly between
    /// the neighboring points' times.
    pub fn insert_point(&mut self, x: f32) -> Option<usize> {
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let mut index = None;
        for i in 1..n {
            if x > self.points[i - 1].pos.x + MIN_TIME_DELTA
                && x < self.points[i].pos.x - MIN_TIME_DELTA
            {
                index = Some(i);
                break;
            }
        }
        let index = index?;
        let value = self.evaluate(x);
        self.points.insert(
            index,
            CurvePoint::new(Vec2::new(x, value), Vec2::default(), Vec2::default()),
        );
        Some(index)
    }

    /// Remove a point. The first and last point are structurally required
    /// (they are the segment's start/end anchors) and cannot be removed.
    pub fn remove_point(&mut self, index: usize) -> bool {
        let n = self.points.len();
        if n < 3 || index == 0 || index >= n - 1 {
            return false;
        }
        self.points.remove(index);
        true
    }

    /// Drag a point by (delta_time, delta_value). Time is clamped so the
    /// point stays strictly between its neighbors; the first and last
    /// point keep their time. Value is unclamped to allow overshoot.
    pub fn move_point(&mut self, index: usize, delta_time: f32, delta_value: f32) {
        let n = self.points.len();
        if index >= n {
            return;
        }
        if index > 0 && index < n - 1 {
            let lo = self.points[index - 1].pos.x + MIN_TIME_DELTA;
            let hi = self.points[index + 1].pos.x - MIN_TIME_DELTA;
            let p = &mut self.points[index];
            if lo <= hi {
                p.pos.x = (p.pos.x + delta_time).clamp(lo, hi);
            }
        }
        self.points[index].pos.y += delta_value;
    }

    /// Drag one tangent handle of a point. In-tangents stay on the left of
    /// the point, out-tangents on the right; with aligned tangents the
    /// opposite handle mirrors the moved one.
    pub fn move_tangent(&mut self, index: usize, side: TanSide, delta_time: f32, delta_value: f32) {
        let Some(p) = self.points.get_mut(index) else {
            return;
        };
        match side {
            TanSide::In => {
                p.in_tan.x = (p.in_tan.x + delta_time).min(0.0);
                p.in_tan.y += delta_value;
                if p.tangents_aligned {
                    p.out_tan = Vec2::new(-p.in_tan.x, -p.in_tan.y);
                }
            }
            TanSide::Out => {
                p.out_tan.x = (p.out_tan.x + delta_time).max(0.0);
                p.out_tan.y += delta_value;
                if p.tangents_aligned {
                    p.in_tan = Vec2::new(-p.out_tan.x, -p.out_tan.y);
                }
            }
        }
    }

    /// Nudge a point's value by `amount`, clamped into [0,1]. Used for the
    /// begin/end anchor values of a segment.
    pub fn adjust_point_value(&mut self, index: usize, amount: f32) {
        if let Some(p) = self.points.get_mut(index) {
            p.pos.y = (p.pos.y + amount).clamp(0.0, 1.0);
        }
    }
}
