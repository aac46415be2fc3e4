use crate::braille::BrailleCanvas;
use glam::DVec2;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, a: DVec2, b: DVec2) {
    let (x0, y0) = (a.x.round() as i32, a.y.round() as i32);
    let (x1, y1) = (b.x.round() as i32, b.y.round() as i32);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let (mut x, mut y) = (x0, y0);

    loop {
        canvas.set_dot(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a filled disc
pub fn draw_circle(canvas: &mut BrailleCanvas, center: DVec2, radius: i32) {
    let (cx, cy) = (center.x.round() as i32, center.y.round() as i32);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_dot(cx + dx, cy + dy);
            }
        }
    }
}

/// Draw a one-dot ring
pub fn draw_ring(canvas: &mut BrailleCanvas, center: DVec2, radius: i32) {
    let (cx, cy) = (center.x.round() as i32, center.y.round() as i32);
    let (inner, outer) = ((radius - 1) * (radius - 1), radius * radius);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d = dx * dx + dy * dy;
            if d <= outer && d > inner {
                canvas.set_dot(cx + dx, cy + dy);
            }
        }
    }
}

/// Scanline fill of a polygon with holes (even-odd rule).
/// `stride` > 1 dithers the fill for translucent layers.
pub fn fill_polygon(canvas: &mut BrailleCanvas, rings: &[Vec<DVec2>], stride: usize) {
    let (_, height) = canvas.dot_size();
    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    if !min_y.is_finite() {
        return;
    }

    let y_start = (min_y.floor() as i32).max(0);
    let y_end = (max_y.ceil() as i32).min(height as i32 - 1);
    let mut crossings = Vec::new();

    for y in y_start..=y_end {
        // Sample at the dot center
        let sy = y as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            for (i, a) in ring.iter().enumerate() {
                let b = ring[(i + 1) % ring.len()];
                if (a.y > sy) != (b.y > sy) {
                    crossings.push(a.x + (sy - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));
        for pair in crossings.chunks_exact(2) {
            canvas.fill_span(y, pair[0].round() as i32, pair[1].round() as i32 - 1, stride);
        }
    }
}

/// Distance from a point to a segment, in dots
pub fn segment_distance(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}
