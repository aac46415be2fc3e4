/// Braille Unicode canvas for terminal map layers.
/// Each character cell holds a 2x4 dot grid; one canvas is drawn per
/// colour so layers can be composited back to front.
#[derive(Clone)]
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    cells: Vec<u8>,
}

impl BrailleCanvas {
    /// Effective dot resolution is `width * 2` x `height * 4`
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Dot resolution as (width, height)
    pub fn dot_size(&self) -> (usize, usize) {
        (self.width * 2, self.height * 4)
    }

    /// Set a dot. Layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    pub fn set_dot(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }

        let bit = match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            _ => 0x80,
        };

        self.cells[cy * self.width + cx] |= bit;
    }

    /// Set a horizontal run of dots `[x0, x1]` on row `y`.
    /// `stride` > 1 leaves gaps, used to dither translucent fills.
    pub fn fill_span(&mut self, y: i32, x0: i32, x1: i32, stride: usize) {
        let max_x = (self.width * 2) as i32 - 1;
        let (start, end) = (x0.max(0), x1.min(max_x));
        // Offset odd rows so dithering forms a checkerboard rather than stripes
        let phase = if stride > 1 { y.rem_euclid(stride as i32) } else { 0 };
        let mut x = start + (phase - start.rem_euclid(stride as i32)).rem_euclid(stride as i32);
        while x <= end {
            self.set_dot(x, y);
            x += stride as i32;
        }
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    /// Character at a cell, `None` if the cell is empty or out of range
    pub fn glyph(&self, cx: usize, cy: usize) -> Option<char> {
        if cx >= self.width || cy >= self.height {
            return None;
        }
        match self.cells[cy * self.width + cx] {
            0 => None,
            bits => char::from_u32(0x2800 + bits as u32),
        }
    }

    /// Iterate over non-empty cells as (column, row, glyph)
    pub fn glyphs(&self) -> impl Iterator<Item = (usize, usize, char)> + '_ {
        (0..self.height).flat_map(move |cy| {
            (0..self.width).filter_map(move |cx| self.glyph(cx, cy).map(|ch| (cx, cy, ch)))
        })
    }

    #[cfg(test)]
    pub fn to_string(&self) -> String {
        (0..self.height)
            .map(|cy| {
                (0..self.width)
                    .map(|cx| self.glyph(cx, cy).unwrap_or('\u{2800}'))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
