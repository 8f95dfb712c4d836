//! Character-cell frame buffer flushed with crossterm

use std::io::{self, Write};

use crossterm::style::{self, Color};
use crossterm::{cursor, queue};

/// One styled character cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Glyph {
    #[must_use]
    pub const fn new(ch: char, fg: Color, bg: Color) -> Self {
        Self { ch, fg, bg }
    }
}

/// A full-screen grid of styled characters
#[derive(Debug)]
pub struct Canvas {
    w: usize,
    h: usize,
    cells: Vec<Glyph>,
}

const BLANK: Glyph = Glyph {
    ch: ' ',
    fg: Color::White,
    bg: Color::Black,
};

impl Canvas {
    #[must_use]
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            cells: vec![BLANK; w * h],
        }
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.cells.resize(w * h, BLANK);
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.w
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.h
    }

    /// Fill the whole canvas with a background colour
    pub fn clear(&mut self, bg: Color) {
        self.cells.fill(Glyph { bg, ..BLANK });
    }

    #[allow(clippy::cast_sign_loss)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h)
            .then(|| y as usize * self.w + x as usize)
    }

    pub fn set(&mut self, x: i32, y: i32, glyph: Glyph) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = glyph;
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, glyph: Glyph) {
        for dy in 0..h {
            for dx in 0..w {
                self.set(x + dx, y + dy, glyph);
            }
        }
    }

    /// Write text on top of the existing background
    pub fn text(&mut self, x: i32, y: i32, text: &str, fg: Color) {
        for (dx, ch) in (0..).zip(text.chars()) {
            if let Some(i) = self.index(x + dx, y) {
                let bg = self.cells[i].bg;
                self.cells[i] = Glyph { ch, fg, bg };
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn centered_text(&mut self, y: i32, text: &str, fg: Color) {
        let len = text.chars().count() as i32;
        let x = (self.w as i32 - len) / 2;
        self.text(x.max(0), y, text, fg);
    }

    /// Flush the frame, only emitting colour changes where they occur
    ///
    /// # Errors
    ///
    /// Returns error if writing to the terminal fails
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        queue!(out, cursor::MoveTo(0, 0))?;
        let mut prev: Option<(Color, Color)> = None;

        for row in 0..self.h {
            for glyph in &self.cells[row * self.w..(row + 1) * self.w] {
                if prev != Some((glyph.fg, glyph.bg)) {
                    queue!(
                        out,
                        style::SetForegroundColor(glyph.fg),
                        style::SetBackgroundColor(glyph.bg)
                    )?;
                    prev = Some((glyph.fg, glyph.bg));
                }
                queue!(out, style::Print(glyph.ch))?;
            }
            if row + 1 < self.h {
                queue!(out, style::ResetColor, style::Print("\r\n"))?;
                prev = None;
            }
        }
        queue!(out, style::ResetColor)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_outside_bounds_are_ignored() {
        let mut canvas = Canvas::new(4, 2);
        let x = Glyph::new('x', Color::Red, Color::Black);
        canvas.set(-1, 0, x);
        canvas.set(4, 1, x);
        canvas.text(2, 1, "abc", Color::White);
        assert_eq!(canvas.cells[6].ch, 'a');
        assert_eq!(canvas.cells[7].ch, 'b');
    }

    #[test]
    fn render_emits_every_cell() {
        let mut canvas = Canvas::new(3, 2);
        canvas.centered_text(0, "hi", Color::Yellow);
        let mut out = Vec::new();
        canvas.render(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("hi"));
    }
}
