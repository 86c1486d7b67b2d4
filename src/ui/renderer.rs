/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// ## Screen layout
///
///   row 0            HUD (score, time, best, toggles)
///   row 1            message bar
///   rows 2..h-2      stage
///   last 2 rows      key help
///
/// The stage is measured in stage px: one column is `PX_PER_COL` px wide,
/// one row `PX_PER_ROW` px tall. A balloon covers exactly the cells whose
/// centre lies inside its rectangle, so what is drawn is what can be hit.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::balloon::Balloon;
use crate::domain::rules::pop_label;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for chrome rows. Using the same RGB for
    /// `Clear(ClearType::All)` and every cell avoids gap lines on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Background of an already-drawn cell, so text can be laid over it.
    fn bg_at(&self, x: usize, y: usize) -> Color {
        self.get(x, y).bg
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    /// Write `s` centred on column `cx`, keeping each cell's background.
    fn put_str_over(&mut self, cx: usize, y: usize, s: &str, fg: Color) {
        let x0 = cx.saturating_sub(s.chars().count() / 2);
        for (i, ch) in s.chars().enumerate() {
            let x = x0 + i;
            if x >= self.width { break; }
            let bg = self.bg_at(x, y);
            self.set(x, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── Stage geometry ──

pub const PX_PER_COL: f64 = 8.0;
pub const PX_PER_ROW: f64 = 16.0;

const HUD_ROW: usize = 0;
const MSG_ROW: usize = 1;
const STAGE_ROW: usize = 2;
const FOOTER_ROWS: usize = 2;

/// Length of the balloon string, in rows.
const STRING_ROWS: isize = 2;

const SKY: Color = Color::Rgb { r: 186, g: 230, b: 253 };
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const STRING_FG: Color = Color::Rgb { r: 100, g: 116, b: 139 };
const GAIN_FG: Color = Color::Rgb { r: 21, g: 128, b: 61 };
const LOSS_FG: Color = Color::Rgb { r: 185, g: 28, b: 28 };

fn stage_rows(term_h: usize) -> usize {
    term_h.saturating_sub(STAGE_ROW + FOOTER_ROWS).max(1)
}

/// Stage size in px for a terminal of `term_w` × `term_h` cells.
fn stage_px(term_w: usize, term_h: usize) -> (f64, f64) {
    (term_w.max(1) as f64 * PX_PER_COL, stage_rows(term_h) as f64 * PX_PER_ROW)
}

/// Stage px at the centre of a terminal cell, or None outside the stage.
fn cell_center(term_w: usize, term_h: usize, col: usize, row: usize) -> Option<(f64, f64)> {
    if col >= term_w || row < STAGE_ROW || row >= STAGE_ROW + stage_rows(term_h) {
        return None;
    }
    let x = (col as f64 + 0.5) * PX_PER_COL;
    let y = ((row - STAGE_ROW) as f64 + 0.5) * PX_PER_ROW;
    Some((x, y))
}

/// Half-open range of cell indices whose centre falls in [start, start+len).
fn cell_span(start: f64, len: f64, px_per: f64) -> (isize, isize) {
    let first = (start / px_per - 0.5).ceil() as isize;
    let end = ((start + len) / px_per - 0.5).ceil() as isize;
    (first, end)
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb { r, g, b }
}

/// Readable label colour on a balloon body.
fn label_fg((r, g, b): (u8, u8, u8)) -> Color {
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luma < 110.0 { Color::White } else { Color::Black }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize_buffers(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Current stage size in px.
    pub fn stage_size(&self) -> (f64, f64) {
        stage_px(self.term_w, self.term_h)
    }

    /// Map a pointer cell to stage px. None for the HUD, message bar and footer.
    pub fn cell_to_stage(&self, col: u16, row: u16) -> Option<(f64, f64)> {
        cell_center(self.term_w, self.term_h, col as usize, row as usize)
    }

    fn resize_buffers(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    /// Pick up a terminal resize. Returns true when the size changed.
    pub fn sync_size(&mut self) -> io::Result<bool> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize == self.term_w && th as usize == self.term_h {
            return Ok(false);
        }
        self.resize_buffers(tw as usize, th as usize);
        queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        Ok(true)
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        // Detect phase change → clear for clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        self.compose_hud(world);
        self.compose_message(world);
        self.compose_stage(world);
        match world.phase {
            Phase::Idle => self.compose_title_overlay(),
            Phase::Ended => self.compose_summary_overlay(world),
            Phase::Running => {}
        }
        self.compose_footer();

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal
        // default, which may differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, w: &WorldState) {
        let on_off = |b: bool| if b { "ON " } else { "OFF" };
        let hud = format!(
            " Score: {:<5}  Time: {:>2}s  Best: {:<5}  Sound: {}  Music: {} ",
            w.score, w.time_left, w.best, on_off(w.sound_on), on_off(w.music_on),
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_message(&mut self, w: &WorldState) {
        if w.message.is_empty() {
            return;
        }
        let msg = format!(" ◈ {} ", w.message);
        self.front.fill_row(MSG_ROW, MSG_BG);
        self.front.put_str(0, MSG_ROW, &msg, Color::Black, MSG_BG);
    }

    fn compose_stage(&mut self, w: &WorldState) {
        let rows = stage_rows(self.term_h);
        for vy in 0..rows {
            self.front.fill_row(STAGE_ROW + vy, SKY);
        }

        // Later balloons are drawn over earlier ones, matching hit order.
        for b in w.balloons.iter().filter(|b| b.is_alive()) {
            self.compose_balloon(b, rows);
        }

        for t in &w.pop_texts {
            let col = (t.x / PX_PER_COL) as usize;
            let vy = (t.y / PX_PER_ROW) as usize;
            if vy >= rows { continue; }
            let fg = if t.text.starts_with('-') { LOSS_FG } else { GAIN_FG };
            self.front.put_str_over(col, STAGE_ROW + vy, &t.text, fg);
        }
    }

    fn compose_balloon(&mut self, b: &Balloon, rows: usize) {
        let (c0, c1) = cell_span(b.x, b.width, PX_PER_COL);
        let (r0, r1) = cell_span(b.y, b.height, PX_PER_ROW);
        if c1 <= c0 || r1 <= r0 {
            return;
        }
        let body = rgb(b.kind.color);
        let rounded = c1 - c0 >= 3 && r1 - r0 >= 3;

        let put = |front: &mut FrameBuffer, col: isize, vy: isize, cell: Cell| {
            if col >= 0 && vy >= 0 && (vy as usize) < rows {
                front.set(col as usize, STAGE_ROW + vy as usize, cell);
            }
        };

        for vy in r0..r1 {
            for col in c0..c1 {
                let corner = match (col == c0, col == c1 - 1, vy == r0, vy == r1 - 1) {
                    _ if !rounded => None,
                    (true, _, true, _) => Some('▟'),
                    (_, true, true, _) => Some('▙'),
                    (true, _, _, true) => Some('▜'),
                    (_, true, _, true) => Some('▛'),
                    _ => None,
                };
                let cell = match corner {
                    // Quarter-cut corners still belong to the balloon.
                    Some(ch) if col >= 0 && vy >= 0 => {
                        let under = self.front.bg_at(col as usize, STAGE_ROW + vy as usize);
                        Cell::new(ch, body, under)
                    }
                    Some(_) => continue,
                    None => Cell::new(' ', Color::White, body),
                };
                put(&mut self.front, col, vy, cell);
            }
        }

        let mid_col = (c0 + c1) / 2;
        for vy in r1..r1 + STRING_ROWS {
            put(&mut self.front, mid_col, vy, Cell::new('│', STRING_FG, SKY));
        }

        let mid_row = (r0 + r1) / 2;
        if mid_row >= 0 && (mid_row as usize) < rows && mid_col >= 0 {
            let label = pop_label(b.kind.points);
            self.front.put_str_over(
                mid_col as usize, STAGE_ROW + mid_row as usize, &label, label_fg(b.kind.color),
            );
        }
    }

    fn compose_footer(&mut self) {
        let help_row = self.term_h.saturating_sub(FOOTER_ROWS);
        if help_row < STAGE_ROW {
            return;
        }
        let keys = " Click: pop   Enter/Space: start   R: restart   S: sound   M: music   Q: quit";
        let pad = " Pad: Start/A start   Select restart   X sound   Y music   B back";
        self.front.put_str(0, help_row, keys, Color::DarkGrey, Cell::BASE_BG);
        self.front.put_str(0, help_row + 1, pad, Color::Rgb { r: 80, g: 80, b: 100 }, Cell::BASE_BG);
    }

    /// Centered box over the stage.
    fn compose_box(&mut self, lines: &[(&str, Color)]) {
        let rows = stage_rows(self.term_h);
        let inner_w = lines.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0) + 4;
        let box_w = inner_w + 2;
        let box_h = lines.len() + 2;
        let x0 = self.term_w.saturating_sub(box_w) / 2;
        let y0 = STAGE_ROW + rows.saturating_sub(box_h) / 2;

        let frame = Color::Rgb { r: 255, g: 220, b: 50 };
        let bg = Color::Rgb { r: 30, g: 41, b: 59 };
        let bar: String = "═".repeat(inner_w);
        self.front.put_str(x0, y0, &format!("╔{}╗", bar), frame, bg);
        for (i, (line, fg)) in lines.iter().enumerate() {
            let y = y0 + 1 + i;
            self.front.put_str(x0, y, "║", frame, bg);
            self.front.put_str(x0 + 1, y, &" ".repeat(inner_w), *fg, bg);
            let pad = (inner_w - line.chars().count()) / 2;
            self.front.put_str(x0 + 1 + pad, y, line, *fg, bg);
            self.front.put_str(x0 + 1 + inner_w, y, "║", frame, bg);
        }
        self.front.put_str(x0, y0 + box_h - 1, &format!("╚{}╝", bar), frame, bg);
    }

    fn compose_title_overlay(&mut self) {
        let gold = Color::Rgb { r: 255, g: 200, b: 50 };
        let hi = Color::Rgb { r: 80, g: 255, b: 80 };
        let dim = Color::Rgb { r: 180, g: 180, b: 180 };
        self.compose_box(&[
            ("B A L L O O N   P O P", gold),
            ("", dim),
            ("Pop as many balloons as you can in 30 seconds.", Color::White),
            ("Black balloons subtract points. Gold is a bonus.", Color::White),
            ("", dim),
            ("ENTER / SPACE   Start", hi),
            ("Q / ESC         Quit", dim),
        ]);
    }

    fn compose_summary_overlay(&mut self, w: &WorldState) {
        let Some(summary) = w.summary else { return };
        let red = Color::Rgb { r: 255, g: 90, b: 90 };
        let gold = Color::Rgb { r: 255, g: 220, b: 50 };
        let hi = Color::Rgb { r: 80, g: 255, b: 80 };
        let dim = Color::Rgb { r: 180, g: 180, b: 180 };
        let score = format!("Final score: {}", summary.score);
        let record = if summary.new_best { "★ New record! ★" } else { "" };
        self.compose_box(&[
            ("Game over!", red),
            ("", dim),
            (score.as_str(), Color::White),
            (record, gold),
            ("", dim),
            ("ENTER   Play again", hi),
            ("ESC     Back to title", dim),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::balloon::CATALOG;

    #[test]
    fn stage_excludes_chrome_rows() {
        assert_eq!(stage_px(80, 24), (640.0, 320.0));
        // Tiny terminals still report a non-empty stage.
        assert_eq!(stage_px(0, 2), (PX_PER_COL, PX_PER_ROW));
    }

    #[test]
    fn cell_center_maps_stage_only() {
        assert_eq!(cell_center(80, 24, 0, 0), None);
        assert_eq!(cell_center(80, 24, 0, 1), None);
        assert_eq!(cell_center(80, 24, 0, 2), Some((4.0, 8.0)));
        assert_eq!(cell_center(80, 24, 10, 5), Some((84.0, 56.0)));
        assert_eq!(cell_center(80, 24, 0, 21), Some((4.0, 19.0 * 16.0 + 8.0)));
        assert_eq!(cell_center(80, 24, 0, 22), None);
        assert_eq!(cell_center(80, 24, 80, 5), None);
    }

    #[test]
    fn span_covers_cells_with_centre_inside() {
        // [20, 82): centres 4, 12, 20.. → first is 20 (col 2), last < 82 is 76 (col 9)
        assert_eq!(cell_span(20.0, 62.0, PX_PER_COL), (2, 10));
        assert_eq!(cell_span(-30.0, 20.0, PX_PER_COL), (-4, -1));
        assert_eq!(cell_span(0.0, 3.0, PX_PER_COL), (0, 0));
    }

    #[test]
    fn drawn_cells_are_hittable() {
        let b = Balloon::new(0, CATALOG[1], 37.5, 51.0, 70.0, 1.0);
        let (c0, c1) = cell_span(b.x, b.width, PX_PER_COL);
        let (r0, r1) = cell_span(b.y, b.height, PX_PER_ROW);
        for col in c0..c1 {
            for row in r0..r1 {
                let (px, py) = cell_center(200, 100, col as usize, row as usize + STAGE_ROW).unwrap();
                assert!(b.contains(px, py), "cell ({col},{row}) drawn but not hittable");
            }
        }
        // The cell just outside on each side is not hittable.
        let (px, py) = cell_center(200, 100, c1 as usize, r0 as usize + STAGE_ROW).unwrap();
        assert!(!b.contains(px, py));
        let (px, py) = cell_center(200, 100, c0 as usize - 1, r0 as usize + STAGE_ROW).unwrap();
        assert!(!b.contains(px, py));
    }

    #[test]
    fn rounded_corners_are_drawn_in_body_colour() {
        let mut r = Renderer::new();
        r.resize_buffers(40, 20);
        let b = Balloon::new(0, CATALOG[0], 16.0, 32.0, 40.0, 1.0);
        let (c0, c1) = cell_span(b.x, b.width, PX_PER_COL);
        let (r0, r1) = cell_span(b.y, b.height, PX_PER_ROW);
        r.compose_balloon(&b, stage_rows(20));

        let body = rgb(CATALOG[0].color);
        let corners = [(c0, r0, '▟'), (c1 - 1, r0, '▙'), (c0, r1 - 1, '▜'), (c1 - 1, r1 - 1, '▛')];
        for (col, vy, ch) in corners {
            let cell = r.front.get(col as usize, STAGE_ROW + vy as usize);
            assert_eq!((cell.ch, cell.fg), (ch, body), "corner ({col},{vy})");
            let (px, py) = cell_center(40, 20, col as usize, STAGE_ROW + vy as usize).unwrap();
            assert!(b.contains(px, py), "corner ({col},{vy}) drawn but not hittable");
        }
        let inner = r.front.get((c0 + 1) as usize, STAGE_ROW + r0 as usize);
        assert_eq!(inner.bg, body);
    }

    #[test]
    fn labels_contrast_with_body() {
        assert_eq!(label_fg(CATALOG[3].color), Color::White);
        assert_eq!(label_fg(CATALOG[2].color), Color::Black);
    }

    #[test]
    fn put_str_over_keeps_background() {
        let mut fb = FrameBuffer::new(10, 1);
        fb.set(4, 0, Cell::new(' ', Color::White, SKY));
        fb.put_str_over(5, 0, "+2", Color::Black);
        assert_eq!(fb.get(4, 0), Cell::new('+', Color::Black, SKY));
        assert_eq!(fb.get(5, 0), Cell::new('2', Color::Black, Cell::BASE_BG));
    }
}
