/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The board is drawn top-down: x grows to the right, z grows upward, each
/// grid cell is `CELL_W` terminal columns wide.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::phase::Phase;
use crate::domain::physics::GridCell;
use crate::domain::tile::{EditRule, Register, TileKind};
use crate::sim::world::WorldState;
use super::view::View;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Self::BASE_BG } else { bg };
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
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
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

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── Renderer ──

const CELL_W: usize = 3;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MAP_COL: usize = 1;
const PANEL_GAP: usize = 3;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const FLOOR_BG: Color = Color::Rgb { r: 45, g: 45, b: 60 };
const CURSOR_BG: Color = Color::Rgb { r: 90, g: 80, b: 20 };

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
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState, view: &View) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        let phase = world.current_phase();
        if self.last_phase != Some(phase) {
            self.back.cells.fill(Cell::INVALID);
            self.last_phase = Some(phase);
        }

        self.front.clear();
        self.compose_hud(world, view);
        let map_w = self.compose_board(world, view);
        self.compose_panel(world, view, MAP_COL + map_w + PANEL_GAP);
        self.compose_help();

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
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
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, w: &WorldState, view: &View) {
        let phase = match w.current_phase() {
            Phase::Editing => "EDITING",
            Phase::Running => "RUNNING",
        };
        let hud = format!(
            " {}  [{}/{}]  {} ",
            w.board.name, view.stage_index + 1, view.stage_count, phase,
        );
        for x in 0..self.front.width {
            self.front.set(x, HUD_ROW, Cell::new(' ', Color::White, HUD_BG));
        }
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    /// Draw the board; returns its width in terminal columns.
    fn compose_board(&mut self, w: &WorldState, view: &View) -> usize {
        let Some((lo, hi)) = w.board.cells.bounds() else { return 0 };
        let player_cell = GridCell::containing(w.player.position());
        let player_visible = w.player.position().y > -1.0;
        let blink_on = (view.anim_tick / 10) % 2 == 0;

        for z in (lo.z..=hi.z).rev() {
            let row = MAP_ROW + (hi.z - z) as usize;
            for x in lo.x..=hi.x {
                let col = MAP_COL + (x - lo.x) as usize * CELL_W;
                let cell = GridCell::new(x, z);

                let (text, mut fg, mut bg) = match w.board.tile_at(cell) {
                    Some(id) => {
                        let tile = &w.board.tiles[id];
                        let fg = match tile.kind {
                            TileKind::Variable { .. } if !view.gem_visible(id) => Color::DarkGrey,
                            kind => kind_color(kind),
                        };
                        (tile.glyph(), fg, FLOOR_BG)
                    }
                    None if w.board.cells.contains(cell) => (" . ".to_string(), Color::DarkGrey, FLOOR_BG),
                    None => ("   ".to_string(), Color::White, Cell::BASE_BG),
                };

                let editable = w.board.tile_at(cell)
                    .map_or(false, |id| w.board.tiles[id].edit.is_editable());
                if editable && w.current_phase() == Phase::Editing && blink_on {
                    fg = Color::White;
                }
                if cell == view.cursor && w.current_phase() == Phase::Editing {
                    bg = CURSOR_BG;
                }

                self.front.put_str(col, row, &text, fg, bg);
                if player_visible && cell == player_cell {
                    let glyph = if w.player.is_falling() { 'x' } else { '@' };
                    self.front.set(col + 1, row, Cell::new(glyph, Color::Yellow, bg));
                }
            }
        }

        (hi.x - lo.x + 1) as usize * CELL_W
    }

    fn compose_panel(&mut self, w: &WorldState, view: &View, col: usize) {
        let mut row = MAP_ROW;
        let mut line = |buf: &mut FrameBuffer, text: &str, fg: Color| {
            buf.put_str(col, row, text, fg, Color::Reset);
            row += 1;
        };

        for register in Register::ALL {
            let text = format!("{:<9} {:>6}", format!("{register:?}"), w.vars.get(register));
            line(&mut self.front, &text, register_color(register));
        }
        line(&mut self.front, "", Color::White);
        line(&mut self.front, &format!("speed     {:>6.1}", w.player.speed()), Color::White);
        if w.player.skip_armed() {
            line(&mut self.front, "skip next tile", Color::Red);
        }
        line(&mut self.front, "", Color::White);

        match view.selected_tile(w).and_then(|id| w.board.tile(id)) {
            Some(tile) => {
                line(&mut self.front, &format!("{} [{}]", tile.kind.label(), tile.glyph().trim()), kind_color(tile.kind));
                line(&mut self.front, &edit_summary(tile.edit), Color::Grey);
            }
            None => line(&mut self.front, "no tile selected", Color::DarkGrey),
        }
        line(&mut self.front, "", Color::White);

        if !view.message().is_empty() {
            let msg = format!(" {} ", view.message());
            line(&mut self.front, &msg, Color::Black);
            if let Some(r) = row.checked_sub(1) {
                for x in col..col + msg.chars().count() {
                    let c = self.front.get(x, r);
                    self.front.set(x, r, Cell::new(c.ch, Color::Black, Color::Rgb { r: 200, g: 180, b: 50 }));
                }
            }
        }
    }

    fn compose_help(&mut self) {
        let Some(row) = self.front.height.checked_sub(1) else { return };
        let help = " Space:run/edit  Arrows:cursor  Enter:turn  [ ]:register  , .:op  - +:value  f/s:speed  n/p:stage  q:quit";
        self.front.put_str(0, row, help, Color::DarkGrey, Color::Reset);
    }
}

fn kind_color(kind: TileKind) -> Color {
    match kind {
        TileKind::Floor => Color::DarkGrey,
        TileKind::Start => Color::Cyan,
        TileKind::Goal => Color::Green,
        TileKind::Arrow { .. } => Color::White,
        TileKind::Variable { register, .. } => register_color(register),
        TileKind::Conditional { .. } => Color::Magenta,
        TileKind::Teleport { .. } => Color::Blue,
    }
}

fn register_color(register: Register) -> Color {
    match register {
        Register::Ruby => Color::Red,
        Register::Sapphire => Color::Blue,
        Register::Emerald => Color::Green,
    }
}

fn edit_summary(rule: EditRule) -> String {
    match rule {
        EditRule::Locked => "locked".to_string(),
        EditRule::Arrow { forbidden: None } => "any direction".to_string(),
        EditRule::Arrow { forbidden: Some(d) } => format!("any direction but {d:?}"),
        EditRule::Fields { register, operation, value } => {
            let open: Vec<&str> = [(register, "register"), (operation, "op"), (value, "value")]
                .into_iter()
                .filter(|(on, _)| *on)
                .map(|(_, name)| name)
                .collect();
            format!("edit: {}", open.join(", "))
        }
    }
}
