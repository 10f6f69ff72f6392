/// Edge length of one drum block (blocks are square).
pub const BLOCK_EDGE: usize = 4;
/// Pads per drum block. Also the number of bank positions one drum octave spans.
pub const BLOCK_SIZE: usize = BLOCK_EDGE * BLOCK_EDGE;

/// Which part of the pad grid owns a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Live note input (bottom rows).
    Play,
    /// Step editing.
    Sequencer,
    /// Page navigation and loop range (top rows).
    Loop,
}

impl Zone {
    pub fn name(self) -> &'static str {
        match self {
            Zone::Play => "play",
            Zone::Sequencer => "sequencer",
            Zone::Loop => "loop",
        }
    }
}

/// A pad resolved to its zone and grid coordinates. Row 0 is the bottom row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadPosition {
    pub zone: Zone,
    pub col: usize,
    pub row: usize,
}

/// Immutable grid geometry for one view.
///
/// Rows are stacked bottom to top: `play_rows` of play zone, then
/// `sequencer_rows` of sequencer zone, and whatever is left becomes the
/// loop/page zone. A block-remapped layout is all play zone and maps pads to
/// drum indices through 4×4 blocks instead of row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    columns: usize,
    total_rows: usize,
    play_rows: usize,
    sequencer_rows: usize,
    block_size: usize,
    block_remapped: bool,
}

impl GridLayout {
    pub fn new(
        columns: usize,
        total_rows: usize,
        play_rows: usize,
        sequencer_rows: usize,
    ) -> anyhow::Result<Self> {
        if columns == 0 || total_rows == 0 {
            anyhow::bail!("Grid must have at least one column and one row (got {columns}x{total_rows})");
        }
        if play_rows + sequencer_rows > total_rows {
            anyhow::bail!(
                "Zone rows exceed grid height: play={play_rows} + sequencer={sequencer_rows} > rows={total_rows}"
            );
        }
        Ok(GridLayout {
            columns,
            total_rows,
            play_rows,
            sequencer_rows,
            block_size: BLOCK_SIZE,
            block_remapped: false,
        })
    }

    /// A grid where every pad is a drum pad, indexed through 4×4 blocks.
    pub fn block_remapped(columns: usize, rows: usize) -> anyhow::Result<Self> {
        if columns == 0 || rows == 0 {
            anyhow::bail!("Grid must have at least one column and one row (got {columns}x{rows})");
        }
        if columns % BLOCK_EDGE != 0 || rows % BLOCK_EDGE != 0 {
            anyhow::bail!(
                "Block-remapped grid needs dimensions divisible by {BLOCK_EDGE} (got {columns}x{rows})"
            );
        }
        Ok(GridLayout {
            columns,
            total_rows: rows,
            play_rows: rows,
            sequencer_rows: 0,
            block_size: BLOCK_SIZE,
            block_remapped: true,
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn play_rows(&self) -> usize {
        self.play_rows
    }

    pub fn sequencer_rows(&self) -> usize {
        self.sequencer_rows
    }

    pub fn loop_rows(&self) -> usize {
        self.total_rows - self.play_rows - self.sequencer_rows
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_block_remapped(&self) -> bool {
        self.block_remapped
    }

    pub fn pad_count(&self) -> usize {
        self.columns * self.total_rows
    }

    pub fn play_pad_count(&self) -> usize {
        self.columns * self.play_rows
    }

    /// Number of steps visible at once (one page).
    pub fn sequencer_steps(&self) -> usize {
        self.columns * self.sequencer_rows
    }

    /// Number of page pads in the loop zone.
    pub fn page_count(&self) -> usize {
        self.columns * self.loop_rows()
    }

    pub fn zone_for_row(&self, row: usize) -> Zone {
        if row < self.play_rows {
            Zone::Play
        } else if row < self.play_rows + self.sequencer_rows {
            Zone::Sequencer
        } else {
            Zone::Loop
        }
    }

    /// Resolve a linear pad index. `None` if the index is off the grid.
    pub fn position(&self, index: usize) -> Option<PadPosition> {
        if index >= self.pad_count() {
            return None;
        }
        let col = index % self.columns;
        let row = index / self.columns;
        Some(PadPosition {
            zone: self.zone_for_row(row),
            col,
            row,
        })
    }

    /// Inverse of [`position`](Self::position).
    pub fn index(&self, col: usize, row: usize) -> Option<usize> {
        if col >= self.columns || row >= self.total_rows {
            return None;
        }
        Some(row * self.columns + col)
    }

    /// Page-relative step for a sequencer pad. The top row of the zone holds
    /// the first steps.
    pub fn sequencer_step(&self, pos: PadPosition) -> Option<usize> {
        if pos.zone != Zone::Sequencer {
            return None;
        }
        let local_row = pos.row - self.play_rows;
        Some(self.columns * (self.sequencer_rows - 1 - local_row) + pos.col)
    }

    /// Grid coordinates of a page-relative step.
    pub fn step_position(&self, step: usize) -> Option<(usize, usize)> {
        if step >= self.sequencer_steps() {
            return None;
        }
        let local_row = self.sequencer_rows - 1 - step / self.columns;
        Some((step % self.columns, self.play_rows + local_row))
    }

    /// Page number for a loop-zone pad, counted like sequencer steps.
    pub fn loop_page(&self, pos: PadPosition) -> Option<usize> {
        if pos.zone != Zone::Loop {
            return None;
        }
        let local_row = pos.row - self.play_rows - self.sequencer_rows;
        Some(self.columns * (self.loop_rows() - 1 - local_row) + pos.col)
    }

    pub fn page_position(&self, page: usize) -> Option<(usize, usize)> {
        if page >= self.page_count() {
            return None;
        }
        let local_row = self.loop_rows() - 1 - page / self.columns;
        Some((
            page % self.columns,
            self.play_rows + self.sequencer_rows + local_row,
        ))
    }

    /// Index of a play-zone pad within the play zone: row-major for plain
    /// grids, block order for block-remapped grids.
    pub fn play_index(&self, pos: PadPosition) -> Option<usize> {
        if pos.zone != Zone::Play {
            return None;
        }
        if self.block_remapped {
            Some(block_index(pos.col, pos.row, self.total_rows))
        } else {
            Some(pos.row * self.columns + pos.col)
        }
    }

    /// Inverse of [`play_index`](Self::play_index).
    pub fn play_position(&self, play_index: usize) -> Option<(usize, usize)> {
        if play_index >= self.play_pad_count() {
            return None;
        }
        if self.block_remapped {
            Some(block_position(play_index, self.total_rows))
        } else {
            Some((play_index % self.columns, play_index / self.columns))
        }
    }
}

/// Drum index of `(col, row)` on a grid tiled with 4×4 blocks. Blocks are
/// numbered column-major: all blocks of the first block column bottom to top,
/// then the next block column.
pub fn block_index(col: usize, row: usize, rows: usize) -> usize {
    let yblocks = rows / BLOCK_EDGE;
    let (bx, by) = (col % BLOCK_EDGE, row % BLOCK_EDGE);
    let block = (col / BLOCK_EDGE) * yblocks + row / BLOCK_EDGE;
    block * BLOCK_SIZE + by * BLOCK_EDGE + bx
}

/// Inverse of [`block_index`].
pub fn block_position(index: usize, rows: usize) -> (usize, usize) {
    let yblocks = rows / BLOCK_EDGE;
    let block = index / BLOCK_SIZE;
    let local = index % BLOCK_SIZE;
    let (bx, by) = (local % BLOCK_EDGE, local / BLOCK_EDGE);
    (
        (block / yblocks) * BLOCK_EDGE + bx,
        (block % yblocks) * BLOCK_EDGE + by,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_thresholds() {
        let layout = GridLayout::new(8, 8, 2, 4).unwrap();
        assert_eq!(layout.zone_for_row(0), Zone::Play);
        assert_eq!(layout.zone_for_row(1), Zone::Play);
        assert_eq!(layout.zone_for_row(2), Zone::Sequencer);
        assert_eq!(layout.zone_for_row(5), Zone::Sequencer);
        assert_eq!(layout.zone_for_row(6), Zone::Loop);
        assert_eq!(layout.zone_for_row(7), Zone::Loop);
        assert_eq!(layout.loop_rows(), 2);
        assert_eq!(layout.sequencer_steps(), 32);
        assert_eq!(layout.page_count(), 16);
    }

    #[test]
    fn plain_position_round_trip() {
        for &(cols, rows) in &[(8, 8), (4, 4), (16, 8), (5, 3)] {
            let layout = GridLayout::new(cols, rows, 0, rows).unwrap();
            for row in 0..rows {
                for col in 0..cols {
                    let index = layout.index(col, row).unwrap();
                    let pos = layout.position(index).unwrap();
                    assert_eq!((pos.col, pos.row), (col, row));
                }
            }
        }
    }

    #[test]
    fn block_round_trip() {
        for &(cols, rows) in &[(8, 8), (4, 4), (16, 8), (8, 16), (12, 4)] {
            let layout = GridLayout::block_remapped(cols, rows).unwrap();
            let mut seen = vec![false; cols * rows];
            for row in 0..rows {
                for col in 0..cols {
                    let pos = layout.position(layout.index(col, row).unwrap()).unwrap();
                    let drum = layout.play_index(pos).unwrap();
                    assert!(!seen[drum], "duplicate drum index {drum}");
                    seen[drum] = true;
                    assert_eq!(layout.play_position(drum), Some((col, row)));
                }
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    fn block_formula_on_eight_by_eight() {
        // Bottom-left block first, then the block above it, then the right column.
        assert_eq!(block_index(0, 0, 8), 0);
        assert_eq!(block_index(3, 3, 8), 15);
        assert_eq!(block_index(0, 4, 8), 16);
        assert_eq!(block_index(4, 0, 8), 32);
        assert_eq!(block_index(7, 7, 8), 63);
        assert_eq!(block_index(1, 2, 8), 9);
    }

    #[test]
    fn block_layout_rejects_odd_dimensions() {
        assert!(GridLayout::block_remapped(6, 8).is_err());
        assert!(GridLayout::block_remapped(8, 5).is_err());
        assert!(GridLayout::block_remapped(0, 8).is_err());
    }

    #[test]
    fn plain_layout_rejects_overfull_zones() {
        assert!(GridLayout::new(8, 8, 5, 4).is_err());
        assert!(GridLayout::new(0, 8, 0, 0).is_err());
        assert!(GridLayout::new(8, 8, 8, 0).is_ok());
    }

    #[test]
    fn step_index_example() {
        let layout = GridLayout::new(8, 4, 0, 4).unwrap();
        let pos = layout.position(layout.index(3, 1).unwrap()).unwrap();
        assert_eq!(layout.sequencer_step(pos), Some(19));
    }

    #[test]
    fn step_index_with_play_zone_below() {
        let layout = GridLayout::new(8, 8, 4, 4).unwrap();
        let pos = layout.position(layout.index(3, 5).unwrap()).unwrap();
        assert_eq!(pos.zone, Zone::Sequencer);
        assert_eq!(layout.sequencer_step(pos), Some(19));
        assert_eq!(layout.step_position(19), Some((3, 5)));
        // Top row of the zone holds the first step.
        let top = layout.position(layout.index(0, 7).unwrap()).unwrap();
        assert_eq!(layout.sequencer_step(top), Some(0));
    }

    #[test]
    fn step_and_page_positions_round_trip() {
        let layout = GridLayout::new(8, 8, 2, 4).unwrap();
        for step in 0..layout.sequencer_steps() {
            let (col, row) = layout.step_position(step).unwrap();
            let pos = layout.position(layout.index(col, row).unwrap()).unwrap();
            assert_eq!(layout.sequencer_step(pos), Some(step));
        }
        for page in 0..layout.page_count() {
            let (col, row) = layout.page_position(page).unwrap();
            let pos = layout.position(layout.index(col, row).unwrap()).unwrap();
            assert_eq!(layout.loop_page(pos), Some(page));
        }
        assert_eq!(layout.step_position(32), None);
        assert_eq!(layout.page_position(16), None);
    }

    #[test]
    fn off_grid_index_is_none() {
        let layout = GridLayout::new(8, 8, 2, 4).unwrap();
        assert!(layout.position(64).is_none());
        assert!(layout.index(8, 0).is_none());
        assert!(layout.index(0, 8).is_none());
    }

    #[test]
    fn zone_lookups_reject_other_zones() {
        let layout = GridLayout::new(8, 8, 2, 4).unwrap();
        let play = layout.position(0).unwrap();
        assert_eq!(layout.sequencer_step(play), None);
        assert_eq!(layout.loop_page(play), None);
        assert_eq!(layout.play_index(play), Some(0));
    }
}
