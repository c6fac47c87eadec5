/// A cursor confined to a `rows x cols` grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
}

impl Cursor {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            row: 0,
            col: 0,
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Change the bounds, pulling the cursor back inside if needed.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.rows = rows.max(1);
        self.cols = cols.max(1);
        self.row = self.row.min(self.rows - 1);
        self.col = self.col.min(self.cols - 1);
    }

    pub fn reset(&mut self) {
        self.row = 0;
        self.col = 0;
    }

    pub fn move_to(&mut self, row: usize, col: usize) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        self.row = row;
        self.col = col;
        true
    }

    pub fn move_by(&mut self, delta: isize) -> bool {
        match self.row.checked_add_signed(delta) {
            Some(row) if row < self.rows => {
                self.row = row;
                true
            }
            _ => false,
        }
    }
}
