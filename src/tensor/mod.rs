//! Raw detector output views.
//!
//! `RawOutput` is a borrowed view over a flat `f32` buffer laid out as
//! `[row][col][anchor][channel]`. Each anchor block holds
//! `[tx, ty, tw, th, to, class_logit_0 .. class_logit_n]`, so one block spans
//! `5 + num_classes` values and one cell spans `num_anchors` blocks.

use crate::util::{GridDecodeError, GridDecodeResult};

/// Number of box and objectness channels that precede the class logits.
pub const BOX_CHANNELS: usize = 5;

/// Spatial size of the detector's output grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridShape {
    /// Number of cell rows.
    pub height: usize,
    /// Number of cell columns.
    pub width: usize,
}

impl GridShape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Square grid, e.g. 13x13.
    pub fn square(side: usize) -> Self {
        Self::new(side, side)
    }

    /// Returns the number of cells, saturating at `usize::MAX`.
    pub fn cells(&self) -> usize {
        self.height.saturating_mul(self.width)
    }

    /// Returns the number of cells, or `None` if it overflows `usize`.
    pub fn checked_cells(&self) -> Option<usize> {
        self.height.checked_mul(self.width)
    }

    fn validate(&self) -> GridDecodeResult<()> {
        if self.height == 0 || self.width == 0 {
            return Err(GridDecodeError::InvalidGrid {
                height: self.height,
                width: self.width,
            });
        }
        Ok(())
    }
}

/// Grid, anchor and class counts of one output tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TensorLayout {
    grid: GridShape,
    num_anchors: usize,
    num_classes: usize,
}

impl TensorLayout {
    /// Creates a layout from explicit counts.
    pub fn new(grid: GridShape, num_anchors: usize, num_classes: usize) -> GridDecodeResult<Self> {
        grid.validate()?;
        if num_anchors == 0 {
            return Err(GridDecodeError::InvalidAnchors {
                reason: "at least one anchor prior is required",
            });
        }
        if num_classes == 0 {
            return Err(GridDecodeError::InvalidConfig {
                reason: "num_classes must be > 0",
            });
        }
        let total = grid
            .checked_cells()
            .and_then(|cells| cells.checked_mul(num_anchors))
            .zip(BOX_CHANNELS.checked_add(num_classes))
            .and_then(|(blocks, stride)| blocks.checked_mul(stride));
        if total.is_none() {
            return Err(GridDecodeError::InvalidConfig {
                reason: "tensor size overflows usize",
            });
        }
        Ok(Self {
            grid,
            num_anchors,
            num_classes,
        })
    }

    /// Derives the class count from a buffer length.
    ///
    /// `num_classes = len / (cells * num_anchors) - 5`; any remainder or a
    /// non-positive class count is a shape mismatch.
    pub fn infer(len: usize, grid: GridShape, num_anchors: usize) -> GridDecodeResult<Self> {
        grid.validate()?;
        if num_anchors == 0 {
            return Err(GridDecodeError::InvalidAnchors {
                reason: "at least one anchor prior is required",
            });
        }
        let mismatch = GridDecodeError::ShapeMismatch {
            len,
            cells: grid.cells(),
            anchors: num_anchors,
        };
        // A block count that overflows cannot describe any real buffer. Every
        // stride below is bounded by `len` once this product fits.
        let per_anchors = grid
            .checked_cells()
            .and_then(|cells| cells.checked_mul(num_anchors))
            .ok_or_else(|| mismatch.clone())?;
        if len % per_anchors != 0 {
            return Err(mismatch);
        }
        let per_anchor = len / per_anchors;
        if per_anchor <= BOX_CHANNELS {
            return Err(mismatch);
        }
        Ok(Self {
            grid,
            num_anchors,
            num_classes: per_anchor - BOX_CHANNELS,
        })
    }

    pub fn grid(&self) -> GridShape {
        self.grid
    }

    pub fn num_anchors(&self) -> usize {
        self.num_anchors
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Values per anchor block (`5 + num_classes`).
    pub fn anchor_stride(&self) -> usize {
        BOX_CHANNELS + self.num_classes
    }

    /// Values per grid cell.
    pub fn cell_stride(&self) -> usize {
        self.num_anchors * self.anchor_stride()
    }

    /// Values per grid row.
    pub fn row_stride(&self) -> usize {
        self.grid.width * self.cell_stride()
    }

    /// Candidates produced by one decode (`cells * num_anchors`).
    pub fn num_candidates(&self) -> usize {
        self.grid.cells() * self.num_anchors
    }

    /// Total buffer length described by the layout.
    pub fn expected_len(&self) -> usize {
        self.grid.height * self.row_stride()
    }

    /// Flat offset of the block for cell `(row, col)` and anchor `anchor`.
    #[inline]
    pub fn block_offset(&self, row: usize, col: usize, anchor: usize) -> usize {
        ((row * self.grid.width + col) * self.num_anchors + anchor) * self.anchor_stride()
    }
}

/// Borrowed view of one detector output tensor.
#[derive(Clone, Copy, Debug)]
pub struct RawOutput<'a> {
    data: &'a [f32],
    layout: TensorLayout,
}

impl<'a> RawOutput<'a> {
    /// Wraps a flat buffer, deriving the class count from its length.
    pub fn new(data: &'a [f32], grid: GridShape, num_anchors: usize) -> GridDecodeResult<Self> {
        let layout = TensorLayout::infer(data.len(), grid, num_anchors)?;
        Ok(Self { data, layout })
    }

    /// Wraps a flat buffer whose length must match `layout` exactly.
    pub fn with_layout(data: &'a [f32], layout: TensorLayout) -> GridDecodeResult<Self> {
        if data.len() != layout.expected_len() {
            return Err(GridDecodeError::ShapeMismatch {
                len: data.len(),
                cells: layout.grid().cells(),
                anchors: layout.num_anchors(),
            });
        }
        Ok(Self { data, layout })
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    /// Returns the backing buffer.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Returns all values of grid row `row`.
    pub fn row(&self, row: usize) -> Option<&'a [f32]> {
        if row >= self.layout.grid().height {
            return None;
        }
        let stride = self.layout.row_stride();
        self.data.get(row * stride..(row + 1) * stride)
    }

    /// Returns the `5 + num_classes` values of one anchor block.
    pub fn block(&self, row: usize, col: usize, anchor: usize) -> Option<&'a [f32]> {
        let grid = self.layout.grid();
        if row >= grid.height || col >= grid.width || anchor >= self.layout.num_anchors() {
            return None;
        }
        let start = self.layout.block_offset(row, col, anchor);
        self.data.get(start..start + self.layout.anchor_stride())
    }

    /// Fails on the first NaN or infinite value.
    pub fn check_finite(&self) -> GridDecodeResult<()> {
        match self.data.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(GridDecodeError::NonFinite {
                index,
                value: self.data[index],
            }),
            None => Ok(()),
        }
    }
}
