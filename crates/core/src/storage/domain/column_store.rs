use std::path::Path;

/// Dimensions of a dense column-major float32 matrix on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Values per column (pixels per frame).
    pub rows: usize,
    /// Number of columns (frames).
    pub columns: usize,
}

impl ColumnLayout {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    pub fn column_bytes(&self) -> usize {
        self.rows * std::mem::size_of::<f32>()
    }

    pub fn total_bytes(&self) -> usize {
        self.column_bytes() * self.columns
    }

    /// Byte offset of column `index` from the start of the file.
    pub fn column_offset(&self, index: usize) -> usize {
        index * self.column_bytes()
    }
}

/// Writes a matrix one column at a time into backing storage.
///
/// `allocate` must be called once before any `write_column`. Each column
/// write is independent: once it returns, that column is visible to other
/// readers of the storage.
pub trait ColumnStore: Send {
    fn allocate(
        &mut self,
        path: &Path,
        layout: ColumnLayout,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write_column(
        &mut self,
        index: usize,
        values: &[f32],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
