use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;

use crate::storage::domain::column_store::{ColumnLayout, ColumnStore};

/// Column store backed by a headerless float32 file, written through
/// short-lived memory maps.
///
/// `allocate` sizes the file up front and closes it. Every `write_column`
/// reopens the file, maps exactly one column's byte range, copies, flushes
/// and unmaps before returning, so memory use stays at one column no matter
/// how many columns the matrix has.
pub struct MmapColumnStore {
    target: Option<(PathBuf, ColumnLayout)>,
}

impl MmapColumnStore {
    pub fn new() -> Self {
        Self { target: None }
    }
}

impl Default for MmapColumnStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnStore for MmapColumnStore {
    fn allocate(
        &mut self,
        path: &Path,
        layout: ColumnLayout,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let file = File::create(path)?;
        file.set_len(layout.total_bytes() as u64)?;
        drop(file);

        log::debug!(
            "Allocated {} ({} x {} float32, {} bytes)",
            path.display(),
            layout.rows,
            layout.columns,
            layout.total_bytes()
        );
        self.target = Some((path.to_path_buf(), layout));
        Ok(())
    }

    fn write_column(
        &mut self,
        index: usize,
        values: &[f32],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (path, layout) = self
            .target
            .as_ref()
            .ok_or("MmapColumnStore: not allocated")?;

        if index >= layout.columns {
            return Err(format!(
                "column {index} out of range for a matrix with {} columns",
                layout.columns
            )
            .into());
        }
        if values.len() != layout.rows {
            return Err(format!(
                "column {index} has {} values, expected {}",
                values.len(),
                layout.rows
            )
            .into());
        }
        if layout.rows == 0 {
            return Ok(());
        }

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        // Safety: the mapping covers a range inside the file sized by
        // `allocate` and is dropped before this function returns.
        let mut region = unsafe {
            MmapOptions::new()
                .offset(layout.column_offset(index) as u64)
                .len(layout.column_bytes())
                .map_mut(&file)?
        };
        region.copy_from_slice(bytemuck::cast_slice(values));
        region.flush()?;
        Ok(())
    }
}
