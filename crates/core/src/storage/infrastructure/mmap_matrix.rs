use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use ndarray::{Array2, ShapeBuilder};

use crate::shared::constants::BYTES_PER_PIXEL;
use crate::shared::memmap_name::{MemmapName, StorageOrder};

/// Read-only view of a column-major frame matrix, dimensions taken from
/// its file name.
pub struct MmapMatrix {
    name: MemmapName,
    map: Mmap,
}

impl MmapMatrix {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let name = MemmapName::from_path(path)?;
        if name.order != StorageOrder::Fortran {
            return Err(format!("{}: only column-major matrices are supported", path.display()).into());
        }

        let file = File::open(path)?;
        let expected = name.pixels_per_frame() * name.frames * BYTES_PER_PIXEL;
        let actual = file.metadata()?.len() as usize;
        if actual != expected {
            return Err(format!(
                "{}: file holds {actual} bytes but its name describes {expected}",
                path.display()
            )
            .into());
        }

        // Safety: the mapping is read-only and owned by this struct.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { name, map })
    }

    pub fn name(&self) -> &MemmapName {
        &self.name
    }

    /// Returns column `index` (one flattened frame), or `None` past the end.
    pub fn column(&self, index: usize) -> Option<Vec<f32>> {
        if index >= self.name.frames {
            return None;
        }
        let bytes = self.name.pixels_per_frame() * BYTES_PER_PIXEL;
        let start = index * bytes;
        Some(bytemuck::pod_collect_to_vec(&self.map[start..start + bytes]))
    }

    /// Un-flattens column `index` into a `(height, width)` plane.
    pub fn frame(&self, index: usize) -> Option<Array2<f32>> {
        let column = self.column(index)?;
        Array2::from_shape_vec((self.name.height, self.name.width).f(), column).ok()
    }
}
