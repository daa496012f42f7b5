pub mod mmap_column_store;
pub mod mmap_matrix;
