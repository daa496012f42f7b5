pub mod column_store;
