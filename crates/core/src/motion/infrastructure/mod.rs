pub mod cubic_shifter;
