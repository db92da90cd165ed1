pub mod pantry_sweep;
