//! Configuration-time coefficient and lookup-table file I/O.
//!
//! All formats are CSV with a quoted header row; see the individual
//! modules for column layouts. These functions never run on the streaming
//! path.

pub mod biquad;
pub mod fir;
pub mod lut;
pub mod table;

pub use biquad::{
    read_biquad_coeffs, read_biquad_coeffs_filtered, write_biquad_coeffs, write_biquad_coeffs_tagged,
};
pub use fir::{read_fir_coeffs, read_fir_coeffs_filtered, write_fir_coeffs, write_fir_coeffs_tagged};
pub use lut::{
    read_lut, read_lut_filtered, read_lut_per_bank, read_lut_per_bank_filtered, write_lut,
    write_lut_per_bank, write_lut_per_bank_tagged, write_lut_tagged,
};
pub use table::{row_matches_all_criteria, row_matches_any_criteria, write_csv, CsvTable};
