//! Exit codes for the `bagit` binary.
//! Library errors map through `BagError::exit_code`.

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_INVALID: i32 = 1; // Bag loaded but failed validation
pub const EXIT_CONFIG_ERROR: i32 = 2; // Bad arguments, options or I/O
pub const EXIT_NOT_FOUND: i32 = 3;
pub const EXIT_STRUCTURE: i32 = 4; // Bag cannot be read at all
