//! Lookup table command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::lookup::{LookupTextures, AREA_FILE_NAME, SEARCH_FILE_NAME};

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Generate both lookup tables and write them into `out`.
pub fn run_lookup(out: &Path) -> ExitCode {
    let lookups = LookupTextures::generate();
    if let Err(e) = lookups.save_to_dir(out) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!("Wrote {}", out.join(AREA_FILE_NAME).display());
    println!("Wrote {}", out.join(SEARCH_FILE_NAME).display());
    ExitCode::from(EXIT_SUCCESS)
}
