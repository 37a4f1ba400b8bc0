//! Fields command implementation.

use papersift_extractor::GCR_FIELDS;

/// Print the extracted field names, one per line, in column order.
pub fn execute_fields() {
    for (idx, (name, guidance)) in GCR_FIELDS.iter().enumerate() {
        println!("{:>2}. {:<30} {}", idx + 1, name, guidance);
    }
}
