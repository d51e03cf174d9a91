// Patient-data audit: static tests that scan every Rust source file for
// tracing calls carrying patient-identifying fields. Logs may hold opaque
// ids and counts only.
