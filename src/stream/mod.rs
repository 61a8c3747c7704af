//! NDJSON stream processing: chunk reassembly and record decoding

pub mod decoder;
pub mod reassembler;

pub use decoder::{decode_line, Decoded, MalformedRecord};
pub use reassembler::{lines, LineReassembler, MAX_LINE_BYTES};
