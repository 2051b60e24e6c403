//! Splitting text into service-sized chunks and joining the results back.

mod chunk;
mod reassemble;

pub use chunk::{TextChunk, chunk};
pub use reassemble::{CHUNK_SEPARATOR, reassemble};
