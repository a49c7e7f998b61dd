//! The bwt_algorithms module is the sorting subsystem of the engine.
//!
//! bzip2 uses the Burrows-Wheeler Transform (BWT) to prepare data for compression. This transform
//! alters the data in such a way that runs of similar bytes are more likely to occur.
//!
//! The transform needs the sorted order of every cyclic rotation of a block. That order is taken
//! from a suffix array built by induced sorting, which runs in linear time whatever the data
//! looks like, so highly repetitive blocks need no separate fallback sort.
pub mod bwt_sort;
pub mod sais;
