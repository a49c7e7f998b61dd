use rayon::prelude::*;

/// Inputs shorter than this are counted on the calling thread.
const PAR_THRESHOLD: usize = 64 * 1024;
/// 16k is pretty much the sweet spot for chunk size.
const CHUNK: usize = 16 * 1024;

/// Returns a byte frequency count of the input data. Uses parallelism for large inputs.
pub fn freqs(data: &[u8]) -> [u32; 256] {
    if data.len() > PAR_THRESHOLD {
        data.par_chunks(CHUNK)
            .fold(
                || [0_u32; 256],
                |mut freqs, chunk| {
                    chunk.iter().for_each(|&el| freqs[el as usize] += 1);
                    freqs
                },
            )
            .reduce(
                || [0_u32; 256],
                |mut s, f| {
                    s.iter_mut().zip(f.iter()).for_each(|(a, b)| *a += b);
                    s
                },
            )
    } else {
        let mut freqs = [0_u32; 256];
        data.iter().for_each(|&el| freqs[el as usize] += 1);
        freqs
    }
}
