use super::sais::suffix_array;
use crate::error::{Error, Result};
use crate::tools::freq_count::freqs;
use log::{debug, trace};

/// Burrows-Wheeler-Transform of one block. Rotations are sorted lexicographically, equal
/// rotations by ascending start position.
/// Returns the row of the original block (the key) and the last column of the sorted rotations.
pub fn bwt_encode(block: &[u8]) -> (u32, Vec<u8>) {
    let n = block.len();
    if n == 0 {
        return (0, Vec::new());
    }

    /*
    Cyclic rotations are not suffixes. For a primitive string u (one that is not a power of a
    shorter string), the suffixes of uu that start inside the first copy sort exactly like the
    rotations of u, since any two rotations differ within |u| symbols. A block that is k copies
    of u has every rotation of u repeated k times in a row, all with the same last byte.
     */
    let period = primitive_period(block);
    let copies = n / period;
    let root = &block[..period];
    if copies > 1 {
        debug!("Block is {} copies of a {} byte root", copies, period);
    }

    let doubled: Vec<u32> = root.iter().chain(root).map(|&b| b as u32).collect();
    let sa = suffix_array(&doubled, 256);

    let mut key = 0_u32;
    let mut bwt = Vec::with_capacity(n);
    for (row, &start) in sa.iter().filter(|&&s| (s as usize) < period).enumerate() {
        if start == 0 {
            key = (row * copies) as u32;
        }
        let last = root[(start as usize + period - 1) % period];
        bwt.extend(std::iter::repeat(last).take(copies));
    }
    trace!("BWT key is {}", key);
    (key, bwt)
}

/// Length of the shortest u with block = u^k, from the KMP failure function.
fn primitive_period(block: &[u8]) -> usize {
    let n = block.len();
    let mut fail = vec![0_usize; n];
    let mut k = 0;
    for i in 1..n {
        while k > 0 && block[i] != block[k] {
            k = fail[k - 1];
        }
        if block[i] == block[k] {
            k += 1;
        }
        fail[i] = k;
    }
    let period = n - fail[n - 1];
    if n % period == 0 {
        period
    } else {
        n
    }
}

/// Decode a Burrows-Wheeler-Transform: count sort the first column, link each row to the row
/// that follows it in the original data, and walk the links from the key.
pub fn bwt_decode(key: u32, bwt_in: &[u8]) -> Result<Vec<u8>> {
    let end = bwt_in.len();
    if key as usize >= end {
        return Err(Error::corrupt(format!(
            "BWT origin pointer {} is outside a block of {} bytes",
            key, end
        )));
    }

    // Convert frequency count to a cumulative sum of frequencies
    let freq_in = freqs(bwt_in);
    let mut freq = [0_u32; 256];
    for i in 0..255 {
        freq[i + 1] = freq[i] + freq_in[i];
    }

    // Build the transformation vector to find the next character in the original data
    let mut t_vec = vec![0_u32; end];
    for (i, &s) in bwt_in.iter().enumerate() {
        t_vec[freq[s as usize] as usize] = i as u32;
        freq[s as usize] += 1
    }

    let mut out = Vec::with_capacity(end);
    let mut pos = t_vec[key as usize] as usize;
    for _ in 0..end {
        out.push(bwt_in[pos]);
        pos = t_vec[pos] as usize;
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Sort rotations the slow way.
    fn naive(block: &[u8]) -> (u32, Vec<u8>) {
        let n = block.len();
        let mut rots: Vec<usize> = (0..n).collect();
        rots.sort_by(|&a, &b| {
            let ra = block[a..].iter().chain(&block[..a]);
            let rb = block[b..].iter().chain(&block[..b]);
            ra.cmp(rb).then(a.cmp(&b))
        });
        let key = rots.iter().position(|&r| r == 0).unwrap_or(0) as u32;
        let bwt = rots.iter().map(|&r| block[(r + n - 1) % n]).collect();
        (key, bwt)
    }

    #[test]
    fn bwt_encode_test() {
        let (key, bwt) = bwt_encode(b"banana");
        assert_eq!(bwt, b"nnbaaa");
        assert_eq!(key, 3);
    }

    #[test]
    fn periodic_test() {
        let (key, bwt) = bwt_encode(b"ABAB");
        assert_eq!(bwt, b"BBAA");
        assert_eq!(key, 0);
        assert_eq!(bwt_encode(b"aaaa"), (0, b"aaaa".to_vec()));
    }

    #[test]
    fn empty_test() {
        assert_eq!(bwt_encode(b""), (0, vec![]));
        assert!(bwt_decode(0, b"").is_err());
    }

    #[test]
    fn bwt_decode_test() {
        let input = b"If Peter Piper picked a peck of pickled peppers, where's the peck of pickled peppers Peter Piper picked?????";
        let (key, bwt) = bwt_encode(input);
        assert_eq!(bwt_decode(key, &bwt).unwrap(), input.to_vec());
    }

    #[test]
    fn matches_naive_test() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let len = rng.gen_range(1..120);
            let top = rng.gen_range(1..4_u8);
            let mut block: Vec<u8> = (0..len).map(|_| b'a' + rng.gen_range(0..top)).collect();
            if rng.gen_bool(0.3) {
                // Make some blocks periodic
                let root = block.clone();
                for _ in 0..rng.gen_range(1..4) {
                    block.extend_from_slice(&root);
                }
            }
            let (key, bwt) = bwt_encode(&block);
            assert_eq!((key, bwt.clone()), naive(&block), "{:?}", block);
            assert_eq!(bwt_decode(key, &bwt).unwrap(), block);
        }
    }

    #[test]
    fn long_run_test() {
        let block = vec![b'x'; 200_000];
        let (key, bwt) = bwt_encode(&block);
        assert_eq!(key, 0);
        assert_eq!(bwt, block);
    }

    #[test]
    fn bad_key_test() {
        assert!(matches!(
            bwt_decode(4, b"BBAA"),
            Err(Error::CorruptStream { .. })
        ));
    }
}
