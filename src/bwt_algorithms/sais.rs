//! Suffix array construction by induced sorting (SA-IS).
//!
//! The end of the text is treated as a virtual sentinel that sorts before every symbol, so the
//! text needs no extra slot. Instead of recursing on the reduced problem, each level is pushed
//! on an explicit stack and finished on the way back up, so deep reductions (long runs of a
//! single byte, for instance) cannot exhaust the call stack.

use log::trace;

const EMPTY: u32 = u32::MAX;

/// One pending reduction level.
struct Level {
    text: Vec<u32>,
    alphabet: usize,
    stype: Vec<bool>,
    lms: Vec<u32>,
}

/// Returns the suffix array of `text`, whose symbols must all be below `alphabet`.
pub fn suffix_array(text: &[u32], alphabet: usize) -> Vec<u32> {
    let mut stack: Vec<Level> = Vec::new();
    let mut text = text.to_vec();
    let mut alphabet = alphabet;

    // Reduce until the LMS substrings all have unique names.
    let mut sa = loop {
        let n = text.len();
        if n < 2 {
            break (0..n as u32).collect::<Vec<u32>>();
        }
        let stype = classify(&text);
        let lms: Vec<u32> = (1..n)
            .filter(|&i| stype[i] && !stype[i - 1])
            .map(|i| i as u32)
            .collect();

        // Sort the LMS substrings by inducing from the LMS positions in text order.
        let mut sa = vec![EMPTY; n];
        induce(&text, alphabet, &stype, &lms, &mut sa);

        let (reduced, names) = name_lms(&text, &stype, &sa, &lms);
        trace!(
            "SA-IS level {}: {} symbols, {} LMS, {} names",
            stack.len(),
            n,
            lms.len(),
            names
        );

        if names == lms.len() {
            // Every LMS suffix is already ordered by its substring name.
            let mut sa1 = vec![0_u32; lms.len()];
            reduced
                .iter()
                .enumerate()
                .for_each(|(i, &name)| sa1[name as usize] = i as u32);
            break finish(&text, alphabet, &stype, &lms, &sa1);
        }
        stack.push(Level {
            text,
            alphabet,
            stype,
            lms,
        });
        text = reduced;
        alphabet = names;
    };

    while let Some(level) = stack.pop() {
        sa = finish(&level.text, level.alphabet, &level.stype, &level.lms, &sa);
    }
    sa
}

/// S-type (true) / L-type (false) for each position. The last position is always L, since the
/// sentinel after it is smaller.
fn classify(text: &[u32]) -> Vec<bool> {
    let n = text.len();
    let mut stype = vec![false; n];
    for i in (0..n - 1).rev() {
        stype[i] = text[i] < text[i + 1] || (text[i] == text[i + 1] && stype[i + 1]);
    }
    stype
}

#[inline]
fn is_lms(stype: &[bool], i: usize) -> bool {
    i > 0 && stype[i] && !stype[i - 1]
}

/// Bucket start positions for each symbol.
fn bucket_starts(text: &[u32], alphabet: usize) -> Vec<u32> {
    let mut counts = vec![0_u32; alphabet + 1];
    text.iter().for_each(|&c| counts[c as usize + 1] += 1);
    for c in 1..=alphabet {
        counts[c] += counts[c - 1];
    }
    counts.truncate(alphabet);
    counts
}

/// Bucket end positions (exclusive) for each symbol.
fn bucket_ends(text: &[u32], alphabet: usize) -> Vec<u32> {
    let mut counts = vec![0_u32; alphabet];
    text.iter().for_each(|&c| counts[c as usize] += 1);
    for c in 1..alphabet {
        counts[c] += counts[c - 1];
    }
    counts
}

/// Place the LMS suffixes (in the order given) at their bucket ends, then induce the L-type
/// suffixes left to right and the S-type suffixes right to left.
fn induce(text: &[u32], alphabet: usize, stype: &[bool], lms: &[u32], sa: &mut [u32]) {
    let n = text.len();
    sa.fill(EMPTY);

    let mut tails = bucket_ends(text, alphabet);
    for &p in lms.iter().rev() {
        let c = text[p as usize] as usize;
        tails[c] -= 1;
        sa[tails[c] as usize] = p;
    }

    let mut heads = bucket_starts(text, alphabet);
    // The sentinel sorts first, and the suffix before it is L-type.
    let c = text[n - 1] as usize;
    sa[heads[c] as usize] = (n - 1) as u32;
    heads[c] += 1;
    for i in 0..n {
        let p = sa[i];
        if p != EMPTY && p > 0 {
            let j = p as usize - 1;
            if !stype[j] {
                let c = text[j] as usize;
                sa[heads[c] as usize] = j as u32;
                heads[c] += 1;
            }
        }
    }

    let mut tails = bucket_ends(text, alphabet);
    for i in (0..n).rev() {
        let p = sa[i];
        if p != EMPTY && p > 0 {
            let j = p as usize - 1;
            if stype[j] {
                let c = text[j] as usize;
                tails[c] -= 1;
                sa[tails[c] as usize] = j as u32;
            }
        }
    }
}

/// Name the LMS substrings in sorted order. Returns the reduced string (names in text order)
/// and the number of distinct names.
fn name_lms(text: &[u32], stype: &[bool], sa: &[u32], lms: &[u32]) -> (Vec<u32>, usize) {
    let mut names = vec![EMPTY; text.len()];
    let mut name = 0_u32;
    let mut prev: Option<usize> = None;
    for &p in sa.iter().filter(|&&p| p != EMPTY && is_lms(stype, p as usize)) {
        let p = p as usize;
        if let Some(q) = prev {
            if !lms_equal(text, stype, q, p) {
                name += 1;
            }
        }
        names[p] = name;
        prev = Some(p);
    }
    let count = if prev.is_some() { name as usize + 1 } else { 0 };
    let reduced = lms.iter().map(|&p| names[p as usize]).collect();
    (reduced, count)
}

/// Compare the LMS substrings starting at `a` and `b`.
fn lms_equal(text: &[u32], stype: &[bool], a: usize, b: usize) -> bool {
    let n = text.len();
    let mut d = 0;
    loop {
        // Only one substring can run into the sentinel.
        if a + d == n || b + d == n {
            return false;
        }
        if text[a + d] != text[b + d] || stype[a + d] != stype[b + d] {
            return false;
        }
        if d > 0 {
            let a_end = is_lms(stype, a + d);
            let b_end = is_lms(stype, b + d);
            if a_end && b_end {
                return true;
            }
            if a_end != b_end {
                return false;
            }
        }
        d += 1;
    }
}

/// Complete one level: order the LMS suffixes by the reduced suffix array and induce the rest.
fn finish(text: &[u32], alphabet: usize, stype: &[bool], lms: &[u32], sa1: &[u32]) -> Vec<u32> {
    let sorted: Vec<u32> = sa1.iter().map(|&i| lms[i as usize]).collect();
    let mut sa = vec![EMPTY; text.len()];
    induce(text, alphabet, stype, &sorted, &mut sa);
    sa
}

#[cfg(test)]
mod test {
    use super::suffix_array;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn naive(text: &[u32]) -> Vec<u32> {
        let mut sa: Vec<u32> = (0..text.len() as u32).collect();
        sa.sort_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));
        sa
    }

    fn bytes(s: &str) -> Vec<u32> {
        s.bytes().map(|b| b as u32).collect()
    }

    #[test]
    fn banana_test() {
        assert_eq!(suffix_array(&bytes("banana"), 256), vec![5, 3, 1, 0, 4, 2]);
    }

    #[test]
    fn tiny_test() {
        assert_eq!(suffix_array(&[], 256), Vec::<u32>::new());
        assert_eq!(suffix_array(&[7], 256), vec![0]);
        assert_eq!(suffix_array(&bytes("ab"), 256), vec![0, 1]);
        assert_eq!(suffix_array(&bytes("ba"), 256), vec![1, 0]);
    }

    #[test]
    fn repetitive_test() {
        for s in [
            "mississippi",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "abababababababababab",
            "abcabcabcabcabcabcab",
            "aabaabaabaabaabaaba",
        ] {
            let t = bytes(s);
            assert_eq!(suffix_array(&t, 256), naive(&t), "{}", s);
        }
    }

    #[test]
    fn long_run_test() {
        let t = vec![3_u32; 100_000];
        let sa = suffix_array(&t, 4);
        assert_eq!(sa[0], 99_999);
        assert_eq!(sa[99_999], 0);
    }

    #[test]
    fn random_test() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let len = rng.gen_range(1..400);
            let alphabet = rng.gen_range(1..5);
            let t: Vec<u32> = (0..len).map(|_| rng.gen_range(0..alphabet)).collect();
            assert_eq!(suffix_array(&t, alphabet as usize), naive(&t));
        }
    }
}
