//! QWERTY adjacency and the keyboard-weighted edit distance.

use crate::types::Weight;

/// Keys physically next to `ch` on a QWERTY layout. Empty for anything that
/// is not an ASCII letter.
pub fn nearby_keys(ch: char) -> &'static [char] {
    match ch.to_ascii_lowercase() {
        'q' => &['w', 'a'],
        'w' => &['q', 'e', 'a', 's'],
        'e' => &['w', 'r', 's', 'd'],
        'r' => &['e', 't', 'd', 'f'],
        't' => &['r', 'y', 'f', 'g'],
        'y' => &['t', 'u', 'g', 'h'],
        'u' => &['y', 'i', 'h', 'j'],
        'i' => &['u', 'o', 'j', 'k'],
        'o' => &['i', 'p', 'k', 'l'],
        'p' => &['o', 'l'],
        'a' => &['q', 'w', 's', 'z'],
        's' => &['a', 'd', 'w', 'e', 'z', 'x'],
        'd' => &['s', 'f', 'e', 'r', 'x', 'c'],
        'f' => &['d', 'g', 'r', 't', 'c', 'v'],
        'g' => &['f', 'h', 't', 'y', 'v', 'b'],
        'h' => &['g', 'j', 'y', 'u', 'b', 'n'],
        'j' => &['h', 'k', 'u', 'i', 'n', 'm'],
        'k' => &['j', 'l', 'i', 'o', 'm'],
        'l' => &['k', 'o', 'p'],
        'z' => &['a', 's', 'x'],
        'x' => &['z', 'c', 's', 'd'],
        'c' => &['x', 'v', 'd', 'f'],
        'v' => &['c', 'b', 'f', 'g'],
        'b' => &['v', 'n', 'g', 'h'],
        'n' => &['b', 'm', 'h', 'j'],
        'm' => &['n', 'j', 'k'],
        _ => &[],
    }
}

/// Whether two letters are neighbouring keys.
#[inline]
pub fn is_adjacent(a: char, b: char) -> bool {
    nearby_keys(a).contains(&b.to_ascii_lowercase())
}

/// Optimal string alignment distance where substituting a neighbouring key
/// costs `adjacent_cost` instead of 1.
pub fn keyboard_distance(a: &str, b: &str, adjacent_cost: Weight) -> Weight {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();

    if a.is_empty() {
        return b.len() as Weight;
    }
    if b.is_empty() {
        return a.len() as Weight;
    }

    let width = b.len() + 1;
    let mut m = vec![0.0 as Weight; (a.len() + 1) * width];

    for i in 0..=a.len() {
        m[i * width] = i as Weight;
    }
    for j in 0..=b.len() {
        m[j] = j as Weight;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let substitution = if a[i - 1] == b[j - 1] {
                0.0
            } else if is_adjacent(a[i - 1], b[j - 1]) {
                adjacent_cost
            } else {
                1.0
            };

            let mut best = (m[(i - 1) * width + j] + 1.0)
                .min(m[i * width + j - 1] + 1.0)
                .min(m[(i - 1) * width + j - 1] + substitution);

            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(m[(i - 2) * width + j - 2] + 1.0);
            }

            m[i * width + j] = best;
        }
    }

    m[a.len() * width + b.len()]
}
