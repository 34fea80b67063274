use super::normalize::normalize;

/// Resemblance of two strings in `[0, 1]`, compared on their normalized forms.
///
/// Ratcliff/Obershelp gestalt ratio: twice the number of characters covered by
/// recursively found longest common blocks, over the combined length. Equal
/// normalized forms score 1.0; an empty side scores 0.0. The block search is
/// run in both directions and the larger count kept, so the score does not
/// depend on argument order.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let matched = matching_chars(&a, &b).max(matching_chars(&b, &a));
    (2 * matched) as f64 / (a.len() + b.len()) as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_block(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Longest common block inside `a[alo..ahi]` and `b[blo..bhi]`, as
/// `(start_in_a, start_in_b, len)`. Ties go to the earliest start in `a`,
/// then in `b`.
fn longest_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0);
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            if a[i] == b[j] {
                let k = prev[col - 1] + 1;
                cur[col] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            } else {
                cur[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_and_empty() {
        assert_eq!(similarity("Feu", "Feu"), 1.0);
        assert_eq!(similarity("Anéantir", "ANEANTIR"), 1.0);
        assert_eq!(similarity("", "Feu"), 0.0);
        assert_eq!(similarity("Feu", "   "), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_gestalt_ratio_values() {
        // "abcd" / "bcde": one block "bcd" -> 2*3/8
        assert!(close(similarity("abcd", "bcde"), 0.75));
        // no common character
        assert_eq!(similarity("abc", "xyz"), 0.0);
        // "houllebeck" vs "michel houellebecq": blocks "hou" + "llebec" -> 18/28
        assert!(close(
            similarity("Houllebeck", "Michel Houellebecq"),
            18.0 / 28.0
        ));
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("Houllebeck", "Michel Houellebecq"),
            ("abxcd", "abcd"),
            ("tante alice enquete", "les annees de plomb"),
            ("Maria Pourchet", "Pourchet Maria"),
            ("aaab", "abaa"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a), "{a:?} / {b:?}");
        }
    }

    #[test]
    fn test_score_in_unit_interval() {
        let s = similarity("Le Mage du Kremlin", "Le Mage du Kremlin (Grand prix)");
        assert!(s > 0.7 && s < 1.0);
    }
}
