//! Natural ordering for file names.
//!
//! Runs of ASCII digits compare by numeric value, everything else compares
//! by character, so `scan_2` sorts before `scan_10`.

use std::cmp::Ordering;
use std::path::Path;

/// Compare two strings in natural order.
///
/// Ties under the natural rule (e.g. `a01` vs `a1`) fall back to plain
/// string comparison so the order is total and deterministic.
pub fn compare(a: &str, b: &str) -> Ordering {
    let mut left = Segments::new(a);
    let mut right = Segments::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_segment(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Sort paths in place by the natural order of their file names.
pub fn sort_paths<P: AsRef<Path>>(paths: &mut [P]) {
    paths.sort_by(|a, b| compare(&name_of(a.as_ref()), &name_of(b.as_ref())));
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn compare_segment(x: Segment<'_>, y: Segment<'_>) -> Ordering {
    match (x, y) {
        (Segment::Digits(a), Segment::Digits(b)) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        // Numbers sort ahead of text at the same position.
        (Segment::Digits(_), Segment::Text(_)) => Ordering::Less,
        (Segment::Text(_), Segment::Digits(_)) => Ordering::Greater,
        (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
    }
}

struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(if digits {
            Segment::Digits(head)
        } else {
            Segment::Text(head)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut names: Vec<&str>) -> Vec<&str> {
        names.sort_by(|a, b| compare(a, b));
        names
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(
            sorted(vec!["scan_10.png", "scan_2.png", "scan_1.png"]),
            vec!["scan_1.png", "scan_2.png", "scan_10.png"]
        );
    }

    #[test]
    fn leading_zeros_tie_break_deterministically() {
        assert_eq!(compare("a01", "a1"), "a01".cmp("a1"));
        assert_eq!(compare("a001", "a2"), Ordering::Less);
    }

    #[test]
    fn timestamp_prefixes_sort_chronologically() {
        assert_eq!(
            sorted(vec![
                "2023-05-01_14-30-00_b.json",
                "2023-04-30_09-00-00_a.json",
                "2023-05-01_09-05-00_c.json",
            ]),
            vec![
                "2023-04-30_09-00-00_a.json",
                "2023-05-01_09-05-00_c.json",
                "2023-05-01_14-30-00_b.json",
            ]
        );
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(compare("page", "page2"), Ordering::Less);
        assert_eq!(compare("", "a"), Ordering::Less);
    }

    #[test]
    fn very_long_numbers_do_not_overflow() {
        let big = "x99999999999999999999999999999";
        let bigger = "x100000000000000000000000000000";
        assert_eq!(compare(big, bigger), Ordering::Less);
    }

    #[test]
    fn sorts_paths_by_file_name() {
        let mut paths = vec![
            std::path::PathBuf::from("/z/img10.jpg"),
            std::path::PathBuf::from("/a/img9.jpg"),
        ];
        sort_paths(&mut paths);
        assert_eq!(paths[0].file_name().unwrap(), "img9.jpg");
    }
}
