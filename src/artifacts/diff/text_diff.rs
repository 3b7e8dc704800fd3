//! Myers' line diff and hunk grouping
//!
//! Feeds the unified-diff text at the boundary (`diff` output and patch
//! rendering). The tree-level structural diff never needs this, it compares
//! object ids.

use std::fmt;

const HUNK_CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Eql,
    Ins,
    Del,
}

/// One output line of the edit script, tagged with its origin line numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    pub text: String,
    /// 1-based line number in the old text, absent for insertions
    pub a_line: Option<usize>,
    /// 1-based line number in the new text, absent for deletions
    pub b_line: Option<usize>,
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            EditKind::Eql => ' ',
            EditKind::Ins => '+',
            EditKind::Del => '-',
        };
        write!(f, "{}{}", tag, self.text)
    }
}

/// A run of edits around one or more changes, with three lines of context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    edits: Vec<Edit>,
}

impl Hunk {
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn a_start(&self) -> usize {
        self.edits
            .iter()
            .find_map(|edit| edit.a_line)
            .unwrap_or(0)
    }

    pub fn a_size(&self) -> usize {
        self.edits.iter().filter(|edit| edit.a_line.is_some()).count()
    }

    pub fn b_start(&self) -> usize {
        self.edits
            .iter()
            .find_map(|edit| edit.b_line)
            .unwrap_or(0)
    }

    pub fn b_size(&self) -> usize {
        self.edits.iter().filter(|edit| edit.b_line.is_some()).count()
    }

    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.a_start(),
            self.a_size(),
            self.b_start(),
            self.b_size()
        )
    }
}

/// Myers' O((N+M)D) shortest edit script between two texts, line by line
#[derive(Debug)]
pub struct MyersDiff {
    a: Vec<String>,
    b: Vec<String>,
}

impl MyersDiff {
    pub fn new(a: &str, b: &str) -> Self {
        MyersDiff {
            a: a.lines().map(str::to_string).collect(),
            b: b.lines().map(str::to_string).collect(),
        }
    }

    /// Full edit script, equal lines included
    pub fn diff(&self) -> Vec<Edit> {
        let mut edits = Vec::new();

        for (prev_x, prev_y, x, y) in self.backtrack() {
            if x == prev_x {
                edits.push(Edit {
                    kind: EditKind::Ins,
                    text: self.b[prev_y].clone(),
                    a_line: None,
                    b_line: Some(prev_y + 1),
                });
            } else if y == prev_y {
                edits.push(Edit {
                    kind: EditKind::Del,
                    text: self.a[prev_x].clone(),
                    a_line: Some(prev_x + 1),
                    b_line: None,
                });
            } else {
                edits.push(Edit {
                    kind: EditKind::Eql,
                    text: self.a[prev_x].clone(),
                    a_line: Some(prev_x + 1),
                    b_line: Some(prev_y + 1),
                });
            }
        }

        edits.reverse();
        edits
    }

    /// Edit script grouped into context hunks, equal runs elided
    pub fn flatten_diff(&self) -> Vec<Hunk> {
        Self::build_hunks(self.diff())
    }

    fn build_hunks(edits: Vec<Edit>) -> Vec<Hunk> {
        let mut hunks = Vec::new();
        let mut offset = 0;

        while offset < edits.len() {
            // find the next changed line
            let Some(change) = edits[offset..]
                .iter()
                .position(|edit| edit.kind != EditKind::Eql)
                .map(|i| offset + i)
            else {
                break;
            };

            let start = change.saturating_sub(HUNK_CONTEXT).max(offset);

            // widen until the gap to the next change exceeds twice the context
            let mut last_change = change;
            let mut cursor = change + 1;
            while cursor < edits.len() && cursor - last_change <= 2 * HUNK_CONTEXT {
                if edits[cursor].kind != EditKind::Eql {
                    last_change = cursor;
                }
                cursor += 1;
            }

            let end = (last_change + HUNK_CONTEXT + 1).min(edits.len());
            hunks.push(Hunk {
                edits: edits[start..end].to_vec(),
            });
            offset = end;
        }

        hunks
    }

    /// Moves of the shortest edit path, recorded tip-to-origin
    fn backtrack(&self) -> Vec<(usize, usize, usize, usize)> {
        let n = self.a.len() as isize;
        let m = self.b.len() as isize;
        let max = n + m;
        let idx = |k: isize| (k + max) as usize;

        let mut v = vec![0isize; (2 * max + 1).max(1) as usize];
        let mut trace: Vec<Vec<isize>> = Vec::new();

        'outer: for d in 0..=max {
            trace.push(v.clone());

            let mut k = -d;
            while k <= d {
                let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                    v[idx(k + 1)]
                } else {
                    v[idx(k - 1)] + 1
                };
                let mut y = x - k;

                while x < n && y < m && self.a[x as usize] == self.b[y as usize] {
                    x += 1;
                    y += 1;
                }

                v[idx(k)] = x;

                if x >= n && y >= m {
                    break 'outer;
                }

                k += 2;
            }
        }

        let mut moves = Vec::new();
        let (mut x, mut y) = (n, m);

        for (d, v) in trace.iter().enumerate().rev() {
            let d = d as isize;
            let k = x - y;

            let prev_k = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                k + 1
            } else {
                k - 1
            };
            let prev_x = v[idx(prev_k)];
            let prev_y = prev_x - prev_k;

            while x > prev_x && y > prev_y {
                moves.push(((x - 1) as usize, (y - 1) as usize, x as usize, y as usize));
                x -= 1;
                y -= 1;
            }

            if d > 0 {
                moves.push((prev_x as usize, prev_y as usize, x as usize, y as usize));
            }

            x = prev_x;
            y = prev_y;
        }

        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(edits: &[Edit]) -> Vec<String> {
        edits.iter().map(Edit::to_string).collect()
    }

    #[test]
    fn identical_texts_produce_no_hunks() {
        let diff = MyersDiff::new("a\nb\nc", "a\nb\nc");
        assert!(diff.flatten_diff().is_empty());
    }

    #[test]
    fn classic_myers_example() {
        let diff = MyersDiff::new("A\nB\nC\nA\nB\nB\nA", "C\nB\nA\nB\nA\nC");
        let edits = diff.diff();

        // the script replays a into b
        let replayed: Vec<&str> = edits
            .iter()
            .filter(|e| e.kind != EditKind::Del)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(replayed, vec!["C", "B", "A", "B", "A", "C"]);

        let deletions = edits.iter().filter(|e| e.kind == EditKind::Del).count();
        let insertions = edits.iter().filter(|e| e.kind == EditKind::Ins).count();
        assert_eq!(deletions + insertions, 5); // minimal script for this pair
    }

    #[test]
    fn single_line_change_gets_three_lines_of_context() {
        let a = "1\n2\n3\n4\n5\n6\n7\n8\n9";
        let b = "1\n2\n3\n4\nfive\n6\n7\n8\n9";
        let hunks = MyersDiff::new(a, b).flatten_diff();

        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!(hunk.header(), "@@ -2,7 +2,7 @@");
        assert_eq!(
            render(hunk.edits()),
            vec![" 2", " 3", " 4", "-5", "+five", " 6", " 7", " 8"]
        );
    }

    #[test]
    fn distant_changes_split_into_separate_hunks() {
        let a = (1..=30).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let b = a.replace("\n5\n", "\nfive\n").replace("\n25\n", "\ntwenty-five\n");
        let hunks = MyersDiff::new(&a, &b).flatten_diff();

        assert_eq!(hunks.len(), 2);
        assert!(render(hunks[0].edits()).contains(&"+five".to_string()));
        assert!(render(hunks[1].edits()).contains(&"+twenty-five".to_string()));
    }

    #[test]
    fn addition_to_empty_text_is_all_insertions() {
        let hunks = MyersDiff::new("", "x\ny").flatten_diff();

        assert_eq!(hunks.len(), 1);
        assert_eq!(render(hunks[0].edits()), vec!["+x", "+y"]);
        assert_eq!(hunks[0].a_size(), 0);
        assert_eq!(hunks[0].b_size(), 2);
    }
}
