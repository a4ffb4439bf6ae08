//! `@extend` resolution.
//!
//! For each compound in a selector, every extension whose target is a subset
//! of the compound is unified with the rest of the compound. The extending
//! selector's ancestors are then woven together with the original selector's
//! ancestors into every ordering consistent with both. Extensions apply
//! transitively; a set of already-applied targets stops cycles.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexSet;

use crate::subset_map::SubsetMap;

use super::{Combinator, CommaSequence, SeqMember, Sequence, Simple, SimpleSequence};

/// Extensions keyed by target simples, valued by the extending selector.
pub type ExtendMap = SubsetMap<Simple, Sequence>;

/// A run of compounds glued together by explicit combinators.
type Group = Vec<SeqMember>;

impl CommaSequence {
    /// Apply every extension in `extends` to this selector list.
    ///
    /// Insertion indices of the extensions that matched are added to
    /// `matched`. The result contains no duplicate sequences.
    pub fn do_extend(&self, extends: &ExtendMap, matched: &mut HashSet<usize>) -> CommaSequence {
        let mut members = IndexSet::new();
        for seq in &self.members {
            members.extend(seq.do_extend(extends, &HashSet::new(), matched));
        }
        CommaSequence::new(members.into_iter().collect())
    }
}

impl Sequence {
    fn do_extend(
        &self,
        extends: &ExtendMap,
        seen: &HashSet<usize>,
        matched: &mut HashSet<usize>,
    ) -> Vec<Sequence> {
        let choices: Vec<Vec<Vec<SeqMember>>> = self
            .members
            .iter()
            .map(|member| {
                let SeqMember::Compound(compound) = member else {
                    return vec![vec![member.clone()]];
                };
                let extended = compound.do_extend(extends, seen, matched);
                let keep_original = !extended.iter().any(|seq| seq.is_superselector(compound));
                let mut options: Vec<Vec<SeqMember>> =
                    extended.into_iter().map(|seq| seq.members).collect();
                if keep_original {
                    options.insert(0, vec![member.clone()]);
                }
                options
            })
            .collect();

        let mut result = Vec::new();
        for path in paths(&choices) {
            for woven in weave(&path) {
                let seq = Sequence::new(woven);
                if !result.contains(&seq) {
                    result.push(seq);
                }
            }
        }
        result
    }
}

impl SimpleSequence {
    fn do_extend(
        &self,
        extends: &ExtendMap,
        seen: &HashSet<usize>,
        matched: &mut HashSet<usize>,
    ) -> Vec<Sequence> {
        let members = self.members();
        let mut result = Vec::new();
        for hit in extends.get(&members) {
            matched.insert(hit.index);
            let remaining: Vec<Simple> = members
                .iter()
                .filter(|simple| !hit.key.contains(*simple))
                .cloned()
                .collect();
            let Some((SeqMember::Compound(last), init)) = hit.value.members.split_last() else {
                continue;
            };
            let Some(unified) = last.unify(&remaining) else {
                continue;
            };
            if seen.contains(&hit.key_id) {
                continue;
            }
            log::trace!(target_set:? = hit.key, extender:% = hit.value; "Applying extension");

            let mut extended_members = init.to_vec();
            extended_members.push(SeqMember::Compound(unified));
            let mut next_seen = seen.clone();
            next_seen.insert(hit.key_id);
            for seq in Sequence::new(extended_members).do_extend(extends, &next_seen, matched) {
                if !result.contains(&seq) {
                    result.push(seq);
                }
            }
        }
        result
    }
}

/// Every way of picking one element from each list, earlier lists varying
/// fastest.
pub fn paths<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    lists.iter().fold(vec![Vec::new()], |acc, list| {
        list.iter()
            .flat_map(|item| {
                acc.iter().map(move |path| {
                    let mut path = path.clone();
                    path.push(item.clone());
                    path
                })
            })
            .collect()
    })
}

/// Longest common subsequence of `x` and `y`.
///
/// `select` decides whether two elements match and which value to keep.
pub fn lcs<T: Clone>(x: &[T], y: &[T], select: impl Fn(&T, &T) -> Option<T>) -> Vec<T> {
    let (n, m) = (x.len(), y.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            table[i][j] = if select(&x[i - 1], &y[j - 1]).is_some() {
                table[i - 1][j - 1] + 1
            } else {
                table[i][j - 1].max(table[i - 1][j])
            };
        }
    }

    let mut result = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        if let Some(value) = select(&x[i - 1], &y[j - 1]) {
            result.push(value);
            i -= 1;
            j -= 1;
        } else if table[i][j - 1] > table[i - 1][j] {
            j -= 1;
        } else {
            i -= 1;
        }
    }
    result.reverse();
    result
}

/// Merge a path of sequences so each one's last compound is kept in place
/// and everything before it is interleaved with the accumulated prefix.
fn weave(path: &[Vec<SeqMember>]) -> Vec<Vec<SeqMember>> {
    let mut befores: Vec<Vec<SeqMember>> = vec![Vec::new()];
    for current in path {
        let Some((last, init)) = current.split_last() else {
            continue;
        };
        let mut next = Vec::new();
        for before in &befores {
            for mut woven in subweave(before, init) {
                woven.push(last.clone());
                next.push(woven);
            }
        }
        befores = next;
    }
    befores
}

/// Every interleaving of two selector chains that keeps each chain's order.
fn subweave(seq1: &[SeqMember], seq2: &[SeqMember]) -> Vec<Vec<SeqMember>> {
    if seq1.is_empty() {
        return vec![seq2.to_vec()];
    }
    if seq2.is_empty() {
        return vec![seq1.to_vec()];
    }
    let mut groups1: VecDeque<Group> = group_selectors(seq1).into();
    let mut groups2: VecDeque<Group> = group_selectors(seq2).into();

    let common = lcs(
        groups2.make_contiguous(),
        groups1.make_contiguous(),
        |g1, g2| {
            if g1 == g2 {
                return Some(g1.clone());
            }
            if g1.first()?.as_compound().is_none() || g2.first()?.as_compound().is_none() {
                return None;
            }
            if group_superselector(g1, g2) {
                Some(g2.clone())
            } else if group_superselector(g2, g1) {
                Some(g1.clone())
            } else {
                None
            }
        },
    );

    let mut diff: Vec<Vec<Vec<Group>>> = Vec::new();
    for head in common {
        diff.push(chunks(&mut groups1, &mut groups2, |rest| {
            rest.front()
                .is_none_or(|group| group_superselector(group, &head))
        }));
        diff.push(vec![vec![head]]);
        groups1.pop_front();
        groups2.pop_front();
    }
    diff.push(chunks(&mut groups1, &mut groups2, VecDeque::is_empty));
    diff.retain(|alternatives| !alternatives.is_empty());

    paths(&diff)
        .into_iter()
        .map(|path| path.into_iter().flatten().flatten().collect())
        .collect()
}

/// Split off the prefixes of both chains that come before `done` holds, and
/// return both orderings of the two prefixes.
fn chunks(
    seq1: &mut VecDeque<Group>,
    seq2: &mut VecDeque<Group>,
    done: impl Fn(&VecDeque<Group>) -> bool,
) -> Vec<Vec<Group>> {
    let mut chunk1 = Vec::new();
    while !done(seq1) {
        match seq1.pop_front() {
            Some(group) => chunk1.push(group),
            None => break,
        }
    }
    let mut chunk2 = Vec::new();
    while !done(seq2) {
        match seq2.pop_front() {
            Some(group) => chunk2.push(group),
            None => break,
        }
    }
    match (chunk1.is_empty(), chunk2.is_empty()) {
        (true, true) => Vec::new(),
        (true, false) => vec![chunk2],
        (false, true) => vec![chunk1],
        (false, false) => {
            let forward = chunk1.iter().chain(&chunk2).cloned().collect();
            let backward = chunk2.into_iter().chain(chunk1).collect();
            vec![forward, backward]
        }
    }
}

/// Group compounds that are joined by explicit combinators.
fn group_selectors(seq: &[SeqMember]) -> Vec<Group> {
    let mut groups = Vec::new();
    let mut tail: VecDeque<SeqMember> = seq.iter().cloned().collect();
    while let Some(first) = tail.pop_front() {
        let mut head = vec![first];
        loop {
            let last_is_combinator = head.last().is_some_and(|m| m.as_combinator().is_some());
            let next_is_combinator = tail.front().is_some_and(|m| m.as_combinator().is_some());
            if tail.is_empty() || !(last_is_combinator || next_is_combinator) {
                break;
            }
            if let Some(member) = tail.pop_front() {
                head.push(member);
            }
        }
        groups.push(head);
    }
    groups
}

fn compound_at(group: &[SeqMember], index: usize) -> Option<&SimpleSequence> {
    group.get(index).and_then(SeqMember::as_compound)
}

fn combinator_at(group: &[SeqMember], index: usize) -> Option<Combinator> {
    group.get(index).and_then(SeqMember::as_combinator)
}

/// Whether group `g1` matches everything group `g2` matches.
fn group_superselector(g1: &[SeqMember], g2: &[SeqMember]) -> bool {
    let (Some(first1), Some(first2)) = (compound_at(g1, 0), compound_at(g2, 0)) else {
        return false;
    };
    if g1.len() > 1 {
        if g2.len() <= 1 {
            return false;
        }
        let (c1, c2) = (combinator_at(g1, 1), combinator_at(g2, 1));
        let compatible = if c1 == Some(Combinator::FollowingSibling) {
            c2 != Some(Combinator::Child)
        } else {
            c1 == c2
        };
        if !compatible || !first1.is_superselector(first2) {
            return false;
        }
        if g1.len() == 2 {
            return true;
        }
        if g2.len() == 2 {
            return false;
        }
        group_superselector(&g1[2..], &g2[2..])
    } else if g2.len() > 1 {
        if combinator_at(g2, 1) == Some(Combinator::Child) && first1.is_superselector(first2) {
            return true;
        }
        if g2.len() == 2 {
            return false;
        }
        group_superselector(g1, &g2[2..])
    } else {
        first1.is_superselector(first2)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::style::OutputStyle;

    fn single(name: &str) -> Sequence {
        seq(vec![compound(vec![class(name)])])
    }

    fn extend_css(selector: &CommaSequence, extends: &ExtendMap) -> String {
        let mut matched = HashSet::new();
        selector
            .do_extend(extends, &mut matched)
            .to_css(OutputStyle::Nested)
    }

    #[test]
    fn test_paths() {
        let result = paths(&[vec![1, 2], vec![3, 4], vec![5]]);
        assert_eq!(
            result,
            vec![vec![1, 3, 5], vec![2, 3, 5], vec![1, 4, 5], vec![2, 4, 5]]
        );
    }

    #[test]
    fn test_lcs() {
        let x: Vec<char> = "ABCBDAB".chars().collect();
        let y: Vec<char> = "BDCABA".chars().collect();
        let result: String = lcs(&x, &y, |a, b| (a == b).then_some(*a)).into_iter().collect();
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_simple_extend() {
        let mut extends = ExtendMap::new();
        extends.insert([class("a")], single("b"));
        let selector = CommaSequence::new(vec![single("a")]);
        assert_eq!(extend_css(&selector, &extends), ".a, .b");
    }

    #[test]
    fn test_extend_unifies_compound() {
        let mut extends = ExtendMap::new();
        extends.insert([class("a")], single("b"));
        let selector = CommaSequence::new(vec![seq(vec![compound(vec![
            element("p"),
            class("a"),
        ])])]);
        assert_eq!(extend_css(&selector, &extends), "p.a, p.b");
    }

    #[test]
    fn test_extend_weaves_descendants() {
        let mut extends = ExtendMap::new();
        extends.insert(
            [class("a")],
            seq(vec![compound(vec![class("x")]), compound(vec![class("b")])]),
        );
        let selector = CommaSequence::new(vec![seq(vec![
            compound(vec![class("y")]),
            compound(vec![class("a")]),
        ])]);
        assert_eq!(
            extend_css(&selector, &extends),
            ".y .a, .y .x .b, .x .y .b"
        );
    }

    #[test]
    fn test_conflicting_ids_drop_extension() {
        let mut extends = ExtendMap::new();
        extends.insert(
            [class("a")],
            seq(vec![compound(vec![Simple::Id("x".to_string())])]),
        );
        let selector = CommaSequence::new(vec![seq(vec![compound(vec![
            Simple::Id("y".to_string()),
            class("a"),
        ])])]);
        assert_eq!(extend_css(&selector, &extends), "#y.a");
    }

    #[test]
    fn test_mutual_extension_terminates() {
        let mut extends = ExtendMap::new();
        extends.insert([class("a")], single("b"));
        extends.insert([class("b")], single("a"));
        let selector = CommaSequence::new(vec![single("a")]);
        // `.a` is already covered by the extended result, so it is not repeated.
        assert_eq!(extend_css(&selector, &extends), ".b, .a");
    }

    #[test]
    fn test_matched_records_indices() {
        let mut extends = ExtendMap::new();
        extends.insert([class("a")], single("b"));
        extends.insert([class("missing")], single("c"));
        let selector = CommaSequence::new(vec![single("a")]);
        let mut matched = HashSet::new();
        selector.do_extend(&extends, &mut matched);
        assert!(matched.contains(&0));
        assert!(!matched.contains(&1));
    }
}
