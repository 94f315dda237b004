//! Identifier spelling heuristics.
//!
//! The lifter names variables, statements and blocks with single-letter
//! prefixes (`V12`, `S12`, `B0x3f`) and derives merged/cloned names by
//! appending `_<suffix>`. None of this is structural information the CFG
//! preserves, so everything here is textual.

/// Length of the window used when comparing identifiers of unequal length.
pub const PHI_WINDOW: usize = 6;

/// The statement spelling of a variable: a storage-load result `V12` is
/// recorded by the storage analysis under its load statement `S12`.
pub fn statement_spelling(var: &str) -> String {
    var.replace('V', "S")
}

/// The part of `var` before its first `_`, if it has one.
pub fn base_name(var: &str) -> Option<&str> {
    var.split_once('_').map(|(base, _)| base)
}

/// Strip the `V`/`B`/`S` kind markers so identifiers of different kinds can be
/// ordered against each other.
pub fn strip_kind_markers(id: &str) -> String {
    id.chars().filter(|c| !matches!(c, 'V' | 'B' | 'S')).collect()
}

/// Which side of a two-way join an operand belongs to, judged by comparing its
/// (stripped) originating id against the (stripped) id of the second
/// predecessor. Returns `true` for the first predecessor.
///
/// Ids of equal length compare directly. When lengths differ, the shorter one
/// is compared against a [`PHI_WINDOW`]-character window of the longer one:
/// the trailing window of a longer predecessor id, the leading window of a
/// longer operand id.
pub fn precedes_second_pred(operand_origin: &str, second_pred: &str) -> bool {
    let a = strip_kind_markers(operand_origin);
    let b = strip_kind_markers(second_pred);
    let (a_len, b_len) = (a.chars().count(), b.chars().count());

    if a_len == b_len {
        a < b
    } else if a_len < b_len {
        a.as_str() < tail(&b, PHI_WINDOW)
    } else {
        head(&a, PHI_WINDOW) < b.as_str()
    }
}

fn head(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn tail(s: &str, n: usize) -> &str {
    let len = s.chars().count();
    if len <= n {
        return s;
    }
    match s.char_indices().nth(len - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
