//! Via branch parameters.
//!
//! ```text
//!   z9hG4bK <hash index hex> . <label hex | md5> . <branch hex>
//! ```
//!
//! The label form (`syn_branch`) is cheaper to match; the MD5 form keeps
//! branch ids stable across restarts.

use crate::transaction::{Cell, CellId};

pub const BRANCH_MAGIC: &str = "z9hG4bK";
const BRANCH_SEPARATOR: char = '.';

/// Middle component of a branch id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchKey {
    Label(u32),
    Md5(String),
}

/// A branch parameter taken apart again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBranch {
    pub hash_index: u32,
    pub key: BranchKey,
    pub branch: usize,
}

/// Branch id for transaction `id` before its cell exists
pub fn calc_branch(id: CellId, md5: &str, branch: usize, syn_branch: bool) -> String {
    if syn_branch {
        format!(
            "{BRANCH_MAGIC}{:x}{BRANCH_SEPARATOR}{:x}{BRANCH_SEPARATOR}{:x}",
            id.hash_index, id.label, branch
        )
    } else {
        format!(
            "{BRANCH_MAGIC}{:x}{BRANCH_SEPARATOR}{}{BRANCH_SEPARATOR}{:x}",
            id.hash_index, md5, branch
        )
    }
}

/// Branch id of branch `branch` of `cell`
pub fn t_calc_branch(cell: &Cell, branch: usize, syn_branch: bool) -> String {
    calc_branch(cell.id, &cell.md5, branch, syn_branch)
}

/// Split a branch parameter built by [`calc_branch`]; foreign ids give `None`
pub fn parse_branch(param: &[u8]) -> Option<ParsedBranch> {
    let text = std::str::from_utf8(param).ok()?;
    let rest = text.strip_prefix(BRANCH_MAGIC)?;
    let mut parts = rest.split(BRANCH_SEPARATOR);
    let hash_index = u32::from_str_radix(parts.next()?, 16).ok()?;
    let middle = parts.next()?;
    let branch = usize::from_str_radix(parts.next()?, 16).ok()?;
    if parts.next().is_some() {
        return None;
    }

    let key = if middle.len() == 32 && middle.bytes().all(|c| c.is_ascii_hexdigit()) {
        BranchKey::Md5(middle.to_string())
    } else {
        BranchKey::Label(u32::from_str_radix(middle, 16).ok()?)
    };
    Some(ParsedBranch { hash_index, key, branch })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_label_form() {
        let id = CellId { hash_index: 0x1a2, label: 7 };
        let branch = calc_branch(id, MD5, 3, true);
        assert_eq!(branch, "z9hG4bK1a2.7.3");
        assert_eq!(
            parse_branch(branch.as_bytes()),
            Some(ParsedBranch { hash_index: 0x1a2, key: BranchKey::Label(7), branch: 3 })
        );
    }

    #[test]
    fn test_md5_form() {
        let id = CellId { hash_index: 5, label: 99 };
        let branch = calc_branch(id, MD5, 0, false);
        assert_eq!(branch, format!("z9hG4bK5.{MD5}.0"));
        assert_eq!(parse_branch(branch.as_bytes()).unwrap().key, BranchKey::Md5(MD5.to_string()));
    }

    #[test]
    fn test_deterministic() {
        let id = CellId { hash_index: 9, label: 1 };
        assert_eq!(calc_branch(id, MD5, 2, true), calc_branch(id, MD5, 2, true));
        assert_ne!(calc_branch(id, MD5, 2, true), calc_branch(id, MD5, 3, true));
    }

    #[test]
    fn test_foreign_branches() {
        assert_eq!(parse_branch(b"z9hG4bK776asdhds"), None);
        assert_eq!(parse_branch(b"1.2.3"), None);
        assert_eq!(parse_branch(b"z9hG4bK1.2.3.4"), None);
    }
}
