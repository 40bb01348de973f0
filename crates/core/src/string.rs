//! Reference-counted rope string (C3).
//!
//! Three variants share one type: a `Leaf` owns its characters inline, a
//! `Node` is an interior concatenation of two child ropes, and a `Name` is a
//! leaf that additionally carries a declared [`ValueType`] and a `constant`
//! flag — the only string kind legal as a scope/table key for variables.
//!
//! Sharing is Rust's own `Rc`: `copy` is `Rc::clone`, `free` is `Drop`. This
//! is the natural lowering of the original's manual refcount bookkeeping
//! (ropes form a DAG, never a cycle, so `Rc` alone is sound — no tracing GC
//! needed).

use crate::value_type::ValueType;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
pub enum XString {
    Leaf {
        chars: Box<str>,
        hash: Cell<Option<u32>>,
    },
    Node {
        left: Rc<XString>,
        right: Rc<XString>,
        len: usize,
        hash: Cell<Option<u32>>,
    },
    Name {
        chars: Box<str>,
        declared_type: ValueType,
        constant: bool,
        hash: Cell<Option<u32>>,
    },
}

impl XString {
    pub fn leaf(s: &str) -> Rc<XString> {
        Rc::new(XString::Leaf {
            chars: s.into(),
            hash: Cell::new(None),
        })
    }

    pub fn name(s: &str, declared_type: ValueType, constant: bool) -> Rc<XString> {
        Rc::new(XString::Name {
            chars: s.into(),
            declared_type,
            constant,
            hash: Cell::new(None),
        })
    }

    pub fn is_name(&self) -> bool {
        matches!(self, XString::Name { .. })
    }

    pub fn declared_type(&self) -> Option<ValueType> {
        match self {
            XString::Name { declared_type, .. } => Some(*declared_type),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, XString::Name { constant: true, .. })
    }

    pub fn len(&self) -> usize {
        match self {
            XString::Leaf { chars, .. } => chars.chars().count(),
            XString::Name { chars, .. } => chars.chars().count(),
            XString::Node { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate two ropes into a new interior node. Retains both
    /// children (their `Rc` refcounts go up, matching `concat`'s contract).
    ///
    /// Fails if either side is a name string — names are scope keys, not
    /// expression values, and concatenating one is forbidden.
    pub fn concat(left: &Rc<XString>, right: &Rc<XString>) -> Result<Rc<XString>, StringError> {
        if left.is_name() || right.is_name() {
            return Err(StringError::ConcatenatedName);
        }
        let len = left.len() + right.len();
        Ok(Rc::new(XString::Node {
            left: Rc::clone(left),
            right: Rc::clone(right),
            len,
            hash: Cell::new(None),
        }))
    }

    /// Flatten a rope into a fresh leaf, copying every character once.
    pub fn deep_copy(s: &Rc<XString>) -> Rc<XString> {
        XString::leaf(&s.flatten())
    }

    /// Walk the rope and produce its logical character sequence.
    pub fn flatten(&self) -> String {
        let mut out = String::with_capacity(self.len());
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut String) {
        match self {
            XString::Leaf { chars, .. } => out.push_str(chars),
            XString::Name { chars, .. } => out.push_str(chars),
            XString::Node { left, right, .. } => {
                left.flatten_into(out);
                right.flatten_into(out);
            }
        }
    }

    /// Rope-aware lexicographic comparison, independent of tree shape.
    /// Name strings compare by raw byte comparison only (they're never
    /// built from concatenation, so there's no shape to be independent of).
    pub fn compare(a: &XString, b: &XString) -> std::cmp::Ordering {
        let mut ca = RopeCursor::new(a);
        let mut cb = RopeCursor::new(b);
        loop {
            match (ca.next(), cb.next()) {
                (None, None) => return std::cmp::Ordering::Equal,
                (None, Some(_)) => return std::cmp::Ordering::Less,
                (Some(_), None) => return std::cmp::Ordering::Greater,
                (Some(x), Some(y)) => {
                    if x != y {
                        return x.cmp(&y);
                    }
                }
            }
        }
    }

    /// FNV-1a style hash over the logical character sequence, cached on
    /// whichever node `hash_string` is called on (the "root" of that call).
    pub fn hash_string(s: &XString) -> u32 {
        let cached = match s {
            XString::Leaf { hash, .. } | XString::Name { hash, .. } | XString::Node { hash, .. } => hash,
        };
        if let Some(h) = cached.get() {
            return h;
        }
        let mut h: u32 = 0x811c_9dc5;
        for ch in RopeCursor::new(s) {
            for byte in (ch as u32).to_le_bytes() {
                h ^= byte as u32;
                h = h.wrapping_mul(0x0100_0193);
            }
        }
        cached.set(Some(h));
        h
    }
}

impl fmt::Display for XString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flatten())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringError {
    ConcatenatedName,
}

impl fmt::Display for StringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringError::ConcatenatedName => write!(f, "cannot concatenate a name string"),
        }
    }
}

impl std::error::Error for StringError {}

/// Walks a rope's logical character sequence without flattening it,
/// independent of how the rope was shaped.
struct RopeCursor<'a> {
    stack: Vec<&'a XString>,
    current: Option<std::str::Chars<'a>>,
}

impl<'a> RopeCursor<'a> {
    fn new(root: &'a XString) -> Self {
        RopeCursor {
            stack: vec![root],
            current: None,
        }
    }
}

impl<'a> Iterator for RopeCursor<'a> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if let Some(chars) = &mut self.current {
                if let Some(c) = chars.next() {
                    return Some(c);
                }
                self.current = None;
            }
            match self.stack.pop()? {
                XString::Leaf { chars, .. } => self.current = Some(chars.chars()),
                XString::Name { chars, .. } => self.current = Some(chars.chars()),
                XString::Node { left, right, .. } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rope_compare_is_shape_independent() {
        let flat = XString::leaf("foobar");
        let a = XString::leaf("foo");
        let b = XString::leaf("bar");
        let rope = XString::concat(&a, &b).unwrap();
        assert_eq!(XString::compare(&flat, &rope), std::cmp::Ordering::Equal);
        assert_eq!(flat.flatten(), rope.flatten());
    }

    #[test]
    fn concat_retains_both_children() {
        let a = XString::leaf("foo");
        let b = XString::leaf("bar");
        let rope = XString::concat(&a, &b).unwrap();
        assert_eq!(rope.flatten(), "foobar");
        assert_eq!(Rc::strong_count(&a), 2);
        assert_eq!(Rc::strong_count(&b), 2);
    }

    #[test]
    fn concat_of_name_is_forbidden() {
        let name = XString::name("x", ValueType::Integer, false);
        let leaf = XString::leaf("y");
        assert!(XString::concat(&name, &leaf).is_err());
    }

    #[test]
    fn deep_copy_flattens_to_single_leaf() {
        let a = XString::leaf("foo");
        let b = XString::leaf("bar");
        let rope = XString::concat(&a, &b).unwrap();
        let flat = XString::deep_copy(&rope);
        assert!(matches!(&*flat, XString::Leaf { .. }));
        assert_eq!(flat.flatten(), "foobar");
    }

    #[test]
    fn hash_is_cached_and_stable() {
        let s = XString::leaf("hello");
        let h1 = XString::hash_string(&s);
        let h2 = XString::hash_string(&s);
        assert_eq!(h1, h2);
    }

    #[test]
    fn names_compare_by_bytes_only() {
        let a = XString::name("abc", ValueType::Any, false);
        let b = XString::name("abd", ValueType::Any, false);
        assert_eq!(XString::compare(&a, &b), std::cmp::Ordering::Less);
    }

    use proptest::prelude::*;

    /// Build a rope out of `s` by splitting it at `cuts` (each reduced
    /// modulo the remaining length) and folding the fragments with
    /// `concat`, so the same text ends up in differently-shaped trees.
    fn rope_from_splits(s: &str, cuts: &[usize]) -> Rc<XString> {
        let chars: Vec<char> = s.chars().collect();
        if chars.is_empty() {
            return XString::leaf("");
        }
        let mut pieces: Vec<Rc<XString>> = vec![XString::leaf(s)];
        for &cut in cuts {
            if let Some(last) = pieces.pop() {
                let text = last.flatten();
                let len = text.chars().count();
                if len < 2 {
                    pieces.push(last);
                    continue;
                }
                let at = 1 + cut % (len - 1);
                let left: String = text.chars().take(at).collect();
                let right: String = text.chars().skip(at).collect();
                pieces.push(XString::leaf(&left));
                pieces.push(XString::leaf(&right));
            }
        }
        pieces
            .into_iter()
            .reduce(|l, r| XString::concat(&l, &r).unwrap())
            .unwrap()
    }

    proptest! {
        // §8: `compareStrings(a, b) == 0 <-> flatten(a) == flatten(b)`
        // regardless of how `a` and `b` were shaped.
        #[test]
        fn rope_compare_matches_flatten_equality(
            text in "[a-zA-Z]{0,24}",
            cuts_a in prop::collection::vec(0usize..24, 0..4),
            cuts_b in prop::collection::vec(0usize..24, 0..4),
        ) {
            let a = rope_from_splits(&text, &cuts_a);
            let b = rope_from_splits(&text, &cuts_b);
            prop_assert_eq!(XString::compare(&a, &b), std::cmp::Ordering::Equal);
            prop_assert_eq!(XString::hash_string(&a), XString::hash_string(&b));
        }
    }
}
