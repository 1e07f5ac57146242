//! Tree data model: leaves, nodes and ordered submappings.
//!
//! A node is either a leaf value or a submapping. Whether something is a
//! subtree is decided by the variant, never by inspecting a value's shape.

use std::fmt;

use indexmap::IndexMap;


/// Insertion-ordered mapping from key to node. Keys are unique.
pub type Submapping = IndexMap<String, Node>;


/// A scalar (or opaque list) value stored at a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Sequences are stored whole; their elements are not addressable
    /// as branches.
    List(Vec<Node>),
}

impl Leaf {
    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Leaf::Null)
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Leaf::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is one. Floats are not truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Leaf::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats as-is, integers widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Leaf::Float(f) => Some(*f),
            Leaf::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The text, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Leaf::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The list items, if this is a list.
    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Leaf::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Null => f.write_str("null"),
            Leaf::Bool(b) => write!(f, "{}", b),
            Leaf::Int(i) => write!(f, "{}", i),
            Leaf::Float(x) => write!(f, "{}", x),
            Leaf::Text(s) => f.write_str(s),
            Leaf::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Node::Leaf(leaf) => write!(f, "{}", leaf)?,
                        Node::Map(map) => write!(f, "{{{} keys}}", map.len())?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}


/// Either a leaf value or a nested submapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Leaf),
    Map(Submapping),
}

impl Node {
    /// True for a submapping.
    pub fn is_map(&self) -> bool {
        matches!(self, Node::Map(_))
    }

    /// The leaf, unless this is a submapping.
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Map(_) => None,
        }
    }

    /// The submapping, unless this is a leaf.
    pub fn as_map(&self) -> Option<&Submapping> {
        match self {
            Node::Map(map) => Some(map),
            Node::Leaf(_) => None,
        }
    }

    /// Mutable form of [`Node::as_map`].
    pub fn as_map_mut(&mut self) -> Option<&mut Submapping> {
        match self {
            Node::Map(map) => Some(map),
            Node::Leaf(_) => None,
        }
    }

    /// Empty submapping, the shape of a freshly created branch.
    pub fn empty_map() -> Self {
        Node::Map(Submapping::new())
    }
}


// ---------------------------------------------------------------------------
// Conversions. Numeric-like inputs normalize to Int / Float.
// ---------------------------------------------------------------------------

macro_rules! int_leaf {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Leaf {
                fn from(v: $t) -> Self {
                    Leaf::Int(i64::from(v))
                }
            }
        )*
    };
}

int_leaf!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Leaf {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Leaf::Int(i),
            Err(_) => Leaf::Float(v as f64),
        }
    }
}

impl From<usize> for Leaf {
    fn from(v: usize) -> Self {
        Leaf::from(v as u64)
    }
}

impl From<f32> for Leaf {
    fn from(v: f32) -> Self {
        Leaf::Float(f64::from(v))
    }
}

impl From<f64> for Leaf {
    fn from(v: f64) -> Self {
        Leaf::Float(v)
    }
}

impl From<bool> for Leaf {
    fn from(v: bool) -> Self {
        Leaf::Bool(v)
    }
}

impl From<&str> for Leaf {
    fn from(v: &str) -> Self {
        Leaf::Text(v.to_string())
    }
}

impl From<String> for Leaf {
    fn from(v: String) -> Self {
        Leaf::Text(v)
    }
}

impl<T: Into<Leaf>> From<Option<T>> for Leaf {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Leaf::Null)
    }
}

impl<T: Into<Node>> From<Vec<T>> for Leaf {
    fn from(v: Vec<T>) -> Self {
        Leaf::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<Leaf> for Node {
    fn from(v: Leaf) -> Self {
        Node::Leaf(v)
    }
}

impl From<Submapping> for Node {
    fn from(v: Submapping) -> Self {
        Node::Map(v)
    }
}

macro_rules! leaf_node {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Node {
                fn from(v: $t) -> Self {
                    Node::Leaf(Leaf::from(v))
                }
            }
        )*
    };
}

leaf_node!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64, bool, &str, String);

impl<T: Into<Node>> From<Vec<T>> for Node {
    fn from(v: Vec<T>) -> Self {
        Node::Leaf(Leaf::from(v))
    }
}


/// Build a [`Submapping`] from `(key, value)` pairs, keeping their order.
pub fn mapping<K, V, I>(pairs: I) -> Submapping
where
    K: Into<String>,
    V: Into<Node>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_normalize_to_int() {
        assert_eq!(Leaf::from(7u8), Leaf::Int(7));
        assert_eq!(Leaf::from(-3i32), Leaf::Int(-3));
        assert_eq!(Leaf::from(42usize), Leaf::Int(42));
    }

    #[test]
    fn huge_u64_normalizes_to_float() {
        match Leaf::from(u64::MAX) {
            Leaf::Float(f) => assert!(f > 1.8e19),
            other => panic!("expected Float, got {:?}", other),
        }
    }

    #[test]
    fn f32_widens() {
        assert_eq!(Leaf::from(0.5f32), Leaf::Float(0.5));
    }

    #[test]
    fn as_f64_widens_ints() {
        assert_eq!(Leaf::Int(3).as_f64(), Some(3.0));
        assert_eq!(Leaf::Text("3".into()).as_f64(), None);
    }

    #[test]
    fn option_none_is_null() {
        let leaf: Leaf = Option::<i32>::None.into();
        assert!(leaf.is_null());
        assert_eq!(Leaf::from(Some(2)), Leaf::Int(2));
    }

    #[test]
    fn mapping_keeps_order() {
        let m = mapping([("z", 1), ("a", 2), ("m", 3)]);
        let keys: Vec<&str> = m.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn node_variant_decides_subtree() {
        assert!(Node::empty_map().is_map());
        assert!(!Node::from("text").is_map());
        assert!(Node::from(vec![1, 2]).as_map().is_none());
    }

    #[test]
    fn list_display() {
        let leaf = Leaf::from(vec![1.5, 2.0]);
        assert_eq!(leaf.to_string(), "[1.5, 2]");
    }
}
