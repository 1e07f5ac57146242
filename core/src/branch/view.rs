//! Branch views onto a [`MemoryTree`].
//!
//! A branch owns no data. It is a path into the tree plus an ordered list of
//! default branches, and every call re-resolves that path against the
//! tree's root mapping. Reads fall back through the defaults chain (first
//! hit wins); writes always land in the branch's own submapping.

use std::fmt;

use crate::error::{Result, TreeError};
use crate::store::MemoryTree;
use crate::types::{Leaf, Node, Submapping};

use super::path::BranchPath;


/// Result of a lookup: a leaf value or a sub-branch view.
#[derive(Debug, Clone)]
pub enum Entry<'t> {
    Leaf(Leaf),
    Branch(Branch<'t>),
}

impl<'t> Entry<'t> {
    /// The leaf value, if this is one.
    pub fn into_leaf(self) -> Option<Leaf> {
        match self {
            Entry::Leaf(leaf) => Some(leaf),
            Entry::Branch(_) => None,
        }
    }

    /// The sub-branch view, if this is one.
    pub fn into_branch(self) -> Option<Branch<'t>> {
        match self {
            Entry::Branch(b) => Some(b),
            Entry::Leaf(_) => None,
        }
    }
}


/// Outcome of [`Branch::create_or_overwrite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The key was absent from the branch's own data.
    Inserted,
    /// The key already had a value, which was replaced.
    Overwritten,
}


/// What a branch's own data holds at a key.
enum Hit {
    Leaf(Leaf),
    Map,
}


/// A path into a [`MemoryTree`] plus an ordered defaults chain.
#[derive(Clone)]
pub struct Branch<'t> {
    tree: &'t MemoryTree,
    path: BranchPath,
    defaults: Vec<Branch<'t>>,
}

impl<'t> Branch<'t> {
    pub(crate) fn root(tree: &'t MemoryTree) -> Self {
        Branch {
            tree,
            path: BranchPath::root(),
            defaults: Vec::new(),
        }
    }

    /// The tree this branch reads from and writes to.
    pub fn tree(&self) -> &'t MemoryTree {
        self.tree
    }

    /// Path from the root.
    pub fn path(&self) -> &BranchPath {
        &self.path
    }

    /// Local name; empty for the root.
    pub fn name(&self) -> &str {
        self.path.name().unwrap_or("")
    }

    /// Dotted path from the root.
    pub fn full_name(&self) -> String {
        self.path.to_dotted()
    }

    /// Defaults chain, highest priority first.
    pub fn defaults(&self) -> &[Branch<'t>] {
        &self.defaults
    }

    /// Replace the defaults chain (highest priority first).
    ///
    /// Key listings are derived from the merged view on every call, so keys
    /// only reachable through the old chain disappear and keys from the new
    /// chain appear immediately. Stored values are not touched.
    pub fn set_defaults(&mut self, defaults: Vec<Branch<'t>>) {
        self.defaults = defaults;
    }

    /// Builder form of [`Branch::set_defaults`].
    pub fn with_defaults(mut self, defaults: Vec<Branch<'t>>) -> Self {
        self.set_defaults(defaults);
        self
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    /// Look `key` up in own data, then in each default in order.
    pub fn read(&self, key: &str) -> Result<Entry<'t>> {
        self.tree.reload_if_stale()?;
        self.lookup(key)
    }

    /// Read a leaf value; `NotALeaf` if `key` holds a branch.
    pub fn leaf(&self, key: &str) -> Result<Leaf> {
        match self.read(key)? {
            Entry::Leaf(leaf) => Ok(leaf),
            Entry::Branch(_) => Err(TreeError::NotALeaf(self.path.child(key).to_dotted())),
        }
    }

    /// Read a sub-branch; `NotABranch` if `key` holds a leaf.
    pub fn branch(&self, key: &str) -> Result<Branch<'t>> {
        match self.read(key)? {
            Entry::Branch(b) => Ok(b),
            Entry::Leaf(_) => Err(TreeError::NotABranch(self.path.child(key).to_dotted())),
        }
    }

    /// Whether `key` is visible in own data or any default.
    pub fn contains(&self, key: &str) -> Result<bool> {
        match self.read(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Defaults merged lowest priority first, then own data on top.
    /// The result is a copy and is never written back.
    pub fn merged_view(&self) -> Result<Submapping> {
        self.tree.reload_if_stale()?;
        self.merged()
    }

    /// Keys of the merged view, in merge order.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.merged_view()?.into_keys().collect())
    }

    /// Keys stored in this branch's own data only.
    pub fn own_keys(&self) -> Result<Vec<String>> {
        self.tree.reload_if_stale()?;
        self.with_own(|own| own.map(|m| m.keys().cloned().collect()).unwrap_or_default())
    }

    /// A copy of this branch's own data (empty if it has none yet).
    pub fn own_data(&self) -> Result<Submapping> {
        self.tree.reload_if_stale()?;
        self.with_own(|own| own.cloned().unwrap_or_default())
    }

    /// Navigate `dotted` from the tree root, reading one segment at a time,
    /// and attach `defaults` to the branch reached.
    pub fn resolve_path(&self, dotted: &str, defaults: Vec<Branch<'t>>) -> Result<Branch<'t>> {
        let path = BranchPath::parse(dotted)?;
        let mut branch = Branch::root(self.tree);
        for segment in path.segments() {
            branch = branch.branch(segment)?;
        }
        Ok(branch.with_defaults(defaults))
    }

    /// Render own data as a standalone document.
    pub fn export_text(&self) -> Result<String> {
        let own = self.own_data()?;
        self.tree.format().render(&own)
    }

    // -------------------------------------------------------------------
    // Writes: each performs exactly one save request.
    // -------------------------------------------------------------------

    /// Store `value` under `key` in own data.
    pub fn write(&self, key: &str, value: impl Into<Node>) -> Result<()> {
        self.create_or_overwrite(key, value).map(|_| ())
    }

    /// Store `value` under `key` in own data and report whether the key is
    /// new, so callers tracking known keys can pick it up.
    pub fn create_or_overwrite(&self, key: &str, value: impl Into<Node>) -> Result<Assignment> {
        let node = value.into();
        let previous = self.with_own_mut(true, |own| own.insert(key.to_string(), node))?;
        self.tree.save()?;
        Ok(match previous {
            Some(_) => Assignment::Overwritten,
            None => Assignment::Inserted,
        })
    }

    /// Create an empty sub-branch `key` unless own data already has one.
    pub fn new_branch(&self, key: &str) -> Result<Branch<'t>> {
        let created = self.with_own_mut(true, |own| match own.get(key) {
            Some(Node::Map(_)) => Ok(false),
            Some(Node::Leaf(_)) => Err(TreeError::NotABranch(self.path.child(key).to_dotted())),
            None => {
                own.insert(key.to_string(), Node::empty_map());
                Ok(true)
            }
        })??;
        if created {
            self.tree.save()?;
        }
        Ok(self.child(key))
    }

    /// Merge `mapping` into own data.
    pub fn bulk_update(&self, mapping: Submapping) -> Result<()> {
        self.with_own_mut(true, |own| own.extend(mapping))?;
        self.tree.save()
    }

    /// Remove `key` from own data. Defaults are never touched.
    pub fn remove(&self, key: &str) -> Result<Node> {
        let removed = self.with_own_mut(false, |own| own.shift_remove(key))?;
        let node = removed.ok_or_else(|| TreeError::KeyNotFound(self.path.child(key).to_dotted()))?;
        self.tree.save()?;
        Ok(node)
    }

    /// Move this branch's own data to `new_name` under the same parent.
    /// Returns a view at the new location with the same defaults.
    pub fn rename(&self, new_name: &str) -> Result<Branch<'t>> {
        let (parent, old_name) = self.parent_and_name("renamed")?;
        if new_name.is_empty() || new_name.contains('.') {
            return Err(TreeError::InvalidPath(format!("bad branch name '{}'", new_name)));
        }
        parent.with_own_mut(false, |siblings| {
            let data = siblings.shift_remove(old_name)?;
            siblings.insert(new_name.to_string(), data);
            Some(())
        })?
        .ok_or_else(|| TreeError::KeyNotFound(self.full_name()))?;
        self.tree.save()?;
        Ok(Branch {
            tree: self.tree,
            path: parent.path.child(new_name),
            defaults: self.defaults.clone(),
        })
    }

    /// Remove this branch from its parent.
    pub fn erase(&self) -> Result<()> {
        let (parent, name) = self.parent_and_name("erased")?;
        parent
            .with_own_mut(false, |siblings| siblings.shift_remove(name))?
            .ok_or_else(|| TreeError::KeyNotFound(self.full_name()))?;
        self.tree.save()
    }

    /// Replace own data with the parsed document. Malformed text is an
    /// error here and leaves the tree unchanged.
    pub fn import_text(&self, text: &str) -> Result<()> {
        let data = self.tree.format().parse(text)?;
        self.with_own_mut(true, |own| *own = data)?;
        self.tree.save()
    }

    // -------------------------------------------------------------------
    // Internal
    // -------------------------------------------------------------------

    fn lookup(&self, key: &str) -> Result<Entry<'t>> {
        if let Some(hit) = self.own_hit(key)? {
            return Ok(self.entry(key, hit));
        }
        for default in &self.defaults {
            match default.own_hit(key) {
                Ok(Some(hit)) => return Ok(self.entry(key, hit)),
                // a default whose path now runs through a leaf has no data
                Ok(None) | Err(TreeError::NotABranch(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(TreeError::KeyNotFound(self.path.child(key).to_dotted()))
    }

    fn entry(&self, key: &str, hit: Hit) -> Entry<'t> {
        match hit {
            Hit::Leaf(leaf) => Entry::Leaf(leaf),
            Hit::Map => Entry::Branch(self.child(key)),
        }
    }

    /// Sub-branch view whose defaults are the same-named sub-branches of
    /// this branch's defaults. Own data for it may not exist yet; the first
    /// write creates it.
    fn child(&self, key: &str) -> Branch<'t> {
        let defaults = self
            .defaults
            .iter()
            .filter(|d| matches!(d.own_hit(key), Ok(Some(Hit::Map))))
            .map(|d| Branch {
                tree: d.tree,
                path: d.path.child(key),
                defaults: Vec::new(),
            })
            .collect();
        Branch {
            tree: self.tree,
            path: self.path.child(key),
            defaults,
        }
    }

    fn own_hit(&self, key: &str) -> Result<Option<Hit>> {
        self.with_own(|own| {
            own.and_then(|m| m.get(key)).map(|node| match node {
                Node::Leaf(leaf) => Hit::Leaf(leaf.clone()),
                Node::Map(_) => Hit::Map,
            })
        })
    }

    /// Like lookup, defaults contribute only their own data.
    fn merged(&self) -> Result<Submapping> {
        let mut out = Submapping::new();
        for default in self.defaults.iter().rev() {
            match default.with_own(|own| own.cloned()) {
                Ok(Some(data)) => out.extend(data),
                Ok(None) | Err(TreeError::NotABranch(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if let Some(own) = self.with_own(|own| own.cloned())? {
            out.extend(own);
        }
        Ok(out)
    }

    fn parent_and_name(&self, op: &'static str) -> Result<(Branch<'t>, &str)> {
        let parent_path = self.path.parent().ok_or(TreeError::RootBranch(op))?;
        let parent = Branch {
            tree: self.tree,
            path: parent_path,
            defaults: Vec::new(),
        };
        Ok((parent, self.name()))
    }

    fn with_own<R>(&self, f: impl FnOnce(Option<&Submapping>) -> R) -> Result<R> {
        self.tree.with_root(|root| descend(root, &self.path).map(f))
    }

    /// Run `f` on own data. With `create`, missing submappings along the
    /// path are created first; without it, a missing branch is
    /// `KeyNotFound`.
    fn with_own_mut<R>(&self, create: bool, f: impl FnOnce(&mut Submapping) -> R) -> Result<R> {
        self.tree.with_root_mut(|root| match descend_mut(root, &self.path, create)? {
            Some(own) => Ok(f(own)),
            None => Err(TreeError::KeyNotFound(self.full_name())),
        })
    }
}

impl fmt::Debug for Branch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let defaults: Vec<String> = self.defaults.iter().map(|d| d.full_name()).collect();
        f.debug_struct("Branch")
            .field("path", &self.full_name())
            .field("defaults", &defaults)
            .finish()
    }
}

impl fmt::Display for Branch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self
            .merged()
            .map(|m| m.into_keys().collect())
            .unwrap_or_default();
        write!(f, "Branch({}: [{}])", self.full_name(), keys.join(", "))
    }
}


fn descend<'m>(mut map: &'m Submapping, path: &BranchPath) -> Result<Option<&'m Submapping>> {
    for (i, segment) in path.segments().iter().enumerate() {
        match map.get(segment) {
            Some(Node::Map(inner)) => map = inner,
            Some(Node::Leaf(_)) => return Err(TreeError::NotABranch(path.prefix(i + 1).to_dotted())),
            None => return Ok(None),
        }
    }
    Ok(Some(map))
}

fn descend_mut<'m>(
    mut map: &'m mut Submapping,
    path: &BranchPath,
    create: bool,
) -> Result<Option<&'m mut Submapping>> {
    for (i, segment) in path.segments().iter().enumerate() {
        if create && !map.contains_key(segment) {
            map.insert(segment.clone(), Node::empty_map());
        }
        match map.get_mut(segment) {
            Some(Node::Map(inner)) => map = inner,
            Some(Node::Leaf(_)) => return Err(TreeError::NotABranch(path.prefix(i + 1).to_dotted())),
            None => return Ok(None),
        }
    }
    Ok(Some(map))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::clock::ManualClock;
    use crate::store::fs::StdFileOps;
    use crate::types::{mapping, TreeConfig};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn tree_with(data: Submapping) -> MemoryTree {
        let tree = MemoryTree::in_memory();
        tree.with_root_mut(|root| *root = data);
        tree
    }

    fn lockbox() -> MemoryTree {
        tree_with(mapping([
            (
                "pid",
                Node::Map(mapping([("p", Node::from(1.0)), ("i", Node::from(10))])),
            ),
            (
                "pid_defaults",
                Node::Map(mapping([
                    ("p", Node::from(0.5)),
                    ("d", Node::from(0)),
                    ("filter", Node::Map(mapping([("cutoff", 1000)]))),
                ])),
            ),
            (
                "factory",
                Node::Map(mapping([
                    ("p", Node::from(0.1)),
                    ("d", Node::from(7)),
                    ("setpoint", Node::from(0.25)),
                ])),
            ),
        ]))
    }

    #[test]
    fn write_then_read_leaves_defaults_alone() {
        let tree = lockbox();
        let defaults = tree.branch("pid_defaults").unwrap();
        let before = defaults.own_data().unwrap();

        let pid = tree.branch("pid").unwrap().with_defaults(vec![defaults.clone()]);
        pid.write("d", 3).unwrap();

        assert_eq!(pid.leaf("d").unwrap(), Leaf::Int(3));
        assert_eq!(defaults.own_data().unwrap(), before);
    }

    #[test]
    fn own_data_shadows_defaults() {
        let tree = lockbox();
        let pid = tree
            .resolve("pid", vec![tree.branch("pid_defaults").unwrap()])
            .unwrap();
        assert_eq!(pid.leaf("p").unwrap(), Leaf::Float(1.0));
    }

    #[test]
    fn defaults_precedence_first_hit_wins() {
        let tree = lockbox();
        let d1 = tree.branch("pid_defaults").unwrap();
        let d2 = tree.branch("factory").unwrap();
        let b = tree.root().new_branch("fresh").unwrap().with_defaults(vec![d1, d2]);

        // both defaults have `d`: the first one wins
        assert_eq!(b.leaf("d").unwrap(), Leaf::Int(0));
        // only the second has `setpoint`
        assert_eq!(b.leaf("setpoint").unwrap(), Leaf::Float(0.25));
        // nobody has `q`
        assert!(matches!(b.read("q"), Err(TreeError::KeyNotFound(name)) if name == "fresh.q"));
    }

    #[test]
    fn merged_view_overlays_in_priority_order() {
        let tree = lockbox();
        let pid = tree.resolve(
            "pid",
            vec![tree.branch("pid_defaults").unwrap(), tree.branch("factory").unwrap()],
        )
        .unwrap();
        let merged = pid.merged_view().unwrap();
        assert_eq!(merged["p"], Node::from(1.0));
        assert_eq!(merged["d"], Node::from(0));
        assert_eq!(merged["setpoint"], Node::from(0.25));
        assert_eq!(merged["i"], Node::from(10));
        let keys: Vec<&str> = merged.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["p", "d", "setpoint", "filter", "i"]);

        // the merged view is not persisted into own data
        assert_eq!(pid.own_keys().unwrap(), vec!["p", "i"]);
    }

    #[test]
    fn set_defaults_changes_visible_keys_only() {
        let tree = lockbox();
        let mut pid = tree.branch("pid").unwrap();
        pid.set_defaults(vec![tree.branch("factory").unwrap()]);
        assert!(pid.keys().unwrap().contains(&"setpoint".to_string()));

        pid.set_defaults(vec![tree.branch("pid_defaults").unwrap()]);
        let keys = pid.keys().unwrap();
        assert!(!keys.contains(&"setpoint".to_string()));
        assert!(keys.contains(&"filter".to_string()));
        assert_eq!(pid.own_keys().unwrap(), vec!["p", "i"]);
    }

    #[test]
    fn sub_branch_from_defaults_materializes_on_write() {
        let tree = lockbox();
        let pid = tree.resolve("pid", vec![tree.branch("pid_defaults").unwrap()]).unwrap();

        let filter = pid.branch("filter").unwrap();
        assert_eq!(filter.leaf("cutoff").unwrap(), Leaf::Int(1000));
        assert!(filter.own_data().unwrap().is_empty());

        filter.write("order", 2).unwrap();
        let snap = tree.snapshot();
        let own_filter = snap["pid"].as_map().unwrap()["filter"].as_map().unwrap();
        assert_eq!(own_filter.len(), 1);
        assert_eq!(own_filter["order"], Node::from(2));
        // the default's filter is unchanged
        let default_filter = snap["pid_defaults"].as_map().unwrap()["filter"].as_map().unwrap();
        assert_eq!(default_filter.len(), 1);
        // and still visible through the chain
        assert_eq!(filter.leaf("cutoff").unwrap(), Leaf::Int(1000));
    }

    #[test]
    fn default_shadowed_by_leaf_is_skipped() {
        let tree = lockbox();
        let stale = tree.branch("pid_defaults").unwrap();
        let pid = tree
            .branch("pid")
            .unwrap()
            .with_defaults(vec![stale, tree.branch("factory").unwrap()]);

        tree.root().write("pid_defaults", 5).unwrap();

        assert_eq!(pid.leaf("d").unwrap(), Leaf::Int(7));
        assert_eq!(pid.leaf("setpoint").unwrap(), Leaf::Float(0.25));
        assert!(pid.read("q").unwrap_err().is_not_found());
        assert_eq!(pid.keys().unwrap(), vec!["p", "d", "setpoint", "i"]);
    }

    #[test]
    fn leaf_and_branch_type_errors() {
        let tree = lockbox();
        assert!(matches!(tree.root().leaf("pid"), Err(TreeError::NotALeaf(_))));
        let pid = tree.branch("pid").unwrap();
        assert!(matches!(pid.branch("p"), Err(TreeError::NotABranch(n)) if n == "pid.p"));
    }

    #[test]
    fn create_or_overwrite_reports_new_keys() {
        let tree = lockbox();
        let pid = tree.branch("pid").unwrap();
        assert_eq!(pid.create_or_overwrite("d", 1).unwrap(), Assignment::Inserted);
        assert_eq!(pid.create_or_overwrite("d", 2).unwrap(), Assignment::Overwritten);
        assert_eq!(tree.save_counter(), 2);
    }

    #[test]
    fn written_submapping_is_a_copy() {
        let tree = lockbox();
        let mut source = mapping([("a", 1)]);
        tree.root().write("copied", source.clone()).unwrap();
        source.insert("b".into(), Node::from(2));
        let copied = tree.branch("copied").unwrap();
        assert_eq!(copied.own_keys().unwrap(), vec!["a"]);
    }

    #[test]
    fn bulk_update_merges_with_one_save() {
        let tree = lockbox();
        let pid = tree.branch("pid").unwrap();
        pid.bulk_update(mapping([("p", Node::from(2.0)), ("d", Node::from(1))])).unwrap();
        assert_eq!(pid.own_keys().unwrap(), vec!["p", "i", "d"]);
        assert_eq!(pid.leaf("p").unwrap(), Leaf::Float(2.0));
        assert_eq!(tree.save_counter(), 1);
    }

    #[test]
    fn remove_only_touches_own_data() {
        let tree = lockbox();
        let pid = tree.resolve("pid", vec![tree.branch("pid_defaults").unwrap()]).unwrap();
        assert_eq!(pid.remove("p").unwrap(), Node::from(1.0));
        // now the default shows through
        assert_eq!(pid.leaf("p").unwrap(), Leaf::Float(0.5));
        // removing a key only present in defaults fails
        assert!(pid.remove("d").unwrap_err().is_not_found());
        assert_eq!(tree.save_counter(), 1);
    }

    #[test]
    fn rename_moves_own_data_with_one_save() {
        let tree = lockbox();
        let pid = tree.resolve("pid", vec![tree.branch("pid_defaults").unwrap()]).unwrap();
        let before = pid.own_data().unwrap();

        let renamed = pid.rename("pid2").unwrap();

        let snap = tree.snapshot();
        assert!(!snap.contains_key("pid"));
        assert_eq!(snap["pid2"], Node::Map(before));
        assert_eq!(renamed.full_name(), "pid2");
        assert_eq!(renamed.defaults().len(), 1);
        assert_eq!(tree.save_counter(), 1);
    }

    #[test]
    fn rename_rejects_root_and_dotted_names() {
        let tree = lockbox();
        assert!(matches!(tree.root().rename("x"), Err(TreeError::RootBranch(_))));
        let pid = tree.branch("pid").unwrap();
        assert!(matches!(pid.rename("a.b"), Err(TreeError::InvalidPath(_))));
        assert_eq!(tree.save_counter(), 0);
    }

    #[test]
    fn erase_removes_branch() {
        let tree = lockbox();
        tree.branch("factory").unwrap().erase().unwrap();
        assert!(!tree.root().contains("factory").unwrap());
        assert_eq!(tree.save_counter(), 1);
        assert!(matches!(tree.root().erase(), Err(TreeError::RootBranch(_))));
    }

    #[test]
    fn resolve_path_walks_segments() {
        let tree = lockbox();
        let filter = tree.resolve("pid_defaults.filter", Vec::new()).unwrap();
        assert_eq!(filter.full_name(), "pid_defaults.filter");
        assert_eq!(filter.name(), "filter");
        assert_eq!(filter.leaf("cutoff").unwrap(), Leaf::Int(1000));

        assert!(tree.resolve("pid.nope", Vec::new()).unwrap_err().is_not_found());
        assert!(matches!(tree.resolve("pid.p", Vec::new()), Err(TreeError::NotABranch(_))));
        assert!(tree.resolve("", Vec::new()).unwrap().path().is_root());
    }

    #[test]
    fn export_import_round_trip_keeps_order() {
        let tree = lockbox();
        let text = tree.branch("factory").unwrap().export_text().unwrap();
        assert_eq!(text, "p: 0.1\nd: 7\nsetpoint: 0.25\n");

        let target = tree.root().new_branch("copy").unwrap();
        target.import_text(&text).unwrap();
        assert_eq!(target.own_data().unwrap(), tree.branch("factory").unwrap().own_data().unwrap());
        assert_eq!(target.own_keys().unwrap(), vec!["p", "d", "setpoint"]);
    }

    #[test]
    fn import_malformed_text_is_error_and_changes_nothing() {
        let tree = lockbox();
        let pid = tree.branch("pid").unwrap();
        assert!(matches!(pid.import_text("p: [1,"), Err(TreeError::Parse { .. })));
        assert_eq!(pid.own_keys().unwrap(), vec!["p", "i"]);
        assert_eq!(tree.save_counter(), 0);
    }

    #[test]
    fn new_branch_is_idempotent() {
        let tree = MemoryTree::in_memory();
        let a = tree.root().new_branch("a").unwrap();
        a.write("x", 1).unwrap();
        let again = tree.root().new_branch("a").unwrap();
        assert_eq!(again.leaf("x").unwrap(), Leaf::Int(1));
        assert_eq!(tree.save_counter(), 2);
    }

    #[test]
    fn display_lists_merged_keys() {
        let tree = lockbox();
        let pid = tree.branch("pid").unwrap();
        assert_eq!(pid.to_string(), "Branch(pid: [p, i])");
    }

    #[test]
    fn defaults_may_live_in_another_tree() {
        let shared = tree_with(mapping([("base", Node::Map(mapping([("gain", 4)])))]));
        let local = MemoryTree::in_memory();
        let b = local
            .root()
            .new_branch("loop")
            .unwrap()
            .with_defaults(vec![shared.branch("base").unwrap()]);
        assert_eq!(b.leaf("gain").unwrap(), Leaf::Int(4));
        b.write("gain", 5).unwrap();
        assert_eq!(shared.branch("base").unwrap().leaf("gain").unwrap(), Leaf::Int(4));
    }

    // -------------------------------------------------------------------
    // File-backed
    // -------------------------------------------------------------------

    fn file_tree(content: &str) -> (TempDir, PathBuf, ManualClock, MemoryTree) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.yml");
        fs::write(&path, content).unwrap();
        let clock = ManualClock::new(0);
        let tree = MemoryTree::from_parts(
            Some(path.clone()),
            TreeConfig::default(),
            Box::new(clock.clone()),
            Box::new(StdFileOps),
        )
        .unwrap();
        (dir, path, clock, tree)
    }

    #[test]
    fn only_own_data_is_persisted() {
        let (_dir, path, _clock, tree) =
            file_tree("defaults:\n  gain: 1\n  offset: 0\nloop:\n  gain: 2\n");
        let lp = tree.resolve("loop", vec![tree.branch("defaults").unwrap()]).unwrap();
        lp.write("offset", 5).unwrap();
        tree.save_now().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "defaults:\n  gain: 1\n  offset: 0\nloop:\n  gain: 2\n  offset: 5\n"
        );
    }

    #[test]
    fn rename_persists_after_flush() {
        let (_dir, path, clock, tree) = file_tree("old:\n  a: 1\nother: 2\n");
        tree.branch("old").unwrap().rename("new").unwrap();
        clock.advance(tree.deadtime_ms());
        assert!(tree.poll().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "other: 2\nnew:\n  a: 1\n");
        assert_eq!(tree.save_counter(), 1);
    }
}
