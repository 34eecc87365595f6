//! Arena-backed tunnel tree.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use tracing::{debug, trace};

use super::{NodeInfo, NodeRole, NodeStatus, PeerPath, TreeError};
use crate::peer::ShortPeerId;

/// Index of a node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct NodeIdx(usize);

#[derive(Clone, Debug)]
struct TreeNode {
    peer: ShortPeerId,
    parent: Option<NodeIdx>,
    children: Vec<NodeIdx>,
    status: NodeStatus,
    role: NodeRole,
    /// Locally adjacent peer that starts the path to this node.
    first_hop: Option<ShortPeerId>,
}

/// Tree of the peers taking part in one tunnel.
///
/// Every peer appears at most once. Nodes cut off by [`delete_path`] keep
/// their subtree and stay known to the tree as detached until they are
/// re-pathed by [`add_path`] or destroyed by [`del_peer`].
///
/// [`delete_path`]: TunnelTree::delete_path
/// [`add_path`]: TunnelTree::add_path
/// [`del_peer`]: TunnelTree::del_peer
#[derive(Clone)]
pub struct TunnelTree {
    nodes: Vec<Option<TreeNode>>,
    /// Vacant arena slots.
    free: Vec<usize>,
    index: HashMap<ShortPeerId, NodeIdx>,
    root: NodeIdx,
    /// The peer this tree is viewed from.
    local: ShortPeerId,
}

impl TunnelTree {
    /// Create a tree holding only `root`, as seen from `local`.
    pub fn new(root: ShortPeerId, local: ShortPeerId) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            root: NodeIdx(0),
            local,
        };
        tree.root = tree.alloc(TreeNode {
            peer: root,
            parent: None,
            children: Vec::new(),
            status: NodeStatus::Connected,
            role: NodeRole::Root,
            first_hop: None,
        });
        tree
    }

    pub fn root(&self) -> ShortPeerId {
        self.node(self.root).peer
    }

    pub fn local(&self) -> ShortPeerId {
        self.local
    }

    /// Number of nodes, detached ones included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // === Queries ===

    /// Look up `peer` among the nodes reachable from the root.
    pub fn find(&self, peer: ShortPeerId) -> Option<NodeInfo> {
        let idx = *self.index.get(&peer)?;
        self.is_attached(idx).then(|| self.info(idx))
    }

    /// Is `peer` known but cut off from the root?
    pub fn is_detached(&self, peer: ShortPeerId) -> bool {
        self.index
            .get(&peer)
            .is_some_and(|&idx| !self.is_attached(idx))
    }

    /// Top nodes of detached subtrees.
    pub fn detached(&self) -> Vec<ShortPeerId> {
        self.index
            .values()
            .filter(|&&idx| idx != self.root && self.node(idx).parent.is_none())
            .map(|&idx| self.node(idx).peer)
            .collect()
    }

    /// Cached first hop toward `peer`.
    pub fn get_first_hop(&self, peer: ShortPeerId) -> Option<ShortPeerId> {
        self.find(peer)?.first_hop
    }

    /// Status of `peer`, attached or not.
    pub fn status(&self, peer: ShortPeerId) -> Option<NodeStatus> {
        self.index.get(&peer).map(|&idx| self.node(idx).status)
    }

    /// Set the status of `peer`. Returns false if the peer is unknown.
    pub fn set_status(&mut self, peer: ShortPeerId, status: NodeStatus) -> bool {
        let Some(&idx) = self.index.get(&peer) else {
            return false;
        };
        self.node_mut(idx).status = status;
        true
    }

    /// Parent of the local node.
    pub fn predecessor(&self) -> Option<ShortPeerId> {
        let idx = *self.index.get(&self.local)?;
        if !self.is_attached(idx) {
            return None;
        }
        let parent = self.node(idx).parent?;
        Some(self.node(parent).peer)
    }

    /// Children of the local node.
    pub fn iterate_children(&self) -> impl Iterator<Item = ShortPeerId> + '_ {
        self.index
            .get(&self.local)
            .into_iter()
            .flat_map(move |&idx| self.node(idx).children.iter())
            .map(move |&child| self.node(child).peer)
    }

    pub fn count_children(&self) -> usize {
        self.iterate_children().count()
    }

    /// Every reachable node with its parent, breadth first from the root.
    pub fn iterate_all(&self) -> Vec<(ShortPeerId, Option<ShortPeerId>)> {
        self.subtree(self.root)
            .into_iter()
            .map(|idx| {
                let node = self.node(idx);
                (node.peer, node.parent.map(|p| self.node(p).peer))
            })
            .collect()
    }

    /// Path from the local peer down to `peer`.
    ///
    /// `None` if `peer` is not reachable or not below the local peer.
    pub fn get_path_to_peer(&self, peer: ShortPeerId) -> Option<PeerPath> {
        let idx = *self.index.get(&peer)?;
        if !self.is_attached(idx) {
            return None;
        }
        let mut peers = Vec::new();
        let mut current = Some(idx);
        while let Some(i) = current {
            let node = self.node(i);
            peers.push(node.peer);
            if node.peer == self.local {
                peers.reverse();
                return PeerPath::new(peers).ok();
            }
            current = node.parent;
        }
        None
    }

    /// Number of hops of `path` that are not already in the tree.
    ///
    /// `u32::MAX` if the path does not start at the root.
    pub fn get_path_cost(&self, path: &PeerPath) -> u32 {
        if path.origin() != self.root() {
            return u32::MAX;
        }
        let mut current = self.root;
        let mut matched = 1;
        for &peer in &path.peers()[1..] {
            match self.child_with_peer(current, peer) {
                Some(child) => {
                    current = child;
                    matched += 1;
                }
                None => break,
            }
        }
        (path.len() - matched) as u32
    }

    // === Mutation ===

    /// Splice `path` into the tree.
    ///
    /// The path must start at the root and list each peer once. The common
    /// prefix is reused; each further peer that the tree already knows is
    /// moved under its new parent together with its subtree, and any other
    /// peer gets a new relay node. Moved nodes, their descendants and relays
    /// left without children are reported to `notify`, each at most once.
    /// The last peer becomes a destination searching for a path, unless the
    /// whole path was already present and the peer is connected.
    pub fn add_path(
        &mut self,
        path: &PeerPath,
        mut notify: impl FnMut(ShortPeerId),
    ) -> Result<(), TreeError> {
        let root = self.root();
        if path.origin() != root {
            return Err(TreeError::RootMismatch {
                expected: root,
                got: path.origin(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(&dup) = path.peers().iter().find(|&&p| !seen.insert(p)) {
            return Err(TreeError::PathLoop(dup));
        }

        let mut reported = HashSet::new();
        let mut parent = self.root;
        let mut fully_present = true;
        for &peer in &path.peers()[1..] {
            if let Some(child) = self.child_with_peer(parent, peer) {
                parent = child;
                continue;
            }
            let idx = match self.index.get(&peer).copied() {
                Some(existing) => {
                    self.move_node(existing, parent, &mut reported, &mut notify);
                    existing
                }
                None => {
                    let idx = self.alloc(TreeNode {
                        peer,
                        parent: Some(parent),
                        children: Vec::new(),
                        status: NodeStatus::Unknown,
                        role: NodeRole::Relay,
                        first_hop: None,
                    });
                    self.node_mut(parent).children.push(idx);
                    idx
                }
            };
            fully_present = false;
            parent = idx;
        }

        let dest = self.node_mut(parent);
        if dest.role != NodeRole::Root {
            dest.role = NodeRole::Destination;
            if !(fully_present && dest.status == NodeStatus::Connected) {
                dest.status = NodeStatus::SearchingPath;
            }
        }
        if !fully_present {
            // A move can change the local node's ancestry; recompute all hops
            self.refresh_first_hops(self.root);
        }

        debug!(path = %path, reported = reported.len(), "Path added to tunnel tree");
        Ok(())
    }

    /// Cut `peer` off from the root.
    ///
    /// The node keeps its subtree and becomes detached; relays above it
    /// that are left without children are pruned bottom-up and reported.
    /// Returns the detached peer, or `None` if it was unknown or already
    /// detached.
    pub fn delete_path(
        &mut self,
        peer: ShortPeerId,
        mut notify: impl FnMut(ShortPeerId),
    ) -> Result<Option<ShortPeerId>, TreeError> {
        let Some(&idx) = self.index.get(&peer) else {
            return Ok(None);
        };
        if idx == self.root {
            return Err(TreeError::CannotDeleteRoot);
        }
        if !self.is_attached(idx) {
            return Ok(None);
        }

        let parent = self.node_mut(idx).parent.take();
        for i in self.subtree(idx) {
            self.node_mut(i).first_hop = None;
        }
        let mut reported = HashSet::new();
        if let Some(p) = parent {
            self.node_mut(p).children.retain(|&c| c != idx);
            self.prune_from(p, &mut reported, &mut notify);
        }
        // The local node may have been cut off along with the subtree
        self.refresh_first_hops(self.root);

        debug!(peer = %peer, pruned = reported.len(), "Path deleted from tunnel tree");
        Ok(Some(peer))
    }

    /// Mark everything below a broken `p1`–`p2` link as disconnected.
    ///
    /// Newly disconnected peers are reported. Returns the endpoint on the
    /// far side of the link, or `None` if the two are not adjacent.
    pub fn notify_connection_broken(
        &mut self,
        p1: ShortPeerId,
        p2: ShortPeerId,
        mut notify: impl FnMut(ShortPeerId),
    ) -> Option<ShortPeerId> {
        let a = *self.index.get(&p1)?;
        let b = *self.index.get(&p2)?;
        let below = if self.node(a).parent == Some(b) {
            a
        } else if self.node(b).parent == Some(a) {
            b
        } else {
            return None;
        };

        for i in self.subtree(below) {
            let node = self.node_mut(i);
            node.first_hop = None;
            if node.status != NodeStatus::Disconnected {
                node.status = NodeStatus::Disconnected;
                notify(node.peer);
            }
        }
        let peer = self.node(below).peer;
        debug!(p1 = %p1, p2 = %p2, below = %peer, "Tunnel link broken");
        Some(peer)
    }

    /// Recompute cached first hops for `peer` and everything below it.
    pub fn update_first_hops(&mut self, peer: ShortPeerId) {
        if let Some(&idx) = self.index.get(&peer) {
            self.refresh_first_hops(idx);
        }
    }

    /// Delete the path to `peer` and destroy its subtree.
    ///
    /// Pruned relays and destroyed descendants are reported. Returns
    /// whether the tree still holds any node besides the root.
    pub fn del_peer(&mut self, peer: ShortPeerId, mut notify: impl FnMut(ShortPeerId)) -> bool {
        if let Some(&idx) = self.index.get(&peer)
            && idx != self.root
        {
            if let Err(e) = self.delete_path(peer, &mut notify) {
                debug!(peer = %peer, error = %e, "Failed to delete path");
            }
            // Inside a detached subtree the node still hangs off its parent
            if let Some(parent) = self.node_mut(idx).parent.take() {
                self.node_mut(parent).children.retain(|&c| c != idx);
            }
            let mut doomed = self.subtree(idx);
            doomed.reverse();
            for i in doomed {
                if i != idx {
                    notify(self.node(i).peer);
                }
                self.release(i);
            }
            trace!(peer = %peer, "Peer destroyed in tunnel tree");
        }
        self.len() > 1
    }

    // === Internals ===

    fn node(&self, idx: NodeIdx) -> &TreeNode {
        match &self.nodes[idx.0] {
            Some(node) => node,
            None => unreachable!("vacant tree slot {} still referenced", idx.0),
        }
    }

    fn node_mut(&mut self, idx: NodeIdx) -> &mut TreeNode {
        match &mut self.nodes[idx.0] {
            Some(node) => node,
            None => unreachable!("vacant tree slot {} still referenced", idx.0),
        }
    }

    fn info(&self, idx: NodeIdx) -> NodeInfo {
        let node = self.node(idx);
        NodeInfo {
            peer: node.peer,
            parent: node.parent.map(|p| self.node(p).peer),
            status: node.status,
            role: node.role,
            first_hop: node.first_hop,
        }
    }

    fn alloc(&mut self, node: TreeNode) -> NodeIdx {
        let peer = node.peer;
        let idx = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeIdx(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeIdx(self.nodes.len() - 1)
            }
        };
        self.index.insert(peer, idx);
        idx
    }

    fn release(&mut self, idx: NodeIdx) {
        if let Some(node) = self.nodes[idx.0].take() {
            self.index.remove(&node.peer);
            self.free.push(idx.0);
        }
    }

    fn is_attached(&self, mut idx: NodeIdx) -> bool {
        loop {
            if idx == self.root {
                return true;
            }
            match self.node(idx).parent {
                Some(parent) => idx = parent,
                None => return false,
            }
        }
    }

    fn child_with_peer(&self, parent: NodeIdx, peer: ShortPeerId) -> Option<NodeIdx> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&c| self.node(c).peer == peer)
    }

    /// `idx` and all its descendants, breadth first.
    fn subtree(&self, idx: NodeIdx) -> Vec<NodeIdx> {
        let mut out = vec![idx];
        let mut i = 0;
        while i < out.len() {
            out.extend(self.node(out[i]).children.iter().copied());
            i += 1;
        }
        out
    }

    /// Re-parent `idx` under `new_parent`, reporting its subtree and
    /// pruning what it leaves behind.
    fn move_node(
        &mut self,
        idx: NodeIdx,
        new_parent: NodeIdx,
        reported: &mut HashSet<ShortPeerId>,
        notify: &mut dyn FnMut(ShortPeerId),
    ) {
        let old_parent = self.node(idx).parent;
        if let Some(old) = old_parent {
            self.node_mut(old).children.retain(|&c| c != idx);
        }
        self.node_mut(idx).parent = Some(new_parent);
        self.node_mut(new_parent).children.push(idx);

        for i in self.subtree(idx) {
            let node = self.node_mut(i);
            if matches!(node.status, NodeStatus::Connected | NodeStatus::Disconnected) {
                node.status = NodeStatus::Reconnecting;
            }
            if reported.insert(node.peer) {
                notify(node.peer);
            }
        }
        trace!(peer = %self.node(idx).peer, "Tunnel node moved");

        if let Some(old) = old_parent {
            self.prune_from(old, reported, notify);
        }
    }

    /// Remove childless relays starting at `idx` and walking up.
    fn prune_from(
        &mut self,
        idx: NodeIdx,
        reported: &mut HashSet<ShortPeerId>,
        notify: &mut dyn FnMut(ShortPeerId),
    ) {
        let mut current = Some(idx);
        while let Some(i) = current {
            let node = self.node(i);
            if node.role != NodeRole::Relay || !node.children.is_empty() {
                break;
            }
            let peer = node.peer;
            current = node.parent;
            if let Some(parent) = current {
                self.node_mut(parent).children.retain(|&c| c != i);
            }
            self.release(i);
            trace!(peer = %peer, "Relay pruned");
            if reported.insert(peer) {
                notify(peer);
            }
        }
    }

    /// First hop for `idx` derived from its ancestry.
    fn compute_first_hop(&self, idx: NodeIdx) -> Option<ShortPeerId> {
        if !self.is_attached(idx) || self.node(idx).peer == self.local {
            return None;
        }
        let mut current = idx;
        while let Some(parent) = self.node(current).parent {
            if self.node(parent).peer == self.local {
                return Some(self.node(current).peer);
            }
            current = parent;
        }
        // Not below us: everything goes up through our parent
        self.predecessor()
    }

    /// Recompute first hops for `idx` and propagate them downward.
    fn refresh_first_hops(&mut self, idx: NodeIdx) {
        let attached = self.is_attached(idx);
        let start = self.compute_first_hop(idx);
        let mut queue = VecDeque::from([(idx, start)]);
        while let Some((i, hop)) = queue.pop_front() {
            self.node_mut(i).first_hop = hop;
            let peer = self.node(i).peer;
            for &child in &self.node(i).children {
                let child_peer = self.node(child).peer;
                let child_hop = if !attached || child_peer == self.local {
                    None
                } else if peer == self.local {
                    Some(child_peer)
                } else {
                    hop
                };
                queue.push_back((child, child_hop));
            }
        }
    }
}

impl fmt::Display for TunnelTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tops = vec![self.root];
        let mut detached: Vec<_> = self
            .index
            .values()
            .copied()
            .filter(|&idx| idx != self.root && self.node(idx).parent.is_none())
            .collect();
        detached.sort_by_key(|&idx| self.node(idx).peer);
        tops.extend(detached);

        for top in tops {
            let mut stack = vec![(top, 0usize)];
            while let Some((i, depth)) = stack.pop() {
                let node = self.node(i);
                write!(
                    f,
                    "{:indent$}{} [{} {}]",
                    "",
                    node.peer,
                    node.role,
                    node.status,
                    indent = depth * 2
                )?;
                if let Some(hop) = node.first_hop {
                    write!(f, " via {}", hop)?;
                }
                if depth == 0 && i != self.root {
                    write!(f, " (detached)")?;
                }
                writeln!(f)?;
                for &child in node.children.iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TunnelTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelTree")
            .field("root", &self.root())
            .field("local", &self.local)
            .field("nodes", &self.len())
            .field("detached", &self.detached().len())
            .finish()
    }
}
