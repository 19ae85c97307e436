use std::collections::HashMap;

use bevy::log::warn;
use constants::coordinate_system::normalise_frame_name;
use parking_lot::RwLock;

use super::transform::FrameTransform;
use crate::messages::geometry_msgs::TransformStamped;
use crate::messages::std_msgs::Time;

/// Guards against cycles introduced by inconsistent publishers.
const MAX_CHAIN_LENGTH: usize = 64;

/// Resolves named frames to transforms.
pub trait TransformTree: Send + Sync {
    /// Transform mapping points expressed in `source` into `target`, or
    /// `None` when the two frames are not connected.
    fn lookup(&self, source: &str, target: &str, at_time: Time) -> Option<FrameTransform>;

    fn can_transform(&self, source: &str, target: &str) -> bool {
        self.lookup(source, target, Time::default()).is_some()
    }
}

/// Like [`TransformTree::lookup`], falling back to identity when unresolvable.
pub fn transform_or_identity(tree: &dyn TransformTree, source: &str, target: &str) -> FrameTransform {
    tree.lookup(source, target, Time::default())
        .unwrap_or(FrameTransform::IDENTITY)
}

#[derive(Debug, Clone)]
struct StampedEdge {
    parent: String,
    /// Maps child coordinates into parent coordinates.
    child_to_parent: FrameTransform,
    stamp: Time,
}

/// In-memory transform forest holding the latest edge for each child frame.
///
/// Lookups walk both frames up to their nearest common ancestor. Older
/// stamps never replace newer ones; a zero stamp always replaces.
#[derive(Default)]
pub struct FrameTransformTree {
    edges: RwLock<HashMap<String, StampedEdge>>,
}

impl FrameTransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an edge. Returns `false` for malformed or stale input.
    pub fn update(&self, msg: &TransformStamped) -> bool {
        let parent = normalise_frame_name(&msg.header.frame_id);
        let child = normalise_frame_name(&msg.child_frame_id);

        if parent.is_empty() || child.is_empty() || parent == child {
            warn!(
                "Ignoring transform with invalid frames '{}' -> '{}'",
                msg.header.frame_id, msg.child_frame_id
            );
            return false;
        }

        let mut edges = self.edges.write();
        if let Some(existing) = edges.get(child) {
            if !msg.header.stamp.is_zero() && msg.header.stamp < existing.stamp {
                return false;
            }
        }

        edges.insert(
            child.to_string(),
            StampedEdge {
                parent: parent.to_string(),
                child_to_parent: FrameTransform::from(&msg.transform),
                stamp: msg.header.stamp,
            },
        );
        true
    }

    pub fn parent_of(&self, frame: &str) -> Option<String> {
        self.edges
            .read()
            .get(normalise_frame_name(frame))
            .map(|edge| edge.parent.clone())
    }

    pub fn clear(&self) {
        self.edges.write().clear();
    }

    /// Every ancestor of `frame` (itself included) with the transform into it.
    fn chain_to_root(
        edges: &HashMap<String, StampedEdge>,
        frame: &str,
    ) -> Vec<(String, FrameTransform)> {
        let mut chain = vec![(frame.to_string(), FrameTransform::IDENTITY)];
        let mut current = frame;
        let mut accumulated = FrameTransform::IDENTITY;

        while let Some(edge) = edges.get(current) {
            if chain.len() > MAX_CHAIN_LENGTH {
                warn!("Transform chain from '{}' exceeds {} links", frame, MAX_CHAIN_LENGTH);
                break;
            }
            accumulated = edge.child_to_parent.compose(&accumulated);
            chain.push((edge.parent.clone(), accumulated));
            current = &edge.parent;
        }
        chain
    }
}

impl TransformTree for FrameTransformTree {
    fn lookup(&self, source: &str, target: &str, _at_time: Time) -> Option<FrameTransform> {
        let source = normalise_frame_name(source);
        let target = normalise_frame_name(target);
        if source == target {
            return Some(FrameTransform::IDENTITY);
        }

        let edges = self.edges.read();
        let source_chain = Self::chain_to_root(&edges, source);
        let target_chain = Self::chain_to_root(&edges, target);

        for (ancestor, target_to_ancestor) in &target_chain {
            if let Some((_, source_to_ancestor)) =
                source_chain.iter().find(|(frame, _)| frame == ancestor)
            {
                return Some(target_to_ancestor.inverse().compose(source_to_ancestor));
            }
        }
        None
    }
}
