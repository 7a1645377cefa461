//! Hierarchical scene graph.
//!
//! Nodes are an enum of small structs: groups own children, primitive nodes
//! own exactly one primitive, material and camera nodes own one material or
//! camera. Only groups and primitive nodes carry bounding boxes.
//!
//! Scene walks go through a single depth-first [`walk`] driven by a
//! [`Traversal`] strategy with three hooks.

use std::fmt::Write as _;
use std::sync::Arc;

use lum_math::BBox;
use thiserror::Error;

use crate::camera::Camera;
use crate::hit::Primitive;

/// Errors raised while editing the graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Cannot append child '{child}' to {kind} node '{parent}'")]
    ChildrenNotSupported {
        kind: &'static str,
        parent: String,
        child: String,
    },
}

pub type NodeResult<T> = Result<T, NodeError>;

/// Inner node holding children and their aggregate bounds.
#[derive(Debug, Clone)]
pub struct GroupNode {
    pub name: String,
    children: Vec<Node>,
    bbox: BBox,
}

/// Leaf owning one primitive; its bounds are the primitive's.
#[derive(Debug, Clone)]
pub struct PrimitiveNode {
    pub name: String,
    pub primitive: Arc<dyn Primitive>,
}

/// Leaf referring to an entry of the scene material table.
#[derive(Debug, Clone)]
pub struct MaterialNode {
    pub name: String,
    pub material_index: usize,
}

/// Leaf owning a camera definition.
#[derive(Debug, Clone)]
pub struct CameraNode {
    pub name: String,
    pub camera: Camera,
}

/// A scene graph node.
#[derive(Debug, Clone)]
pub enum Node {
    Group(GroupNode),
    Primitive(PrimitiveNode),
    Material(MaterialNode),
    Camera(CameraNode),
}

impl Node {
    /// Create an empty group.
    pub fn group(name: impl Into<String>) -> Self {
        Node::Group(GroupNode {
            name: name.into(),
            children: Vec::new(),
            bbox: BBox::INVALID,
        })
    }

    /// Create a primitive leaf named after its primitive.
    pub fn primitive(primitive: Arc<dyn Primitive>) -> Self {
        Node::Primitive(PrimitiveNode {
            name: primitive.name().to_string(),
            primitive,
        })
    }

    pub fn material(name: impl Into<String>, material_index: usize) -> Self {
        Node::Material(MaterialNode {
            name: name.into(),
            material_index,
        })
    }

    pub fn camera(name: impl Into<String>, camera: Camera) -> Self {
        Node::Camera(CameraNode {
            name: name.into(),
            camera,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Group(n) => &n.name,
            Node::Primitive(n) => &n.name,
            Node::Material(n) => &n.name,
            Node::Camera(n) => &n.name,
        }
    }

    /// Short label for the node variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Group(_) => "group",
            Node::Primitive(_) => "primitive",
            Node::Material(_) => "material",
            Node::Camera(_) => "camera",
        }
    }

    pub fn is_primitive_node(&self) -> bool {
        matches!(self, Node::Primitive(_))
    }

    /// True for the variants that carry a bounding box.
    pub fn has_node_bbox(&self) -> bool {
        matches!(self, Node::Group(_) | Node::Primitive(_))
    }

    /// The node's bounding box, if this variant has one.
    pub fn get_bbox(&self) -> Option<BBox> {
        match self {
            Node::Group(n) => Some(n.bbox),
            Node::Primitive(n) => Some(n.primitive.bbox()),
            Node::Material(_) | Node::Camera(_) => None,
        }
    }

    /// Append `child` to a group node.
    ///
    /// Every other variant is a leaf and rejects children.
    pub fn append_child(&mut self, child: Node) -> NodeResult<()> {
        match self {
            Node::Group(n) => {
                n.children.push(child);
                Ok(())
            }
            other => Err(NodeError::ChildrenNotSupported {
                kind: other.kind(),
                parent: other.name().to_string(),
                child: child.name().to_string(),
            }),
        }
    }

    pub fn get_children(&self) -> &[Node] {
        match self {
            Node::Group(n) => n.children.as_slice(),
            _ => &[],
        }
    }

    fn children_mut(&mut self) -> &mut [Node] {
        match self {
            Node::Group(n) => n.children.as_mut_slice(),
            _ => &mut [],
        }
    }

    /// Depth-first search by name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name() == name {
            return Some(self);
        }
        self.get_children().iter().find_map(|c| c.find(name))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.get_children().iter().map(Node::node_count).sum::<usize>()
    }
}

/// Three-hook strategy applied by [`walk`].
///
/// `apply_before_recurse` runs pre-order, `apply_middle` after each child has
/// been walked (in-order), and `apply_after_recurse` post-order.
pub trait Traversal {
    fn apply_before_recurse(&mut self, _node: &mut Node, _depth: usize) {}

    fn apply_middle(&mut self, _node: &mut Node, _child_index: usize, _depth: usize) {}

    fn apply_after_recurse(&mut self, _node: &mut Node, _depth: usize) {}
}

/// Walk `node` depth-first, invoking the strategy hooks.
pub fn walk<T: Traversal + ?Sized>(node: &mut Node, strategy: &mut T) {
    walk_at(node, strategy, 0);
}

fn walk_at<T: Traversal + ?Sized>(node: &mut Node, strategy: &mut T, depth: usize) {
    strategy.apply_before_recurse(node, depth);
    let count = node.get_children().len();
    for i in 0..count {
        walk_at(&mut node.children_mut()[i], strategy, depth + 1);
        strategy.apply_middle(node, i, depth);
    }
    strategy.apply_after_recurse(node, depth);
}

/// Recomputes group bounds bottom-up.
///
/// Child boxes that are missing or empty are ignored so an empty subtree
/// does not spoil its parent's aggregate.
#[derive(Debug, Default)]
pub struct BBoxUpdate;

impl Traversal for BBoxUpdate {
    fn apply_after_recurse(&mut self, node: &mut Node, _depth: usize) {
        if let Node::Group(group) = node {
            group.bbox.invalidate();
            for child in &group.children {
                if let Some(child_box) = child.get_bbox().filter(BBox::has_volume) {
                    group.bbox.insert_bbox(&child_box);
                }
            }
        }
    }
}

/// Update every group box under `root` and return the root box.
///
/// An empty scene yields the unit cube, with a warning, so downstream
/// framing code always has a usable volume.
pub fn update_bboxes(root: &mut Node) -> BBox {
    walk(root, &mut BBoxUpdate);
    match root.get_bbox().filter(BBox::has_volume) {
        Some(bbox) => bbox,
        None => {
            log::warn!(
                "Scene graph '{}' has no geometry bounds, using unit cube",
                root.name()
            );
            let unit = BBox::unit_cube();
            if let Node::Group(group) = root {
                group.bbox = unit;
            }
            unit
        }
    }
}

/// Collects an indented text dump of the tree.
#[derive(Debug, Default)]
pub struct DebugDump {
    pub output: String,
}

impl Traversal for DebugDump {
    fn apply_before_recurse(&mut self, node: &mut Node, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(self.output, "{}{} '{}'", indent, node.kind(), node.name());
        match &*node {
            Node::Group(n) => {
                let _ = write!(self.output, " children={}", n.children.len());
            }
            Node::Primitive(n) => {
                let _ = write!(self.output, " material={:?}", n.primitive.material_index());
            }
            Node::Material(n) => {
                let _ = write!(self.output, " index={}", n.material_index);
            }
            Node::Camera(n) => {
                let _ = write!(self.output, " eye={}", n.camera.eye());
            }
        }
        if let Some(bbox) = node.get_bbox().filter(BBox::has_volume) {
            let _ = write!(self.output, " bbox=[{} .. {}]", bbox.min, bbox.max);
        }
        self.output.push('\n');
    }
}

/// Render `root` as an indented tree.
pub fn dump(root: &mut Node) -> String {
    let mut dumper = DebugDump::default();
    walk(root, &mut dumper);
    dumper.output
}
