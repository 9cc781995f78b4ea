//! # Block Side Module
//!
//! This module defines the six faces of a voxel block along with the
//! geometry each face contributes to a mesh: its outward normal, the offset to
//! the neighbouring voxel across it, and its corner positions.

/// Represents the six possible faces of a voxel block.
///
/// Each variant carries a stable discriminant used to index per-face tables
/// such as the texture atlas lookup.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Offset from a block to the neighbour that shares this face.
    pub fn neighbor_offset(self) -> [i32; 3] {
        match self {
            BlockSide::FRONT => [0, 0, 1],
            BlockSide::BACK => [0, 0, -1],
            BlockSide::BOTTOM => [0, -1, 0],
            BlockSide::TOP => [0, 1, 0],
            BlockSide::LEFT => [-1, 0, 0],
            BlockSide::RIGHT => [1, 0, 0],
        }
    }

    /// Outward unit normal of this face.
    pub fn normal(self) -> [f32; 3] {
        let [x, y, z] = self.neighbor_offset();
        [x as f32, y as f32, z as f32]
    }

    /// Corners of this face on the unit cube at the origin.
    ///
    /// The corners run bottom-left, bottom-right, top-right, top-left as seen
    /// from outside the cube, so they are counter-clockwise when viewed
    /// against the normal. Triangles `(0, 1, 2)` and `(0, 2, 3)` therefore face
    /// outward.
    pub fn corners(self) -> [[f32; 3]; 4] {
        match self {
            BlockSide::FRONT => [
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 1.0],
            ],
            BlockSide::BACK => [
                [1.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            BlockSide::BOTTOM => [
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0],
            ],
            BlockSide::TOP => [
                [0.0, 1.0, 1.0],
                [1.0, 1.0, 1.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            BlockSide::LEFT => [
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 1.0, 1.0],
                [0.0, 1.0, 0.0],
            ],
            BlockSide::RIGHT => [
                [1.0, 0.0, 1.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [1.0, 1.0, 1.0],
            ],
        }
    }

    /// Unit vector along the face's texture U axis (bottom-left to bottom-right).
    pub fn tangent(self) -> [f32; 3] {
        let [bl, br, _, _] = self.corners();
        [br[0] - bl[0], br[1] - bl[1], br[2] - bl[2]]
    }

    /// Unit vector along the face's texture V axis (bottom-left to top-left).
    pub fn bitangent(self) -> [f32; 3] {
        let [bl, _, _, tl] = self.corners();
        [tl[0] - bl[0], tl[1] - bl[1], tl[2] - bl[2]]
    }
}
