//! Tiling layout engine.
//!
//! Partitions an ordered camera list into a balanced binary space
//! partition: every internal node splits its rectangle 50/50 along an
//! axis that alternates with depth, so N feeds tile the screen edge to
//! edge with no gaps and no overlap, for any N.
//!
//! The whole tree is rebuilt from scratch whenever the input list's
//! membership or order changes — N is tens, not thousands, and a total
//! rebuild keeps the function pure and trivially testable.
//!
//! Note the 50/50 share is taken regardless of how many leaves each
//! subtree holds: three cameras split 1/3 : 2/3 by area, not by count.
//! That asymmetry is part of the contract — do not "fix" it here.

use crate::model::{Camera, CameraId};

// ── Tile ────────────────────────────────────────────────────────────

/// Direction an internal node divides its rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAxis {
    /// Children stack top/bottom.
    Horizontal,
    /// Children sit left/right.
    Vertical,
}

/// Share of the parent rectangle each child receives, in percent.
pub const EVEN_SHARE: u8 = 50;

/// A node in the partition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tile {
    /// Terminal rectangle showing exactly one camera.
    Leaf { camera: CameraId },

    /// Internal division into exactly two children.
    Split {
        axis: SplitAxis,
        children: Box<[Branch; 2]>,
    },
}

/// One child of a split, with its percentage share of the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub share: u8,
    pub tile: Tile,
}

impl Tile {
    /// Leaf camera ids in left-to-right display order.
    pub fn leaves(&self) -> Vec<&CameraId> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Split { children, .. } => {
                children[0].tile.leaf_count() + children[1].tile.leaf_count()
            }
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a CameraId>) {
        match self {
            Self::Leaf { camera } => out.push(camera),
            Self::Split { children, .. } => {
                children[0].tile.collect_leaves(out);
                children[1].tile.collect_leaves(out);
            }
        }
    }
}

// ── Construction ────────────────────────────────────────────────────

/// Build the partition tree for an order-sorted camera list.
///
/// Pure, deterministic, and total: an empty list yields no tile, one
/// camera yields a bare leaf, and larger lists yield a balanced tree of
/// depth `ceil(log2 N)`.
pub fn build_layout(cameras: &[Camera]) -> Option<Tile> {
    if cameras.is_empty() {
        return None;
    }
    Some(subdivide(cameras, 0))
}

/// Split `cameras` at the midpoint and recurse, alternating the axis:
/// vertical at even depths, horizontal at odd depths.
fn subdivide(cameras: &[Camera], depth: usize) -> Tile {
    if let [only] = cameras {
        return Tile::Leaf {
            camera: only.id.clone(),
        };
    }

    let axis = if depth % 2 == 0 {
        SplitAxis::Vertical
    } else {
        SplitAxis::Horizontal
    };
    let (left, right) = cameras.split_at(cameras.len() / 2);

    Tile::Split {
        axis,
        children: Box::new([
            Branch {
                share: EVEN_SHARE,
                tile: subdivide(left, depth + 1),
            },
            Branch {
                share: EVEN_SHARE,
                tile: subdivide(right, depth + 1),
            },
        ]),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cameras(n: usize) -> Vec<Camera> {
        (1..=n)
            .map(|i| Camera {
                id: CameraId::numbered(i),
                address: format!("http://10.0.0.{i}/stream"),
                order: u32::try_from(i).unwrap() - 1,
            })
            .collect()
    }

    #[test]
    fn empty_list_yields_no_tile() {
        assert_eq!(build_layout(&[]), None);
    }

    #[test]
    fn single_camera_yields_a_bare_leaf() {
        let cams = cameras(1);
        let tile = build_layout(&cams).unwrap();
        assert_eq!(
            tile,
            Tile::Leaf {
                camera: CameraId::numbered(1)
            }
        );
    }

    #[test]
    fn three_cameras_split_vertical_then_horizontal() {
        let cams = cameras(3);
        let tile = build_layout(&cams).unwrap();

        let Tile::Split { axis, children } = tile else {
            panic!("expected a root split");
        };
        assert_eq!(axis, SplitAxis::Vertical);
        assert_eq!(children[0].share, EVEN_SHARE);
        assert_eq!(children[1].share, EVEN_SHARE);

        // Left half is [X], right half is [Y, Z] split horizontally.
        assert_eq!(
            children[0].tile,
            Tile::Leaf {
                camera: CameraId::numbered(1)
            }
        );
        let Tile::Split { axis, children } = &children[1].tile else {
            panic!("expected the right half to split again");
        };
        assert_eq!(*axis, SplitAxis::Horizontal);
        assert_eq!(
            children[0].tile,
            Tile::Leaf {
                camera: CameraId::numbered(2)
            }
        );
        assert_eq!(
            children[1].tile,
            Tile::Leaf {
                camera: CameraId::numbered(3)
            }
        );
    }

    #[test]
    fn every_camera_appears_exactly_once_in_input_order() {
        for n in 1..=12 {
            let cams = cameras(n);
            let tile = build_layout(&cams).unwrap();

            assert_eq!(tile.leaf_count(), n, "leaf count for n={n}");

            let leaves: Vec<&str> = tile.leaves().iter().map(|id| id.as_str()).collect();
            let expected: Vec<String> =
                cams.iter().map(|c| c.id.as_str().to_owned()).collect();
            assert_eq!(leaves, expected, "leaf order for n={n}");
        }
    }

    #[test]
    fn rebuilding_an_unchanged_list_is_structurally_identical() {
        let cams = cameras(7);
        assert_eq!(build_layout(&cams), build_layout(&cams));
    }

    #[test]
    fn tree_depth_is_logarithmic() {
        fn depth(tile: &Tile) -> usize {
            match tile {
                Tile::Leaf { .. } => 0,
                Tile::Split { children, .. } => {
                    1 + depth(&children[0].tile).max(depth(&children[1].tile))
                }
            }
        }

        for (n, expected) in [(1, 0), (2, 1), (4, 2), (8, 3), (9, 4)] {
            let cams = cameras(n);
            let tile = build_layout(&cams).unwrap();
            assert_eq!(depth(&tile), expected, "depth for n={n}");
        }
    }
}
