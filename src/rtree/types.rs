//! Core geometry and node types shared by the storage codec and the engine.
//!
//! Grounded on `examples/original_source/lib/index/rect.go` (Point/Rect
//! arithmetic) and `examples/original_source/lib/tree/data.go`
//! (Node/Entry/SpatialData field shapes). The Go `NEW_PAGE_NUM` sentinel
//! used to mark an unassigned child/page is replaced here by [`PageRef`],
//! an enum that makes "not yet written to disk" a distinct, unrepresentable-
//! as-a-valid-block-number state instead of a magic constant.

use crate::disk::BlockNum;

/// A WGS84 geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Expands this point into a degenerate rect `tol` degrees wide and
    /// tall on each side, so leaf entries can be stored and reasoned about
    /// as rects like every other entry.
    #[must_use]
    pub fn to_rect(self, tol: f64) -> Rect {
        Rect { s_lat: self.lat - tol, s_lon: self.lon - tol, t_lat: self.lat + tol, t_lon: self.lon + tol }
    }

    /// Squared planar distance from this point to the nearest point of
    /// `r` (zero if `r` contains the point). Used to prune branches during
    /// nearest-neighbor search before falling back to haversine distance.
    #[must_use]
    pub fn min_dist_sq(self, r: &Rect) -> f64 {
        let mut sum = 0.0;
        if self.lat < r.s_lat {
            sum += (self.lat - r.s_lat).powi(2);
        } else if self.lat > r.t_lat {
            sum += (self.lat - r.t_lat).powi(2);
        }
        if self.lon < r.s_lon {
            sum += (self.lon - r.s_lon).powi(2);
        } else if self.lon > r.t_lon {
            sum += (self.lon - r.t_lon).powi(2);
        }
        sum
    }
}

/// An axis-aligned bounding rectangle: `s` (south-west / minimum) corner
/// and `t` (north-east / maximum) corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub s_lat: f64,
    pub s_lon: f64,
    pub t_lat: f64,
    pub t_lon: f64,
}

impl Rect {
    #[must_use]
    pub fn area(&self) -> f64 {
        (self.t_lat - self.s_lat) * (self.t_lon - self.s_lon)
    }

    #[must_use]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.s_lat <= other.s_lat && other.t_lat <= self.t_lat && self.s_lon <= other.s_lon && other.t_lon <= self.t_lon
    }

    /// The smallest rect enclosing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            s_lat: self.s_lat.min(other.s_lat),
            s_lon: self.s_lon.min(other.s_lon),
            t_lat: self.t_lat.max(other.t_lat),
            t_lon: self.t_lon.max(other.t_lon),
        }
    }

    /// How much `self`'s area would grow to enclose `other` as well.
    #[must_use]
    pub fn enlargement(&self, other: &Rect) -> f64 {
        self.union(other).area() - self.area()
    }

    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.s_lat <= other.t_lat && other.s_lat <= self.t_lat && self.s_lon <= other.t_lon && other.s_lon <= self.t_lon
    }
}

/// The payload carried by a leaf entry: a location plus an opaque blob.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialData {
    pub location: Point,
    pub data: Vec<u8>,
}

impl SpatialData {
    #[must_use]
    pub fn new(location: Point, data: Vec<u8>) -> Self {
        Self { location, data }
    }

    #[must_use]
    pub fn bounds(&self, tol: f64) -> Rect {
        self.location.to_rect(tol)
    }
}

/// A reference to a node's page: either not yet assigned a block (a node
/// built in memory that hasn't been written out) or bound to a concrete
/// on-disk block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRef {
    Unassigned,
    Assigned(BlockNum),
}

impl PageRef {
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        matches!(self, PageRef::Assigned(_))
    }

    #[must_use]
    pub fn block_num(&self) -> Option<BlockNum> {
        match self {
            PageRef::Assigned(b) => Some(*b),
            PageRef::Unassigned => None,
        }
    }
}

/// One entry in a node: a bounding rect plus either a child page (internal
/// nodes) or a spatial payload (leaf nodes).
#[derive(Debug, Clone)]
pub struct Entry {
    pub rect: Rect,
    pub child: PageRef,
    pub obj: SpatialData,
}

impl Entry {
    #[must_use]
    pub fn leaf(obj: SpatialData, tol: f64) -> Self {
        let rect = obj.bounds(tol);
        Self { rect, child: PageRef::Unassigned, obj }
    }

    #[must_use]
    pub fn internal(rect: Rect, child: PageRef) -> Self {
        Self { rect, child, obj: SpatialData::new(Point::new(0.0, 0.0), Vec::new()) }
    }
}

/// A single page's worth of R-tree entries: either a leaf node (entries
/// carry spatial payloads) or an internal node (entries carry child page
/// references), plus the bookkeeping needed to walk back up the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub entries: Vec<Entry>,
    pub parent: PageRef,
    pub page_num: PageRef,
    pub level: u16,
    pub leaf: bool,
}

impl Node {
    #[must_use]
    pub fn new(entries: Vec<Entry>, parent: PageRef, level: u16, leaf: bool) -> Self {
        Self { entries, parent, page_num: PageRef::Unassigned, level, leaf }
    }

    #[must_use]
    pub fn empty(leaf: bool, level: u16) -> Self {
        Self::new(Vec::new(), PageRef::Unassigned, level, leaf)
    }

    /// The bounding rect of this node: the union of all its entries' rects.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect> {
        self.entries.iter().map(|e| e.rect).reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_encloses_both_inputs() {
        let a = Rect { s_lat: 0.0, s_lon: 0.0, t_lat: 1.0, t_lon: 1.0 };
        let b = Rect { s_lat: 2.0, s_lon: 2.0, t_lat: 3.0, t_lon: 3.0 };
        let u = a.union(&b);
        assert!(u.contains_rect(&a));
        assert!(u.contains_rect(&b));
    }

    #[test]
    fn enlargement_is_zero_when_already_contained() {
        let outer = Rect { s_lat: 0.0, s_lon: 0.0, t_lat: 10.0, t_lon: 10.0 };
        let inner = Rect { s_lat: 1.0, s_lon: 1.0, t_lat: 2.0, t_lon: 2.0 };
        assert_eq!(outer.enlargement(&inner), 0.0);
    }

    #[test]
    fn min_dist_sq_is_zero_inside_rect() {
        let r = Rect { s_lat: 0.0, s_lon: 0.0, t_lat: 10.0, t_lon: 10.0 };
        let p = Point::new(5.0, 5.0);
        assert_eq!(p.min_dist_sq(&r), 0.0);
    }

    #[test]
    fn min_dist_sq_matches_axis_distance_outside_rect() {
        let r = Rect { s_lat: 0.0, s_lon: 0.0, t_lat: 10.0, t_lon: 10.0 };
        let p = Point::new(15.0, 0.0);
        assert_eq!(p.min_dist_sq(&r), 25.0);
    }
}
