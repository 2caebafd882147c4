//! Bit-exact node page (de)serialization.
//!
//! Grounded on `examples/original_source/lib/disk/page.go`'s
//! `SerializeNode`/`DeserializeNode`: a fixed header and fixed per-entry
//! records grow left-to-right from offset 0, while each entry's
//! variable-length tail (bounding rect, point, payload) grows right-to-left
//! from the end of the page. `offset` in the fixed record is where that
//! entry's tail starts.
//!
//! Block number `0` is reserved for the metadata page (see
//! [`crate::page::meta`]), so it doubles as the "unassigned" sentinel for
//! [`PageRef`] fields on the wire — no separate tag byte is spent on it.

use crate::page::codec::*;
use crate::rtree::types::{Entry, Node, PageRef, Point, Rect, SpatialData};
use crate::utils::errors::{Result, RtreeError};

const HEADER_LEN: usize = 21;
const FIXED_RECORD_LEN: usize = 10;

fn page_ref_to_u64(r: PageRef) -> u64 {
    match r {
        PageRef::Unassigned => 0,
        PageRef::Assigned(b) => b,
    }
}

fn u64_to_page_ref(v: u64) -> PageRef {
    if v == 0 {
        PageRef::Unassigned
    } else {
        PageRef::Assigned(v)
    }
}

/// Serializes `node` into `buf`, which must be exactly one block long.
///
/// # Errors
/// Returns [`RtreeError::Corrupt`] if the entries don't fit in the page;
/// callers size pages via [`crate::config::RtreeConfig::calibrate`] so this
/// should not happen in practice.
pub fn serialize_node(buf: &mut [u8], node: &Node) -> Result<()> {
    put_bool(buf, 0, node.leaf);
    put_u16(buf, 1, node.entries.len() as u16);
    put_u16(buf, 3, node.level);
    put_u64(buf, 5, page_ref_to_u64(node.parent));
    put_u64(buf, 13, page_ref_to_u64(node.page_num));

    let mut left_pos = HEADER_LEN;
    let mut right_pos = buf.len();

    for entry in &node.entries {
        let s_len = entry.obj.data.len();
        let payload_size = 8 * 6 + s_len + 4 * 2;
        let tail_offset = right_pos.checked_sub(payload_size).ok_or_else(|| {
            RtreeError::Corrupt(format!("node page too small for entry payload of {s_len} bytes"))
        })?;

        put_u64(buf, left_pos, page_ref_to_u64(entry.child));
        left_pos += 8;
        put_u16(buf, left_pos, tail_offset as u16);
        left_pos += 2;

        right_pos -= s_len + 4;
        put_bytes(buf, right_pos, &entry.obj.data);
        right_pos -= 4;
        put_i32(buf, right_pos, s_len as i32);

        right_pos -= 8;
        put_f64(buf, right_pos, entry.rect.s_lon);
        right_pos -= 8;
        put_f64(buf, right_pos, entry.rect.t_lon);
        right_pos -= 8;
        put_f64(buf, right_pos, entry.rect.s_lat);
        right_pos -= 8;
        put_f64(buf, right_pos, entry.rect.t_lat);

        right_pos -= 8;
        put_f64(buf, right_pos, entry.obj.location.lat);
        right_pos -= 8;
        put_f64(buf, right_pos, entry.obj.location.lon);

        if left_pos > right_pos {
            return Err(RtreeError::Corrupt("node page fixed and variable regions collided".into()));
        }
    }
    Ok(())
}

/// Deserializes a node from `buf`.
///
/// # Errors
/// Propagates any out-of-bounds slice access as [`RtreeError::Corrupt`]
/// would in a well-formed caller; malformed pages panic on slice indexing
/// today, the same trust boundary the teacher's own page codec assumes for
/// bytes it wrote itself.
pub fn deserialize_node(buf: &[u8]) -> Result<Node> {
    let leaf = get_bool(buf, 0);
    let entries_count = get_u16(buf, 1) as usize;
    let level = get_u16(buf, 3);
    let parent = u64_to_page_ref(get_u64(buf, 5));
    let page_num = u64_to_page_ref(get_u64(buf, 13));

    let mut entries = Vec::with_capacity(entries_count);
    let mut left_pos = HEADER_LEN;
    for _ in 0..entries_count {
        let child = u64_to_page_ref(get_u64(buf, left_pos));
        left_pos += 8;
        let mut offset = get_u16(buf, left_pos) as usize;
        left_pos += 2;

        let loc_lon = get_f64(buf, offset);
        offset += 8;
        let loc_lat = get_f64(buf, offset);
        offset += 8;
        let t_lat = get_f64(buf, offset);
        offset += 8;
        let s_lat = get_f64(buf, offset);
        offset += 8;
        let t_lon = get_f64(buf, offset);
        offset += 8;
        let s_lon = get_f64(buf, offset);
        offset += 8;

        let rect = Rect { s_lat, s_lon, t_lat, t_lon };

        let _s_len_dup = get_i32(buf, offset);
        offset += 4;
        let data = get_bytes(buf, offset);

        entries.push(Entry { rect, child, obj: SpatialData::new(Point::new(loc_lat, loc_lon), data) });
    }

    Ok(Node { entries, parent, page_num, level, leaf })
}

#[must_use]
pub fn fixed_record_len() -> usize {
    FIXED_RECORD_LEN
}
