//! Anchor tables and the mark and anchor arrays built from them.

use crate::binary::read::{ReadBinaryDep, ReadCtxt, ReadFixedSizeDep, ReadScope};
use crate::binary::U16Be;
use crate::error::DecodeError;
use crate::gpos::value::Device;
use crate::gpos::DecodeContext;
use crate::layout::read_objects_nullable_dep;
use crate::size;

/// An attachment point on a glyph, in design units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
    pub detail: AnchorDetail,
}

/// The format specific part of an anchor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorDetail {
    /// Format 1: design units only.
    Coordinates,
    /// Format 2: index of a glyph contour point that gives the final position after hinting.
    ContourPoint(u16),
    /// Format 3: device or variation tables adjusting each coordinate.
    Device {
        x_device: Option<Device>,
        y_device: Option<Device>,
    },
    /// An anchor format this decoder does not know. Only the coordinates were read.
    Unrecognised(u16),
}

impl ReadBinaryDep for Anchor {
    type Args<'a> = DecodeContext<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        context: DecodeContext<'a>,
    ) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let anchor_format = ctxt.read_u16be()?;
        if context.options().strict_anchors && !(1..=3).contains(&anchor_format) {
            return Err(DecodeError::UnknownFormat(anchor_format));
        }
        let x = ctxt.read_i16be()?;
        let y = ctxt.read_i16be()?;
        let detail = match anchor_format {
            1 => AnchorDetail::Coordinates,
            2 => AnchorDetail::ContourPoint(ctxt.read_u16be()?),
            3 => {
                let x_device = read_anchor_device(scope, ctxt.read_u16be()?)?;
                let y_device = read_anchor_device(scope, ctxt.read_u16be()?)?;
                AnchorDetail::Device { x_device, y_device }
            }
            _ => AnchorDetail::Unrecognised(anchor_format),
        };
        Ok(Anchor { x, y, detail })
    }
}

fn read_anchor_device(scope: ReadScope<'_>, offset: u16) -> Result<Option<Device>, DecodeError> {
    match offset {
        0 => Ok(None),
        offset => scope.offset(usize::from(offset)).read::<Device>().map(Some),
    }
}

/// Read the anchor at `offset` from `scope`, treating a zero offset as no anchor.
pub(crate) fn read_nullable_anchor<'a>(
    scope: ReadScope<'a>,
    offset: u16,
    context: DecodeContext<'a>,
) -> Result<Option<Anchor>, DecodeError> {
    match offset {
        0 => Ok(None),
        offset => scope
            .offset(usize::from(offset))
            .read_dep::<Anchor>(context)
            .map(Some),
    }
}

/// The class and attachment point of each mark covered by a mark attachment subtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkArray {
    pub mark_records: Vec<MarkRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkRecord {
    pub mark_class: u16,
    pub mark_anchor: Anchor,
}

/// The mark class count of the subtable and the decode context.
pub type ClassCountArgs<'a> = (u16, DecodeContext<'a>);

impl ReadBinaryDep for MarkArray {
    type Args<'a> = ClassCountArgs<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        args: ClassCountArgs<'a>,
    ) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let mark_count = usize::from(ctxt.read_u16be()?);
        let mark_records = ctxt
            .read_array_dep::<MarkRecord>(mark_count, (scope, args))?
            .read_to_vec()?;
        Ok(MarkArray { mark_records })
    }
}

impl ReadBinaryDep for MarkRecord {
    type Args<'a> = (ReadScope<'a>, ClassCountArgs<'a>);
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (scope, (class_count, context)): Self::Args<'a>,
    ) -> Result<Self, DecodeError> {
        let mark_class = ctxt.read_u16be()?;
        ctxt.check_count(mark_class < class_count)?;
        let mark_anchor_offset = ctxt.read_u16be()?;
        let mark_anchor = read_nullable_anchor(scope, mark_anchor_offset, context)?
            .ok_or(DecodeError::BadOffset)?;
        Ok(MarkRecord {
            mark_class,
            mark_anchor,
        })
    }
}

impl ReadFixedSizeDep for MarkRecord {
    fn size(_args: Self::Args<'_>) -> usize {
        2 * size::U16
    }
}

impl MarkArray {
    pub fn mark_record(&self, mark_index: u16) -> Option<&MarkRecord> {
        self.mark_records.get(usize::from(mark_index))
    }
}

/// Rows of anchors, one per mark class, with absent anchors as `None`.
///
/// This is the shape of the BaseArray and Mark2Array tables, where there is a row per covered
/// glyph, and of each LigatureAttach table, where there is a row per ligature component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorMatrix {
    class_count: u16,
    anchors: Vec<Option<Anchor>>,
}

impl ReadBinaryDep for AnchorMatrix {
    type Args<'a> = ClassCountArgs<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (class_count, context): ClassCountArgs<'a>,
    ) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let row_count = usize::from(ctxt.read_u16be()?);
        let anchor_count = row_count
            .checked_mul(usize::from(class_count))
            .ok_or(DecodeError::BufferBounds)?;
        let anchor_offsets = ctxt.read_array::<U16Be>(anchor_count)?;
        let anchors = read_objects_nullable_dep::<Anchor>(&scope, anchor_offsets, context)?;
        Ok(AnchorMatrix {
            class_count,
            anchors,
        })
    }
}

impl AnchorMatrix {
    pub fn rows(&self) -> usize {
        match self.class_count {
            0 => 0,
            class_count => self.anchors.len() / usize::from(class_count),
        }
    }

    /// The anchor for mark class `class` in `row`, if present.
    pub fn anchor(&self, row: usize, class: u16) -> Option<&Anchor> {
        if class >= self.class_count {
            return None;
        }
        let index = row
            .checked_mul(usize::from(self.class_count))?
            .checked_add(usize::from(class))?;
        self.anchors.get(index)?.as_ref()
    }
}
