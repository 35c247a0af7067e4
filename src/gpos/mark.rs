//! Mark attachment positioning (lookup types 4, 5 and 6).

use crate::binary::read::{ReadBinaryDep, ReadCtxt, ReadScope};
use crate::binary::U16Be;
use crate::error::DecodeError;
use crate::gpos::anchor::{Anchor, AnchorMatrix, MarkArray, MarkRecord};
use crate::gpos::DecodeContext;
use crate::layout::{read_objects_dep, read_offset_table, Coverage};

/// Attaches marks to base glyphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkBasePos {
    pub mark_coverage: Coverage,
    pub base_coverage: Coverage,
    pub class_count: u16,
    pub mark_array: MarkArray,
    /// A row per covered base glyph.
    pub base_array: AnchorMatrix,
}

/// Attaches marks to the components of ligatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkLigPos {
    pub mark_coverage: Coverage,
    pub ligature_coverage: Coverage,
    pub class_count: u16,
    pub mark_array: MarkArray,
    /// A matrix per covered ligature with a row per component.
    pub ligature_array: Vec<AnchorMatrix>,
}

/// Attaches marks (mark1) to other marks (mark2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkMarkPos {
    pub mark1_coverage: Coverage,
    pub mark2_coverage: Coverage,
    pub class_count: u16,
    pub mark1_array: MarkArray,
    /// A row per covered mark2 glyph.
    pub mark2_array: AnchorMatrix,
}

// The layout shared by the three mark attachment subtables after posFormat.
struct MarkAttachment {
    mark_coverage: Coverage,
    target_coverage: Coverage,
    class_count: u16,
    mark_array: MarkArray,
    target_offset: usize,
}

fn read_mark_attachment<'a>(
    ctxt: &mut ReadCtxt<'a>,
    scope: ReadScope<'a>,
    context: DecodeContext<'a>,
) -> Result<MarkAttachment, DecodeError> {
    match ctxt.read_u16be()? {
        1 => {
            let mark_coverage = read_offset_table::<Coverage>(&scope, ctxt, ())?;
            let target_coverage = read_offset_table::<Coverage>(&scope, ctxt, ())?;
            let class_count = ctxt.read_u16be()?;
            let mark_array =
                read_offset_table::<MarkArray>(&scope, ctxt, (class_count, context))?;
            let target_offset = usize::from(ctxt.read_u16be()?);
            Ok(MarkAttachment {
                mark_coverage,
                target_coverage,
                class_count,
                mark_array,
                target_offset,
            })
        }
        format => Err(DecodeError::UnknownFormat(format)),
    }
}

impl ReadBinaryDep for MarkBasePos {
    type Args<'a> = DecodeContext<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        context: DecodeContext<'a>,
    ) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let header = read_mark_attachment(ctxt, scope, context)?;
        let base_array = scope
            .offset(header.target_offset)
            .read_dep::<AnchorMatrix>((header.class_count, context))?;
        Ok(MarkBasePos {
            mark_coverage: header.mark_coverage,
            base_coverage: header.target_coverage,
            class_count: header.class_count,
            mark_array: header.mark_array,
            base_array,
        })
    }
}

impl ReadBinaryDep for MarkLigPos {
    type Args<'a> = DecodeContext<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        context: DecodeContext<'a>,
    ) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let header = read_mark_attachment(ctxt, scope, context)?;
        let ligature_array_scope = scope.offset(header.target_offset);
        let mut ligature_array_ctxt = ligature_array_scope.ctxt();
        let ligature_count = usize::from(ligature_array_ctxt.read_u16be()?);
        let ligature_attach_offsets = ligature_array_ctxt.read_array::<U16Be>(ligature_count)?;
        let ligature_array = read_objects_dep::<AnchorMatrix>(
            &ligature_array_scope,
            ligature_attach_offsets,
            (header.class_count, context),
        )?;
        Ok(MarkLigPos {
            mark_coverage: header.mark_coverage,
            ligature_coverage: header.target_coverage,
            class_count: header.class_count,
            mark_array: header.mark_array,
            ligature_array,
        })
    }
}

impl ReadBinaryDep for MarkMarkPos {
    type Args<'a> = DecodeContext<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        context: DecodeContext<'a>,
    ) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let header = read_mark_attachment(ctxt, scope, context)?;
        let mark2_array = scope
            .offset(header.target_offset)
            .read_dep::<AnchorMatrix>((header.class_count, context))?;
        Ok(MarkMarkPos {
            mark1_coverage: header.mark_coverage,
            mark2_coverage: header.target_coverage,
            class_count: header.class_count,
            mark1_array: header.mark_array,
            mark2_array,
        })
    }
}

fn mark_record<'s>(
    coverage: &Coverage,
    mark_array: &'s MarkArray,
    mark_glyph: u16,
) -> Option<&'s MarkRecord> {
    let mark_index = coverage.glyph_coverage_value(mark_glyph)?;
    mark_array.mark_record(mark_index)
}

impl MarkBasePos {
    /// The base anchor and mark anchor for attaching `mark_glyph` to `base_glyph`.
    pub fn anchors(&self, base_glyph: u16, mark_glyph: u16) -> Option<(&Anchor, &Anchor)> {
        let base_index = self.base_coverage.glyph_coverage_value(base_glyph)?;
        let mark = mark_record(&self.mark_coverage, &self.mark_array, mark_glyph)?;
        let base_anchor = self
            .base_array
            .anchor(usize::from(base_index), mark.mark_class)?;
        Some((base_anchor, &mark.mark_anchor))
    }
}

impl MarkLigPos {
    /// The ligature anchor and mark anchor for attaching `mark_glyph` to component
    /// `component_index` of `ligature_glyph`.
    pub fn anchors(
        &self,
        ligature_glyph: u16,
        component_index: usize,
        mark_glyph: u16,
    ) -> Option<(&Anchor, &Anchor)> {
        let ligature_index = self.ligature_coverage.glyph_coverage_value(ligature_glyph)?;
        let mark = mark_record(&self.mark_coverage, &self.mark_array, mark_glyph)?;
        let ligature_attach = self.ligature_array.get(usize::from(ligature_index))?;
        let ligature_anchor = ligature_attach.anchor(component_index, mark.mark_class)?;
        Some((ligature_anchor, &mark.mark_anchor))
    }
}

impl MarkMarkPos {
    /// The mark2 anchor and mark1 anchor for attaching `mark1_glyph` to `mark2_glyph`.
    pub fn anchors(&self, mark2_glyph: u16, mark1_glyph: u16) -> Option<(&Anchor, &Anchor)> {
        let mark2_index = self.mark2_coverage.glyph_coverage_value(mark2_glyph)?;
        let mark1 = mark_record(&self.mark1_coverage, &self.mark1_array, mark1_glyph)?;
        let mark2_anchor = self
            .mark2_array
            .anchor(usize::from(mark2_index), mark1.mark_class)?;
        Some((mark2_anchor, &mark1.mark_anchor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpos::DecodeOptions;
    use crate::tests::writer::{self, TtfType::*};

    fn context(scope: ReadScope<'_>) -> DecodeContext<'_> {
        DecodeContext::new(scope, DecodeOptions::default())
    }

    // Two mark classes. Mark glyph 200 is class 0, 201 is class 1. The target array offset
    // (at byte 10) is left for each test to fill in.
    fn mark_attachment_prefix() -> Vec<writer::TtfType> {
        vec![
            UInt16(1),  // posFormat
            UInt16(12), // markCoverageOffset
            UInt16(20), // targetCoverageOffset
            UInt16(2),  // classCount
            UInt16(26), // markArrayOffset
        ]
    }

    fn mark_attachment_tables() -> Vec<writer::TtfType> {
        vec![
            // mark coverage @ 12
            UInt16(1),
            UInt16(2),
            UInt16(200),
            UInt16(201),
            // target coverage @ 20
            UInt16(1),
            UInt16(1),
            UInt16(100),
            // MarkArray @ 26
            UInt16(2),
            UInt16(0),  // class
            UInt16(10), // anchor @ 36
            UInt16(1),  // class
            UInt16(16), // anchor @ 42
            UInt16(1),
            Int16(10),
            Int16(-10),
            UInt16(1),
            Int16(20),
            Int16(-20),
        ]
    }

    fn mark_base_data() -> Vec<u8> {
        let mut fields = mark_attachment_prefix();
        fields.push(UInt16(48)); // baseArrayOffset
        fields.extend(mark_attachment_tables());
        fields.extend_from_slice(&[
            // BaseArray @ 48
            UInt16(1),  // baseCount
            UInt16(0),  // class 0 anchor
            UInt16(6),  // class 1 anchor
            UInt16(1),
            Int16(300),
            Int16(700),
        ]);
        writer::convert(&fields)
    }

    #[test]
    fn test_mark_base() {
        let data = mark_base_data();
        let scope = ReadScope::new(&data);
        let mark_base = scope.read_dep::<MarkBasePos>(context(scope)).unwrap();

        assert_eq!(mark_base.base_array.rows(), 1);
        assert!(mark_base.anchors(100, 200).is_none());
        let (base_anchor, mark_anchor) = mark_base.anchors(100, 201).unwrap();
        assert_eq!((base_anchor.x, base_anchor.y), (300, 700));
        assert_eq!((mark_anchor.x, mark_anchor.y), (20, -20));
        assert!(mark_base.anchors(101, 201).is_none());
    }

    fn mark_lig_data() -> Vec<u8> {
        let mut fields = mark_attachment_prefix();
        fields.push(UInt16(48)); // ligatureArrayOffset
        fields.extend(mark_attachment_tables());
        fields.extend_from_slice(&[
            // LigatureArray @ 48
            UInt16(1), // ligatureCount
            UInt16(4), // LigatureAttach @ 52
            // LigatureAttach @ 52
            UInt16(2),  // componentCount
            UInt16(10), // [0][0]
            UInt16(0),  // [0][1]
            UInt16(0),  // [1][0]
            UInt16(16), // [1][1]
            UInt16(1),
            Int16(1),
            Int16(2),
            UInt16(1),
            Int16(3),
            Int16(4),
        ]);
        writer::convert(&fields)
    }

    #[test]
    fn test_mark_lig() {
        let data = mark_lig_data();
        let scope = ReadScope::new(&data);
        let mark_lig = scope.read_dep::<MarkLigPos>(context(scope)).unwrap();

        assert_eq!(mark_lig.ligature_array.len(), 1);
        assert_eq!(mark_lig.ligature_array[0].rows(), 2);
        let (ligature_anchor, _) = mark_lig.anchors(100, 0, 200).unwrap();
        assert_eq!((ligature_anchor.x, ligature_anchor.y), (1, 2));
        let (ligature_anchor, mark_anchor) = mark_lig.anchors(100, 1, 201).unwrap();
        assert_eq!((ligature_anchor.x, ligature_anchor.y), (3, 4));
        assert_eq!(mark_anchor.x, 20);
        assert!(mark_lig.anchors(100, 1, 200).is_none());
        assert!(mark_lig.anchors(100, 2, 200).is_none());
    }

    fn mark_mark_data() -> Vec<u8> {
        let mut fields = mark_attachment_prefix();
        fields.push(UInt16(48)); // mark2ArrayOffset
        fields.extend(mark_attachment_tables());
        fields.extend_from_slice(&[
            // Mark2Array @ 48
            UInt16(1),
            UInt16(6),
            UInt16(6),
            UInt16(1),
            Int16(-5),
            Int16(900),
        ]);
        writer::convert(&fields)
    }

    #[test]
    fn test_mark_mark() {
        let data = mark_mark_data();
        let scope = ReadScope::new(&data);
        let mark_mark = scope.read_dep::<MarkMarkPos>(context(scope)).unwrap();

        let (mark2_anchor, mark1_anchor) = mark_mark.anchors(100, 200).unwrap();
        assert_eq!((mark2_anchor.x, mark2_anchor.y), (-5, 900));
        assert_eq!((mark1_anchor.x, mark1_anchor.y), (10, -10));
    }

    #[test]
    fn test_truncated() {
        // The last byte of each table belongs to the anchor of the last target glyph.
        fn decode(data: &[u8], lookup_type: u16) -> Result<(), DecodeError> {
            let scope = ReadScope::new(data);
            match lookup_type {
                4 => scope.read_dep::<MarkBasePos>(context(scope)).map(drop),
                5 => scope.read_dep::<MarkLigPos>(context(scope)).map(drop),
                _ => scope.read_dep::<MarkMarkPos>(context(scope)).map(drop),
            }
        }

        for (data, lookup_type) in [
            (mark_base_data(), 4),
            (mark_lig_data(), 5),
            (mark_mark_data(), 6),
        ] {
            assert_eq!(decode(&data, lookup_type), Ok(()));
            let truncated = &data[..data.len() - 1];
            assert_eq!(
                decode(truncated, lookup_type),
                Err(DecodeError::BufferBounds),
                "lookup type {}",
                lookup_type
            );
        }
    }

    #[test]
    fn test_mark_class_not_below_class_count() {
        let data = writer::convert(&[
            UInt16(1),
            UInt16(12),
            UInt16(12),
            UInt16(1), // classCount
            UInt16(18),
            UInt16(0),
            // coverage @ 12
            UInt16(1),
            UInt16(1),
            UInt16(200),
            // MarkArray @ 18
            UInt16(1),
            UInt16(1), // class 1 with classCount 1
            UInt16(6),
            UInt16(1),
            Int16(0),
            Int16(0),
        ]);
        let scope = ReadScope::new(&data);
        assert_eq!(
            scope.read_dep::<MarkBasePos>(context(scope)),
            Err(DecodeError::InconsistentCount)
        );
    }

    #[test]
    fn test_unknown_format() {
        let data = writer::convert(&[UInt16(2), UInt16(0)]);
        let scope = ReadScope::new(&data);
        assert_eq!(
            scope.read_dep::<MarkMarkPos>(context(scope)),
            Err(DecodeError::UnknownFormat(2))
        );
    }
}
