//! Pair adjustment positioning (lookup type 2).

use crate::binary::read::{ReadBinaryDep, ReadCtxt, ReadFixedSizeDep};
use crate::binary::U16Be;
use crate::error::DecodeError;
use crate::gpos::value::{ValueArgs, ValueFormat, ValueRecord};
use crate::gpos::DecodeContext;
use crate::layout::{read_objects_dep, read_offset_table, ClassDef, Coverage};
use crate::size;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairPos {
    /// Adjustments for specific glyph pairs, with one `PairSet` per covered first glyph.
    Format1 {
        coverage: Coverage,
        value_format1: ValueFormat,
        value_format2: ValueFormat,
        pair_sets: Vec<PairSet>,
    },
    /// Adjustments for pairs of glyph classes.
    Format2 {
        coverage: Coverage,
        value_format1: ValueFormat,
        value_format2: ValueFormat,
        class_def1: ClassDef,
        class_def2: ClassDef,
        class1_count: u16,
        class2_count: u16,
        /// `class1_count` rows of `class2_count` records.
        class_records: Vec<Class2Record>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSet {
    pub pair_value_records: Vec<PairValueRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairValueRecord {
    pub second_glyph: u16,
    pub value_record1: ValueRecord,
    pub value_record2: ValueRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class2Record {
    pub value_record1: ValueRecord,
    pub value_record2: ValueRecord,
}

type PairSetArgs<'a> = (ValueFormat, ValueFormat, DecodeContext<'a>);

type RecordArgs<'a> = (ValueArgs<'a>, ValueArgs<'a>);

impl ReadBinaryDep for PairPos {
    type Args<'a> = DecodeContext<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        context: DecodeContext<'a>,
    ) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();

        match ctxt.read_u16be()? {
            1 => {
                let coverage = read_offset_table::<Coverage>(&scope, ctxt, ())?;
                let value_format1 = ctxt.read::<ValueFormat>()?;
                let value_format2 = ctxt.read::<ValueFormat>()?;
                let pair_set_count = usize::from(ctxt.read_u16be()?);
                let pair_set_offsets = ctxt.read_array::<U16Be>(pair_set_count)?;
                let pair_sets = read_objects_dep::<PairSet>(
                    &scope,
                    pair_set_offsets,
                    (value_format1, value_format2, context),
                )?;
                Ok(PairPos::Format1 {
                    coverage,
                    value_format1,
                    value_format2,
                    pair_sets,
                })
            }
            2 => {
                let coverage = read_offset_table::<Coverage>(&scope, ctxt, ())?;
                let value_format1 = ctxt.read::<ValueFormat>()?;
                let value_format2 = ctxt.read::<ValueFormat>()?;
                let class_def1 = read_offset_table::<ClassDef>(&scope, ctxt, ())?;
                let class_def2 = read_offset_table::<ClassDef>(&scope, ctxt, ())?;
                let class1_count = ctxt.read_u16be()?;
                let class2_count = ctxt.read_u16be()?;
                let record_count = usize::from(class1_count)
                    .checked_mul(usize::from(class2_count))
                    .ok_or(DecodeError::BufferBounds)?;
                let class_records = ctxt
                    .read_array_dep::<Class2Record>(
                        record_count,
                        (
                            context.value_args(value_format1, scope),
                            context.value_args(value_format2, scope),
                        ),
                    )?
                    .read_to_vec()?;
                Ok(PairPos::Format2 {
                    coverage,
                    value_format1,
                    value_format2,
                    class_def1,
                    class_def2,
                    class1_count,
                    class2_count,
                    class_records,
                })
            }
            format => Err(DecodeError::UnknownFormat(format)),
        }
    }
}

impl ReadBinaryDep for PairSet {
    type Args<'a> = PairSetArgs<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (value_format1, value_format2, context): PairSetArgs<'a>,
    ) -> Result<Self, DecodeError> {
        // Device offsets in the records are relative to the PairSet.
        let scope = ctxt.scope();
        let pair_value_count = usize::from(ctxt.read_u16be()?);
        let pair_value_records = ctxt
            .read_array_dep::<PairValueRecord>(
                pair_value_count,
                (
                    context.value_args(value_format1, scope),
                    context.value_args(value_format2, scope),
                ),
            )?
            .read_to_vec()?;
        Ok(PairSet { pair_value_records })
    }
}

impl ReadBinaryDep for PairValueRecord {
    type Args<'a> = RecordArgs<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (value_args1, value_args2): RecordArgs<'a>,
    ) -> Result<Self, DecodeError> {
        let second_glyph = ctxt.read_u16be()?;
        let value_record1 = ctxt.read_dep::<ValueRecord>(value_args1)?;
        let value_record2 = ctxt.read_dep::<ValueRecord>(value_args2)?;
        Ok(PairValueRecord {
            second_glyph,
            value_record1,
            value_record2,
        })
    }
}

impl ReadFixedSizeDep for PairValueRecord {
    fn size((value_args1, value_args2): RecordArgs<'_>) -> usize {
        size::U16 + value_args1.value_format.size() + value_args2.value_format.size()
    }
}

impl ReadBinaryDep for Class2Record {
    type Args<'a> = RecordArgs<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (value_args1, value_args2): RecordArgs<'a>,
    ) -> Result<Self, DecodeError> {
        let value_record1 = ctxt.read_dep::<ValueRecord>(value_args1)?;
        let value_record2 = ctxt.read_dep::<ValueRecord>(value_args2)?;
        Ok(Class2Record {
            value_record1,
            value_record2,
        })
    }
}

impl ReadFixedSizeDep for Class2Record {
    fn size((value_args1, value_args2): RecordArgs<'_>) -> usize {
        value_args1.value_format.size() + value_args2.value_format.size()
    }
}

impl PairSet {
    pub fn pair_value_record(&self, second_glyph: u16) -> Option<&PairValueRecord> {
        self.pair_value_records
            .iter()
            .find(|record| record.second_glyph == second_glyph)
    }
}

impl PairPos {
    pub fn coverage(&self) -> &Coverage {
        match self {
            PairPos::Format1 { coverage, .. } | PairPos::Format2 { coverage, .. } => coverage,
        }
    }

    /// The adjustments for `glyph1` followed by `glyph2`, or `None` if the subtable has none.
    pub fn pair_value_records(
        &self,
        glyph1: u16,
        glyph2: u16,
    ) -> Option<(&ValueRecord, &ValueRecord)> {
        let coverage_index = self.coverage().glyph_coverage_value(glyph1)?;
        match self {
            PairPos::Format1 { pair_sets, .. } => {
                let record = pair_sets
                    .get(usize::from(coverage_index))?
                    .pair_value_record(glyph2)?;
                Some((&record.value_record1, &record.value_record2))
            }
            PairPos::Format2 {
                class_def1,
                class_def2,
                ..
            } => {
                let class1 = class_def1.glyph_class_value(glyph1);
                let class2 = class_def2.glyph_class_value(glyph2);
                let record = self.class_record(class1, class2)?;
                Some((&record.value_record1, &record.value_record2))
            }
        }
    }

    /// The record for the class pair in a format 2 subtable.
    ///
    /// Returns `None` for format 1 or for classes outside the grid.
    pub fn class_record(&self, class1: u16, class2: u16) -> Option<&Class2Record> {
        match self {
            PairPos::Format1 { .. } => None,
            PairPos::Format2 {
                class1_count,
                class2_count,
                class_records,
                ..
            } => {
                if class1 >= *class1_count || class2 >= *class2_count {
                    return None;
                }
                let index = usize::from(class1) * usize::from(*class2_count) + usize::from(class2);
                class_records.get(index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::gpos::DecodeOptions;
    use crate::tests::writer::{self, TtfType::*};

    fn read_pair_pos(data: &[u8]) -> Result<PairPos, DecodeError> {
        let scope = ReadScope::new(data);
        scope.read_dep::<PairPos>(DecodeContext::new(scope, DecodeOptions::default()))
    }

    #[test]
    fn test_format1() {
        let data = writer::convert(&[
            UInt16(1),  // posFormat
            UInt16(14), // coverageOffset
            UInt16(4),  // valueFormat1: xAdvance
            UInt16(0),  // valueFormat2
            UInt16(2),  // pairSetCount
            UInt16(22), // pairSetOffsets[0]
            UInt16(32), // pairSetOffsets[1]
            // coverage @ 14
            UInt16(1),
            UInt16(2),
            UInt16(10),
            UInt16(11),
            // PairSet @ 22 for glyph 10
            UInt16(2),
            UInt16(20),
            Int16(-50),
            UInt16(21),
            Int16(-60),
            // PairSet @ 32 for glyph 11
            UInt16(1),
            UInt16(20),
            Int16(-70),
        ]);
        let pair_pos = read_pair_pos(&data).unwrap();
        let x_advance = |g1, g2| {
            pair_pos
                .pair_value_records(g1, g2)
                .map(|(record1, _)| record1.x_advance)
        };
        assert_eq!(x_advance(10, 20), Some(-50));
        assert_eq!(x_advance(10, 21), Some(-60));
        assert_eq!(x_advance(11, 20), Some(-70));
        assert_eq!(x_advance(11, 21), None);
        assert_eq!(x_advance(12, 20), None);
    }

    #[test]
    fn test_format1_pair_set_offsets_from_array() {
        // Each PairSet is found through its own offset, not at a fixed position after the
        // header. Here the PairSets are stored in reverse order.
        let data = writer::convert(&[
            UInt16(1),
            UInt16(14),
            UInt16(4),
            UInt16(0),
            UInt16(2),
            UInt16(28), // pairSetOffsets[0]
            UInt16(22), // pairSetOffsets[1]
            // coverage @ 14
            UInt16(1),
            UInt16(2),
            UInt16(5),
            UInt16(6),
            // PairSet @ 22 for glyph 6
            UInt16(1),
            UInt16(7),
            Int16(66),
            // PairSet @ 28 for glyph 5
            UInt16(1),
            UInt16(7),
            Int16(55),
        ]);
        let pair_pos = read_pair_pos(&data).unwrap();
        assert_eq!(
            pair_pos.pair_value_records(5, 7).map(|(r, _)| r.x_advance),
            Some(55)
        );
        assert_eq!(
            pair_pos.pair_value_records(6, 7).map(|(r, _)| r.x_advance),
            Some(66)
        );
    }

    #[test]
    fn test_format2_class_grid() {
        // class1Count = 2, class2Count = 3, each record carries xAdvance = its encoded index
        let mut fields = vec![
            UInt16(2),  // posFormat
            UInt16(28), // coverageOffset
            UInt16(4),  // valueFormat1: xAdvance
            UInt16(0),  // valueFormat2
            UInt16(34), // classDef1Offset
            UInt16(44), // classDef2Offset
            UInt16(2),  // class1Count
            UInt16(3),  // class2Count
        ];
        fields.extend((0..6).map(Int16));
        fields.extend_from_slice(&[
            // coverage @ 28
            UInt16(1),
            UInt16(1),
            UInt16(40),
            // classDef1 @ 34
            UInt16(2),
            UInt16(1),
            UInt16(40),
            UInt16(40),
            UInt16(1),
            // classDef2 @ 44
            UInt16(1),
            UInt16(50),
            UInt16(2),
            UInt16(1),
            UInt16(2),
        ]);
        let data = writer::convert(&fields);
        let pair_pos = read_pair_pos(&data).unwrap();

        assert_eq!(pair_pos.class_record(1, 2).unwrap().value_record1.x_advance, 5);
        assert_eq!(pair_pos.class_record(0, 1).unwrap().value_record1.x_advance, 1);
        assert!(pair_pos.class_record(2, 0).is_none());
        assert!(pair_pos.class_record(0, 3).is_none());

        // glyph 40 is class 1, glyph 51 is class 2
        let (record1, record2) = pair_pos.pair_value_records(40, 51).unwrap();
        assert_eq!(record1.x_advance, 5);
        assert!(record2.is_zero());
        // glyph 60 is class 0
        let (record1, _) = pair_pos.pair_value_records(40, 60).unwrap();
        assert_eq!(record1.x_advance, 3);
        assert!(pair_pos.pair_value_records(41, 51).is_none());
    }

    #[test]
    fn test_format2_truncated_grid() {
        let data = writer::convert(&[
            UInt16(2),
            UInt16(0),
            UInt16(4),
            UInt16(0),
            UInt16(0),
            UInt16(0),
            UInt16(2),
            UInt16(3),
            Int16(0),
            Int16(1),
        ]);
        assert_eq!(read_pair_pos(&data), Err(DecodeError::BufferBounds));
    }
}
