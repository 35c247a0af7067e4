//! Single adjustment positioning (lookup type 1).

use crate::binary::read::{ReadBinaryDep, ReadCtxt};
use crate::error::DecodeError;
use crate::gpos::value::{ValueFormat, ValueRecord};
use crate::gpos::DecodeContext;
use crate::layout::{read_offset_table, Coverage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinglePos {
    /// One adjustment applied to every covered glyph.
    Format1 {
        coverage: Coverage,
        value_format: ValueFormat,
        value_record: ValueRecord,
    },
    /// One adjustment per covered glyph, in coverage index order.
    Format2 {
        coverage: Coverage,
        value_format: ValueFormat,
        value_records: Vec<ValueRecord>,
    },
}

impl ReadBinaryDep for SinglePos {
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
                let value_format = ctxt.read::<ValueFormat>()?;
                let value_args = context.value_args(value_format, scope);
                let value_record = ctxt.read_dep::<ValueRecord>(value_args)?;
                Ok(SinglePos::Format1 {
                    coverage,
                    value_format,
                    value_record,
                })
            }
            2 => {
                let coverage = read_offset_table::<Coverage>(&scope, ctxt, ())?;
                let value_format = ctxt.read::<ValueFormat>()?;
                let value_count = usize::from(ctxt.read_u16be()?);
                let value_args = context.value_args(value_format, scope);
                let value_records = ctxt
                    .read_array_dep::<ValueRecord>(value_count, value_args)?
                    .read_to_vec()?;
                Ok(SinglePos::Format2 {
                    coverage,
                    value_format,
                    value_records,
                })
            }
            format => Err(DecodeError::UnknownFormat(format)),
        }
    }
}

impl SinglePos {
    pub fn coverage(&self) -> &Coverage {
        match self {
            SinglePos::Format1 { coverage, .. } | SinglePos::Format2 { coverage, .. } => coverage,
        }
    }

    /// The adjustment for `glyph`, or `None` if the subtable does not cover it.
    pub fn value_record(&self, glyph: u16) -> Option<&ValueRecord> {
        let coverage_index = self.coverage().glyph_coverage_value(glyph)?;
        match self {
            SinglePos::Format1 { value_record, .. } => Some(value_record),
            SinglePos::Format2 { value_records, .. } => {
                value_records.get(usize::from(coverage_index))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::gpos::value::Device;
    use crate::gpos::{DecodeOptions, DeviceBase};
    use crate::tests::writer::{self, TtfType::*};

    fn read_single_pos(data: &[u8], options: DecodeOptions) -> Result<SinglePos, DecodeError> {
        let scope = ReadScope::new(data);
        scope.read_dep::<SinglePos>(DecodeContext::new(scope, options))
    }

    #[test]
    fn test_format1_x_advance() {
        let data = writer::convert(&[
            UInt16(1),  // posFormat
            UInt16(8),  // coverageOffset
            UInt16(4),  // valueFormat: xAdvance
            Int16(120), // xAdvance
            UInt16(1),  // coverageFormat
            UInt16(1),  // glyphCount
            UInt16(36), // glyphArray[0]
        ]);
        let single_pos = read_single_pos(&data, DecodeOptions::default()).unwrap();
        let expected = ValueRecord {
            x_advance: 120,
            ..ValueRecord::default()
        };
        assert_eq!(single_pos.value_record(36), Some(&expected));
        assert_eq!(single_pos.value_record(37), None);
        match single_pos {
            SinglePos::Format1 { value_format, .. } => {
                assert_eq!(value_format, ValueFormat::X_ADVANCE)
            }
            SinglePos::Format2 { .. } => panic!("expected format 1"),
        }
    }

    #[test]
    fn test_format2() {
        let data = writer::convert(&[
            UInt16(2),  // posFormat
            UInt16(16), // coverageOffset
            UInt16(3),  // valueFormat: xPlacement | yPlacement
            UInt16(2),  // valueCount
            Int16(-1),
            Int16(-2),
            Int16(3),
            Int16(4),
            // coverage @ 16
            UInt16(2),
            UInt16(1),
            UInt16(50),
            UInt16(51),
            UInt16(0),
        ]);
        let single_pos = read_single_pos(&data, DecodeOptions::default()).unwrap();
        let record = single_pos.value_record(51).unwrap();
        assert_eq!((record.x_placement, record.y_placement), (3, 4));
        let record = single_pos.value_record(50).unwrap();
        assert_eq!((record.x_placement, record.y_placement), (-1, -2));
    }

    #[test]
    fn test_format2_truncated() {
        // valueCount claims more records than present
        let data = writer::convert(&[
            UInt16(2),
            UInt16(0),
            UInt16(4),
            UInt16(3),
            Int16(1),
            Int16(2),
        ]);
        assert_eq!(
            read_single_pos(&data, DecodeOptions::default()),
            Err(DecodeError::BufferBounds)
        );
    }

    #[test]
    fn test_unknown_format() {
        let data = writer::convert(&[UInt16(3), UInt16(0)]);
        assert_eq!(
            read_single_pos(&data, DecodeOptions::default()),
            Err(DecodeError::UnknownFormat(3))
        );
    }

    #[test]
    fn test_device_base() {
        // The xAdvDevice offset lands on a different device table depending on the base it is
        // resolved against.
        let data = writer::convert(&[
            UInt16(0xFFFF),
            UInt16(0xFFFF),
            UInt16(0xFFFF),
            UInt16(0xFFFF),
            // subtable @ 8
            UInt16(1),    // posFormat
            UInt16(0),    // coverageOffset, unused here
            UInt16(0x40), // valueFormat: xAdvDevice
            UInt16(16),   // xAdvDevice
            // device @ 16 from the start of the data
            UInt16(0),
            UInt16(0),
            UInt16(0x8000),
            UInt16(0xFFFF),
            // device @ 16 from the subtable
            UInt16(1),
            UInt16(1),
            UInt16(0x8000),
        ]);
        let gpos = ReadScope::new(&data);
        let subtable = gpos.offset(8);

        let options = DecodeOptions::default();
        let single_pos = subtable
            .read_dep::<SinglePos>(DecodeContext::new(gpos, options))
            .unwrap();
        let device = match single_pos {
            SinglePos::Format1 { value_record, .. } => value_record.x_advance_device,
            SinglePos::Format2 { .. } => None,
        };
        assert_eq!(
            device,
            Some(Device::VariationIndex {
                delta_set_outer_index: 1,
                delta_set_inner_index: 1,
            })
        );

        let options = DecodeOptions::default().with_device_base(DeviceBase::GposTable);
        let single_pos = subtable
            .read_dep::<SinglePos>(DecodeContext::new(gpos, options))
            .unwrap();
        let device = match single_pos {
            SinglePos::Format1 { value_record, .. } => value_record.x_advance_device,
            SinglePos::Format2 { .. } => None,
        };
        assert_eq!(
            device,
            Some(Device::VariationIndex {
                delta_set_outer_index: 0,
                delta_set_inner_index: 0,
            })
        );
    }
}
