//! Value records and device tables.

use bitflags::bitflags;

use crate::binary::read::{ReadBinary, ReadBinaryDep, ReadCtxt, ReadFixedSizeDep, ReadScope};
use crate::binary::U16Be;
use crate::error::DecodeError;
use crate::size;

bitflags! {
    /// Which fields are present in a value record.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct ValueFormat: u16 {
        const X_PLACEMENT = 0x0001;
        const Y_PLACEMENT = 0x0002;
        const X_ADVANCE = 0x0004;
        const Y_ADVANCE = 0x0008;
        const X_PLACEMENT_DEVICE = 0x0010;
        const Y_PLACEMENT_DEVICE = 0x0020;
        const X_ADVANCE_DEVICE = 0x0040;
        const Y_ADVANCE_DEVICE = 0x0080;
        // 0xFF00 reserved
    }
}

impl ReadBinary for ValueFormat {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let value_format = ctxt.read_u16be()?;
        ValueFormat::from_bits(value_format).ok_or(DecodeError::UnknownFormat(value_format))
    }
}

impl ValueFormat {
    /// Number of bytes a value record in this format occupies.
    pub fn size(self) -> usize {
        self.bits().count_ones() as usize * size::U16
    }
}

/// A positioning adjustment.
///
/// Fields absent from the record's `ValueFormat` are zero or `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueRecord {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
    pub x_placement_device: Option<Device>,
    pub y_placement_device: Option<Device>,
    pub x_advance_device: Option<Device>,
    pub y_advance_device: Option<Device>,
}

/// Arguments for reading a `ValueRecord`.
#[derive(Copy, Clone)]
pub struct ValueArgs<'a> {
    pub value_format: ValueFormat,
    /// Scope that device table offsets in the record are resolved against.
    pub device_scope: ReadScope<'a>,
}

impl ReadBinaryDep for ValueRecord {
    type Args<'a> = ValueArgs<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: ValueArgs<'a>) -> Result<Self, DecodeError> {
        let format = args.value_format;
        let x_placement = read_value(ctxt, format, ValueFormat::X_PLACEMENT)?;
        let y_placement = read_value(ctxt, format, ValueFormat::Y_PLACEMENT)?;
        let x_advance = read_value(ctxt, format, ValueFormat::X_ADVANCE)?;
        let y_advance = read_value(ctxt, format, ValueFormat::Y_ADVANCE)?;
        let scope = args.device_scope;
        let x_placement_device =
            read_device(ctxt, format, ValueFormat::X_PLACEMENT_DEVICE, scope)?;
        let y_placement_device =
            read_device(ctxt, format, ValueFormat::Y_PLACEMENT_DEVICE, scope)?;
        let x_advance_device = read_device(ctxt, format, ValueFormat::X_ADVANCE_DEVICE, scope)?;
        let y_advance_device = read_device(ctxt, format, ValueFormat::Y_ADVANCE_DEVICE, scope)?;
        Ok(ValueRecord {
            x_placement,
            y_placement,
            x_advance,
            y_advance,
            x_placement_device,
            y_placement_device,
            x_advance_device,
            y_advance_device,
        })
    }
}

impl ReadFixedSizeDep for ValueRecord {
    fn size(args: ValueArgs<'_>) -> usize {
        args.value_format.size()
    }
}

fn read_value(
    ctxt: &mut ReadCtxt<'_>,
    format: ValueFormat,
    field: ValueFormat,
) -> Result<i16, DecodeError> {
    if format.contains(field) {
        Ok(ctxt.read_i16be()?)
    } else {
        Ok(0)
    }
}

fn read_device(
    ctxt: &mut ReadCtxt<'_>,
    format: ValueFormat,
    field: ValueFormat,
    scope: ReadScope<'_>,
) -> Result<Option<Device>, DecodeError> {
    if !format.contains(field) {
        return Ok(None);
    }
    match ctxt.read_u16be()? {
        0 => Ok(None),
        offset => scope.offset(usize::from(offset)).read::<Device>().map(Some),
    }
}

impl ValueRecord {
    /// True if the record makes no adjustment at all.
    pub fn is_zero(&self) -> bool {
        *self == ValueRecord::default()
    }
}

/// `deltaFormat` value marking a VariationIndex table.
pub const VARIATION_INDEX_FORMAT: u16 = 0x8000;

/// A Device table, or the VariationIndex table that shares its layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    /// Per pixel size adjustments for sizes `start_size..=end_size`.
    Hinting {
        start_size: u16,
        end_size: u16,
        /// 1, 2 or 3 for signed 2, 4 or 8-bit packed deltas.
        delta_format: u16,
        deltas: Vec<i8>,
    },
    /// Reference into the item variation store of a variable font.
    VariationIndex {
        delta_set_outer_index: u16,
        delta_set_inner_index: u16,
    },
}

impl ReadBinary for Device {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let start_size = ctxt.read_u16be()?;
        let end_size = ctxt.read_u16be()?;
        let delta_format = ctxt.read_u16be()?;
        let bits_per_value = match delta_format {
            1 => 2,
            2 => 4,
            3 => 8,
            VARIATION_INDEX_FORMAT => {
                return Ok(Device::VariationIndex {
                    delta_set_outer_index: start_size,
                    delta_set_inner_index: end_size,
                })
            }
            _ => return Err(DecodeError::UnknownFormat(delta_format)),
        };

        let value_count = if end_size >= start_size {
            usize::from(end_size - start_size) + 1
        } else {
            0
        };
        let values_per_word = 16 / bits_per_value;
        let word_count = value_count / values_per_word + (value_count % values_per_word).min(1);
        let words = ctxt.read_array::<U16Be>(word_count)?;

        let mut deltas = Vec::with_capacity(value_count);
        for (word_index, word) in words.iter().enumerate() {
            let in_word = (value_count - word_index * values_per_word).min(values_per_word);
            for i in 0..in_word {
                let shift = 16 - bits_per_value * (i + 1);
                deltas.push(sign_extend(word >> shift, bits_per_value));
            }
        }

        Ok(Device::Hinting {
            start_size,
            end_size,
            delta_format,
            deltas,
        })
    }
}

// Extract the low `bits` bits of `value` as a signed integer.
fn sign_extend(value: u16, bits: usize) -> i8 {
    let shift = 16 - bits;
    (((value << shift) as i16) >> shift) as i8
}

impl Device {
    /// The adjustment in pixels at `ppem`. Sizes outside the table, and VariationIndex tables,
    /// give 0.
    pub fn delta(&self, ppem: u16) -> i16 {
        match self {
            Device::Hinting {
                start_size, deltas, ..
            } => ppem
                .checked_sub(*start_size)
                .and_then(|index| deltas.get(usize::from(index)))
                .map_or(0, |&delta| i16::from(delta)),
            Device::VariationIndex { .. } => 0,
        }
    }
}
