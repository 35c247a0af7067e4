//! Glyph positioning (`GPOS`) table decoding.
//!
//! > The Glyph Positioning table (GPOS) provides precise control over glyph placement for
//! > sophisticated text layout and rendering in each script and language system that a font
//! > supports.
//!
//! From <https://docs.microsoft.com/en-us/typography/opentype/spec/gpos>
//!
//! [`decode_gpos`] reads the table header, script list and feature list, and decodes every
//! lookup subtable into an owned tree. The result borrows nothing from the font data.

pub mod anchor;
pub mod context;
pub mod cursive;
pub mod mark;
pub mod pair;
pub mod single;
pub mod value;

use log::{debug, warn};

use crate::binary::read::{ReadBinary, ReadBinaryDep, ReadBudget, ReadCtxt, ReadScope};
use crate::error::DecodeError;
use crate::layout::{
    FeatureList, FeatureTable, LangSys, Lookup, LookupErrorPolicy, LookupList, ScriptList,
    ScriptTable, SkippedItem, SubtableDecoder,
};

pub use self::anchor::{Anchor, AnchorDetail, AnchorMatrix, MarkArray, MarkRecord};
pub use self::context::{
    ChainContextPos, ChainPosRule, ChainPosRuleSet, ContextPos, PosLookupRecord, PosRule,
    PosRuleSet,
};
pub use self::cursive::{CursivePos, EntryExitRecord};
pub use self::mark::{MarkBasePos, MarkLigPos, MarkMarkPos};
pub use self::pair::{Class2Record, PairPos, PairSet, PairValueRecord};
pub use self::single::SinglePos;
pub use self::value::{Device, ValueArgs, ValueFormat, ValueRecord};

/// GPOS lookup types.
pub mod lookup_type {
    pub const SINGLE_ADJUSTMENT: u16 = 1;
    pub const PAIR_ADJUSTMENT: u16 = 2;
    pub const CURSIVE_ATTACHMENT: u16 = 3;
    pub const MARK_TO_BASE_ATTACHMENT: u16 = 4;
    pub const MARK_TO_LIGATURE_ATTACHMENT: u16 = 5;
    pub const MARK_TO_MARK_ATTACHMENT: u16 = 6;
    pub const CONTEXT_POSITIONING: u16 = 7;
    pub const CHAINED_CONTEXT_POSITIONING: u16 = 8;
    pub const EXTENSION_POSITIONING: u16 = 9;
}

/// The table that device table offsets in value records are resolved against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum DeviceBase {
    /// The table holding the value record: the subtable, or the PairSet for pair adjustment
    /// format 1. This is what the OpenType layout prescribes.
    #[default]
    EnclosingTable,
    /// The start of the GPOS table, for compatibility with data produced for decoders that
    /// resolved device offsets this way.
    GposTable,
}

/// Options controlling how a GPOS table is decoded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    pub lookup_errors: LookupErrorPolicy,
    pub device_base: DeviceBase,
    /// Reject anchor tables with an unknown format instead of keeping their coordinates.
    pub strict_anchors: bool,
    /// How many extension subtables may be followed to reach a subtable.
    pub max_extension_depth: u8,
    /// Limit on the bytes read while decoding, as a multiple of the table length. Data that
    /// offsets share is read again for every reference. Small tables are always allowed
    /// [`MIN_READ_BUDGET`] bytes.
    pub max_read_multiple: usize,
}

/// The smallest read budget a table is given, regardless of its length.
pub const MIN_READ_BUDGET: usize = 1 << 16;

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            lookup_errors: LookupErrorPolicy::default(),
            device_base: DeviceBase::default(),
            strict_anchors: false,
            max_extension_depth: 1,
            max_read_multiple: 32,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        DecodeOptions::default()
    }

    pub fn with_lookup_errors(mut self, lookup_errors: LookupErrorPolicy) -> Self {
        self.lookup_errors = lookup_errors;
        self
    }

    pub fn with_device_base(mut self, device_base: DeviceBase) -> Self {
        self.device_base = device_base;
        self
    }

    pub fn with_strict_anchors(mut self, strict_anchors: bool) -> Self {
        self.strict_anchors = strict_anchors;
        self
    }

    pub fn with_max_extension_depth(mut self, max_extension_depth: u8) -> Self {
        self.max_extension_depth = max_extension_depth;
        self
    }

    pub fn with_max_read_multiple(mut self, max_read_multiple: usize) -> Self {
        self.max_read_multiple = max_read_multiple;
        self
    }

    /// The number of bytes that may be read when decoding a table of `table_len` bytes.
    pub fn read_budget(&self, table_len: usize) -> usize {
        table_len
            .saturating_mul(self.max_read_multiple)
            .max(MIN_READ_BUDGET)
    }
}

/// State shared by all subtable readers while decoding one GPOS table.
#[derive(Copy, Clone, Debug)]
pub struct DecodeContext<'a> {
    gpos: ReadScope<'a>,
    options: DecodeOptions,
}

impl<'a> DecodeContext<'a> {
    /// `gpos` is the whole GPOS table.
    pub fn new(gpos: ReadScope<'a>, options: DecodeOptions) -> Self {
        DecodeContext { gpos, options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Arguments for reading value records held by the table starting at `enclosing`.
    pub fn value_args(
        &self,
        value_format: ValueFormat,
        enclosing: ReadScope<'a>,
    ) -> ValueArgs<'a> {
        let device_scope = match self.options.device_base {
            DeviceBase::EnclosingTable => enclosing,
            DeviceBase::GposTable => self.gpos,
        };
        ValueArgs {
            value_format,
            device_scope,
        }
    }
}

/// A decoded GPOS table.
#[derive(Debug, Clone, PartialEq)]
pub struct GposTable {
    pub major_version: u16,
    pub minor_version: u16,
    pub opt_script_list: Option<ScriptList>,
    pub opt_feature_list: Option<FeatureList>,
    pub opt_lookup_list: Option<LookupList<PosSubtable>>,
    /// Offset to the FeatureVariations table (version 1.1). The table itself is not decoded.
    pub opt_feature_variations_offset: Option<u32>,
}

/// A decoded lookup subtable.
#[derive(Debug, Clone, PartialEq)]
pub enum PosSubtable {
    SinglePos(SinglePos),
    PairPos(PairPos),
    CursivePos(CursivePos),
    MarkBasePos(MarkBasePos),
    MarkLigPos(MarkLigPos),
    MarkMarkPos(MarkMarkPos),
    ContextPos(ContextPos),
    ChainContextPos(ChainContextPos),
    /// A lookup type with no defined subtable format. The subtable was not read.
    Reserved(u16),
}

impl PosSubtable {
    /// The lookup type of this subtable, after any extension indirection.
    pub fn lookup_type(&self) -> u16 {
        match self {
            PosSubtable::SinglePos(_) => lookup_type::SINGLE_ADJUSTMENT,
            PosSubtable::PairPos(_) => lookup_type::PAIR_ADJUSTMENT,
            PosSubtable::CursivePos(_) => lookup_type::CURSIVE_ATTACHMENT,
            PosSubtable::MarkBasePos(_) => lookup_type::MARK_TO_BASE_ATTACHMENT,
            PosSubtable::MarkLigPos(_) => lookup_type::MARK_TO_LIGATURE_ATTACHMENT,
            PosSubtable::MarkMarkPos(_) => lookup_type::MARK_TO_MARK_ATTACHMENT,
            PosSubtable::ContextPos(_) => lookup_type::CONTEXT_POSITIONING,
            PosSubtable::ChainContextPos(_) => lookup_type::CHAINED_CONTEXT_POSITIONING,
            PosSubtable::Reserved(lookup_type) => *lookup_type,
        }
    }
}

/// Decodes GPOS lookup subtables for the lookup list reader.
pub struct GposDecoder<'a> {
    context: DecodeContext<'a>,
}

struct ExtensionPos<'a> {
    extension_lookup_type: u16,
    subtable: ReadScope<'a>,
}

impl<'b> ReadBinary for ExtensionPos<'b> {
    type HostType<'a> = ExtensionPos<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, DecodeError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let extension_lookup_type = ctxt.read_u16be()?;
                let extension_offset = usize::try_from(ctxt.read_u32be()?)?;
                Ok(ExtensionPos {
                    extension_lookup_type,
                    subtable: scope.offset(extension_offset),
                })
            }
            format => Err(DecodeError::UnknownFormat(format)),
        }
    }
}

impl<'a> GposDecoder<'a> {
    /// `gpos` is the whole GPOS table.
    pub fn new(gpos: ReadScope<'a>, options: DecodeOptions) -> Self {
        GposDecoder {
            context: DecodeContext::new(gpos, options),
        }
    }

    /// Decode the subtable at the start of `scope` as `lookup_type`, following extension
    /// subtables.
    pub fn decode_subtable(
        &self,
        scope: ReadScope<'a>,
        lookup_type: u16,
    ) -> Result<PosSubtable, DecodeError> {
        self.decode_subtable_at_depth(scope, lookup_type, 0)
    }

    fn decode_subtable_at_depth(
        &self,
        scope: ReadScope<'a>,
        lookup_type: u16,
        depth: u8,
    ) -> Result<PosSubtable, DecodeError> {
        let context = self.context;
        let subtable = match lookup_type {
            lookup_type::SINGLE_ADJUSTMENT => {
                PosSubtable::SinglePos(scope.read_dep::<SinglePos>(context)?)
            }
            lookup_type::PAIR_ADJUSTMENT => {
                PosSubtable::PairPos(scope.read_dep::<PairPos>(context)?)
            }
            lookup_type::CURSIVE_ATTACHMENT => {
                PosSubtable::CursivePos(scope.read_dep::<CursivePos>(context)?)
            }
            lookup_type::MARK_TO_BASE_ATTACHMENT => {
                PosSubtable::MarkBasePos(scope.read_dep::<MarkBasePos>(context)?)
            }
            lookup_type::MARK_TO_LIGATURE_ATTACHMENT => {
                PosSubtable::MarkLigPos(scope.read_dep::<MarkLigPos>(context)?)
            }
            lookup_type::MARK_TO_MARK_ATTACHMENT => {
                PosSubtable::MarkMarkPos(scope.read_dep::<MarkMarkPos>(context)?)
            }
            lookup_type::CONTEXT_POSITIONING => {
                PosSubtable::ContextPos(scope.read::<ContextPos>()?)
            }
            lookup_type::CHAINED_CONTEXT_POSITIONING => {
                PosSubtable::ChainContextPos(scope.read::<ChainContextPos>()?)
            }
            lookup_type::EXTENSION_POSITIONING => {
                if depth >= context.options.max_extension_depth {
                    return Err(DecodeError::LimitExceeded);
                }
                let extension = scope.read::<ExtensionPos<'a>>()?;
                return self.decode_subtable_at_depth(
                    extension.subtable,
                    extension.extension_lookup_type,
                    depth + 1,
                );
            }
            _ => {
                if context.options.lookup_errors == LookupErrorPolicy::Strict {
                    return Err(DecodeError::UnknownLookupType(lookup_type));
                }
                warn!("keeping subtable of reserved lookup type {}", lookup_type);
                PosSubtable::Reserved(lookup_type)
            }
        };
        Ok(subtable)
    }
}

impl<'a> SubtableDecoder<'a> for GposDecoder<'a> {
    type Subtable = PosSubtable;

    fn decode_subtable(
        &self,
        scope: ReadScope<'a>,
        lookup_type: u16,
    ) -> Result<PosSubtable, DecodeError> {
        GposDecoder::decode_subtable(self, scope, lookup_type)
    }

    fn subtable_lookup_type(&self, subtable: &PosSubtable) -> u16 {
        subtable.lookup_type()
    }

    fn error_policy(&self) -> LookupErrorPolicy {
        self.context.options.lookup_errors
    }
}

/// Decode a GPOS table with the default options.
///
/// ```
/// use gpos_tables::gpos::decode_gpos;
///
/// // Version 1.0 with no script, feature or lookup lists
/// let data = [0, 1, 0, 0, 0, 0, 0, 0, 0, 0];
/// let gpos = decode_gpos(&data).unwrap();
/// assert!(gpos.opt_lookup_list.is_none());
/// ```
pub fn decode_gpos(data: &[u8]) -> Result<GposTable, DecodeError> {
    decode_gpos_with_options(data, DecodeOptions::default())
}

/// Decode a GPOS table.
///
/// Reads are limited by [`DecodeOptions::read_budget`]. A table that needs more fails with
/// [`DecodeError::LimitExceeded`], wrapped in [`DecodeError::Lookup`] when it happens inside
/// the lookup list, whatever the lookup error policy.
pub fn decode_gpos_with_options(
    data: &[u8],
    options: DecodeOptions,
) -> Result<GposTable, DecodeError> {
    let budget = ReadBudget::new(options.read_budget(data.len()));
    let scope = ReadScope::new(data).with_budget(&budget);
    scope.read_dep::<GposTable>(options)
}

impl ReadBinaryDep for GposTable {
    type Args<'a> = DecodeOptions;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, options: DecodeOptions) -> Result<Self, DecodeError> {
        let table = ctxt.scope();

        let major_version = ctxt.read_u16be()?;
        let minor_version = ctxt.read_u16be()?;
        // We handle versions 1.x
        ctxt.check_version(major_version == 1)?;
        let script_list_offset = usize::from(ctxt.read_u16be()?);
        let feature_list_offset = usize::from(ctxt.read_u16be()?);
        let lookup_list_offset = usize::from(ctxt.read_u16be()?);
        let opt_feature_variations_offset = if minor_version >= 1 {
            Some(ctxt.read_u32be()?).filter(|&offset| offset != 0)
        } else {
            None
        };

        let opt_script_list = match optional_table(table, script_list_offset)? {
            Some(scope) => Some(scope.read::<ScriptList>()?),
            None => None,
        };
        let opt_feature_list = match optional_table(table, feature_list_offset)? {
            Some(scope) => Some(scope.read::<FeatureList>()?),
            None => None,
        };
        let opt_lookup_list = match optional_table(table, lookup_list_offset)? {
            Some(scope) => {
                let decoder = GposDecoder::new(table, options);
                Some(LookupList::read(scope, &decoder)?)
            }
            None => None,
        };

        let gpos = GposTable {
            major_version,
            minor_version,
            opt_script_list,
            opt_feature_list,
            opt_lookup_list,
            opt_feature_variations_offset,
        };
        debug!(
            "GPOS {}.{}: {} scripts, {} features, {} lookups, {} skipped",
            major_version,
            minor_version,
            gpos.opt_script_list
                .as_ref()
                .map_or(0, |list| list.script_records().len()),
            gpos.opt_feature_list
                .as_ref()
                .map_or(0, |list| list.feature_records().len()),
            gpos.opt_lookup_list.as_ref().map_or(0, |list| list.len()),
            gpos.skipped().len()
        );
        Ok(gpos)
    }
}

fn optional_table(
    table: ReadScope<'_>,
    offset: usize,
) -> Result<Option<ReadScope<'_>>, DecodeError> {
    if offset == 0 {
        Ok(None)
    } else if offset >= table.data().len() {
        Err(DecodeError::BadOffset)
    } else {
        Ok(Some(table.offset(offset)))
    }
}

impl GposTable {
    pub fn find_script(&self, script_tag: u32) -> Option<&ScriptTable> {
        self.opt_script_list
            .as_ref()
            .and_then(|script_list| script_list.find_script(script_tag))
    }

    /// Find the script for `script_tag`, falling back to the `DFLT` script.
    pub fn find_script_or_default(&self, script_tag: u32) -> Option<&ScriptTable> {
        self.opt_script_list
            .as_ref()
            .and_then(|script_list| script_list.find_script_or_default(script_tag))
    }

    pub fn find_langsys_feature(
        &self,
        langsys: &LangSys,
        feature_tag: u32,
    ) -> Result<Option<&FeatureTable>, DecodeError> {
        match self.opt_feature_list {
            Some(ref feature_list) => feature_list.find_langsys_feature(langsys, feature_tag),
            None => Ok(None),
        }
    }

    /// The lookup at `index` in the lookup list, unless it is absent or was skipped.
    pub fn lookup(&self, index: usize) -> Option<&Lookup<PosSubtable>> {
        self.opt_lookup_list
            .as_ref()
            .and_then(|lookup_list| lookup_list.lookup(index))
    }

    /// The lookups referenced by `feature`, in the order the feature lists them, paired with
    /// their lookup list index. Indices that don't resolve to a decoded lookup are left out.
    pub fn lookups_for_feature<'a>(
        &'a self,
        feature: &'a FeatureTable,
    ) -> impl Iterator<Item = (usize, &'a Lookup<PosSubtable>)> + 'a {
        feature.lookup_indices.iter().filter_map(move |&index| {
            let index = usize::from(index);
            self.lookup(index).map(|lookup| (index, lookup))
        })
    }

    /// Lookups and subtables dropped while decoding under a best-effort policy.
    pub fn skipped(&self) -> &[SkippedItem] {
        match self.opt_lookup_list {
            Some(ref lookup_list) => lookup_list.skipped(),
            None => &[],
        }
    }
}
