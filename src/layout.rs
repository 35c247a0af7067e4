//! Layout table structures shared by GSUB and GPOS.
//!
//! This covers the common top-level machinery: the script, feature and lookup lists, and the
//! Coverage and Class Definition tables that lookup subtables refer to. The lookup list reader
//! does not know how to decode any particular lookup type. Instead it is handed a
//! [`SubtableDecoder`] that turns the bytes of each subtable into a decoded value.

use crate::binary::read::{
    CheckIndex, ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFixedSizeDep, ReadFrom,
    ReadScope,
};
use crate::binary::U16Be;
use crate::error::DecodeError;
use crate::size;
use crate::tag::{self, DisplayTag};
use bitflags::bitflags;
use log::{trace, warn};

/// How failures while decoding lookups are handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum LookupErrorPolicy {
    /// The first failure aborts decoding of the whole table.
    Strict,
    /// A lookup with any failing subtable is dropped, the remaining lookups are decoded.
    SkipLookup,
    /// Only the failing subtable is dropped.
    #[default]
    SkipSubtable,
}

/// A lookup or subtable that was dropped under a best-effort [`LookupErrorPolicy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedItem {
    pub lookup_index: usize,
    /// `None` when the lookup header itself could not be read.
    pub subtable_index: Option<usize>,
    pub error: DecodeError,
}

/// Decodes the subtables of a lookup.
///
/// The lookup list reader calls this for every subtable offset of every lookup, passing a scope
/// that starts at the subtable and the lookup type declared in the lookup header.
pub trait SubtableDecoder<'a> {
    type Subtable;

    fn decode_subtable(
        &self,
        scope: ReadScope<'a>,
        lookup_type: u16,
    ) -> Result<Self::Subtable, DecodeError>;

    /// The lookup type a decoded subtable actually holds, after any extension indirection.
    fn subtable_lookup_type(&self, subtable: &Self::Subtable) -> u16;

    fn error_policy(&self) -> LookupErrorPolicy;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptList {
    script_records: Vec<ScriptRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    pub script_tag: u32,
    script_table: ScriptTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTable {
    opt_default_langsys: Option<LangSys>,
    langsys_records: Vec<LangSysRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangSysRecord {
    pub langsys_tag: u32,
    langsys_table: LangSys,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangSys {
    _lookup_order: u16, // reserved, should be zero
    required_feature_index: u16,
    feature_indices: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureList {
    feature_records: Vec<FeatureRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRecord {
    pub feature_tag: u32,
    feature_table: FeatureTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureTable {
    /// Offset to feature parameters. Only a few features define them and they are not decoded.
    pub feature_params: u16,
    pub lookup_indices: Vec<u16>,
}

bitflags! {
    /// Flags in the lookup table header that control which glyphs a lookup skips.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct LookupFlag: u16 {
        /// Cursive attachment: the last glyph in a sequence is positioned on the baseline.
        const RIGHT_TO_LEFT = 0x0001;
        const IGNORE_BASE_GLYPHS = 0x0002;
        const IGNORE_LIGATURES = 0x0004;
        const IGNORE_MARKS = 0x0008;
        /// The lookup header carries a mark filtering set index into the GDEF mark glyph sets.
        const USE_MARK_FILTERING_SET = 0x0010;
        // 0x00E0 reserved
        /// High byte: if non-zero, skip marks of any other mark attachment class.
        const MARK_ATTACHMENT_CLASS_FILTER = 0xFF00;
    }
}

impl LookupFlag {
    /// The GDEF mark attachment class marks must belong to, or 0 if unfiltered.
    pub fn mark_attachment_type(self) -> u8 {
        (self.bits() >> 8) as u8
    }
}

/// A decoded lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<S> {
    /// Lookup type as declared in the lookup header. This is the extension type for lookups
    /// whose subtables are reached through extension subtables.
    pub lookup_type: u16,
    pub lookup_flag: LookupFlag,
    /// Index into the GDEF mark glyph sets, present when `USE_MARK_FILTERING_SET` is set.
    pub mark_filtering_set: Option<u16>,
    pub subtables: Vec<S>,
}

/// The lookup list with all lookups decoded.
///
/// Lookups are referenced by index from features and contextual lookup records, so a lookup
/// dropped under [`LookupErrorPolicy::SkipLookup`] leaves a `None` in its place rather than
/// shifting the indices of the lookups after it.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupList<S> {
    lookups: Vec<Option<Lookup<S>>>,
    skipped: Vec<SkippedItem>,
}

struct LookupHeader<'a> {
    scope: ReadScope<'a>,
    lookup_type: u16,
    lookup_flag: LookupFlag,
    subtable_offsets: ReadArray<'a, U16Be>,
    mark_filtering_set: Option<u16>,
}

impl ReadBinary for ScriptList {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let script_count = usize::from(ctxt.read_u16be()?);
        let script_records = ctxt
            .read_array_dep::<ScriptRecord>(script_count, scope)?
            .read_to_vec()?;
        Ok(ScriptList { script_records })
    }
}

impl ReadBinaryDep for ScriptRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = ScriptRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, DecodeError> {
        let script_tag = ctxt.read_u32be()?;
        let script_offset = ctxt.read_u16be()?;
        let script_table = scope
            .offset(usize::from(script_offset))
            .read::<ScriptTable>()?;
        Ok(ScriptRecord {
            script_tag,
            script_table,
        })
    }
}

impl ReadFixedSizeDep for ScriptRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        size::U32 + size::U16
    }
}

impl ReadBinary for ScriptTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let default_langsys_offset = usize::from(ctxt.read_u16be()?);
        let opt_default_langsys = if default_langsys_offset != 0 {
            Some(scope.offset(default_langsys_offset).read::<LangSys>()?)
        } else {
            None
        };
        let langsys_count = usize::from(ctxt.read_u16be()?);
        let langsys_records = ctxt
            .read_array_dep::<LangSysRecord>(langsys_count, scope)?
            .read_to_vec()?;
        Ok(ScriptTable {
            opt_default_langsys,
            langsys_records,
        })
    }
}

impl ReadBinaryDep for LangSysRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = LangSysRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, DecodeError> {
        let langsys_tag = ctxt.read_u32be()?;
        let langsys_offset = ctxt.read_u16be()?;
        let langsys_table = scope
            .offset(usize::from(langsys_offset))
            .read::<LangSys>()?;
        Ok(LangSysRecord {
            langsys_tag,
            langsys_table,
        })
    }
}

impl ReadFixedSizeDep for LangSysRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        size::U32 + size::U16
    }
}

impl ReadBinary for LangSys {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let _lookup_order = ctxt.read_u16be()?;
        let required_feature_index = ctxt.read_u16be()?;
        let feature_index_count = usize::from(ctxt.read_u16be()?);
        let feature_indices = ctxt.read_array::<U16Be>(feature_index_count)?.to_vec();
        Ok(LangSys {
            _lookup_order,
            required_feature_index,
            feature_indices,
        })
    }
}

impl ReadBinary for FeatureList {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let feature_count = usize::from(ctxt.read_u16be()?);
        let feature_records = ctxt
            .read_array_dep::<FeatureRecord>(feature_count, scope)?
            .read_to_vec()?;
        Ok(FeatureList { feature_records })
    }
}

impl ReadBinaryDep for FeatureRecord {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = FeatureRecord;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, scope: Self::Args<'a>) -> Result<Self, DecodeError> {
        let feature_tag = ctxt.read_u32be()?;
        let feature_offset = ctxt.read_u16be()?;
        let feature_table = scope
            .offset(usize::from(feature_offset))
            .read::<FeatureTable>()?;
        Ok(FeatureRecord {
            feature_tag,
            feature_table,
        })
    }
}

impl ReadFixedSizeDep for FeatureRecord {
    fn size(_scope: Self::Args<'_>) -> usize {
        size::U32 + size::U16
    }
}

impl ReadBinary for FeatureTable {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let feature_params = ctxt.read_u16be()?;
        let lookup_index_count = usize::from(ctxt.read_u16be()?);
        let lookup_indices = ctxt.read_array::<U16Be>(lookup_index_count)?.to_vec();
        Ok(FeatureTable {
            feature_params,
            lookup_indices,
        })
    }
}

impl ScriptList {
    pub fn script_records(&self) -> &[ScriptRecord] {
        &self.script_records
    }

    pub fn find_script(&self, script_tag: u32) -> Option<&ScriptTable> {
        self.script_records
            .iter()
            .find(|script_record| script_record.script_tag == script_tag)
            .map(|script_record| &script_record.script_table)
    }

    /// Find the script for `script_tag`, falling back to the `DFLT` script.
    pub fn find_script_or_default(&self, script_tag: u32) -> Option<&ScriptTable> {
        self.find_script(script_tag)
            .or_else(|| self.find_script(tag::DFLT))
    }
}

impl ScriptRecord {
    pub fn script_table(&self) -> &ScriptTable {
        &self.script_table
    }
}

impl ScriptTable {
    pub fn default_langsys_record(&self) -> Option<&LangSys> {
        self.opt_default_langsys.as_ref()
    }

    pub fn langsys_records(&self) -> &[LangSysRecord] {
        &self.langsys_records
    }

    pub fn find_langsys(&self, langsys_tag: u32) -> Option<&LangSys> {
        self.langsys_records
            .iter()
            .find(|langsys_record| langsys_record.langsys_tag == langsys_tag)
            .map(|langsys_record| &langsys_record.langsys_table)
    }

    pub fn find_langsys_or_default(&self, opt_lang_tag: Option<u32>) -> Option<&LangSys> {
        match opt_lang_tag {
            Some(lang_tag) => self
                .find_langsys(lang_tag)
                .or_else(|| self.default_langsys_record()),
            None => self.default_langsys_record(),
        }
    }
}

impl LangSysRecord {
    pub fn langsys_table(&self) -> &LangSys {
        &self.langsys_table
    }
}

impl LangSys {
    /// Index of the feature required by this language system, if any.
    pub fn required_feature_index(&self) -> Option<u16> {
        match self.required_feature_index {
            0xFFFF => None,
            index => Some(index),
        }
    }

    pub fn feature_indices(&self) -> &[u16] {
        &self.feature_indices
    }
}

impl FeatureList {
    pub fn feature_records(&self) -> &[FeatureRecord] {
        &self.feature_records
    }

    pub fn nth_feature_record(&self, index: usize) -> Result<&FeatureRecord, DecodeError> {
        self.feature_records.check_index(index)?;
        Ok(&self.feature_records[index])
    }

    /// Find the feature tagged `feature_tag` among the features enabled by `langsys`.
    pub fn find_langsys_feature(
        &self,
        langsys: &LangSys,
        feature_tag: u32,
    ) -> Result<Option<&FeatureTable>, DecodeError> {
        for feature_index in &langsys.feature_indices {
            let feature_record = self.nth_feature_record(usize::from(*feature_index))?;
            if feature_record.feature_tag == feature_tag {
                return Ok(Some(&feature_record.feature_table));
            }
        }
        Ok(None)
    }
}

impl FeatureRecord {
    pub fn feature_table(&self) -> &FeatureTable {
        &self.feature_table
    }
}

impl<'b> ReadBinary for LookupHeader<'b> {
    type HostType<'a> = LookupHeader<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, DecodeError> {
        let scope = ctxt.scope();
        let lookup_type = ctxt.read_u16be()?;
        let lookup_flag = LookupFlag::from_bits_retain(ctxt.read_u16be()?);
        let subtable_count = usize::from(ctxt.read_u16be()?);
        let subtable_offsets = ctxt.read_array::<U16Be>(subtable_count)?;
        let mark_filtering_set = if lookup_flag.contains(LookupFlag::USE_MARK_FILTERING_SET) {
            Some(ctxt.read_u16be()?)
        } else {
            None
        };
        Ok(LookupHeader {
            scope,
            lookup_type,
            lookup_flag,
            subtable_offsets,
            mark_filtering_set,
        })
    }
}

impl<S> LookupList<S> {
    /// Read the lookup list at the start of `scope`, decoding every subtable with `decoder`.
    ///
    /// Failures are handled according to `decoder.error_policy()`. Under
    /// [`LookupErrorPolicy::Strict`] the first failure is returned wrapped in
    /// [`DecodeError::Lookup`]. Otherwise failures are recorded and available from
    /// [`LookupList::skipped`]. Running out of the read budget of `scope` always aborts, as
    /// nothing further could be read.
    pub fn read<'a, D>(scope: ReadScope<'a>, decoder: &D) -> Result<LookupList<S>, DecodeError>
    where
        D: SubtableDecoder<'a, Subtable = S> + ?Sized,
    {
        let policy = decoder.error_policy();
        let mut ctxt = scope.ctxt();
        let lookup_count = usize::from(ctxt.read_u16be()?);
        let lookup_offsets = ctxt.read_array::<U16Be>(lookup_count)?;

        let mut lookups = Vec::with_capacity(lookup_count);
        let mut skipped = Vec::new();
        for (lookup_index, lookup_offset) in lookup_offsets.iter().enumerate() {
            let lookup_scope = scope.offset(usize::from(lookup_offset));
            match read_lookup(lookup_scope, decoder, policy) {
                Ok(lookup) => {
                    trace!(
                        "lookup {}: type {}, {} subtables",
                        lookup_index,
                        lookup.lookup_type,
                        lookup.subtables.len()
                    );
                    lookups.push(Some(lookup))
                }
                Err(LookupFailure::Abort(error)) => {
                    return Err(DecodeError::Lookup {
                        index: lookup_index,
                        error: Box::new(error),
                    });
                }
                Err(LookupFailure::Skipped {
                    subtable_index,
                    error,
                }) => {
                    match subtable_index {
                        Some(subtable_index) => warn!(
                            "skipping invalid subtable {} of lookup {}: {}",
                            subtable_index, lookup_index, error
                        ),
                        None => warn!("skipping invalid lookup {}: {}", lookup_index, error),
                    }
                    skipped.push(SkippedItem {
                        lookup_index,
                        subtable_index,
                        error,
                    });
                    lookups.push(None);
                }
                Err(LookupFailure::SkippedSubtables(lookup, failures)) => {
                    for (subtable_index, error) in failures {
                        warn!(
                            "skipping invalid subtable {} of lookup {}: {}",
                            subtable_index, lookup_index, error
                        );
                        skipped.push(SkippedItem {
                            lookup_index,
                            subtable_index: Some(subtable_index),
                            error,
                        });
                    }
                    lookups.push(Some(lookup));
                }
            }
        }

        Ok(LookupList { lookups, skipped })
    }

    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    /// The lookup at `index`, or `None` if it was skipped or the index is out of range.
    pub fn lookup(&self, index: usize) -> Option<&Lookup<S>> {
        self.lookups.get(index).and_then(Option::as_ref)
    }

    pub fn lookups(&self) -> impl Iterator<Item = Option<&Lookup<S>>> + '_ {
        self.lookups.iter().map(Option::as_ref)
    }

    /// Lookups and subtables dropped while decoding.
    pub fn skipped(&self) -> &[SkippedItem] {
        &self.skipped
    }
}

enum LookupFailure<S> {
    Abort(DecodeError),
    Skipped {
        subtable_index: Option<usize>,
        error: DecodeError,
    },
    SkippedSubtables(Lookup<S>, Vec<(usize, DecodeError)>),
}

fn read_lookup<'a, S, D>(
    scope: ReadScope<'a>,
    decoder: &D,
    policy: LookupErrorPolicy,
) -> Result<Lookup<S>, LookupFailure<S>>
where
    D: SubtableDecoder<'a, Subtable = S> + ?Sized,
{
    let header = match scope.read::<LookupHeader<'a>>() {
        Ok(header) => header,
        Err(error) if policy == LookupErrorPolicy::Strict || scope.budget_exhausted() => {
            return Err(LookupFailure::Abort(error))
        }
        Err(error) => {
            return Err(LookupFailure::Skipped {
                subtable_index: None,
                error,
            })
        }
    };

    let mut subtables = Vec::with_capacity(header.subtable_offsets.len());
    let mut failures = Vec::new();
    let mut opt_effective_type = None;
    for (subtable_index, subtable_offset) in header.subtable_offsets.iter().enumerate() {
        let result = read_lookup_subtable(&header, subtable_offset, decoder).and_then(|subtable| {
            // All subtables of a lookup must hold the same type, which matters for extension
            // lookups where each subtable names its own.
            let effective_type = decoder.subtable_lookup_type(&subtable);
            match opt_effective_type {
                Some(lookup_type) if lookup_type != effective_type => Err(DecodeError::BadValue),
                _ => {
                    opt_effective_type = Some(effective_type);
                    Ok(subtable)
                }
            }
        });
        match result {
            Ok(subtable) => subtables.push(subtable),
            Err(error) if scope.budget_exhausted() => return Err(LookupFailure::Abort(error)),
            Err(error) => match policy {
                LookupErrorPolicy::Strict => return Err(LookupFailure::Abort(error)),
                LookupErrorPolicy::SkipLookup => {
                    return Err(LookupFailure::Skipped {
                        subtable_index: Some(subtable_index),
                        error,
                    })
                }
                LookupErrorPolicy::SkipSubtable => failures.push((subtable_index, error)),
            },
        }
    }

    let lookup = Lookup {
        lookup_type: header.lookup_type,
        lookup_flag: header.lookup_flag,
        mark_filtering_set: header.mark_filtering_set,
        subtables,
    };
    if failures.is_empty() {
        Ok(lookup)
    } else {
        Err(LookupFailure::SkippedSubtables(lookup, failures))
    }
}

fn read_lookup_subtable<'a, D: SubtableDecoder<'a> + ?Sized>(
    header: &LookupHeader<'a>,
    subtable_offset: u16,
    decoder: &D,
) -> Result<D::Subtable, DecodeError> {
    if subtable_offset == 0 {
        return Err(DecodeError::BadOffset);
    }
    let subtable_scope = header.scope.offset(usize::from(subtable_offset));
    decoder.decode_subtable(subtable_scope, header.lookup_type)
}

impl<S> Lookup<S> {
    pub fn subtables(&self) -> &[S] {
        &self.subtables
    }
}

impl std::fmt::Display for ScriptRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "script {} ({} language systems)",
            DisplayTag(self.script_tag),
            self.script_table.langsys_records.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    Format1 {
        glyph_array: Vec<u16>,
    },
    Format2 {
        coverage_range_array: Vec<CoverageRangeRecord>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CoverageRangeRecord {
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub start_coverage_index: u16,
}

impl ReadFrom for CoverageRangeRecord {
    type ReadType = (U16Be, U16Be, U16Be);
    fn read_from((start_glyph, end_glyph, start_coverage_index): (u16, u16, u16)) -> Self {
        CoverageRangeRecord {
            start_glyph,
            end_glyph,
            start_coverage_index,
        }
    }
}

impl ReadBinary for Coverage {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        match ctxt.read_u16be()? {
            1 => {
                let glyph_count = usize::from(ctxt.read_u16be()?);
                // The glyph indices must be in numerical order for binary searching of the list.
                // This is assumed, not checked.
                let glyph_array = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
                Ok(Coverage::Format1 { glyph_array })
            }
            2 => {
                let coverage_range_count = usize::from(ctxt.read_u16be()?);
                let coverage_range_array = ctxt
                    .read_array::<CoverageRangeRecord>(coverage_range_count)?
                    .to_vec();
                for coverage_range_record in &coverage_range_array {
                    ctxt.check_count(
                        coverage_range_record.start_glyph <= coverage_range_record.end_glyph,
                    )?
                }
                Ok(Coverage::Format2 {
                    coverage_range_array,
                })
            }
            format => Err(DecodeError::UnknownFormat(format)),
        }
    }
}

impl Coverage {
    /// The coverage index of `glyph`, or `None` if the glyph is not covered.
    pub fn glyph_coverage_value(&self, glyph: u16) -> Option<u16> {
        match self {
            Coverage::Format1 { glyph_array } => glyph_array
                .binary_search(&glyph)
                .ok()
                .and_then(|index| u16::try_from(index).ok()),
            Coverage::Format2 {
                coverage_range_array,
            } => coverage_range_array
                .iter()
                .find(|range| glyph >= range.start_glyph && glyph <= range.end_glyph)
                .and_then(|range| {
                    range
                        .start_coverage_index
                        .checked_add(glyph - range.start_glyph)
                }),
        }
    }

    /// Convenience method to count the total number of glyphs covered
    pub fn glyph_count(&self) -> usize {
        match self {
            Coverage::Format1 { glyph_array } => glyph_array.len(),
            Coverage::Format2 {
                coverage_range_array,
            } => coverage_range_array
                .iter()
                .map(|range| usize::from(range.end_glyph) - usize::from(range.start_glyph) + 1)
                .sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassDef {
    Format1 {
        start_glyph: u16,
        class_value_array: Vec<u16>,
    },
    Format2 {
        class_range_array: Vec<ClassRangeRecord>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClassRangeRecord {
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub class_value: u16,
}

impl ReadFrom for ClassRangeRecord {
    type ReadType = (U16Be, U16Be, U16Be);
    fn read_from((start_glyph, end_glyph, class_value): (u16, u16, u16)) -> Self {
        ClassRangeRecord {
            start_glyph,
            end_glyph,
            class_value,
        }
    }
}

impl ReadBinary for ClassDef {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        match ctxt.read_u16be()? {
            1 => {
                let start_glyph = ctxt.read_u16be()?;
                let glyph_count = usize::from(ctxt.read_u16be()?);
                let class_value_array = ctxt.read_array::<U16Be>(glyph_count)?.to_vec();
                Ok(ClassDef::Format1 {
                    start_glyph,
                    class_value_array,
                })
            }
            2 => {
                let class_range_count = usize::from(ctxt.read_u16be()?);
                let class_range_array = ctxt
                    .read_array::<ClassRangeRecord>(class_range_count)?
                    .to_vec();
                for class_range in &class_range_array {
                    ctxt.check_count(class_range.start_glyph <= class_range.end_glyph)?;
                }
                Ok(ClassDef::Format2 { class_range_array })
            }
            format => Err(DecodeError::UnknownFormat(format)),
        }
    }
}

impl ClassDef {
    /// The class of `glyph`. Glyphs not assigned a class are in class 0.
    pub fn glyph_class_value(&self, glyph: u16) -> u16 {
        match self {
            ClassDef::Format1 {
                start_glyph,
                class_value_array,
            } => glyph
                .checked_sub(*start_glyph)
                .and_then(|index| class_value_array.get(usize::from(index)))
                .copied()
                .unwrap_or(0),
            ClassDef::Format2 { class_range_array } => class_range_array
                .iter()
                .find(|range| glyph >= range.start_glyph && glyph <= range.end_glyph)
                .map_or(0, |range| range.class_value),
        }
    }
}

/// Read the tables at each of `offsets`, resolved against `scope`.
pub(crate) fn read_objects_dep<'a, T: ReadBinaryDep<HostType<'a> = T>>(
    scope: &ReadScope<'a>,
    offsets: ReadArray<'a, U16Be>,
    args: T::Args<'a>,
) -> Result<Vec<T>, DecodeError> {
    let mut objects = Vec::with_capacity(offsets.len());
    for offset in &offsets {
        let object = scope.offset(usize::from(offset)).read_dep::<T>(args)?;
        objects.push(object);
    }
    Ok(objects)
}

/// Like `read_objects_dep` but a zero offset yields `None`.
pub(crate) fn read_objects_nullable_dep<'a, T: ReadBinaryDep<HostType<'a> = T>>(
    scope: &ReadScope<'a>,
    offsets: ReadArray<'a, U16Be>,
    args: T::Args<'a>,
) -> Result<Vec<Option<T>>, DecodeError> {
    let mut objects = Vec::with_capacity(offsets.len());
    for offset in &offsets {
        if offset != 0 {
            let object = scope.offset(usize::from(offset)).read_dep::<T>(args)?;
            objects.push(Some(object));
        } else {
            objects.push(None);
        }
    }
    Ok(objects)
}

/// Read `count` coverage offsets from `ctxt` and the coverage tables they point to.
pub(crate) fn read_coverages<'a>(
    scope: &ReadScope<'a>,
    ctxt: &mut ReadCtxt<'a>,
    count: usize,
) -> Result<Vec<Coverage>, DecodeError> {
    let coverage_offsets = ctxt.read_array::<U16Be>(count)?;
    read_objects_dep::<Coverage>(scope, coverage_offsets, ())
}

/// Read a non-null offset from `ctxt` and the table it points to in `scope`.
pub(crate) fn read_offset_table<'a, T: ReadBinaryDep<HostType<'a> = T>>(
    scope: &ReadScope<'a>,
    ctxt: &mut ReadCtxt<'a>,
    args: T::Args<'a>,
) -> Result<T, DecodeError> {
    let offset = usize::from(ctxt.read_u16be()?);
    scope.offset(offset).read_dep::<T>(args)
}
