//! Contextual and chained contextual positioning (lookup types 7 and 8).
//!
//! Rules in the glyph based and class based formats share a layout, so both are read as
//! `PosRule` and `ChainPosRule`. In the class based formats the sequences hold class values
//! rather than glyph ids.

use crate::binary::read::{ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::U16Be;
use crate::error::DecodeError;
use crate::layout::{
    read_coverages, read_objects_dep, read_objects_nullable_dep, ClassDef, Coverage,
};

/// Apply the lookup at `lookup_list_index` at position `sequence_index` of the matched input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PosLookupRecord {
    pub sequence_index: u16,
    pub lookup_list_index: u16,
}

impl ReadFrom for PosLookupRecord {
    type ReadType = (U16Be, U16Be);
    fn read_from((sequence_index, lookup_list_index): (u16, u16)) -> Self {
        PosLookupRecord {
            sequence_index,
            lookup_list_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextPos {
    Format1 {
        coverage: Coverage,
        /// A rule set per covered glyph.
        pos_rule_sets: Vec<Option<PosRuleSet>>,
    },
    Format2 {
        coverage: Coverage,
        class_def: ClassDef,
        /// A rule set per class of the first glyph.
        pos_class_sets: Vec<Option<PosRuleSet>>,
    },
    Format3 {
        /// A coverage per input position.
        coverages: Vec<Coverage>,
        pos_lookup_records: Vec<PosLookupRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosRuleSet {
    pub pos_rules: Vec<PosRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosRule {
    /// The input sequence after the first glyph, which is matched by coverage.
    pub input_sequence: Vec<u16>,
    pub pos_lookup_records: Vec<PosLookupRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainContextPos {
    Format1 {
        coverage: Coverage,
        chain_pos_rule_sets: Vec<Option<ChainPosRuleSet>>,
    },
    Format2 {
        coverage: Coverage,
        backtrack_class_def: ClassDef,
        input_class_def: ClassDef,
        lookahead_class_def: ClassDef,
        chain_pos_class_sets: Vec<Option<ChainPosRuleSet>>,
    },
    Format3 {
        backtrack_coverages: Vec<Coverage>,
        input_coverages: Vec<Coverage>,
        lookahead_coverages: Vec<Coverage>,
        pos_lookup_records: Vec<PosLookupRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPosRuleSet {
    pub chain_pos_rules: Vec<ChainPosRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPosRule {
    /// Glyphs before the input, in reverse logical order.
    pub backtrack_sequence: Vec<u16>,
    /// The input sequence after the first glyph.
    pub input_sequence: Vec<u16>,
    pub lookahead_sequence: Vec<u16>,
    pub pos_lookup_records: Vec<PosLookupRecord>,
}

// A null ClassDef offset assigns every glyph to class 0.
fn read_nullable_class_def<'a>(
    scope: &ReadScope<'a>,
    ctxt: &mut ReadCtxt<'a>,
) -> Result<ClassDef, DecodeError> {
    match usize::from(ctxt.read_u16be()?) {
        0 => Ok(ClassDef::Format2 {
            class_range_array: Vec::new(),
        }),
        offset => scope.offset(offset).read::<ClassDef>(),
    }
}

// Reads an input glyph count and the sequence that follows the first glyph.
fn read_input_sequence(
    ctxt: &mut ReadCtxt<'_>,
    glyph_count: usize,
) -> Result<Vec<u16>, DecodeError> {
    ctxt.check_count(glyph_count > 0)?;
    Ok(ctxt.read_array::<U16Be>(glyph_count - 1)?.to_vec())
}

fn read_sequence(ctxt: &mut ReadCtxt<'_>) -> Result<Vec<u16>, DecodeError> {
    let count = usize::from(ctxt.read_u16be()?);
    Ok(ctxt.read_array::<U16Be>(count)?.to_vec())
}

fn read_pos_lookup_records(
    ctxt: &mut ReadCtxt<'_>,
    count: usize,
) -> Result<Vec<PosLookupRecord>, DecodeError> {
    Ok(ctxt.read_array::<PosLookupRecord>(count)?.to_vec())
}

impl ReadBinary for ContextPos {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let pos_rule_set_count = usize::from(ctxt.read_u16be()?);
                let pos_rule_set_offsets = ctxt.read_array::<U16Be>(pos_rule_set_count)?;
                let pos_rule_sets =
                    read_objects_nullable_dep::<PosRuleSet>(&scope, pos_rule_set_offsets, ())?;
                let coverage = scope.offset(coverage_offset).read::<Coverage>()?;
                Ok(ContextPos::Format1 {
                    coverage,
                    pos_rule_sets,
                })
            }
            2 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let class_def = read_nullable_class_def(&scope, ctxt)?;
                let pos_class_set_count = usize::from(ctxt.read_u16be()?);
                let pos_class_set_offsets = ctxt.read_array::<U16Be>(pos_class_set_count)?;
                let pos_class_sets =
                    read_objects_nullable_dep::<PosRuleSet>(&scope, pos_class_set_offsets, ())?;
                let coverage = scope.offset(coverage_offset).read::<Coverage>()?;
                Ok(ContextPos::Format2 {
                    coverage,
                    class_def,
                    pos_class_sets,
                })
            }
            3 => {
                let glyph_count = usize::from(ctxt.read_u16be()?);
                ctxt.check_count(glyph_count > 0)?;
                let pos_count = usize::from(ctxt.read_u16be()?);
                let coverages = read_coverages(&scope, ctxt, glyph_count)?;
                let pos_lookup_records = read_pos_lookup_records(ctxt, pos_count)?;
                Ok(ContextPos::Format3 {
                    coverages,
                    pos_lookup_records,
                })
            }
            format => Err(DecodeError::UnknownFormat(format)),
        }
    }
}

impl ReadBinary for PosRuleSet {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let pos_rule_count = usize::from(ctxt.read_u16be()?);
        let pos_rule_offsets = ctxt.read_array::<U16Be>(pos_rule_count)?;
        let pos_rules = read_objects_dep::<PosRule>(&scope, pos_rule_offsets, ())?;
        Ok(PosRuleSet { pos_rules })
    }
}

impl ReadBinary for PosRule {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let glyph_count = usize::from(ctxt.read_u16be()?);
        let pos_count = usize::from(ctxt.read_u16be()?);
        let input_sequence = read_input_sequence(ctxt, glyph_count)?;
        let pos_lookup_records = read_pos_lookup_records(ctxt, pos_count)?;
        Ok(PosRule {
            input_sequence,
            pos_lookup_records,
        })
    }
}

impl ReadBinary for ChainContextPos {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        match ctxt.read_u16be()? {
            1 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let chain_pos_rule_set_count = usize::from(ctxt.read_u16be()?);
                let chain_pos_rule_set_offsets =
                    ctxt.read_array::<U16Be>(chain_pos_rule_set_count)?;
                let chain_pos_rule_sets = read_objects_nullable_dep::<ChainPosRuleSet>(
                    &scope,
                    chain_pos_rule_set_offsets,
                    (),
                )?;
                let coverage = scope.offset(coverage_offset).read::<Coverage>()?;
                Ok(ChainContextPos::Format1 {
                    coverage,
                    chain_pos_rule_sets,
                })
            }
            2 => {
                let coverage_offset = usize::from(ctxt.read_u16be()?);
                let backtrack_class_def = read_nullable_class_def(&scope, ctxt)?;
                let input_class_def = read_nullable_class_def(&scope, ctxt)?;
                let lookahead_class_def = read_nullable_class_def(&scope, ctxt)?;
                let chain_pos_class_set_count = usize::from(ctxt.read_u16be()?);
                let chain_pos_class_set_offsets =
                    ctxt.read_array::<U16Be>(chain_pos_class_set_count)?;
                let chain_pos_class_sets = read_objects_nullable_dep::<ChainPosRuleSet>(
                    &scope,
                    chain_pos_class_set_offsets,
                    (),
                )?;
                let coverage = scope.offset(coverage_offset).read::<Coverage>()?;
                Ok(ChainContextPos::Format2 {
                    coverage,
                    backtrack_class_def,
                    input_class_def,
                    lookahead_class_def,
                    chain_pos_class_sets,
                })
            }
            3 => {
                let backtrack_count = usize::from(ctxt.read_u16be()?);
                let backtrack_coverages = read_coverages(&scope, ctxt, backtrack_count)?;
                let input_count = usize::from(ctxt.read_u16be()?);
                ctxt.check_count(input_count > 0)?;
                let input_coverages = read_coverages(&scope, ctxt, input_count)?;
                let lookahead_count = usize::from(ctxt.read_u16be()?);
                let lookahead_coverages = read_coverages(&scope, ctxt, lookahead_count)?;
                let pos_count = usize::from(ctxt.read_u16be()?);
                let pos_lookup_records = read_pos_lookup_records(ctxt, pos_count)?;
                Ok(ChainContextPos::Format3 {
                    backtrack_coverages,
                    input_coverages,
                    lookahead_coverages,
                    pos_lookup_records,
                })
            }
            format => Err(DecodeError::UnknownFormat(format)),
        }
    }
}

impl ReadBinary for ChainPosRuleSet {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let scope = ctxt.scope();
        let chain_pos_rule_count = usize::from(ctxt.read_u16be()?);
        let chain_pos_rule_offsets = ctxt.read_array::<U16Be>(chain_pos_rule_count)?;
        let chain_pos_rules =
            read_objects_dep::<ChainPosRule>(&scope, chain_pos_rule_offsets, ())?;
        Ok(ChainPosRuleSet { chain_pos_rules })
    }
}

impl ReadBinary for ChainPosRule {
    type HostType<'a> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, DecodeError> {
        let backtrack_sequence = read_sequence(ctxt)?;
        let input_count = usize::from(ctxt.read_u16be()?);
        let input_sequence = read_input_sequence(ctxt, input_count)?;
        let lookahead_sequence = read_sequence(ctxt)?;
        let pos_count = usize::from(ctxt.read_u16be()?);
        let pos_lookup_records = read_pos_lookup_records(ctxt, pos_count)?;
        Ok(ChainPosRule {
            backtrack_sequence,
            input_sequence,
            lookahead_sequence,
            pos_lookup_records,
        })
    }
}

impl ContextPos {
    /// The rule set that applies when the input starts with `glyph`.
    ///
    /// Format 3 subtables have a single rule and no rule sets, so always return `None`.
    pub fn rule_set(&self, glyph: u16) -> Option<&PosRuleSet> {
        match self {
            ContextPos::Format1 {
                coverage,
                pos_rule_sets,
            } => {
                let coverage_index = coverage.glyph_coverage_value(glyph)?;
                pos_rule_sets.get(usize::from(coverage_index))?.as_ref()
            }
            ContextPos::Format2 {
                coverage,
                class_def,
                pos_class_sets,
            } => {
                coverage.glyph_coverage_value(glyph)?;
                let class = class_def.glyph_class_value(glyph);
                pos_class_sets.get(usize::from(class))?.as_ref()
            }
            ContextPos::Format3 { .. } => None,
        }
    }
}

impl ChainContextPos {
    /// The rule set that applies when the input starts with `glyph`.
    ///
    /// Format 3 subtables have a single rule and no rule sets, so always return `None`.
    pub fn rule_set(&self, glyph: u16) -> Option<&ChainPosRuleSet> {
        match self {
            ChainContextPos::Format1 {
                coverage,
                chain_pos_rule_sets,
            } => {
                let coverage_index = coverage.glyph_coverage_value(glyph)?;
                chain_pos_rule_sets.get(usize::from(coverage_index))?.as_ref()
            }
            ChainContextPos::Format2 {
                coverage,
                input_class_def,
                chain_pos_class_sets,
                ..
            } => {
                coverage.glyph_coverage_value(glyph)?;
                let class = input_class_def.glyph_class_value(glyph);
                chain_pos_class_sets.get(usize::from(class))?.as_ref()
            }
            ChainContextPos::Format3 { .. } => None,
        }
    }
}
