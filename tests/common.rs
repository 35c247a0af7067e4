#![allow(dead_code)]

use gpos_tables::binary::write::{Placeholder, WriteBinary, WriteBuffer, WriteContext};
use gpos_tables::binary::{I16Be, U16Be, U32Be};

struct ScriptSpec {
    tag: u32,
    feature_indices: Vec<u16>,
}

struct FeatureSpec {
    tag: u32,
    lookup_indices: Vec<u16>,
}

struct LookupSpec {
    lookup_type: u16,
    lookup_flag: u16,
    mark_filtering_set: Option<u16>,
    subtables: Vec<Vec<u8>>,
}

/// Assembles a GPOS table from scripts, features and lookups whose subtables are given as
/// raw bytes.
///
/// Every script has only a default language system.
#[derive(Default)]
pub struct GposBuilder {
    scripts: Vec<ScriptSpec>,
    features: Vec<FeatureSpec>,
    lookups: Vec<LookupSpec>,
}

impl GposBuilder {
    pub fn new() -> Self {
        GposBuilder::default()
    }

    pub fn script(mut self, tag: u32, feature_indices: &[u16]) -> Self {
        self.scripts.push(ScriptSpec {
            tag,
            feature_indices: feature_indices.to_vec(),
        });
        self
    }

    pub fn feature(mut self, tag: u32, lookup_indices: &[u16]) -> Self {
        self.features.push(FeatureSpec {
            tag,
            lookup_indices: lookup_indices.to_vec(),
        });
        self
    }

    pub fn lookup(mut self, lookup_type: u16, subtables: Vec<Vec<u8>>) -> Self {
        self.lookups.push(LookupSpec {
            lookup_type,
            lookup_flag: 0,
            mark_filtering_set: None,
            subtables,
        });
        self
    }

    pub fn lookup_with_flag(
        mut self,
        lookup_type: u16,
        lookup_flag: u16,
        mark_filtering_set: Option<u16>,
        subtables: Vec<Vec<u8>>,
    ) -> Self {
        self.lookups.push(LookupSpec {
            lookup_type,
            lookup_flag,
            mark_filtering_set,
            subtables,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut w = WriteBuffer::new();
        U16Be::write(&mut w, 1u16).unwrap(); // majorVersion
        U16Be::write(&mut w, 0u16).unwrap(); // minorVersion
        let script_list = w.placeholder::<U16Be, u16>().unwrap();
        let feature_list = w.placeholder::<U16Be, u16>().unwrap();
        let lookup_list = w.placeholder::<U16Be, u16>().unwrap();

        w.write_offset16(script_list, 0).unwrap();
        self.write_script_list(&mut w);
        w.write_offset16(feature_list, 0).unwrap();
        self.write_feature_list(&mut w);
        w.write_offset16(lookup_list, 0).unwrap();
        self.write_lookup_list(&mut w);

        w.into_inner()
    }

    fn write_script_list(&self, w: &mut WriteBuffer) {
        let start = w.bytes_written();
        U16Be::write(w, self.scripts.len() as u16).unwrap();
        let offsets = self
            .scripts
            .iter()
            .map(|script| {
                U32Be::write(w, script.tag).unwrap();
                w.placeholder::<U16Be, u16>().unwrap()
            })
            .collect::<Vec<_>>();
        for (script, offset) in self.scripts.iter().zip(offsets) {
            w.write_offset16(offset, start).unwrap();
            let script_start = w.bytes_written();
            let default_langsys = w.placeholder::<U16Be, u16>().unwrap();
            U16Be::write(w, 0u16).unwrap(); // langSysCount
            w.write_offset16(default_langsys, script_start).unwrap();
            U16Be::write(w, 0u16).unwrap(); // lookupOrderOffset
            U16Be::write(w, 0xFFFFu16).unwrap(); // requiredFeatureIndex
            write_u16_array(w, &script.feature_indices);
        }
    }

    fn write_feature_list(&self, w: &mut WriteBuffer) {
        let start = w.bytes_written();
        U16Be::write(w, self.features.len() as u16).unwrap();
        let offsets = self
            .features
            .iter()
            .map(|feature| {
                U32Be::write(w, feature.tag).unwrap();
                w.placeholder::<U16Be, u16>().unwrap()
            })
            .collect::<Vec<_>>();
        for (feature, offset) in self.features.iter().zip(offsets) {
            w.write_offset16(offset, start).unwrap();
            U16Be::write(w, 0u16).unwrap(); // featureParamsOffset
            write_u16_array(w, &feature.lookup_indices);
        }
    }

    fn write_lookup_list(&self, w: &mut WriteBuffer) {
        let start = w.bytes_written();
        U16Be::write(w, self.lookups.len() as u16).unwrap();
        let offsets = w
            .placeholder_array::<U16Be, u16>(self.lookups.len())
            .unwrap();
        for (lookup, offset) in self.lookups.iter().zip(offsets) {
            w.write_offset16(offset, start).unwrap();
            let lookup_start = w.bytes_written();
            U16Be::write(w, lookup.lookup_type).unwrap();
            U16Be::write(w, lookup.lookup_flag).unwrap();
            U16Be::write(w, lookup.subtables.len() as u16).unwrap();
            let subtable_offsets: Vec<Placeholder<U16Be, u16>> = w
                .placeholder_array::<U16Be, u16>(lookup.subtables.len())
                .unwrap();
            if let Some(mark_filtering_set) = lookup.mark_filtering_set {
                U16Be::write(w, mark_filtering_set).unwrap();
            }
            for (subtable, offset) in lookup.subtables.iter().zip(subtable_offsets) {
                w.write_offset16(offset, lookup_start).unwrap();
                w.write_bytes(subtable).unwrap();
            }
        }
    }
}

fn write_u16_array(w: &mut WriteBuffer, values: &[u16]) {
    U16Be::write(w, values.len() as u16).unwrap();
    w.write_iter::<U16Be, _>(values.iter().copied()).unwrap();
}

/// A format 1 coverage table for `glyphs`, which must be sorted.
pub fn coverage(w: &mut WriteBuffer, glyphs: &[u16]) {
    U16Be::write(w, 1u16).unwrap();
    write_u16_array(w, glyphs);
}

/// Single adjustment format 1 giving every glyph in `glyphs` an xAdvance of `x_advance`.
pub fn single_pos_x_advance(glyphs: &[u16], x_advance: i16) -> Vec<u8> {
    let mut w = WriteBuffer::new();
    U16Be::write(&mut w, 1u16).unwrap(); // posFormat
    let coverage_offset = w.placeholder::<U16Be, u16>().unwrap();
    U16Be::write(&mut w, 0x0004u16).unwrap(); // valueFormat: xAdvance
    I16Be::write(&mut w, x_advance).unwrap();
    w.write_offset16(coverage_offset, 0).unwrap();
    coverage(&mut w, glyphs);
    w.into_inner()
}

/// Pair adjustment format 1 with one pair per first glyph. The adjustment is to the xAdvance
/// of the first glyph.
pub fn pair_pos_kerning(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
    let mut w = WriteBuffer::new();
    U16Be::write(&mut w, 1u16).unwrap(); // posFormat
    let coverage_offset = w.placeholder::<U16Be, u16>().unwrap();
    U16Be::write(&mut w, 0x0004u16).unwrap(); // valueFormat1: xAdvance
    U16Be::write(&mut w, 0u16).unwrap(); // valueFormat2
    U16Be::write(&mut w, pairs.len() as u16).unwrap();
    let pair_set_offsets = w.placeholder_array::<U16Be, u16>(pairs.len()).unwrap();
    w.write_offset16(coverage_offset, 0).unwrap();
    let first_glyphs = pairs.iter().map(|&(first, _, _)| first).collect::<Vec<_>>();
    coverage(&mut w, &first_glyphs);
    for (&(_, second, x_advance), offset) in pairs.iter().zip(pair_set_offsets) {
        w.write_offset16(offset, 0).unwrap();
        U16Be::write(&mut w, 1u16).unwrap(); // pairValueCount
        U16Be::write(&mut w, second).unwrap();
        I16Be::write(&mut w, x_advance).unwrap();
    }
    w.into_inner()
}

/// Mark-to-base format 1 with a single mark class, one mark and one base.
pub fn mark_base_pos(
    mark: u16,
    mark_anchor: (i16, i16),
    base: u16,
    base_anchor: (i16, i16),
) -> Vec<u8> {
    let mut w = WriteBuffer::new();
    U16Be::write(&mut w, 1u16).unwrap(); // posFormat
    let mark_coverage = w.placeholder::<U16Be, u16>().unwrap();
    let base_coverage = w.placeholder::<U16Be, u16>().unwrap();
    U16Be::write(&mut w, 1u16).unwrap(); // markClassCount
    let mark_array = w.placeholder::<U16Be, u16>().unwrap();
    let base_array = w.placeholder::<U16Be, u16>().unwrap();

    w.write_offset16(mark_coverage, 0).unwrap();
    coverage(&mut w, &[mark]);
    w.write_offset16(base_coverage, 0).unwrap();
    coverage(&mut w, &[base]);

    w.write_offset16(mark_array, 0).unwrap();
    let mark_array_start = w.bytes_written();
    U16Be::write(&mut w, 1u16).unwrap(); // markCount
    U16Be::write(&mut w, 0u16).unwrap(); // markClass
    let mark_anchor_offset = w.placeholder::<U16Be, u16>().unwrap();
    w.write_offset16(mark_anchor_offset, mark_array_start).unwrap();
    anchor(&mut w, mark_anchor);

    w.write_offset16(base_array, 0).unwrap();
    let base_array_start = w.bytes_written();
    U16Be::write(&mut w, 1u16).unwrap(); // baseCount
    let base_anchor_offset = w.placeholder::<U16Be, u16>().unwrap();
    w.write_offset16(base_anchor_offset, base_array_start).unwrap();
    anchor(&mut w, base_anchor);

    w.into_inner()
}

/// A format 1 anchor table.
pub fn anchor(w: &mut WriteBuffer, (x, y): (i16, i16)) {
    U16Be::write(w, 1u16).unwrap();
    I16Be::write(w, x).unwrap();
    I16Be::write(w, y).unwrap();
}

/// An extension subtable wrapping `subtable` of `lookup_type`.
pub fn extension(lookup_type: u16, subtable: &[u8]) -> Vec<u8> {
    let mut w = WriteBuffer::new();
    U16Be::write(&mut w, 1u16).unwrap(); // posFormat
    U16Be::write(&mut w, lookup_type).unwrap();
    U32Be::write(&mut w, 8u32).unwrap();
    w.write_bytes(subtable).unwrap();
    w.into_inner()
}

/// Context positioning format 1 whose `count` rule set offsets all point at the same rule set,
/// which in turn has `count` offsets to the same one glyph rule.
pub fn context_pos_shared_rules(count: u16) -> Vec<u8> {
    let mut w = WriteBuffer::new();
    U16Be::write(&mut w, 1u16).unwrap(); // posFormat
    let coverage_offset = w.placeholder::<U16Be, u16>().unwrap();
    U16Be::write(&mut w, count).unwrap(); // posRuleSetCount
    let rule_set_offsets = w
        .placeholder_array::<U16Be, u16>(usize::from(count))
        .unwrap();
    w.write_offset16(coverage_offset, 0).unwrap();
    coverage(&mut w, &[1]);

    for offset in rule_set_offsets {
        w.write_offset16(offset, 0).unwrap();
    }
    let rule_set_start = w.bytes_written();
    U16Be::write(&mut w, count).unwrap(); // posRuleCount
    let rule_offsets = w
        .placeholder_array::<U16Be, u16>(usize::from(count))
        .unwrap();
    for offset in rule_offsets {
        w.write_offset16(offset, rule_set_start).unwrap();
    }
    U16Be::write(&mut w, 1u16).unwrap(); // glyphCount
    U16Be::write(&mut w, 0u16).unwrap(); // posCount
    w.into_inner()
}
