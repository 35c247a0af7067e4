//! Cursive attachment positioning (lookup type 3).

use crate::binary::read::{ReadBinaryDep, ReadCtxt, ReadFixedSizeDep, ReadScope};
use crate::error::DecodeError;
use crate::gpos::anchor::{read_nullable_anchor, Anchor};
use crate::gpos::DecodeContext;
use crate::layout::{read_offset_table, Coverage};
use crate::size;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursivePos {
    pub coverage: Coverage,
    pub entry_exit_records: Vec<EntryExitRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryExitRecord {
    pub entry_anchor: Option<Anchor>,
    pub exit_anchor: Option<Anchor>,
}

impl ReadBinaryDep for CursivePos {
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
                let entry_exit_count = usize::from(ctxt.read_u16be()?);
                let entry_exit_records = ctxt
                    .read_array_dep::<EntryExitRecord>(entry_exit_count, (scope, context))?
                    .read_to_vec()?;
                Ok(CursivePos {
                    coverage,
                    entry_exit_records,
                })
            }
            format => Err(DecodeError::UnknownFormat(format)),
        }
    }
}

impl ReadBinaryDep for EntryExitRecord {
    type Args<'a> = (ReadScope<'a>, DecodeContext<'a>);
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (scope, context): Self::Args<'a>,
    ) -> Result<Self, DecodeError> {
        let entry_anchor_offset = ctxt.read_u16be()?;
        let exit_anchor_offset = ctxt.read_u16be()?;
        let entry_anchor = read_nullable_anchor(scope, entry_anchor_offset, context)?;
        let exit_anchor = read_nullable_anchor(scope, exit_anchor_offset, context)?;
        Ok(EntryExitRecord {
            entry_anchor,
            exit_anchor,
        })
    }
}

impl ReadFixedSizeDep for EntryExitRecord {
    fn size(_args: Self::Args<'_>) -> usize {
        2 * size::U16
    }
}

impl CursivePos {
    /// The entry and exit anchors of `glyph`, or `None` if the glyph is not covered.
    pub fn entry_exit(&self, glyph: u16) -> Option<&EntryExitRecord> {
        let coverage_index = self.coverage.glyph_coverage_value(glyph)?;
        self.entry_exit_records.get(usize::from(coverage_index))
    }
}
