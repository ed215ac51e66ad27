mod python;

use crate::{split, Segmentation, SourceBlock, SourceKind};

pub(crate) fn segment(kind: SourceKind, code: &str) -> Segmentation {
    split(&SourceBlock::new(kind, code))
}

pub(crate) fn texts(kind: SourceKind, code: &str) -> Vec<String> {
    segment(kind, code)
        .into_units()
        .into_iter()
        .map(|unit| unit.text)
        .collect()
}
