//! Presentation tags attached to lot rows.
//!
//! Only purchase and sale rows reach a lot, so [`RowTag::Header`] is never
//! set here; the report assembler tags its own header lines.

use crate::config::Settings;
use crate::models::{AnnotatedRow, RowTag, TransactionKind, TransactionRow};

/// Attaches [`RowTag`]s to rows as their lot is sealed.
#[derive(Debug, Clone)]
pub struct RowAnnotator {
    disposal_marker: String,
}

impl RowAnnotator {
    pub fn new(disposal_marker: impl Into<String>) -> Self {
        Self {
            disposal_marker: disposal_marker.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.disposal_marker.clone())
    }

    /// Tag a row of a lot. `negative` is the sign of the lot's result total.
    pub fn annotate(&self, row: TransactionRow, negative: bool) -> AnnotatedRow {
        let mut tags = Vec::new();

        if negative {
            tags.push(RowTag::Negative);
        }
        if row.party == self.disposal_marker {
            tags.push(RowTag::RecycleBin);
        }
        if row.kind == TransactionKind::Sale {
            tags.push(RowTag::Sale);
        }

        AnnotatedRow { row, tags }
    }
}

impl Default for RowAnnotator {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::row;

    #[test]
    fn test_plain_purchase_has_no_tags() {
        let tagged = RowAnnotator::default().annotate(row("ACHAT", "Dupont", "L1", "1", "1"), false);
        assert!(tagged.tags.is_empty());
    }

    #[test]
    fn test_all_tags() {
        let annotator = RowAnnotator::default();

        let sale = annotator.annotate(row("VENTE", "Corbeille", "L1", "1", "-1"), true);
        assert_eq!(sale.tags, vec![RowTag::Negative, RowTag::RecycleBin, RowTag::Sale]);

        let purchase = annotator.annotate(row("ACHAT", "Dupont", "L1", "1", "-1"), true);
        assert_eq!(purchase.tags, vec![RowTag::Negative]);
    }

    #[test]
    fn test_custom_marker() {
        let annotator = RowAnnotator::new("Destruction");
        assert!(annotator
            .annotate(row("ACHAT", "Destruction", "L1", "1", "1"), false)
            .has_tag(RowTag::RecycleBin));
        assert!(!annotator
            .annotate(row("ACHAT", "Corbeille", "L1", "1", "1"), false)
            .has_tag(RowTag::RecycleBin));
    }
}
