//! Group consecutive lots by counterparty.
//!
//! Lots are never reordered: two lots of the same buyer separated by a lot
//! of another buyer end up in two different groups. Buyer contiguity comes
//! from the upstream sort by lot identifier.
//!
//! ```text
//! Lots (ordered)                 →  Buyer groups
//! ┌──────────────────────┐         ┌─────────────────────┐
//! │ L1  party: Dupont    │         │ Dupont: [L1, L2]    │
//! │ L2  party: Dupont    │    →    ├─────────────────────┤
//! │ L3  party: Martin    │         │ Martin: [L3]        │
//! └──────────────────────┘         └─────────────────────┘
//! ```

use std::mem;

use crate::error::{LotError, LotResult};
use crate::models::{BuyerGroup, Lot};

/// Group sealed lots by the counterparty of their first row.
pub fn group_by_party(lots: Vec<Lot>) -> LotResult<Vec<BuyerGroup>> {
    let mut lots = lots.into_iter();
    let first = lots.next().ok_or(LotError::EmptyInput)?;

    let mut groups = Vec::new();
    let mut current = BuyerGroup {
        party: first.party().to_string(),
        lots: vec![first],
    };

    for lot in lots {
        if lot.party() == current.party {
            current.lots.push(lot);
        } else {
            let party = lot.party().to_string();
            groups.push(mem::replace(
                &mut current,
                BuyerGroup {
                    party,
                    lots: vec![lot],
                },
            ));
        }
    }

    groups.push(current);
    Ok(groups)
}
