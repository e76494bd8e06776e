//! The combination engine: the Cartesian product of every collection
//! attached to one test unit, merged into one record per product tuple.

use serde::{Deserialize, Serialize};

use crate::diagnostics::ExpandError;
use crate::param::Param;
use crate::paramseq::{OwnerInfo, ParamSeq};

/// Nesting order of the product over attached collections.
///
/// Both orders are observable through generated names and ordinals, so both
/// are kept. `Legacy` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductOrder {
    /// The first attached collection varies slowest.
    #[default]
    Legacy,
    /// The last attached collection varies slowest. Merged records still
    /// take their values in attachment order.
    Modern,
}

/// Computes the cartesian product of several dimensions, leftmost slowest.
///
/// For example: `cartesian_product(&[vec![1, 2], vec![3, 4]])` returns
/// `[[1, 3], [1, 4], [2, 3], [2, 4]]`. No dimensions give one empty tuple;
/// any empty dimension gives no tuples.
pub fn cartesian_product<T: Clone>(dimensions: &[Vec<T>]) -> Vec<Vec<T>> {
    let total: usize = dimensions.iter().map(Vec::len).product();

    let mut result = Vec::with_capacity(total);
    result.push(Vec::with_capacity(dimensions.len()));

    for dimension in dimensions {
        let mut next = Vec::with_capacity(result.len() * dimension.len());
        for existing in &result {
            for item in dimension {
                let mut tuple = existing.clone();
                tuple.push(item.clone());
                next.push(tuple);
            }
        }
        result = next;
    }

    result
}

/// Resolves the collections attached to one test unit into its final list
/// of records.
///
/// No collections means no expansion and an empty list. One collection
/// yields its records unchanged. Several are multiplied out eagerly, each
/// tuple merged in attachment order whatever the nesting; the first
/// conflicting tuple aborts the whole combination.
pub fn combine(
    seqs: &[ParamSeq],
    owner: &OwnerInfo,
    order: ProductOrder,
) -> Result<Vec<Param>, ExpandError> {
    let mut dimensions: Vec<Vec<Param>> = seqs.iter().map(|seq| seq.generate(owner)).collect();
    match dimensions.len() {
        0 => return Ok(Vec::new()),
        1 => return Ok(dimensions.swap_remove(0)),
        _ => {}
    }
    tracing::trace!(
        dimensions = dimensions.len(),
        order = ?order,
        "combining parameter collections"
    );

    if order == ProductOrder::Legacy {
        return cartesian_product(&dimensions)
            .iter()
            .map(|tuple| Param::combine(tuple))
            .collect();
    }

    // nest in reverse, but merge every tuple back in attachment order
    dimensions.reverse();
    cartesian_product(&dimensions)
        .iter()
        .map(|tuple| Param::combine(tuple.iter().rev()))
        .collect()
}
