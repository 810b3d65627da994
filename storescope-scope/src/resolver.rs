//! Reduces sets of identifiers to the scope a lookup applies to.

use crate::{DEFAULT_TYPE_ID, Scope, ScopeError, ScopeResult, TypeId};

/// Splits `ids` into the lookup target and its fallback chain.
///
/// `ids[0]` is the target (`DEFAULT_TYPE_ID` when `ids` is empty). The
/// remaining identifiers are kept in caller order when their scope is
/// shallower than the target's, or when they are the default scope itself.
/// The chain always ends in `DEFAULT_TYPE_ID`.
#[must_use]
pub fn target_and_parents(ids: &[TypeId]) -> (TypeId, Vec<TypeId>) {
    let Some((&target, rest)) = ids.split_first() else {
        return (DEFAULT_TYPE_ID, vec![DEFAULT_TYPE_ID]);
    };

    let target_scope = target.scope();
    let mut parents = Vec::with_capacity(rest.len() + 1);
    let mut has_default = false;
    for &id in rest {
        if id == DEFAULT_TYPE_ID {
            has_default = true;
            parents.push(id);
        } else if id.scope() < target_scope {
            parents.push(id);
        }
    }
    if !has_default {
        parents.push(DEFAULT_TYPE_ID);
    }
    (target, parents)
}

/// Finds the single deepest scope shared by all identifiers.
///
/// The deepest scope present among `Website`, `Group` and `Store` wins, but
/// only if every identifier at that depth carries the same ID; mixed IDs at
/// the winning depth (say `Store(2)` and `Store(3)`) cannot be reduced to one
/// scope and are rejected. `Default` and `Absent` entries never fail.
pub fn lowest(ids: &[TypeId]) -> ScopeResult<TypeId> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();

    // Indexed by scope tag; only Website, Group and Store are counted.
    let mut count = [0u64; 5];
    let mut sum = [0u64; 5];
    let mut pick = DEFAULT_TYPE_ID;
    for id in sorted {
        let (scope, num) = id.unpack();
        if scope < Scope::Website {
            continue;
        }
        count[scope as usize] += 1;
        sum[scope as usize] += num as u64;
        pick = id;
    }

    let (scope, num) = pick.unpack();
    if scope < Scope::Website {
        return Ok(DEFAULT_TYPE_ID);
    }
    let mean = sum[scope as usize] / count[scope as usize];
    if mean != num as u64 {
        return Err(ScopeError::NotValid(format!(
            "ids {ids:?} disagree at scope {scope}, cannot pick a single lowest scope"
        )));
    }
    Ok(pick)
}
