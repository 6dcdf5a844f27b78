//! Quantifier elimination: rewrite a quantified `Prop` into a
//! quantifier-free formula over fresh `{var}_{agent_id}` propositional
//! variables, given the concrete `Spawn` table.

use std::collections::{BTreeSet, HashSet};

use crate::error::{SliverError, Warning};
use crate::info::Spawn;
use crate::property::{Expr, Ident, Modality, NaryFn, Prop, Quantifier, pprint};

/// The result of eliminating a property's quantifiers.
pub struct Eliminated {
    /// The quantifier-free formula, using only `BinOp`, `BuiltIn`, `Nary`,
    /// integer literals, and fresh identifiers.
    pub formula: Expr,
    /// The fresh propositional variables introduced, in sorted order.
    pub new_vars: BTreeSet<String>,
    pub modality: Modality,
}

/// Eliminate every quantifier in `prop`, returning the ground formula, the
/// set of fresh variables it introduces, the modality, and any non-fatal
/// warnings (currently only `EmptyQuantifierDomain`).
pub fn eliminate(prop: &Prop, spawn: &Spawn) -> Result<(Eliminated, Vec<Warning>), SliverError> {
    let (chain, mut body) = collect_chain(&prop.quant)?;

    let mut new_vars = BTreeSet::new();
    let mut warnings = Vec::new();

    // Process innermost-to-outermost, matching the reference
    // implementation's dict-insertion order (see DESIGN.md).
    for (varname, kind, typename) in chain.iter().rev() {
        if !contains(&body, varname) {
            continue;
        }
        let ids = spawn.ids_of_type(typename);
        if ids.is_empty() {
            warnings.push(Warning::EmptyQuantifierDomain {
                var: varname.clone(),
                typename: typename.clone(),
            });
        }
        let instances: Vec<Expr> = ids
            .iter()
            .map(|&id| substitute(&body, varname, id, &mut new_vars))
            .collect();
        body = Expr::Nary(kind.fold_fn(), instances);
    }

    if let Some(agent) = first_free_agent(&body) {
        return Err(SliverError::UnboundAgent { var: agent });
    }

    Ok((
        Eliminated {
            formula: body,
            new_vars,
            modality: prop.modality,
        },
        warnings,
    ))
}

/// Walk the `Quant` chain outer-to-inner, returning the ordered list of
/// `(varname, quantifier, typename)` bindings and the terminal non-`Quant`
/// body. Rejects a name bound twice along the chain.
fn collect_chain(expr: &Expr) -> Result<(Vec<(String, Quantifier, String)>, Expr), SliverError> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut cur = expr;
    loop {
        match cur {
            Expr::Quant {
                kind,
                typename,
                varname,
                inner,
            } => {
                if !seen.insert(varname.clone()) {
                    return Err(SliverError::DuplicateBinding {
                        var: varname.clone(),
                    });
                }
                chain.push((varname.clone(), *kind, typename.clone()));
                cur = inner.as_ref();
            }
            other => return Ok((chain, other.clone())),
        }
    }
}

/// Does `expr` syntactically reference `var` as the agent of some `Of`
/// node (directly, or nested inside another `Of`'s offset)?
fn contains(expr: &Expr, var: &str) -> bool {
    match expr {
        Expr::Of { offset, agent, .. } => {
            agent == var || offset.as_deref().is_some_and(|o| contains(o, var))
        }
        Expr::BinOp(lhs, _, rhs) => contains(lhs, var) || contains(rhs, var),
        Expr::BuiltIn(_, args) | Expr::Nary(_, args) => args.iter().any(|a| contains(a, var)),
        Expr::Quant { inner, .. } => contains(inner, var),
        Expr::Int(_) | Expr::Ident(_) => false,
    }
}

/// Replace every `Of(var, offset, agent = bound_var)` in `expr` with the
/// fresh identifier `{var}_{agent_id}` (or, when an offset is present,
/// `{var}_idx{offset}_{agent_id}`, with the offset sanitized to
/// identifier-safe characters, preserving it rather than silently
/// dropping it, per the open design question this resolves, while
/// staying a syntactically valid MCL/LNT identifier).
fn substitute(expr: &Expr, bound_var: &str, agent_id: u32, fresh: &mut BTreeSet<String>) -> Expr {
    match expr {
        Expr::Of { var, offset, agent } => {
            let new_offset = offset
                .as_deref()
                .map(|o| Box::new(substitute(o, bound_var, agent_id, fresh)));
            if agent == bound_var {
                let name = match &new_offset {
                    Some(o) => format!("{var}_idx{}_{agent_id}", sanitize_offset(&pprint(o))),
                    None => format!("{var}_{agent_id}"),
                };
                fresh.insert(name.clone());
                Expr::Ident(Ident::new(name))
            } else {
                Expr::Of {
                    var: var.clone(),
                    offset: new_offset,
                    agent: agent.clone(),
                }
            }
        }
        Expr::BinOp(lhs, op, rhs) => Expr::BinOp(
            Box::new(substitute(lhs, bound_var, agent_id, fresh)),
            *op,
            Box::new(substitute(rhs, bound_var, agent_id, fresh)),
        ),
        Expr::BuiltIn(f, args) => Expr::BuiltIn(
            *f,
            args.iter()
                .map(|a| substitute(a, bound_var, agent_id, fresh))
                .collect(),
        ),
        Expr::Nary(f, args) => Expr::Nary(
            *f,
            args.iter()
                .map(|a| substitute(a, bound_var, agent_id, fresh))
                .collect(),
        ),
        Expr::Quant { .. } => expr.clone(),
        Expr::Int(_) | Expr::Ident(_) => expr.clone(),
    }
}

/// Turn an offset's pretty-printed text into identifier-safe characters,
/// so the fresh variable name it feeds into stays a valid MCL identifier
/// even for a non-literal offset expression (e.g. `a + 1`).
fn sanitize_offset(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Find the agent name of the first `Of` node remaining in `expr`, if any:
/// a free reference never bound by an enclosing quantifier.
fn first_free_agent(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Of { agent, .. } => Some(agent.clone()),
        Expr::BinOp(lhs, _, rhs) => first_free_agent(lhs).or_else(|| first_free_agent(rhs)),
        Expr::BuiltIn(_, args) | Expr::Nary(_, args) => {
            args.iter().find_map(first_free_agent)
        }
        Expr::Quant { inner, .. } => first_free_agent(inner),
        Expr::Int(_) | Expr::Ident(_) => None,
    }
}
