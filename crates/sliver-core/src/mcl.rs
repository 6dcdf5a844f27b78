//! MCL emitter: turns an eliminated formula into a `Predicate` macro plus
//! one of four fixed-point schemata selected by modality.
//!
//! Grounded directly on `atlas/mcl.py` in the original reference. The
//! structure of every `render_*` function here mirrors a `sprint_*`
//! function there line for line.

use std::collections::{BTreeMap, BTreeSet};

use crate::eliminate::Eliminated;
use crate::error::SliverError;
use crate::info::Info;
use crate::property::{Expr, Modality};

/// Whether an action pattern is wrapped as a box (`[...]`), a diamond
/// (`<...>`), or left bare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrap {
    Box,
    Diamond,
    Bare,
}

impl Wrap {
    fn around(self, s: &str) -> String {
        match self {
            Wrap::Box => format!("[{s}]"),
            Wrap::Diamond => format!("<{s}>"),
            Wrap::Bare => s.to_string(),
        }
    }
}

/// Split a fresh variable name `{var}_idx{offset}_{agent}` or
/// `{var}_{agent}` into its base-variable-with-offset text and the agent
/// id.
fn split_param(param: &str) -> Result<(&str, u32), SliverError> {
    let (var_part, agent_str) = param
        .rsplit_once('_')
        .ok_or_else(|| SliverError::InternalError {
            detail: format!("malformed fresh variable '{param}'"),
        })?;
    let agent_id: u32 = agent_str.parse().map_err(|_| SliverError::InternalError {
        detail: format!("malformed fresh variable '{param}'"),
    })?;
    Ok((var_part, agent_id))
}

/// The base variable name, stripped of any `_idx{offset}` suffix.
fn base_name(var_part: &str) -> &str {
    match var_part.find("_idx") {
        Some(idx) => &var_part[..idx],
        None => var_part,
    }
}

fn lookup(var_part: &str, info: &Info) -> Result<&crate::info::Variable, SliverError> {
    let name = base_name(var_part);
    info.lookup_var(name)
        .ok_or_else(|| SliverError::UnknownVariable {
            var: name.to_string(),
        })
}

/// Action pattern for a propositional variable `{var}_{agent}`: matches a
/// transition that writes value `binds_to` to `var` of `agent`.
fn action_pattern(param: &str, info: &Info, binds_to: &str) -> Result<String, SliverError> {
    let (var_part, agent_id) = split_param(param)?;
    let var = lookup(var_part, info)?;
    let label = var.store.label();
    Ok(format!(
        "{{{label} !{agent_id} !{} ?{binds_to}:Int ...}}",
        var.index
    ))
}

fn sprint_predicate(params: &[String], body: &str) -> String {
    format!("\nmacro Predicate({}) =\n    {body}\nend_macro\n", params.join(", "))
}

/// The stores referenced by `params`, each mapped to the set of variable
/// indices within it. Keyed by `Store` rather than its label string so
/// iteration follows the reference's fixed `i, lstig, e` order (`ATTR`,
/// `L`, `E`) rather than the labels' alphabetical one.
fn group_by_store(
    params: &[String],
    info: &Info,
) -> Result<BTreeMap<crate::info::Store, BTreeSet<u32>>, SliverError> {
    let mut by_store: BTreeMap<crate::info::Store, BTreeSet<u32>> = BTreeMap::new();
    for p in params {
        let (var_part, _) = split_param(p)?;
        let var = lookup(var_part, info)?;
        by_store.entry(var.store).or_default().insert(var.index);
    }
    Ok(by_store)
}

/// The "irrelevant transitions" disjunction: matches any transition that
/// cannot affect satisfaction of `Predicate`. Returns `None` if `params`
/// is empty (matching the reference, which emits nothing in that case).
fn render_irrelevant(
    params: &[String],
    info: &Info,
    suffix: &str,
    wrap: Wrap,
) -> Result<Option<String>, SliverError> {
    let by_store = group_by_store(params, info)?;
    if by_store.is_empty() {
        return Ok(None);
    }
    let mut clauses = Vec::new();
    let other_actions = by_store
        .keys()
        .map(|store| format!("(not {{{} ...}})", store.label()))
        .collect::<Vec<_>>()
        .join(" and ");
    clauses.push(other_actions);
    for (store, indices) in &by_store {
        let label = store.label();
        let filter = indices
            .iter()
            .map(|i| format!("(x <> {i})"))
            .collect::<Vec<_>>()
            .join(" and ");
        clauses.push(format!(
            "{{{label} ?any ?x:Nat ... where ({filter})}}"
        ));
    }
    let body = clauses.join("\n    or\n    ");
    Ok(Some(format!("({}{})", wrap.around(&body), suffix)))
}

/// Action-pattern initializers, `{prefix}_{p}`-named bind targets, and
/// `p:Int:={prefix}{p}`-style parameter declarations for each fresh
/// variable, in the order given.
fn preprocess(
    params: &[String],
    prefix: &str,
    info: &Info,
) -> Result<(Vec<String>, Vec<String>), SliverError> {
    let prefix = if prefix.is_empty() {
        String::new()
    } else {
        format!("{prefix}_")
    };
    let mut inits = Vec::new();
    let mut decls = Vec::new();
    for p in params {
        inits.push(action_pattern(p, info, &format!("{prefix}{p}"))?);
        decls.push(format!("{p}:Int:={prefix}{p}"));
    }
    Ok((inits, decls))
}

/// One update clause per tracked parameter: rebind it to the value `v`
/// observed on a matching write, recursing into `fname` with the other
/// parameters unchanged.
fn update_clauses(
    params: &[String],
    info: &Info,
    fname: &str,
    wrap: Wrap,
) -> Result<Vec<String>, SliverError> {
    let mut out = Vec::new();
    for (i, p) in params.iter().enumerate() {
        let pattern = action_pattern(p, info, "v")?;
        let args = params
            .iter()
            .enumerate()
            .map(|(j, q)| if i == j { "v".to_string() } else { q.clone() })
            .collect::<Vec<_>>()
            .join(", ");
        out.push(format!("({}{fname}({args}))", wrap.around(&pattern)));
    }
    Ok(out)
}

fn interleave_inits(irrelevant_star: &str, inits: &[String]) -> String {
    inits
        .iter()
        .map(|init| format!("{irrelevant_star} . {init}"))
        .collect::<Vec<_>>()
        .join(" . ")
}

fn render_reach(params: &[String], info: &Info) -> Result<String, SliverError> {
    let (_, args) = preprocess(params, "args", info)?;
    let macro_params = params
        .iter()
        .map(|p| format!("args_{p}"))
        .collect::<Vec<_>>()
        .join(", ");
    let joined = params.join(", ");
    let irrelevant = render_irrelevant(params, info, &format!(" <{joined}>"), Wrap::Diamond)?
        .unwrap_or_default();
    let updates = update_clauses(params, info, "R", Wrap::Diamond)?.join("\n    or\n    ");
    Ok(format!(
        "\nmacro Reach({macro_params}) =\nmu R ({}) . (\n    Predicate({joined})\n    or\n    ((<\"SPURIOUS\"> true) and ([not \"SPURIOUS\"] false))\n    or\n    {irrelevant}\n    or\n    {updates})\nend_macro\n",
        args.join(", ")
    ))
}

fn render_finally(params: &[String], info: &Info) -> Result<String, SliverError> {
    let (inits, args) = preprocess(params, "", info)?;
    let joined = params.join(", ");
    let irrelevant_bare = render_irrelevant(params, info, "", Wrap::Bare)?.unwrap_or_default();
    let irrelevant_star = format!("{irrelevant_bare}*");
    let init_seq = interleave_inits(&irrelevant_star, &inits);
    let irrelevant_box = render_irrelevant(params, info, &format!(" R({joined})"), Wrap::Box)?
        .unwrap_or_default();
    let updates = update_clauses(params, info, "R", Wrap::Box)?.join("\n    and\n    ");
    Ok(format!(
        "\n[{init_seq}]\nmu R ({}) . (\n    (Predicate({joined})\n    or\n    ((<\"SPURIOUS\"> true) and ([not \"SPURIOUS\"] false)))\n    or\n    ({irrelevant_box}\n    and\n    {updates}))\n",
        args.join(", ")
    ))
}

fn render_invariant(
    params: &[String],
    info: &Info,
    name: &str,
    short_circuit: Option<&str>,
) -> Result<String, SliverError> {
    let (inits, nu_params) = preprocess(params, "init", info)?;
    let joined = params.join(", ");
    let irrelevant_bare = render_irrelevant(params, info, "", Wrap::Bare)?.unwrap_or_default();
    let irrelevant_star = format!("{irrelevant_bare}*");
    let init_seq = interleave_inits(&irrelevant_star, &inits);
    let irrelevant_box = render_irrelevant(params, info, &format!(" Inv({joined})"), Wrap::Box)?
        .unwrap_or_default();
    let updates = update_clauses(params, info, "Inv", Wrap::Box)?.join("\n    and\n    ");

    let tail = format!("{irrelevant_box}\n    and\n    {updates}");
    let body = match short_circuit {
        Some(sc) => format!("{sc}({joined}) or (\n    {tail})"),
        None => tail,
    };
    Ok(format!(
        "\n[{init_seq}]\nnu Inv ({}) . (\n    {name}({joined})\n    and\n    {body})\n",
        nu_params.join(", ")
    ))
}

/// Render an eliminated AST node using MCL's operator spellings
/// (`%` → `mod`, `!=` → `<>`). An `Of` node surviving to here is a
/// programmer error: elimination must have removed all of them.
fn render_formula(node: &Expr) -> Result<String, SliverError> {
    match node {
        Expr::Int(n) => Ok(n.to_string()),
        Expr::Ident(id) => Ok(id.name.clone()),
        Expr::Of { .. } => Err(SliverError::InternalError {
            detail: "unexpected Of node in eliminated formula".to_string(),
        }),
        Expr::BinOp(lhs, op, rhs) => {
            let op_text = match op.as_str() {
                "%" => "mod",
                "!=" => "<>",
                other => other,
            };
            Ok(format!(
                "({} {op_text} {})",
                render_formula(lhs)?,
                render_formula(rhs)?
            ))
        }
        Expr::BuiltIn(f, args) => {
            let rendered = args
                .iter()
                .map(render_formula)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("{}({})", f.as_str(), rendered.join(", ")))
        }
        Expr::Nary(f, args) => {
            let rendered = args
                .iter()
                .map(render_formula)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("({})", rendered.join(&format!(" {} ", f.as_str()))))
        }
        Expr::Quant { .. } => Err(SliverError::InternalError {
            detail: "unexpected Quant node in eliminated formula".to_string(),
        }),
    }
}

/// Emit the full MCL text for an eliminated property.
pub fn emit(elim: &Eliminated, info: &Info) -> Result<String, SliverError> {
    let params: Vec<String> = elim.new_vars.iter().cloned().collect();
    let body = render_formula(&elim.formula)?;
    let mut out = sprint_predicate(&params, &body);

    match elim.modality {
        Modality::Always => {
            out.push_str(&render_invariant(&params, info, "Predicate", None)?);
        }
        Modality::Finally => {
            out.push_str(&render_finally(&params, info)?);
        }
        Modality::Fairly => {
            out.push_str(&render_reach(&params, info)?);
            out.push_str(&render_invariant(&params, info, "Reach", Some("Predicate"))?);
        }
        Modality::FairlyInf => {
            out.push_str(&render_reach(&params, info)?);
            out.push_str(&render_invariant(&params, info, "Reach", None)?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eliminate::eliminate;
    use crate::info;

    fn info_one_agent() -> Info {
        info::parse("0=x=0|A 0,1||;|always forall A a, x of a = 0").unwrap()
    }

    fn info_two_agents_iface() -> Info {
        info::parse("|A 0,2|0=k=0||finally exists A a, k of a = 1").unwrap()
    }

    fn info_two_types() -> Info {
        info::parse("|A 0,2|0=flag=0||B 2,3|0=flag=0||fairly forall A a, exists B b, flag of a != flag of b").unwrap()
    }

    #[test]
    fn s1_trivial_always() {
        let info = info_one_agent();
        let prop = crate::property::parse(&info.properties[0]).unwrap();
        let (elim, _) = eliminate(&prop, &info.spawn).unwrap();
        let mcl = emit(&elim, &info).unwrap();
        assert!(mcl.contains("macro Predicate(x_0) =\n    ((x_0 = 0))"));
        assert!(mcl.contains("nu Inv"));
        assert!(mcl.contains("Predicate(x_0)"));
    }

    #[test]
    fn s2_finally_two_agents() {
        let info = info_two_agents_iface();
        let prop = crate::property::parse(&info.properties[0]).unwrap();
        let (elim, _) = eliminate(&prop, &info.spawn).unwrap();
        let mcl = emit(&elim, &info).unwrap();
        assert!(mcl.contains("macro Predicate(k_0, k_1) =\n    ((k_0 = 1) or (k_1 = 1))"));
        assert!(mcl.contains("mu R"));
        assert!(mcl.contains("SPURIOUS"));
    }

    #[test]
    fn s3_fairly_two_types() {
        let info = info_two_types();
        let prop = crate::property::parse(&info.properties[0]).unwrap();
        let (elim, _) = eliminate(&prop, &info.spawn).unwrap();
        let mcl = emit(&elim, &info).unwrap();
        assert!(mcl.contains("macro Predicate("));
        assert!(mcl.contains("macro Reach("));
    }

    #[test]
    fn exactly_one_predicate_and_one_fixed_point() {
        let info = info_one_agent();
        let prop = crate::property::parse(&info.properties[0]).unwrap();
        let (elim, _) = eliminate(&prop, &info.spawn).unwrap();
        let mcl = emit(&elim, &info).unwrap();
        assert_eq!(mcl.matches("macro Predicate(").count(), 1);
        assert_eq!(mcl.matches("nu Inv").count() + mcl.matches("mu R").count(), 1);
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let info = info_one_agent();
        // Eliminate, then corrupt a fresh variable name so lookup fails.
        let prop = crate::property::parse(&info.properties[0]).unwrap();
        let (mut elim, _) = eliminate(&prop, &info.spawn).unwrap();
        elim.new_vars.clear();
        elim.new_vars.insert("ghost_0".to_string());
        let err = emit(&elim, &info).unwrap_err();
        assert!(matches!(err, SliverError::UnknownVariable { var } if var == "ghost"));
    }

    #[test]
    fn empty_domain_does_not_crash_emission() {
        let info = info::parse("0=k=0|A 0,1||;|always forall C c, k of c = 0").unwrap();
        let prop = crate::property::parse(&info.properties[0]).unwrap();
        let (elim, warnings) = eliminate(&prop, &info.spawn).unwrap();
        assert_eq!(warnings.len(), 1);
        let mcl = emit(&elim, &info).unwrap();
        assert!(mcl.contains("macro Predicate() =\n    ()"));
    }
}
