//! Counterexample trace formatting: turns raw CADP action text back into
//! human-readable variable assignments.
//!
//! Grounded on `info.py`'s `pprint_var`/`pprint_assign` for the rendering
//! rules, and on `cex.py`'s `translate_cadp` for the shape of the trace
//! being read (a sequence of `{LABEL !agent !index !value}` actions, the
//! same patterns `crate::mcl` emits).

use crate::info::{Info, Store};

/// One observed write: agent `agent` set its store-`store` variable at
/// `index` to `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub store: Store,
    pub agent: u32,
    pub index: u32,
    pub value: i64,
}

/// The variable name (with array offset, if any) holding index `key`
/// within `store`, or `None` if no declared variable covers it.
fn pprint_var(store: Store, key: u32, info: &Info) -> Option<String> {
    let found = match store {
        Store::Env => find_var(info.e.values(), key),
        Store::Iface => find_var(info.spawn.iter().flat_map(|(_, ty)| ty.iface.values()), key),
        Store::Lstig => find_var(info.spawn.iter().flat_map(|(_, ty)| ty.lstig.values()), key),
    };
    found.map(|(v, offset)| {
        if v.is_array() {
            format!("{}[{offset}]", v.name)
        } else {
            v.name.clone()
        }
    })
}

fn find_var<'a>(
    vars: impl Iterator<Item = &'a crate::info::Variable>,
    key: u32,
) -> Option<(&'a crate::info::Variable, u32)> {
    vars.find(|v| v.index_range().contains(&key))
        .map(|v| (v, key - v.index))
}

fn arrow(store: Store) -> &'static str {
    match store {
        Store::Env => "<--",
        Store::Iface => "<-",
        Store::Lstig => "<~",
    }
}

/// `"{var} {arrow} {value}"`, e.g. `"x[1] <- 3"`. `None` if `key` names no
/// declared variable in `store`.
pub fn pprint_assign(store: Store, key: u32, value: i64, info: &Info) -> Option<String> {
    pprint_var(store, key, info).map(|name| format!("{name} {} {value}", arrow(store)))
}

/// Render a sequence of observed actions as a readable trace, one line per
/// action, prefixed by the originating agent's type and id for per-agent
/// stores.
pub fn format_trace(actions: &[Action], info: &Info) -> String {
    let mut out = String::new();
    for action in actions {
        let Some(assign) = pprint_assign(action.store, action.index, action.value, info) else {
            continue;
        };
        match action.store {
            Store::Env => out.push_str(&format!("\t{assign}\n")),
            Store::Iface | Store::Lstig => {
                let ty_name = info
                    .spawn
                    .lookup(action.agent)
                    .map(|ty| ty.name.as_str())
                    .unwrap_or("?");
                out.push_str(&format!("{ty_name} {}:\t{assign}\n", action.agent));
            }
        }
    }
    out
}

/// Parse `{LABEL !agent !index !value}`-shaped action lines out of raw
/// CADP output, skipping anything that doesn't match. Environment actions
/// omit the agent field (`{E !index !value}`); `agent` is reported as `0`
/// in that case since environment writes have no owning agent.
pub fn parse_cadp_actions(text: &str) -> Vec<Action> {
    text.lines().filter_map(parse_action_line).collect()
}

fn parse_action_line(line: &str) -> Option<Action> {
    let line = line.trim().trim_start_matches('{').trim_end_matches('}');
    let mut parts = line.split_whitespace();
    let label = parts.next()?;
    let store = Store::from_label(label)?;
    let nums: Vec<i64> = parts
        .map(|p| p.trim_start_matches('!').parse::<i64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match (store, nums.as_slice()) {
        (Store::Env, [index, value]) => Some(Action {
            store,
            agent: 0,
            index: *index as u32,
            value: *value,
        }),
        (_, [agent, index, value]) => Some(Action {
            store,
            agent: *agent as u32,
            index: *index as u32,
            value: *value,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info;

    fn info_one_agent() -> Info {
        info::parse("0=k=0|A 0,2|0=flag=0||;|always forall A a, flag of a = 0").unwrap()
    }

    #[test]
    fn pprint_var_names_env_variable() {
        let info = info_one_agent();
        assert_eq!(pprint_var(Store::Env, 0, &info), Some("k".to_string()));
    }

    #[test]
    fn pprint_var_names_iface_variable() {
        let info = info_one_agent();
        assert_eq!(pprint_var(Store::Iface, 0, &info), Some("flag".to_string()));
    }

    #[test]
    fn pprint_var_unknown_index_is_none() {
        let info = info_one_agent();
        assert_eq!(pprint_var(Store::Iface, 99, &info), None);
    }

    #[test]
    fn pprint_assign_uses_store_specific_arrow() {
        let info = info_one_agent();
        assert_eq!(
            pprint_assign(Store::Env, 0, 7, &info),
            Some("k <-- 7".to_string())
        );
        assert_eq!(
            pprint_assign(Store::Iface, 0, 1, &info),
            Some("flag <- 1".to_string())
        );
    }

    #[test]
    fn parse_action_line_reads_agent_store_writes() {
        let actions = parse_cadp_actions("{ATTR !0 !0 !1}\nnot an action\n{E !0 !7}");
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].store, Store::Iface);
        assert_eq!(actions[0].agent, 0);
        assert_eq!(actions[0].value, 1);
        assert_eq!(actions[1].store, Store::Env);
        assert_eq!(actions[1].value, 7);
    }

    #[test]
    fn format_trace_renders_agent_prefixed_lines() {
        let info = info_one_agent();
        let actions = vec![Action {
            store: Store::Iface,
            agent: 1,
            index: 0,
            value: 1,
        }];
        let out = format_trace(&actions, &info);
        assert_eq!(out, "A 1:\tflag <- 1\n");
    }
}
