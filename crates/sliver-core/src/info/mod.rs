//! The system descriptor: agents, stores, variables, and the spawn table,
//! parsed from the textual blob emitted by the external `LabsTranslate`
//! translator (`sliver_core::driver::Translator::info`).

pub mod init_expr;

use std::collections::BTreeMap;
use std::fmt;

pub use init_expr::{InitExpr, InitExprError};

/// Sentinel value used for an uninitialized (`undef`) variable.
pub const UNDEF: i64 = -32767;

/// One of the three LAbS variable stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Store {
    /// Per-agent public interface.
    Iface,
    /// Per-agent stigmergic store.
    Lstig,
    /// System-wide shared environment.
    Env,
}

impl Store {
    /// The MCL action label that tags a write to a variable in this store.
    pub fn label(self) -> &'static str {
        match self {
            Store::Iface => "ATTR",
            Store::Lstig => "L",
            Store::Env => "E",
        }
    }

    /// The inverse of [`Store::label`], used when reading a counterexample
    /// trace back into store/index/value triples.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ATTR" => Some(Store::Iface),
            "L" => Some(Store::Lstig),
            "E" => Some(Store::Env),
            _ => None,
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Store::Iface => "i",
            Store::Lstig => "lstig",
            Store::Env => "e",
        };
        write!(f, "{s}")
    }
}

/// How a variable's initial value is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitSpec {
    /// A single initializer expression.
    Single(InitExpr),
    /// An explicit enumeration of feasible values.
    Enum(Vec<InitExpr>),
    /// An inclusive lower / exclusive upper range.
    Range(InitExpr, InitExpr),
    /// The `undef` sentinel.
    Undef,
}

impl InitSpec {
    /// All initializer expressions appearing in this spec, for validation
    /// or enumeration purposes.
    pub fn feasible_values(&self, agent_id: i64) -> Vec<i64> {
        match self {
            InitSpec::Single(e) => vec![e.eval(agent_id)],
            InitSpec::Enum(es) => es.iter().map(|e| e.eval(agent_id)).collect(),
            InitSpec::Range(lo, hi) => {
                let (lo, hi) = (lo.eval(agent_id), hi.eval(agent_id));
                (lo..hi).collect()
            }
            InitSpec::Undef => vec![UNDEF],
        }
    }
}

/// A single variable declared in some store.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub index: u32,
    pub name: String,
    pub size: u32,
    pub store: Store,
    pub init: InitSpec,
}

impl Variable {
    /// Whether this variable occupies more than one index (an array).
    pub fn is_array(&self) -> bool {
        self.size > 1
    }

    /// The half-open index range `[index, index + size)` this variable
    /// occupies within its store.
    pub fn index_range(&self) -> std::ops::Range<u32> {
        self.index..(self.index + self.size)
    }

    /// A deterministic feasible initial value for the variable, as spawned
    /// for agent `agent_id`. Narrower than the Python reference's
    /// `rnd_value` (which samples uniformly at random): this picks the
    /// first feasible value, which is enough for the core pipeline (see
    /// DESIGN.md for the rationale).
    pub fn sample(&self, agent_id: i64) -> i64 {
        self.init
            .feasible_values(agent_id)
            .into_iter()
            .next()
            .unwrap_or(UNDEF)
    }
}

/// A named agent type: its ordered `iface` and `lstig` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentType {
    pub name: String,
    pub iface: BTreeMap<u32, Variable>,
    pub lstig: BTreeMap<u32, Variable>,
}

/// Maps half-open agent-id ranges to the agent type spawned there.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spawn {
    ranges: Vec<(std::ops::Range<u32>, AgentType)>,
}

impl Spawn {
    pub fn new(ranges: Vec<(std::ops::Range<u32>, AgentType)>) -> Self {
        Spawn { ranges }
    }

    /// The agent type spawned at `id`, if any.
    pub fn lookup(&self, id: u32) -> Option<&AgentType> {
        self.ranges
            .iter()
            .find(|(range, _)| range.contains(&id))
            .map(|(_, ty)| ty)
    }

    /// All agent ids of the given type, in ascending numeric order.
    pub fn ids_of_type(&self, typename: &str) -> Vec<u32> {
        self.ranges
            .iter()
            .find(|(_, ty)| ty.name == typename)
            .map(|(range, _)| range.clone().collect())
            .unwrap_or_default()
    }

    /// Total number of agents in the system (the upper bound of the last
    /// range), or 0 if no agents are spawned.
    pub fn num_agents(&self) -> u32 {
        self.ranges
            .iter()
            .map(|(range, _)| range.end)
            .max()
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(std::ops::Range<u32>, AgentType)> {
        self.ranges.iter()
    }
}

/// The full system descriptor: the spawn table, the environment store, and
/// the properties to verify.
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub spawn: Spawn,
    pub e: BTreeMap<u32, Variable>,
    pub properties: Vec<String>,
}

impl Info {
    /// Find a variable by name, searching `e`, then `i`, then `lstig`, in
    /// that order (matches the Python reference's `lookup_var`).
    pub fn lookup_var(&self, name: &str) -> Option<&Variable> {
        if let Some(v) = self.e.values().find(|v| v.name == name) {
            return Some(v);
        }
        for (_, ty) in self.spawn.iter() {
            if let Some(v) = ty.iface.values().find(|v| v.name == name) {
                return Some(v);
            }
        }
        for (_, ty) in self.spawn.iter() {
            if let Some(v) = ty.lstig.values().find(|v| v.name == name) {
                return Some(v);
            }
        }
        None
    }
}

/// Error parsing a system descriptor blob.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorError {
    Empty,
    MalformedRange(String),
    DuplicateIndex(u32),
    InvalidVariable(String),
    InitExpr(InitExprError),
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::Empty => write!(f, "empty descriptor"),
            DescriptorError::MalformedRange(s) => write!(f, "malformed agent range '{s}'"),
            DescriptorError::DuplicateIndex(i) => write!(f, "duplicate variable index {i}"),
            DescriptorError::InvalidVariable(s) => write!(f, "invalid variable entry '{s}'"),
            DescriptorError::InitExpr(e) => write!(f, "invalid initializer: {e}"),
        }
    }
}

impl std::error::Error for DescriptorError {}

impl From<InitExprError> for DescriptorError {
    fn from(e: InitExprError) -> Self {
        DescriptorError::InitExpr(e)
    }
}

/// Parse the descriptor blob:
/// `ENV | COMP1 | IFACE1 | LSTIG1 | COMP2 | IFACE2 | LSTIG2 | … | PROPS`.
pub fn parse(text: &str) -> Result<Info, DescriptorError> {
    if text.is_empty() {
        return Err(DescriptorError::Empty);
    }
    let fields: Vec<&str> = text.split('|').collect();
    if fields.len() < 2 {
        return Err(DescriptorError::Empty);
    }
    let env_field = fields[0];
    let props_field = fields[fields.len() - 1];
    let comp_fields = &fields[1..fields.len() - 1];

    let e = parse_var_list(env_field, Store::Env)?;

    let mut ranges = Vec::new();
    for chunk in comp_fields.chunks(3) {
        let comp = chunk[0];
        let iface_field = chunk.get(1).copied().unwrap_or("");
        let lstig_field = chunk.get(2).copied().unwrap_or("");

        let mut parts = comp.trim().splitn(2, ' ');
        let name = parts
            .next()
            .ok_or_else(|| DescriptorError::MalformedRange(comp.to_string()))?;
        let rng = parts
            .next()
            .ok_or_else(|| DescriptorError::MalformedRange(comp.to_string()))?;
        let (lo, hi) = rng
            .split_once(',')
            .ok_or_else(|| DescriptorError::MalformedRange(comp.to_string()))?;
        let lo: u32 = lo
            .trim()
            .parse()
            .map_err(|_| DescriptorError::MalformedRange(comp.to_string()))?;
        let hi: u32 = hi
            .trim()
            .parse()
            .map_err(|_| DescriptorError::MalformedRange(comp.to_string()))?;

        let iface = parse_var_list(iface_field, Store::Iface)?
            .into_iter()
            .collect();
        let lstig = parse_var_list(lstig_field, Store::Lstig)?
            .into_iter()
            .collect();

        ranges.push((
            lo..hi,
            AgentType {
                name: name.to_string(),
                iface,
                lstig,
            },
        ));
    }

    let properties: Vec<String> = props_field
        .split(';')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if properties.is_empty() {
        return Err(DescriptorError::Empty);
    }

    Ok(Info {
        spawn: Spawn::new(ranges),
        e: e.into_iter().collect(),
        properties,
    })
}

/// Parse a `;`-separated list of `index=name[=init]` entries.
fn parse_var_list(field: &str, store: Store) -> Result<Vec<(u32, Variable)>, DescriptorError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(Vec::new());
    }
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for entry in field.split(';').filter(|s| !s.is_empty()) {
        let var = parse_var_entry(entry, store)?;
        if !seen.insert(var.index) {
            return Err(DescriptorError::DuplicateIndex(var.index));
        }
        out.push((var.index, var));
    }
    Ok(out)
}

fn parse_var_entry(entry: &str, store: Store) -> Result<Variable, DescriptorError> {
    let mut parts = entry.splitn(3, '=');
    let index_str = parts
        .next()
        .ok_or_else(|| DescriptorError::InvalidVariable(entry.to_string()))?;
    let name_str = parts
        .next()
        .ok_or_else(|| DescriptorError::InvalidVariable(entry.to_string()))?;
    let init_str = parts.next();

    let index: u32 = index_str
        .trim()
        .parse()
        .map_err(|_| DescriptorError::InvalidVariable(entry.to_string()))?;

    let (name, size) = if let Some(bracket) = name_str.find('[') {
        if !name_str.ends_with(']') {
            return Err(DescriptorError::InvalidVariable(entry.to_string()));
        }
        let size: u32 = name_str[bracket + 1..name_str.len() - 1]
            .parse()
            .map_err(|_| DescriptorError::InvalidVariable(entry.to_string()))?;
        (name_str[..bracket].to_string(), size)
    } else {
        (name_str.to_string(), 1)
    };

    let init = match init_str {
        None => InitSpec::Single(InitExpr::Int(0)),
        Some(s) => parse_init_spec(s)?,
    };

    Ok(Variable {
        index,
        name,
        size,
        store,
        init,
    })
}

fn parse_init_spec(s: &str) -> Result<InitSpec, DescriptorError> {
    let s = s.trim();
    if s == "undef" {
        Ok(InitSpec::Undef)
    } else if let Some(inner) = s.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let values = inner
            .split(',')
            .map(init_expr::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(InitSpec::Enum(values))
    } else if let Some((lo, hi)) = s.split_once("..") {
        Ok(InitSpec::Range(
            init_expr::parse(lo)?,
            init_expr::parse(hi)?,
        ))
    } else {
        Ok(InitSpec::Single(init_expr::parse(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> &'static str {
        "0=x=0|A 0,1||;|always forall A a, x of a = 0"
    }

    #[test]
    fn parses_trivial_descriptor() {
        let info = parse(descriptor()).unwrap();
        assert_eq!(info.spawn.num_agents(), 1);
        assert_eq!(info.e.len(), 1);
        assert_eq!(info.properties, vec!["always forall A a, x of a = 0"]);
    }

    #[test]
    fn empty_iface_and_lstig_parse_to_empty_maps() {
        let info = parse(descriptor()).unwrap();
        let (_, ty) = info.spawn.iter().next().unwrap();
        assert!(ty.iface.is_empty());
        assert!(ty.lstig.is_empty());
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(parse(""), Err(DescriptorError::Empty));
    }

    #[test]
    fn duplicate_index_is_an_error() {
        let bad = "0=x=0;0=y=0|A 0,1||;|always forall A a, x of a = 0";
        assert!(matches!(parse(bad), Err(DescriptorError::DuplicateIndex(0))));
    }

    #[test]
    fn undef_sentinel() {
        let d = "0=x=undef|A 0,1||;|always forall A a, x of a = 0";
        let info = parse(d).unwrap();
        let v = info.e.get(&0).unwrap();
        assert_eq!(v.sample(0), UNDEF);
    }

    #[test]
    fn array_variable_size_and_offset() {
        let d = "0=x[3]=[1,2,3]|A 0,1||;|always forall A a, x of a = 0";
        let info = parse(d).unwrap();
        let v = info.e.get(&0).unwrap();
        assert!(v.is_array());
        assert_eq!(v.index_range(), 0..3);
    }

    #[test]
    fn lookup_var_searches_e_then_i_then_lstig() {
        let d = "0=k=0|A 0,2|0=k=1|;|always forall A a, k of a = 0";
        let info = parse(d).unwrap();
        let v = info.lookup_var("k").unwrap();
        assert_eq!(v.store, Store::Env);
    }

    #[test]
    fn spawn_tids_ascending() {
        let d = "|A 0,3||;|always forall A a, x of a = 0";
        let info = parse(d).unwrap();
        assert_eq!(info.spawn.ids_of_type("A"), vec![0, 1, 2]);
    }

    #[test]
    fn range_init_is_half_open() {
        let d = "0=x=0..3|A 0,1||;|always forall A a, x of a = 0";
        let info = parse(d).unwrap();
        let v = info.e.get(&0).unwrap();
        assert_eq!(v.init.feasible_values(0), vec![0, 1, 2]);
    }
}
