//! The property AST: quantified arithmetic/boolean formulae over a LAbS
//! system, plus the post-elimination leaves an emitted formula is allowed
//! to contain.

use std::fmt;

/// One of the four temporal modalities SLiVER's backends understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Always,
    Finally,
    Fairly,
    FairlyInf,
}

impl Modality {
    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Always => "always",
            Modality::Finally => "finally",
            Modality::Fairly => "fairly",
            Modality::FairlyInf => "fairly_inf",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "always" => Some(Modality::Always),
            "finally" => Some(Modality::Finally),
            "fairly" => Some(Modality::Fairly),
            "fairly_inf" => Some(Modality::FairlyInf),
            _ => None,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `forall` or `exists`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Forall,
    Exists,
}

impl Quantifier {
    /// The n-ary connective elimination folds instances with.
    pub fn fold_fn(self) -> NaryFn {
        match self {
            Quantifier::Forall => NaryFn::And,
            Quantifier::Exists => NaryFn::Or,
        }
    }
}

/// A binary arithmetic or comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Mod,
    Mul,
    Div,
    Add,
    Sub,
    Gt,
    Lt,
    Eq,
    Ge,
    Le,
    Ne,
    And,
    Or,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Mod => "%",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Gt => ">",
            BinOp::Lt => "<",
            BinOp::Eq => "=",
            BinOp::Ge => ">=",
            BinOp::Le => "<=",
            BinOp::Ne => "!=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

/// One of the four built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltInFn {
    Abs,
    Max,
    Min,
    Not,
}

impl BuiltInFn {
    pub fn as_str(self) -> &'static str {
        match self {
            BuiltInFn::Abs => "abs",
            BuiltInFn::Max => "max",
            BuiltInFn::Min => "min",
            BuiltInFn::Not => "not",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "abs" => Some(BuiltInFn::Abs),
            "max" => Some(BuiltInFn::Max),
            "min" => Some(BuiltInFn::Min),
            "not" => Some(BuiltInFn::Not),
            _ => None,
        }
    }
}

/// `and` or `or`, used only in `Nary` nodes produced by elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaryFn {
    And,
    Or,
}

impl NaryFn {
    pub fn as_str(self) -> &'static str {
        match self {
            NaryFn::And => "and",
            NaryFn::Or => "or",
        }
    }
}

/// An identifier leaf. Before elimination this is just a bound name (the
/// `agent` field of an `Of` node, or a free-standing identifier in an
/// already-quantifier-free sub-expression); after elimination it carries
/// the concrete agent id substituted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Ident { name: name.into() }
    }
}

/// A node of the property expression/formula tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A signed integer literal.
    Int(i64),
    /// A bare identifier. Only appears post-elimination, as a fresh
    /// `{var}_{agent_id}` propositional variable.
    Ident(Ident),
    /// `var[offset] of agent`, a variable held by the agent bound to
    /// `agent`, optionally array-indexed.
    Of {
        var: String,
        offset: Option<Box<Expr>>,
        agent: String,
    },
    BinOp(Box<Expr>, BinOp, Box<Expr>),
    BuiltIn(BuiltInFn, Vec<Expr>),
    /// Produced only by elimination: the fold of one quantifier's
    /// per-agent instances.
    Nary(NaryFn, Vec<Expr>),
    /// `forall`/`exists TypeName varname, inner`.
    Quant {
        kind: Quantifier,
        typename: String,
        varname: String,
        inner: Box<Expr>,
    },
}

impl Expr {
    pub fn int(n: i64) -> Self {
        Expr::Int(n)
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(Ident::new(name))
    }

    pub fn of(var: impl Into<String>, offset: Option<Expr>, agent: impl Into<String>) -> Self {
        Expr::Of {
            var: var.into(),
            offset: offset.map(Box::new),
            agent: agent.into(),
        }
    }

    pub fn bin(lhs: Expr, op: BinOp, rhs: Expr) -> Self {
        Expr::BinOp(Box::new(lhs), op, Box::new(rhs))
    }
}

/// The top-level parsed property: a modality applied to a (possibly)
/// quantified formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub modality: Modality,
    pub quant: Expr,
}

/// Pretty-print an AST node using infix notation, as written by a user
/// (operators rendered verbatim, not MCL-translated). Used for
/// round-trip testing and diagnostics.
pub fn pprint(node: &Expr) -> String {
    match node {
        Expr::Int(n) => n.to_string(),
        Expr::Ident(id) => id.name.clone(),
        Expr::Of { var, offset, agent } => match offset {
            Some(e) => format!("{var}[{}] of {agent}", pprint(e)),
            None => format!("{var} of {agent}"),
        },
        // `and`/`or` are the top-level `BExpr` connective, left-assoc with
        // no parenthesized form in the grammar (only `Expr` nests inside
        // parens, not `BExpr`), rendered unparenthesized so re-parsing the
        // left-assoc chain reconstructs the same tree. Arithmetic and
        // comparison operators keep explicit parens to preserve grouping.
        Expr::BinOp(lhs, op @ (BinOp::And | BinOp::Or), rhs) => {
            format!("{} {} {}", pprint(lhs), op.as_str(), pprint(rhs))
        }
        Expr::BinOp(lhs, op, rhs) => format!("({} {} {})", pprint(lhs), op.as_str(), pprint(rhs)),
        Expr::BuiltIn(f, args) => format!(
            "{}({})",
            f.as_str(),
            args.iter().map(pprint).collect::<Vec<_>>().join(", ")
        ),
        Expr::Nary(f, args) => args
            .iter()
            .map(pprint)
            .collect::<Vec<_>>()
            .join(&format!(" {} ", f.as_str())),
        Expr::Quant {
            kind,
            typename,
            varname,
            inner,
        } => {
            let kw = match kind {
                Quantifier::Forall => "forall",
                Quantifier::Exists => "exists",
            };
            format!("{kw} {typename} {varname}, {}", pprint(inner))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pprint_parenthesizes_arithmetic_and_comparison() {
        let e = Expr::bin(Expr::bin(Expr::int(1), BinOp::Add, Expr::int(2)), BinOp::Eq, Expr::int(3));
        assert_eq!(pprint(&e), "((1 + 2) = 3)");
    }

    #[test]
    fn pprint_leaves_and_or_chains_unparenthesized() {
        let e = Expr::bin(
            Expr::bin(Expr::int(1), BinOp::Eq, Expr::int(1)),
            BinOp::And,
            Expr::bin(Expr::int(2), BinOp::Eq, Expr::int(2)),
        );
        assert_eq!(pprint(&e), "(1 = 1) and (2 = 2)");
    }

    #[test]
    fn pprint_renders_of_with_and_without_offset() {
        assert_eq!(pprint(&Expr::of("x", None, "a")), "x of a");
        assert_eq!(
            pprint(&Expr::of("x", Some(Expr::int(0)), "a")),
            "x[0] of a"
        );
    }
}
