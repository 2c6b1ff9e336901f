use core::fmt;

use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashMap;

use crate::decimal::Decimal;
use crate::real::{NodeId, Real, RealKind};
use crate::traversal::reachable;

#[derive(Clone, Debug, Default)]
pub struct StringTreeOptions<'a> {
    /// Display names for parameters and columns; unnamed variables print as `param#id`/`col#id`.
    pub variable_names: Option<&'a FxHashMap<NodeId, String>>,
}

pub fn default_string_variable(node: &Real, names: Option<&FxHashMap<NodeId, String>>) -> String {
    if let Some(name) = names.and_then(|names| names.get(&node.id())) {
        return name.clone();
    }
    let prefix = if node.is_column() { "col" } else { "param" };
    format!("{prefix}{}", node.id())
}

fn strip_outer_parens(mut s: &str) -> &str {
    loop {
        let bytes = s.as_bytes();
        if bytes.len() < 2 || bytes[0] != b'(' || bytes[bytes.len() - 1] != b')' {
            return s;
        }

        let mut depth = 0i32;
        let mut encloses_all = false;
        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        encloses_all = i == bytes.len() - 1;
                        break;
                    }
                }
                _ => {}
            }
        }

        if encloses_all {
            s = &s[1..s.len() - 1];
            continue;
        }

        return s;
    }
}

fn call(name: &str, args: &[&str]) -> String {
    let mut out = String::new();
    out.push_str(name);
    out.push('(');
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(strip_outer_parens(a));
    }
    out.push(')');
    out
}

fn wrap(parts: Vec<String>) -> String {
    if parts.len() == 1 {
        parts.into_iter().next().unwrap_or_default()
    } else {
        format!("({})", parts.join(" "))
    }
}

fn rendered_str<'m>(rendered: &'m FxHashMap<NodeId, String>, node: &Real) -> &'m str {
    rendered[&node.id()].as_str()
}

pub fn string_tree(root: &Real, opts: StringTreeOptions<'_>) -> String {
    let mut nodes = reachable(root);
    nodes.sort_by_key(Real::id);
    let mut rendered: FxHashMap<NodeId, String> = FxHashMap::default();

    for node in &nodes {
        let get = |r: &Real| rendered_str(&rendered, r);
        let out = match node.kind() {
            RealKind::Constant(c) => Decimal::from(c).to_string(),
            RealKind::Infinity => "inf".to_string(),
            RealKind::NegInfinity => "-inf".to_string(),
            RealKind::Parameter(_) | RealKind::Column => default_string_variable(node, opts.variable_names),
            RealKind::Unary(u) => call(u.op.name(), &[get(&u.original)]),
            RealKind::Line(line) => {
                let mut parts = Vec::new();
                for (term, coefficient) in &line.terms {
                    let term = get(term);
                    let piece = if coefficient.is_one() {
                        term.to_string()
                    } else {
                        format!("{} * {term}", Decimal::from(coefficient))
                    };
                    if !parts.is_empty() {
                        parts.push("+".to_string());
                    }
                    parts.push(piece);
                }
                if !line.bias.is_zero() {
                    parts.push("+".to_string());
                    parts.push(Decimal::from(&line.bias).to_string());
                }
                wrap(parts)
            }
            RealKind::LogLine(log_line) => {
                let mut parts = Vec::new();
                for (term, exponent) in &log_line.terms {
                    let term = get(term);
                    let piece = if exponent.is_one() {
                        term.to_string()
                    } else if exponent.is_negative() || !exponent.is_integer() {
                        format!("{term}^({})", Decimal::from(exponent))
                    } else {
                        format!("{term}^{}", Decimal::from(exponent))
                    };
                    if !parts.is_empty() {
                        parts.push("*".to_string());
                    }
                    parts.push(piece);
                }
                wrap(parts)
            }
            RealKind::Pow(p) => call("pow", &[get(&p.base), get(&p.exponent)]),
            RealKind::Compare(c) => call("compare", &[get(&c.left), get(&c.right)]),
            RealKind::Lookup(l) => {
                let table: Vec<&str> = l.table.iter().map(|t| strip_outer_parens(get(t))).collect();
                let table = format!("[{}]", table.join(", "));
                call("lookup", &[get(&l.index), &table])
            }
            RealKind::If(i) => call("if", &[get(&i.test), get(&i.when_non_zero), get(&i.when_zero)]),
        };
        rendered.insert(node.id(), out);
    }

    strip_outer_parens(&rendered[&root.id()]).to_string()
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&string_tree(self, StringTreeOptions::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_outer_parens_keeps_separate_groups() {
        assert_eq!(strip_outer_parens("((a + b))"), "a + b");
        assert_eq!(strip_outer_parens("(a) * (b)"), "(a) * (b)");
    }

    #[test]
    fn variables_use_names_when_given() {
        let x = Real::parameter(Real::zero());
        let c = Real::column();
        let e = &x * &c;
        let mut names = FxHashMap::default();
        names.insert(x.id(), "x".to_string());
        let s = string_tree(
            &e,
            StringTreeOptions {
                variable_names: Some(&names),
            },
        );
        assert_eq!(s, format!("x * col{}", c.id()));
    }
}
