//! Column-type rules of the relational operators
//!
//! Each rule takes the column types of the operands and returns the column
//! types of the result, or the reason the combination is ill-typed.

use super::symbols::SigTable;
use crate::ast::ColumnType;

/// Columns of a type-checked expression
pub type Columns = Vec<ColumnType>;

fn same_arity(op: &str, a: &[ColumnType], b: &[ColumnType]) -> Result<(), String> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(format!("`{op}` applied to operands of arity {} and {}", a.len(), b.len()))
    }
}

/// `a + b` and `a ++ b`
pub fn union(op: &str, a: &[ColumnType], b: &[ColumnType]) -> Result<Columns, String> {
    same_arity(op, a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| x.union(y)).collect())
}

/// `a & b` and `a - b`, typed by the left operand
pub fn restrict_left(op: &str, a: &[ColumnType], b: &[ColumnType]) -> Result<Columns, String> {
    same_arity(op, a, b)?;
    Ok(a.to_vec())
}

/// `a in b` and `a = b`
pub fn comparable(op: &str, a: &[ColumnType], b: &[ColumnType]) -> Result<(), String> {
    same_arity(op, a, b)
}

/// `a . b`
pub fn join(sigs: &SigTable, a: &[ColumnType], b: &[ColumnType]) -> Result<Columns, String> {
    if a.len() + b.len() <= 2 {
        return Err("join of two unary expressions has arity zero".to_string());
    }
    let (last, first) = match (a.last(), b.first()) {
        (Some(last), Some(first)) => (last, first),
        _ => return Err("join operand has no columns".to_string()),
    };
    if !sigs.overlaps(last, first) {
        return Err("the joined columns have disjoint types".to_string());
    }
    Ok(a[..a.len() - 1].iter().chain(&b[1..]).cloned().collect())
}

/// `a -> b`
pub fn product(a: &[ColumnType], b: &[ColumnType]) -> Columns {
    a.iter().chain(b).cloned().collect()
}

/// `s <: r`
pub fn domain_restrict(s: &[ColumnType], r: &[ColumnType]) -> Result<Columns, String> {
    if s.len() != 1 {
        return Err(format!("left side of `<:` must be a set, found arity {}", s.len()));
    }
    Ok(r.to_vec())
}

/// `r :> s`
pub fn range_restrict(r: &[ColumnType], s: &[ColumnType]) -> Result<Columns, String> {
    if s.len() != 1 {
        return Err(format!("right side of `:>` must be a set, found arity {}", s.len()));
    }
    Ok(r.to_vec())
}

/// `~r`, `^r`, `*r`
pub fn binary_relation(op: &str, r: &[ColumnType]) -> Result<Columns, String> {
    if r.len() != 2 {
        return Err(format!("`{op}` requires a binary relation, found arity {}", r.len()));
    }
    if op == "~" {
        Ok(vec![r[1].clone(), r[0].clone()])
    } else {
        Ok(r.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    #[test]
    fn join_drops_the_shared_column() {
        let t = SigTable::build(&parse("sig A {} sig B { f: A -> B }").unwrap()).unwrap();
        let a = ColumnType::of(t.lookup("A").unwrap());
        let b = ColumnType::of(t.lookup("B").unwrap());

        let field = t.field(t.field_named("f").unwrap()).columns.clone();
        let joined = join(&t, &[b.clone()], &field).unwrap();
        assert_eq!(joined, vec![a.clone(), b.clone()]);

        assert!(join(&t, &[a.clone()], &field).is_err());
        assert!(join(&t, &[a.clone()], &[a.clone()]).is_err());
        assert!(join(&t, &[ColumnType::default()], &field).is_ok());
    }

    #[test]
    fn arity_rules() {
        let c = ColumnType::default();
        assert!(union("+", &[c.clone()], &[c.clone(), c.clone()]).is_err());
        assert!(binary_relation("^", &[c.clone()]).is_err());
        assert!(domain_restrict(&[c.clone(), c.clone()], &[c.clone(), c.clone()]).is_err());
        assert_eq!(product(&[c.clone()], &[c.clone()]).len(), 2);
    }
}
