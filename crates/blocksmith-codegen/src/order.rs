//! Operator precedence of generated C++ expressions

use serde::Serialize;

/// Binding strength of an expression; lower values bind tighter.
///
/// Expression handlers report the order of the code they return, and callers
/// state the order their operator needs from each operand. An operand is
/// parenthesised when it binds no tighter than the caller requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(u8)]
pub enum Order {
    /// Literals, identifiers, parenthesised code
    Atomic = 0,
    /// `f()`, `a[i]`, `x++`
    UnaryPostfix = 1,
    /// `!x`, `-x`
    UnaryPrefix = 2,
    /// `*` `/` `%`
    Multiplicative = 3,
    /// `+` `-`
    Additive = 4,
    /// `<<` `>>`
    Shift = 5,
    /// `<` `<=` `>` `>=`
    Relational = 6,
    /// `==` `!=`
    Equality = 7,
    /// `&`
    BitwiseAnd = 8,
    /// `^`
    BitwiseXor = 9,
    /// `|`
    BitwiseOr = 10,
    /// `&&`
    LogicalAnd = 11,
    /// `||`
    LogicalOr = 12,
    /// `?:`
    Conditional = 13,
    /// `=` and compound assignment
    Assignment = 14,
    /// Standalone position; never needs parentheses
    None = 99,
}

impl Order {
    /// Whether code of order `self` must be wrapped when used where `outer` is required
    pub fn needs_parens(self, outer: Order) -> bool {
        if self < outer {
            return false;
        }
        !(self == outer && matches!(self, Order::Atomic | Order::None))
    }

    /// Wrap `code` in parentheses if required
    pub fn wrap(self, code: String, outer: Order) -> String {
        if self.needs_parens(outer) {
            format!("({})", code)
        } else {
            code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Order::Atomic, Order::Atomic, false)]
    #[case(Order::None, Order::None, false)]
    #[case(Order::Additive, Order::Multiplicative, true)]
    #[case(Order::Multiplicative, Order::Additive, false)]
    #[case(Order::Additive, Order::Additive, true)]
    #[case(Order::LogicalOr, Order::None, false)]
    #[case(Order::Conditional, Order::Assignment, false)]
    fn test_needs_parens(#[case] inner: Order, #[case] outer: Order, #[case] expected: bool) {
        assert_eq!(inner.needs_parens(outer), expected);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(Order::Additive.wrap("a + b".into(), Order::Multiplicative), "(a + b)");
        assert_eq!(Order::Atomic.wrap("x".into(), Order::UnaryPrefix), "x");
    }
}
