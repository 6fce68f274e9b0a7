use std::rc::Rc;

use thiserror::Error;

use crate::object::Object;
use brine_parser::lexer::LexError;
use brine_parser::parser::ParseError;
use brine_parser::token::Token;

/// Everything that can go wrong while a program runs. Messages lead with the
/// error kind so script authors can tell a bad name from a bad type at a
/// glance. Break/continue/return signals are not errors and never appear
/// here; only their *misuse* does.
#[derive(Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("NameError: identifier '{0}' is not defined")]
    IdentifierNotFound(String),

    #[error("NameError: assignment to undeclared name '{0}'")]
    AssignmentToUndeclared(String),

    #[error("DuplicateNameError: '{0}' is already declared in this scope")]
    DuplicateDeclaration(String),

    #[error("TypeError: unsupported operand type for {} operator: `{}` ({})", .operator, .right.typename(), .right)]
    InvalidUnaryOperand { operator: Token, right: Rc<Object> },

    #[error("TypeError: unsupported operand type(s) for {} operator: `{}` ({}) and `{}` ({})", .operator, .left.typename(), .left, .right.typename(), .right)]
    InvalidBinaryOperands {
        operator: Token,
        left: Rc<Object>,
        right: Rc<Object>,
    },

    #[error("TypeError: expected a `boolean` condition but got `{}` ({})", .0.typename(), .0)]
    ExpectedBooleanCondition(Rc<Object>),

    #[error("TypeError: `{}` ({}) is not a function", .0.typename(), .0)]
    NotAFunction(Rc<Object>),

    #[error("TypeError: expected {expected} argument(s) but got {got}")]
    BadArity { expected: usize, got: usize },

    #[error("TypeError: index operator not supported for `{}` ({})", .0.typename(), .0)]
    IndexNotSupported(Rc<Object>),

    #[error("IndexError: array index must be a non-negative integer, got {0}")]
    InvalidIndex(Rc<Object>),

    #[error("IndexError: index {} out of bounds for array of length {}", .index, .length)]
    IndexOutOfBounds { index: Rc<Object>, length: usize },

    #[error("ControlFlowError: `break` outside of a loop")]
    BreakOutsideLoop,

    #[error("ControlFlowError: `continue` outside of a loop")]
    ContinueOutsideLoop,

    #[error("ControlFlowError: `return` outside of a function")]
    ReturnOutsideFunction,

    #[error("IoError: {0}")]
    Output(String),
}

/// Any failure from one full tokenize, parse, evaluate run — one script
/// execution or one REPL line.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::error::RuntimeError;
    use crate::object::Object;
    use brine_parser::token::Token;

    #[test]
    fn messages_name_the_error_kind() {
        let tests = vec![
            (
                RuntimeError::IdentifierNotFound("x".to_owned()),
                "NameError: identifier 'x' is not defined",
            ),
            (
                RuntimeError::DuplicateDeclaration("x".to_owned()),
                "DuplicateNameError: 'x' is already declared in this scope",
            ),
            (
                RuntimeError::InvalidBinaryOperands {
                    operator: Token::Plus,
                    left: Rc::new(Object::Number(1.0)),
                    right: Rc::new(Object::Boolean(true)),
                },
                "TypeError: unsupported operand type(s) for + operator: `number` (1) and `boolean` (true)",
            ),
            (
                RuntimeError::BadArity {
                    expected: 1,
                    got: 2,
                },
                "TypeError: expected 1 argument(s) but got 2",
            ),
            (
                RuntimeError::IndexOutOfBounds {
                    index: Rc::new(Object::Number(5.0)),
                    length: 2,
                },
                "IndexError: index 5 out of bounds for array of length 2",
            ),
            (
                RuntimeError::BreakOutsideLoop,
                "ControlFlowError: `break` outside of a loop",
            ),
        ];

        for (error, expected) in tests {
            assert_eq!(error.to_string(), expected);
        }
    }
}
