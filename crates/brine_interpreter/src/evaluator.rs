use std::{cell::RefCell, io::Write, rc::Rc};

use crate::{
    environment::Environment,
    error::RuntimeError,
    object::{Array, Function, Object},
};

use brine_parser::{
    ast::{Block, Expression, Program, Statement},
    token::Token,
};

/// Outcome of evaluating a statement. Break, continue, and return travel as
/// ordinary values until the nearest loop or call boundary consumes them;
/// they are never errors and error handling never sees them.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Rc<Object>),
}

/// Tree-walking evaluator. Holds the current environment handle and a sink
/// that `print` writes to. All runtime state is owned here and supplied by
/// the caller, so independent sessions and tests never interfere.
pub struct Evaluator<W: Write> {
    env: Rc<RefCell<Environment>>,
    out: W,
}

impl<W: Write> Evaluator<W> {
    pub fn new(out: W) -> Self {
        Self::new_with_env(Rc::new(RefCell::new(Environment::new())), out)
    }

    /// Evaluate against an existing environment, e.g. a persistent REPL
    /// context that outlives individual inputs.
    pub fn new_with_env(env: Rc<RefCell<Environment>>, out: W) -> Self {
        Evaluator { env, out }
    }

    pub fn eval(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for statement in &program.statements {
            match self.eval_statement(statement)? {
                Flow::Normal => {}
                // A signal that reaches the top level has no boundary left
                // to consume it
                Flow::Break => return Err(RuntimeError::BreakOutsideLoop),
                Flow::Continue => return Err(RuntimeError::ContinueOutsideLoop),
                Flow::Return(_) => return Err(RuntimeError::ReturnOutsideFunction),
            }
        }
        Ok(())
    }

    fn eval_statement(&mut self, statement: &Statement) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::Let { name, value } => {
                let value = self.eval_expression(value)?;
                self.env.borrow_mut().declare(name.clone(), value)?;
                Ok(Flow::Normal)
            }

            Statement::Assign { name, index, value } => {
                let value = self.eval_expression(value)?;
                match index {
                    Some(index) => self.assign_index(name, index, value)?,
                    None => self.env.borrow_mut().assign(name.clone(), value)?,
                }
                Ok(Flow::Normal)
            }

            Statement::Print { value } => {
                let value = self.eval_expression(value)?;
                writeln!(self.out, "{}", value)
                    .map_err(|error| RuntimeError::Output(error.to_string()))?;
                Ok(Flow::Normal)
            }

            Statement::Block(block) => self.eval_block(block),

            Statement::If {
                condition,
                consequence,
                alternative,
            } => {
                if self.eval_condition(condition)? {
                    self.eval_block(consequence)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Statement::While { condition, body } => {
                while self.eval_condition(condition)? {
                    match self.eval_block(body)? {
                        // Continue just moves on to the next condition check
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        // A return belongs to the enclosing call, keep unwinding
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Statement::Break => Ok(Flow::Break),
            Statement::Continue => Ok(Flow::Continue),

            Statement::Return { value } => {
                let value = self.eval_expression(value)?;
                Ok(Flow::Return(value))
            }

            Statement::FunctionDeclaration {
                name,
                parameters,
                body,
            } => {
                // The captured chain includes this very binding, which is
                // what makes name-based recursion work
                let function = Rc::new(Object::Function(Function {
                    parameters: parameters.clone(),
                    body: Rc::clone(body),
                    env: Rc::clone(&self.env),
                }));
                self.env.borrow_mut().declare(name.clone(), function)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run a block in a fresh scope enclosed by the current one. The scope is
    /// dropped on every exit path — normal, signal, or error — so bindings
    /// never leak outward.
    fn eval_block(&mut self, block: &Block) -> Result<Flow, RuntimeError> {
        let enclosing = Rc::clone(&self.env);
        self.env = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(
            &enclosing,
        ))));

        let result = self.eval_statements(&block.statements);

        self.env = enclosing;
        result
    }

    fn eval_statements(&mut self, statements: &[Statement]) -> Result<Flow, RuntimeError> {
        for statement in statements {
            match self.eval_statement(statement)? {
                Flow::Normal => {}
                // Stop sequencing and let a boundary consume the signal
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_condition(&mut self, condition: &Expression) -> Result<bool, RuntimeError> {
        let value = self.eval_expression(condition)?;
        match value.as_ref() {
            Object::Boolean(value) => Ok(*value),
            _ => Err(RuntimeError::ExpectedBooleanCondition(value)),
        }
    }

    fn eval_expression(&mut self, expression: &Expression) -> Result<Rc<Object>, RuntimeError> {
        match expression {
            Expression::Number(value) => Ok(Rc::new(Object::Number(*value))),
            Expression::Boolean(value) => Ok(Rc::new(Object::Boolean(*value))),
            Expression::Identifier(name) => self.lookup(name),

            Expression::Unary(unary) => {
                let right = self.eval_expression(&unary.operand)?;
                eval_unary_expression(&unary.operator, right)
            }

            Expression::Binary(binary) => {
                // Both operands are always evaluated; `&&` and `||` do not
                // short-circuit
                let left = self.eval_expression(&binary.left)?;
                let right = self.eval_expression(&binary.right)?;
                eval_binary_expression(&binary.operator, left, right)
            }

            Expression::Function(function) => Ok(Rc::new(Object::Function(Function {
                parameters: function.parameters.clone(),
                body: Rc::clone(&function.body),
                env: Rc::clone(&self.env),
            }))),

            Expression::Call(call) => {
                let callee = self.lookup(&call.name)?;

                // Arguments are evaluated left to right in the caller's
                // environment, before any frame is built
                let mut arguments = Vec::with_capacity(call.arguments.len());
                for argument in &call.arguments {
                    arguments.push(self.eval_expression(argument)?);
                }

                self.apply_function(callee, arguments)
            }

            Expression::Array(elements) => {
                let mut evaluated = Vec::with_capacity(elements.len());
                for element in elements {
                    evaluated.push(self.eval_expression(element)?);
                }
                Ok(Rc::new(Object::Array(Array {
                    elements: evaluated,
                })))
            }

            Expression::Index(index) => {
                let array = self.lookup(&index.name)?;
                let position = self.eval_expression(&index.index)?;
                eval_index_expression(array, position)
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Rc<Object>, RuntimeError> {
        self.env
            .borrow()
            .get(name)
            .ok_or_else(|| RuntimeError::IdentifierNotFound(name.to_owned()))
    }

    /// `name[index] = value`. Arrays are immutable values: the binding is
    /// replaced with a new array sharing every other element.
    fn assign_index(
        &mut self,
        name: &str,
        index: &Expression,
        value: Rc<Object>,
    ) -> Result<(), RuntimeError> {
        let index = self.eval_expression(index)?;
        let current = self.lookup(name)?;

        let elements = match current.as_ref() {
            Object::Array(array) => &array.elements,
            _ => return Err(RuntimeError::IndexNotSupported(Rc::clone(&current))),
        };

        let position = index_position(&index, elements.len())?;

        let mut elements: Vec<Rc<Object>> = elements.iter().map(Rc::clone).collect();
        elements[position] = value;

        self.env
            .borrow_mut()
            .assign(name.to_owned(), Rc::new(Object::Array(Array { elements })))
    }

    fn apply_function(
        &mut self,
        callee: Rc<Object>,
        arguments: Vec<Rc<Object>>,
    ) -> Result<Rc<Object>, RuntimeError> {
        let function = match callee.as_ref() {
            Object::Function(function) => function,
            _ => return Err(RuntimeError::NotAFunction(Rc::clone(&callee))),
        };

        if arguments.len() != function.parameters.len() {
            return Err(RuntimeError::BadArity {
                expected: function.parameters.len(),
                got: arguments.len(),
            });
        }

        // The frame nests inside the *captured* chain, not the caller's
        let mut frame = Environment::new_enclosed(Rc::clone(&function.env));
        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            frame.declare(parameter.clone(), argument)?;
        }

        let caller_env = Rc::clone(&self.env);
        self.env = Rc::new(RefCell::new(frame));
        let flow = self.eval_statements(&function.body.statements);
        self.env = caller_env;

        match flow? {
            Flow::Return(value) => Ok(value),
            // Falling off the end of the body yields no value
            Flow::Normal => Ok(Rc::new(Object::Nil)),
            // Loop signals cannot cross a call boundary
            Flow::Break => Err(RuntimeError::BreakOutsideLoop),
            Flow::Continue => Err(RuntimeError::ContinueOutsideLoop),
        }
    }
}

fn eval_unary_expression(operator: &Token, right: Rc<Object>) -> Result<Rc<Object>, RuntimeError> {
    match (operator, right.as_ref()) {
        (Token::Minus, Object::Number(value)) => Ok(Rc::new(Object::Number(-value))),
        (Token::Bang, Object::Boolean(value)) => Ok(Rc::new(Object::Boolean(!value))),
        _ => Err(RuntimeError::InvalidUnaryOperand {
            operator: operator.clone(),
            right,
        }),
    }
}

fn eval_binary_expression(
    operator: &Token,
    left: Rc<Object>,
    right: Rc<Object>,
) -> Result<Rc<Object>, RuntimeError> {
    match (left.as_ref(), right.as_ref()) {
        (Object::Number(left_value), Object::Number(right_value)) => {
            eval_number_binary_expression(operator, *left_value, *right_value)
        }
        (Object::Boolean(left_value), Object::Boolean(right_value)) => {
            eval_boolean_binary_expression(operator, *left_value, *right_value)
        }
        (_, _) => Err(RuntimeError::InvalidBinaryOperands {
            operator: operator.clone(),
            left,
            right,
        }),
    }
}

fn eval_number_binary_expression(
    operator: &Token,
    left: f64,
    right: f64,
) -> Result<Rc<Object>, RuntimeError> {
    let object = match operator {
        Token::Plus => Object::Number(left + right),
        Token::Minus => Object::Number(left - right),
        Token::Star => Object::Number(left * right),
        Token::Slash => Object::Number(left / right),

        Token::Less => Object::Boolean(left < right),
        Token::LessEqual => Object::Boolean(left <= right),
        Token::Greater => Object::Boolean(left > right),
        Token::GreaterEqual => Object::Boolean(left >= right),
        Token::EqualEqual => Object::Boolean(left == right),
        Token::BangEqual => Object::Boolean(left != right),

        operator => {
            return Err(RuntimeError::InvalidBinaryOperands {
                operator: operator.clone(),
                left: Rc::new(Object::Number(left)),
                right: Rc::new(Object::Number(right)),
            })
        }
    };

    Ok(Rc::new(object))
}

fn eval_boolean_binary_expression(
    operator: &Token,
    left: bool,
    right: bool,
) -> Result<Rc<Object>, RuntimeError> {
    let object = match operator {
        Token::EqualEqual => Object::Boolean(left == right),
        Token::BangEqual => Object::Boolean(left != right),

        Token::AndAnd => Object::Boolean(left && right),
        Token::OrOr => Object::Boolean(left || right),

        operator => {
            return Err(RuntimeError::InvalidBinaryOperands {
                operator: operator.clone(),
                left: Rc::new(Object::Boolean(left)),
                right: Rc::new(Object::Boolean(right)),
            })
        }
    };

    Ok(Rc::new(object))
}

fn eval_index_expression(
    array: Rc<Object>,
    index: Rc<Object>,
) -> Result<Rc<Object>, RuntimeError> {
    match array.as_ref() {
        Object::Array(elements) => {
            let position = index_position(&index, elements.elements.len())?;
            Ok(Rc::clone(&elements.elements[position]))
        }
        _ => Err(RuntimeError::IndexNotSupported(Rc::clone(&array))),
    }
}

/// Validate an index value against an array length. Only non-negative whole
/// numbers within bounds pass; negative indices are unsupported.
fn index_position(index: &Rc<Object>, length: usize) -> Result<usize, RuntimeError> {
    match index.as_ref() {
        Object::Number(value) => {
            if value.fract() != 0.0 || *value < 0.0 {
                return Err(RuntimeError::InvalidIndex(Rc::clone(index)));
            }

            let position = *value as usize;
            if position >= length {
                return Err(RuntimeError::IndexOutOfBounds {
                    index: Rc::clone(index),
                    length,
                });
            }

            Ok(position)
        }
        _ => Err(RuntimeError::InvalidIndex(Rc::clone(index))),
    }
}
