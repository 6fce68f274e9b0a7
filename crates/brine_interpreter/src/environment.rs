use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::error::RuntimeError;
use crate::object::Object;

/// One lexical scope's name to value mapping, linked to the enclosing scope.
/// Chains are shared (`Rc`) so closures keep their defining scopes alive.
#[derive(Debug, Clone)]
pub struct Environment {
    store: HashMap<String, Rc<Object>>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            store: HashMap::new(),
            outer: None,
        }
    }

    /// Create a new environment that is enclosed by a given outer environment
    pub fn new_enclosed(outer: Rc<RefCell<Environment>>) -> Self {
        Environment {
            store: HashMap::new(),
            outer: Some(outer),
        }
    }

    /// Resolve a name, innermost scope first.
    pub fn get(&self, name: &str) -> Option<Rc<Object>> {
        match self.store.get(name) {
            Some(obj) => Some(Rc::clone(obj)),
            // If not found in this environment, look for it in the outer environment
            None => match self.outer {
                Some(ref outer) => outer.borrow().get(name),
                None => None,
            },
        }
    }

    /// Bind a new name in this scope. Re-declaring a name already present in
    /// this same scope is an error; shadowing an outer scope is fine.
    pub fn declare(&mut self, name: String, value: Rc<Object>) -> Result<(), RuntimeError> {
        if self.store.contains_key(&name) {
            return Err(RuntimeError::DuplicateDeclaration(name));
        }
        self.store.insert(name, value);
        Ok(())
    }

    /// Rebind an existing name, innermost scope first. The name must have
    /// been declared somewhere on the chain.
    pub fn assign(&mut self, name: String, value: Rc<Object>) -> Result<(), RuntimeError> {
        if self.store.contains_key(&name) {
            self.store.insert(name, value);
            Ok(())
        } else {
            match self.outer {
                Some(ref outer) => outer.borrow_mut().assign(name, value),
                None => Err(RuntimeError::AssignmentToUndeclared(name)),
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::environment::Environment;
    use crate::error::RuntimeError;
    use crate::object::Object;

    #[test]
    fn declare_and_get() {
        let mut env = Environment::new();
        env.declare("x".to_owned(), Rc::new(Object::Number(1.0)))
            .unwrap();

        assert_eq!(env.get("x"), Some(Rc::new(Object::Number(1.0))));
        assert_eq!(env.get("y"), None);
    }

    #[test]
    fn duplicate_declaration_in_same_scope() {
        let mut env = Environment::new();
        env.declare("x".to_owned(), Rc::new(Object::Number(1.0)))
            .unwrap();

        assert_eq!(
            env.declare("x".to_owned(), Rc::new(Object::Number(2.0))),
            Err(RuntimeError::DuplicateDeclaration("x".to_owned()))
        );
    }

    #[test]
    fn shadowing_in_inner_scope() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer
            .borrow_mut()
            .declare("x".to_owned(), Rc::new(Object::Number(1.0)))
            .unwrap();

        let mut inner = Environment::new_enclosed(Rc::clone(&outer));
        inner
            .declare("x".to_owned(), Rc::new(Object::Number(2.0)))
            .unwrap();

        assert_eq!(inner.get("x"), Some(Rc::new(Object::Number(2.0))));
        assert_eq!(outer.borrow().get("x"), Some(Rc::new(Object::Number(1.0))));
    }

    #[test]
    fn assign_walks_the_chain() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer
            .borrow_mut()
            .declare("x".to_owned(), Rc::new(Object::Number(1.0)))
            .unwrap();

        let mut inner = Environment::new_enclosed(Rc::clone(&outer));
        inner
            .assign("x".to_owned(), Rc::new(Object::Number(5.0)))
            .unwrap();

        assert_eq!(outer.borrow().get("x"), Some(Rc::new(Object::Number(5.0))));
    }

    #[test]
    fn assign_to_undeclared_name() {
        let mut env = Environment::new();

        assert_eq!(
            env.assign("ghost".to_owned(), Rc::new(Object::Nil)),
            Err(RuntimeError::AssignmentToUndeclared("ghost".to_owned()))
        );
    }
}
