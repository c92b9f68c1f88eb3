//! Implements the function environment (e.g. a name-to-function mapping) for interpretation.

use cubefold_codegen::ir::Function;
use std::collections::HashMap;

/// A collection of functions, looked up by the name they are written with after `%`.
#[derive(Default, Clone)]
pub struct FunctionStore<'a> {
    functions: HashMap<String, &'a Function>,
}

impl<'a> From<&'a Function> for FunctionStore<'a> {
    fn from(function: &'a Function) -> Self {
        let mut store = FunctionStore::default();
        store.add(function.name.clone(), function);
        store
    }
}

impl<'a> FunctionStore<'a> {
    /// Add a function by name. A later function with the same name replaces the earlier one.
    pub fn add(&mut self, name: String, function: &'a Function) {
        self.functions.insert(name, function);
    }

    /// Retrieve a function by its name.
    pub fn get_by_name(&self, name: &str) -> Option<&'a Function> {
        self.functions.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubefold_codegen::ir::Signature;

    #[test]
    fn addition() {
        let mut env = FunctionStore::default();
        let a = "a";
        let f = Function::new();

        env.add(a.to_string(), &f);
        assert!(env.get_by_name(a).is_some());
    }

    #[test]
    fn nonexistence() {
        let env = FunctionStore::default();
        assert!(env.get_by_name("a").is_none());
    }

    #[test]
    fn from() {
        let func = Function::with_name_signature("test", Signature::default());
        let env: FunctionStore = (&func).into();
        assert!(env.get_by_name("test").is_some());
        assert!(env.get_by_name("%test").is_none());
    }
}
