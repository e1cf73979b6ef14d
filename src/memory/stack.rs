//! Call stack implementation
//!
//! This module provides the replayed call stack:
//! - [`Stack`]: The call stack containing frames
//! - [`StackFrame`]: A single function's activation record
//! - [`Variable`]: A stack-resident local with a fixed address
//!
//! Locals keep declaration order. A name is unique within one frame; other
//! frames may declare the same name independently.

use super::value::{Address, Value};
use serde::Serialize;

/// Local variable on the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub address: Address,
    pub size: usize,
    pub value: Value,
}

impl Variable {
    pub fn new(name: String, var_type: String, address: Address, size: usize, value: Value) -> Self {
        Variable {
            name,
            var_type,
            address,
            size,
            value,
        }
    }

    /// Whether stores into this variable should be read back as characters
    pub fn holds_chars(&self) -> bool {
        let ty = self.var_type.to_ascii_lowercase();
        ty.contains("char") || ty.contains("str")
    }
}

/// Stack frame for a function call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub name: String,
    pub locals: Vec<Variable>,
}

impl StackFrame {
    pub fn new(name: String) -> Self {
        StackFrame {
            name,
            locals: Vec::new(),
        }
    }

    /// Declare a local, replacing a live local of the same name in place.
    /// Also returns the address of the replaced local, if any.
    pub fn declare_var(&mut self, var: Variable) -> (&Variable, Option<Address>) {
        match self.locals.iter().position(|v| v.name == var.name) {
            Some(i) => {
                let old = std::mem::replace(&mut self.locals[i], var);
                (&self.locals[i], Some(old.address))
            }
            None => {
                self.locals.push(var);
                (&self.locals[self.locals.len() - 1], None)
            }
        }
    }

    /// Get a local variable
    pub fn get_var(&self, name: &str) -> Option<&Variable> {
        self.locals.iter().find(|v| v.name == name)
    }

    /// Get a mutable reference to a local variable
    pub fn get_var_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.locals.iter_mut().find(|v| v.name == name)
    }
}

/// The call stack
#[derive(Debug, Clone, Default)]
pub struct Stack {
    frames: Vec<StackFrame>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { frames: Vec::new() }
    }

    /// Push a new stack frame
    pub fn push_frame(&mut self, name: String) {
        self.frames.push(StackFrame::new(name));
    }

    /// Pop the top stack frame
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Get a mutable reference to the current frame
    pub fn current_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    /// Get all frames, bottom first
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Get the depth of the call stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, address: Address) -> Variable {
        Variable::new(name.to_string(), "int".to_string(), address, 4, Value::Int(0))
    }

    #[test]
    fn test_declare_keeps_order() {
        let mut frame = StackFrame::new("main".to_string());
        frame.declare_var(var("b", 8));
        frame.declare_var(var("a", 4));
        let names: Vec<_> = frame.locals.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_redeclare_replaces_in_place() {
        let mut frame = StackFrame::new("main".to_string());
        frame.declare_var(var("x", 8));
        frame.declare_var(var("y", 4));
        let (x, replaced) = frame.declare_var(var("x", 0));
        assert_eq!(x.address, 0);
        assert_eq!(replaced, Some(8));
        assert_eq!(frame.locals.len(), 2);
        assert_eq!(frame.locals[0].address, 0);
    }

    #[test]
    fn test_char_types() {
        let mut v = var("s", 0);
        v.var_type = "char*".to_string();
        assert!(v.holds_chars());
        v.var_type = "&str".to_string();
        assert!(v.holds_chars());
        v.var_type = "i32".to_string();
        assert!(!v.holds_chars());
    }

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new();
        assert!(stack.pop_frame().is_none());
        stack.push_frame("main".to_string());
        stack.push_frame("helper".to_string());
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current_frame().map(|f| f.name.as_str()), Some("helper"));
        stack.pop_frame();
        assert_eq!(stack.current_frame().map(|f| f.name.as_str()), Some("main"));
    }
}
