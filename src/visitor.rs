//! Traversal and rewriting of expression trees.
//!
//! [`walk`] is the single traversal routine. For every node it calls the
//! matching `visit_*` hook of an [`ExpressionVisitor`] (pre-order), walks the
//! children in source order, rebuilds the node from the walked children and
//! finally hands the rebuilt node to [`ExpressionVisitor::rewrite`]. The
//! dispatch and the child order live in free functions, so a visitor can only
//! observe and replace nodes, never change the order in which they are seen.
//!
//! Analysis visitors override hooks and ignore the returned tree;
//! transformation visitors override `rewrite`.

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::{
    ast::{ArrayItem, AssignOp, BinOp, CastType, ClosureExpr, Expr, Parameter, UnaryOp},
    error::EvalError,
    value::Value,
};

pub trait ExpressionVisitor {
    fn visit_value(&mut self, _value: &Value) {}

    fn visit_variable(&mut self, _name: &Expr) {}

    fn visit_field(&mut self, _object: &Expr, _name: &str) {}

    fn visit_index(&mut self, _subject: &Expr, _index: Option<&Expr>) {}

    fn visit_unary_op(&mut self, _op: UnaryOp, _operand: &Expr) {}

    fn visit_binary_op(&mut self, _op: BinOp, _left: &Expr, _right: &Expr) {}

    fn visit_cast(&mut self, _target: CastType, _operand: &Expr) {}

    fn visit_ternary(&mut self, _condition: &Expr, _if_true: Option<&Expr>, _if_false: &Expr) {}

    fn visit_assignment(&mut self, _target: &Expr, _op: AssignOp, _value: &Expr) {}

    fn visit_array(&mut self, _items: &[ArrayItem]) {}

    fn visit_function_call(&mut self, _callee: &Expr, _args: &[Expr]) {}

    fn visit_method_call(&mut self, _receiver: &Expr, _name: &str, _args: &[Expr]) {}

    fn visit_static_method_call(&mut self, _class: &str, _name: &str, _args: &[Expr]) {}

    fn visit_new(&mut self, _class: &Expr, _args: &[Expr]) {}

    /// Called before the parameters and body of a closure are walked.
    fn visit_closure(&mut self, _closure: &ClosureExpr) {}

    /// Called after the body of a closure has been walked.
    fn leave_closure(&mut self, _closure: &ClosureExpr) {}

    fn visit_empty(&mut self, _operand: &Expr) {}

    fn visit_return(&mut self, _value: Option<&Expr>) {}

    /// Replaces a node after its children have been walked.
    fn rewrite(&mut self, expr: Expr) -> Expr {
        expr
    }
}

/// Walks `expr`, returning the (possibly rewritten) tree.
pub fn walk<V: ExpressionVisitor + ?Sized>(visitor: &mut V, expr: &Expr) -> Expr {
    let walked = match expr {
        Expr::Value(value) => {
            visitor.visit_value(value);
            Expr::Value(value.clone())
        }
        Expr::Variable { name } => {
            visitor.visit_variable(name);
            Expr::Variable {
                name: Box::new(walk(visitor, name)),
            }
        }
        Expr::Field { object, name } => {
            visitor.visit_field(object, name);
            Expr::Field {
                object: Box::new(walk(visitor, object)),
                name: name.clone(),
            }
        }
        Expr::Index { subject, index } => {
            visitor.visit_index(subject, index.as_deref());
            Expr::Index {
                subject: Box::new(walk(visitor, subject)),
                index: index.as_deref().map(|i| Box::new(walk(visitor, i))),
            }
        }
        Expr::UnaryOp { op, operand } => {
            visitor.visit_unary_op(*op, operand);
            Expr::UnaryOp {
                op: *op,
                operand: Box::new(walk(visitor, operand)),
            }
        }
        Expr::BinaryOp { op, left, right } => {
            visitor.visit_binary_op(*op, left, right);
            let left = walk(visitor, left);
            let right = walk(visitor, right);
            Expr::binary(*op, left, right)
        }
        Expr::Cast { target, operand } => {
            visitor.visit_cast(*target, operand);
            Expr::Cast {
                target: *target,
                operand: Box::new(walk(visitor, operand)),
            }
        }
        Expr::Ternary {
            condition,
            if_true,
            if_false,
        } => {
            visitor.visit_ternary(condition, if_true.as_deref(), if_false);
            Expr::Ternary {
                condition: Box::new(walk(visitor, condition)),
                if_true: if_true.as_deref().map(|e| Box::new(walk(visitor, e))),
                if_false: Box::new(walk(visitor, if_false)),
            }
        }
        Expr::Assignment { target, op, value } => {
            visitor.visit_assignment(target, *op, value);
            Expr::Assignment {
                target: Box::new(walk(visitor, target)),
                op: *op,
                value: Box::new(walk(visitor, value)),
            }
        }
        Expr::Array(items) => {
            visitor.visit_array(items);
            Expr::Array(
                items
                    .iter()
                    .map(|item| ArrayItem {
                        key: item.key.as_ref().map(|k| walk(visitor, k)),
                        value: walk(visitor, &item.value),
                    })
                    .collect(),
            )
        }
        Expr::FunctionCall { callee, args } => {
            visitor.visit_function_call(callee, args);
            Expr::FunctionCall {
                callee: Box::new(walk(visitor, callee)),
                args: walk_all(visitor, args),
            }
        }
        Expr::MethodCall {
            receiver,
            name,
            args,
        } => {
            visitor.visit_method_call(receiver, name, args);
            Expr::MethodCall {
                receiver: Box::new(walk(visitor, receiver)),
                name: name.clone(),
                args: walk_all(visitor, args),
            }
        }
        Expr::StaticMethodCall { class, name, args } => {
            visitor.visit_static_method_call(class, name, args);
            Expr::StaticMethodCall {
                class: class.clone(),
                name: name.clone(),
                args: walk_all(visitor, args),
            }
        }
        Expr::New { class, args } => {
            visitor.visit_new(class, args);
            Expr::New {
                class: Box::new(walk(visitor, class)),
                args: walk_all(visitor, args),
            }
        }
        Expr::Closure(closure) => Expr::Closure(walk_closure(visitor, closure)),
        Expr::Empty(operand) => {
            visitor.visit_empty(operand);
            Expr::Empty(Box::new(walk(visitor, operand)))
        }
        Expr::Return(value) => {
            visitor.visit_return(value.as_deref());
            Expr::Return(value.as_deref().map(|v| Box::new(walk(visitor, v))))
        }
    };

    visitor.rewrite(walked)
}

pub fn walk_all<V: ExpressionVisitor + ?Sized>(visitor: &mut V, exprs: &[Expr]) -> Vec<Expr> {
    exprs.iter().map(|e| walk(visitor, e)).collect()
}

/// Walks a closure root: parameter defaults first, then body statements.
pub fn walk_closure<V: ExpressionVisitor + ?Sized>(
    visitor: &mut V,
    closure: &ClosureExpr,
) -> ClosureExpr {
    visitor.visit_closure(closure);

    let parameters = closure
        .parameters
        .iter()
        .map(|p| Parameter {
            name: p.name.clone(),
            type_hint: p.type_hint.clone(),
            default: p.default.as_ref().map(|d| walk(visitor, d)),
        })
        .collect();
    let body = walk_all(visitor, &closure.body);

    visitor.leave_closure(closure);

    ClosureExpr {
        parameters,
        bound_variables: closure.bound_variables.clone(),
        body,
    }
}

#[derive(Debug, Default)]
struct VariableScope {
    declared: IndexSet<String>,
    assigned: IndexSet<String>,
    used: IndexSet<String>,
}

/// Finds variables a closure reads without declaring them.
///
/// A variable is declared by a parameter, a `use (...)` binding, or an
/// assignment anywhere in the same closure. Nested closures are their own
/// scope; their `use` list counts as a read in the enclosing closure.
#[derive(Debug, Default)]
pub struct VariableUsage {
    scopes: Vec<VariableScope>,
    free_variables: IndexSet<String>,
    dynamic: bool,
}

impl VariableUsage {
    pub fn analyze(closure: &ClosureExpr) -> Self {
        let mut usage = VariableUsage::default();
        walk_closure(&mut usage, closure);
        usage
    }

    /// Free variable names, in order of first use.
    pub fn free_variables(&self) -> impl Iterator<Item = &str> {
        self.free_variables.iter().map(String::as_str)
    }

    /// True when a variable-variable (`$$name`) appears anywhere, in which
    /// case the free variable list cannot be complete.
    pub fn has_dynamic_variables(&self) -> bool {
        self.dynamic
    }
}

impl ExpressionVisitor for VariableUsage {
    fn visit_closure(&mut self, closure: &ClosureExpr) {
        if let Some(outer) = self.scopes.last_mut() {
            outer.used.extend(closure.bound_variables.iter().cloned());
        }
        let declared = closure
            .parameters
            .iter()
            .map(|p| p.name.clone())
            .chain(closure.bound_variables.iter().cloned())
            .collect();
        self.scopes.push(VariableScope {
            declared,
            ..VariableScope::default()
        });
    }

    fn leave_closure(&mut self, _closure: &ClosureExpr) {
        if let Some(scope) = self.scopes.pop() {
            for name in &scope.used {
                if !scope.declared.contains(name) && !scope.assigned.contains(name) {
                    self.free_variables.insert(name.clone());
                }
            }
        }
    }

    fn visit_assignment(&mut self, target: &Expr, _op: AssignOp, _value: &Expr) {
        if let (Some(name), Some(scope)) = (assigned_name(target), self.scopes.last_mut()) {
            scope.assigned.insert(name.to_string());
        }
    }

    fn visit_variable(&mut self, name: &Expr) {
        match (name, self.scopes.last_mut()) {
            (Expr::Value(Value::String(name)), Some(scope)) => {
                scope.used.insert(name.clone());
            }
            (Expr::Value(_), _) => {}
            _ => self.dynamic = true,
        }
    }
}

/// The variable an assignment writes to: `$a`, `$a[..]` or `$a[]`.
fn assigned_name(target: &Expr) -> Option<&str> {
    let mut base = target;
    while let Expr::Index { subject, .. } = base {
        base = subject;
    }
    base.variable_name()
}

/// Collects the variables a closure assigns in its own body, ignoring
/// nested closures.
#[derive(Default)]
struct AssignedVariables {
    depth: usize,
    names: IndexSet<String>,
}

impl AssignedVariables {
    fn of(closure: &ClosureExpr) -> IndexSet<String> {
        let mut assigned = AssignedVariables::default();
        walk_closure(&mut assigned, closure);
        assigned.names
    }
}

impl ExpressionVisitor for AssignedVariables {
    fn visit_closure(&mut self, _closure: &ClosureExpr) {
        self.depth += 1;
    }

    fn leave_closure(&mut self, _closure: &ClosureExpr) {
        self.depth -= 1;
    }

    fn visit_assignment(&mut self, target: &Expr, _op: AssignOp, _value: &Expr) {
        if self.depth == 1
            && let Some(name) = assigned_name(target)
        {
            self.names.insert(name.to_string());
        }
    }
}

/// `$name = <value>;`, the initial value of a bound variable the closure
/// writes to.
fn seed(name: &str, value: &Value) -> Expr {
    Expr::Assignment {
        target: Box::new(Expr::variable(name)),
        op: AssignOp::Assign,
        value: Box::new(Expr::Value(value.clone())),
    }
}

/// Replaces `use (...)` variables with literal values.
///
/// Nested closures only see a binding they capture themselves and do not
/// shadow with a parameter. A bound variable the closure assigns to is a
/// local copy: it is not inlined but initialized by a leading assignment.
pub struct BindingInliner<'a> {
    bindings: &'a HashMap<String, Value>,
    visible: Vec<IndexSet<String>>,
}

impl<'a> BindingInliner<'a> {
    /// Inlines every bound variable of `closure`. Each must have a binding.
    pub fn inline(
        closure: &ClosureExpr,
        bindings: &'a HashMap<String, Value>,
    ) -> Result<ClosureExpr, EvalError> {
        if let Some(missing) = closure
            .bound_variables
            .iter()
            .find(|name| !bindings.contains_key(*name))
        {
            return Err(EvalError::UndefinedVariable(missing.clone()));
        }

        let mut inliner = BindingInliner {
            bindings,
            visible: vec![],
        };
        let mut inlined = walk_closure(&mut inliner, closure);
        let assigned = AssignedVariables::of(closure);
        let seeds = closure
            .bound_variables
            .iter()
            .filter(|name| assigned.contains(*name))
            .filter_map(|name| bindings.get(name).map(|value| seed(name, value)));
        inlined.body = seeds.chain(inlined.body).collect();
        inlined.bound_variables.clear();
        Ok(inlined)
    }

    fn is_visible(&self, name: &str) -> bool {
        self.visible.last().is_some_and(|names| names.contains(name))
    }
}

impl ExpressionVisitor for BindingInliner<'_> {
    fn visit_closure(&mut self, closure: &ClosureExpr) {
        let mut names: IndexSet<String> = match self.visible.last() {
            Some(outer) => closure
                .bound_variables
                .iter()
                .filter(|name| outer.contains(*name))
                .cloned()
                .collect(),
            None => closure.bound_variables.iter().cloned().collect(),
        };
        for parameter in &closure.parameters {
            names.shift_remove(&parameter.name);
        }
        for name in AssignedVariables::of(closure) {
            names.shift_remove(&name);
        }
        self.visible.push(names);
    }

    fn leave_closure(&mut self, _closure: &ClosureExpr) {
        self.visible.pop();
    }

    fn rewrite(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::Variable { .. } => match expr.variable_name() {
                Some(name) if self.is_visible(name) => match self.bindings.get(name) {
                    Some(value) => Expr::Value(value.clone()),
                    None => expr,
                },
                _ => expr,
            },
            // A nested closure no longer captures what was inlined into it
            Expr::Closure(mut closure) => {
                let assigned = AssignedVariables::of(&closure);
                let mut seeds = vec![];
                for name in &closure.bound_variables {
                    if self.is_visible(name)
                        && assigned.contains(name)
                        && let Some(value) = self.bindings.get(name)
                    {
                        seeds.push(seed(name, value));
                    }
                }
                closure.bound_variables.retain(|name| !self.is_visible(name));
                closure.body = seeds.into_iter().chain(closure.body).collect();
                Expr::Closure(closure)
            }
            other => other,
        }
    }
}
