//! Statement execution.

use std::cmp::Ordering;
use std::rc::Rc;

use dws_ir::{
    CaseBranch, CaseLabel, ConstDecl, Expr, ExprKind, ForDirection, Name, Pos, Stmt, StmtKind,
    VarDecl,
};
use dws_runtime::convert::{compare_values, enum_from_ordinal, values_equal};
use dws_runtime::errors::{cancelled, type_mismatch};
use dws_runtime::{ControlAction, EnumType, EvalError, EvalResult, Mutability, TypeMeta, Value};

use super::expr::{index_ordinal, Resolved};
use super::{at_pos, is_self_expr, CallArgs, MemberAccess};
use crate::interpreter::Interpreter;
use crate::stack::ensure_sufficient_stack;

/// How a loop body finished.
enum LoopStep {
    Next,
    Stop,
}

impl Interpreter {
    pub(crate) fn exec_stmts(&mut self, stmts: &[Stmt]) -> EvalResult<()> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    /// Execute one statement. Interface temporaries produced while it ran
    /// are released before it returns.
    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        if self
            .config
            .cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
        {
            tracing::debug!(line = stmt.pos.line, "cancelled");
            return Err(ControlAction::from(cancelled().with_pos(stmt.pos)));
        }
        let mark = self.temporaries.len();
        let outcome = ensure_sufficient_stack(|| {
            self.exec_stmt_kind(stmt)
                .map_err(|action| at_pos(action, stmt.pos))
        });
        self.release_temporaries(mark, outcome)
    }

    fn exec_stmt_kind(&mut self, stmt: &Stmt) -> EvalResult<()> {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.exec_expr_stmt(expr),
            StmtKind::Assign { target, op, value } => self.exec_assign(target, *op, value, stmt.pos),
            StmtKind::Var(decl) => self.exec_var(decl),
            StmtKind::Const(decl) => self.exec_const(decl),
            StmtKind::Block(stmts) => {
                let mut scoped = self.scoped();
                let result = scoped.exec_stmts(stmts);
                scoped.close_scope(result)
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_condition(cond)? {
                    self.exec_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(())
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval_condition(cond)? {
                    if let LoopStep::Stop = loop_step(self.exec_stmt(body))? {
                        break;
                    }
                }
                Ok(())
            }
            StmtKind::Repeat { body, until } => {
                loop {
                    if let LoopStep::Stop = loop_step(self.exec_stmts(body))? {
                        break;
                    }
                    if self.eval_condition(until)? {
                        break;
                    }
                }
                Ok(())
            }
            StmtKind::For {
                var,
                declare,
                start,
                end,
                direction,
                step,
                body,
            } => {
                let range = self.for_range(start, end, *direction, step.as_ref())?;
                if *declare {
                    let mut scoped = self.scoped();
                    scoped
                        .env
                        .define(var.clone(), range.value_at(range.from), Mutability::Mutable);
                    let result = scoped.run_for(var, &range, body, stmt.pos);
                    scoped.close_scope(result)
                } else {
                    self.run_for(var, &range, body, stmt.pos)
                }
            }
            StmtKind::ForIn {
                var,
                declare,
                iterable,
                body,
            } => {
                let items = self.iteration_items(iterable)?;
                if *declare {
                    let mut scoped = self.scoped();
                    scoped.env.define(var.clone(), Value::Nil, Mutability::Mutable);
                    let result = scoped.run_for_in(var, items, body, stmt.pos);
                    scoped.close_scope(result)
                } else {
                    self.run_for_in(var, items, body, stmt.pos)
                }
            }
            StmtKind::Case {
                subject,
                branches,
                else_branch,
            } => self.exec_case(subject, branches, else_branch.as_deref()),
            StmtKind::Try {
                body,
                except,
                finally,
            } => self.exec_try(body, except.as_ref(), finally.as_deref()),
            StmtKind::Raise(value) => self.exec_raise(value.as_ref(), stmt.pos),
            StmtKind::Break => Err(ControlAction::Break),
            StmtKind::Continue => Err(ControlAction::Continue),
            StmtKind::Exit(value) => {
                if let Some(value) = value {
                    let value = self.eval_expr(value)?;
                    let result = self.names.result.clone();
                    let place = self.name_place(&result)?;
                    self.write_place(place, value, stmt.pos)?;
                }
                Err(ControlAction::Exit)
            }
        }
    }

    /// An expression statement. A bare procedure variable (`OnDone;`) is
    /// called rather than read.
    fn exec_expr_stmt(&mut self, expr: &Expr) -> EvalResult<()> {
        match &expr.kind {
            ExprKind::Ident(name) => {
                if let Resolved::Variable(Value::Function(pointer)) = self.resolve_ident(name) {
                    self.call_pointer(&pointer, CallArgs::empty(), expr.pos)?;
                    return Ok(());
                }
                self.eval_expr(expr)?;
            }
            ExprKind::Member { object, member } => {
                let receiver = self.eval_expr(object)?;
                let held = match receiver.unboxed() {
                    Value::Object(object) => object.get_field(member.as_str()),
                    Value::Record(record) => record.get(member.as_str()),
                    _ => None,
                };
                if let Some(Value::Function(pointer)) = held {
                    self.call_pointer(&pointer, CallArgs::empty(), expr.pos)?;
                    return Ok(());
                }
                let access = MemberAccess {
                    checked: !is_self_expr(object),
                    write_back: object.as_ident().is_some(),
                };
                self.read_member(receiver, member, expr.pos, access)
                    .map_err(|action| at_pos(action, expr.pos))?;
            }
            _ => {
                self.eval_expr(expr)?;
            }
        }
        Ok(())
    }

    fn exec_var(&mut self, decl: &VarDecl) -> EvalResult<()> {
        for name in &decl.names {
            let value = match (&decl.init, &decl.ty) {
                (Some(init), Some(ty)) => {
                    let value = self.eval_expr(init)?;
                    self.coerce_to_type(value, ty)?
                }
                (Some(init), None) => self.eval_expr(init)?.copy_for_store(),
                (None, Some(ty)) => {
                    let meta = self.types.resolve_or_err(ty)?;
                    self.types.default_for(&meta)
                }
                (None, None) => Value::Variant(None),
            };
            self.retain(&value);
            self.env.define(name.clone(), value, Mutability::Mutable);
        }
        Ok(())
    }

    fn exec_const(&mut self, decl: &ConstDecl) -> EvalResult<()> {
        let value = self.const_value(decl)?;
        self.retain(&value);
        self.env
            .define(decl.name.clone(), value, Mutability::Immutable);
        Ok(())
    }

    // Loops

    fn for_range(
        &mut self,
        start: &Expr,
        end: &Expr,
        direction: ForDirection,
        step: Option<&Expr>,
    ) -> EvalResult<ForRange> {
        let start = self.eval_expr(start)?;
        let end = self.eval_expr(end)?;
        let step = match step {
            Some(step) => {
                let step = index_ordinal(&self.eval_expr(step)?)?;
                if step <= 0 {
                    return Err(EvalError::new(format!(
                        "FOR loop STEP should be strictly positive: {step}"
                    ))
                    .into());
                }
                step
            }
            None => 1,
        };
        let enum_type = match start.unboxed() {
            Value::Enum(value) => Some(Rc::clone(&value.ty)),
            _ => None,
        };
        Ok(ForRange {
            from: index_ordinal(&start)?,
            to: index_ordinal(&end)?,
            step,
            direction,
            enum_type,
        })
    }

    fn run_for(&mut self, var: &Name, range: &ForRange, body: &Stmt, pos: Pos) -> EvalResult<()> {
        let mut current = range.from;
        while range.includes(current) {
            let skip = range
                .enum_type
                .as_ref()
                .is_some_and(|ty| ty.name_of(current).is_none());
            if !skip {
                let place = self.name_place(var)?;
                self.write_place(place, range.value_at(current), pos)?;
                if let LoopStep::Stop = loop_step(self.exec_stmt(body))? {
                    break;
                }
            }
            match range.next(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(())
    }

    /// The values a `for .. in` loop visits.
    fn iteration_items(&mut self, iterable: &Expr) -> EvalResult<Vec<Value>> {
        let value = self.eval_expr(iterable)?;
        let items = match value.unboxed() {
            Value::Array(array) => array.to_vec(),
            Value::String(text) => text.chars().map(|c| Value::String(c.to_string())).collect(),
            Value::Set(set) => {
                let ty = set.enum_type().cloned();
                set.ordinals()
                    .into_iter()
                    .map(|ordinal| match &ty {
                        Some(ty) => enum_from_ordinal(ty, ordinal),
                        None => Value::Integer(ordinal),
                    })
                    .collect()
            }
            Value::Type(TypeMeta::Enum(ty)) => ty
                .members
                .iter()
                .map(|(_, ordinal)| enum_from_ordinal(ty, *ordinal))
                .collect(),
            other => {
                return Err(type_mismatch("array, string, set or enumeration", &other.type_name()).into())
            }
        };
        Ok(items)
    }

    fn run_for_in(&mut self, var: &Name, items: Vec<Value>, body: &Stmt, pos: Pos) -> EvalResult<()> {
        for item in items {
            let place = self.name_place(var)?;
            self.write_place(place, item, pos)?;
            if let LoopStep::Stop = loop_step(self.exec_stmt(body))? {
                break;
            }
        }
        Ok(())
    }

    fn exec_case(
        &mut self,
        subject: &Expr,
        branches: &[CaseBranch],
        else_branch: Option<&[Stmt]>,
    ) -> EvalResult<()> {
        let subject = self.eval_expr(subject)?;
        for branch in branches {
            for label in &branch.labels {
                if self.case_label_matches(&subject, label)? {
                    return self.exec_stmt(&branch.body);
                }
            }
        }
        match else_branch {
            Some(stmts) => self.exec_stmts(stmts),
            None => Ok(()),
        }
    }

    fn case_label_matches(&mut self, subject: &Value, label: &CaseLabel) -> EvalResult<bool> {
        match label {
            CaseLabel::Value(expr) => {
                let value = self.eval_expr(expr)?;
                Ok(values_equal(subject, &value))
            }
            CaseLabel::Range(low, high) => {
                let low = self.eval_expr(low)?;
                let high = self.eval_expr(high)?;
                let above = compare_values(subject, &low).is_some_and(|o| o != Ordering::Less);
                let below = compare_values(subject, &high).is_some_and(|o| o != Ordering::Greater);
                Ok(above && below)
            }
        }
    }
}

/// Bounds of a counting `for` loop, evaluated once before the first
/// iteration.
struct ForRange {
    from: i64,
    to: i64,
    step: i64,
    direction: ForDirection,
    enum_type: Option<Rc<EnumType>>,
}

impl ForRange {
    fn includes(&self, current: i64) -> bool {
        match self.direction {
            ForDirection::To => current <= self.to,
            ForDirection::DownTo => current >= self.to,
        }
    }

    /// The following counter value; `None` once it would overflow.
    fn next(&self, current: i64) -> Option<i64> {
        match self.direction {
            ForDirection::To => current.checked_add(self.step),
            ForDirection::DownTo => current.checked_sub(self.step),
        }
    }

    fn value_at(&self, ordinal: i64) -> Value {
        match &self.enum_type {
            Some(ty) => enum_from_ordinal(ty, ordinal),
            None => Value::Integer(ordinal),
        }
    }
}

/// Map a loop body's outcome: `continue` goes on, `break` stops the loop,
/// anything else propagates.
fn loop_step(outcome: EvalResult<()>) -> EvalResult<LoopStep> {
    match outcome {
        Ok(()) | Err(ControlAction::Continue) => Ok(LoopStep::Next),
        Err(ControlAction::Break) => Ok(LoopStep::Stop),
        Err(action) => Err(action),
    }
}
