//! Tree-walking interpreter for compiled contracts.

use std::collections::HashMap;

use thiserror::Error;

use super::ast::{BinaryOp, Call, CallTarget, Expr, ReturnValues, Stmt};
use super::compiler::{CompiledContract, FunctionDef};
use crate::domain::Felt;

pub const MAX_CALL_DEPTH: usize = 256;
/// Calls plus evaluated expressions allowed in one entry-point run.
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("assertion failed on line {line}: {lhs} != {rhs}")]
    AssertionFailed { line: usize, lhs: Felt, rhs: Felt },
    #[error("division by zero on line {line}")]
    DivisionByZero { line: usize },
    #[error("call depth exceeded {MAX_CALL_DEPTH}")]
    DepthExceeded,
    #[error("execution budget of {limit} steps exhausted")]
    BudgetExhausted { limit: u64 },
    #[error("'{function}' expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
}

/// Storage of one deployed contract: `(variable, keys) -> value`, zero when
/// never written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Storage {
    slots: HashMap<(String, Vec<Felt>), Felt>,
}

impl Storage {
    pub fn read(&self, var: &str, keys: &[Felt]) -> Felt {
        self.slots
            .get(&(var.to_string(), keys.to_vec()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn write(&mut self, var: &str, keys: Vec<Felt>, value: Felt) {
        self.slots.insert((var.to_string(), keys), value);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

pub struct Vm<'c> {
    contract: &'c CompiledContract,
    storage: &'c mut Storage,
    depth: usize,
    steps: u64,
    step_limit: u64,
}

impl<'c> Vm<'c> {
    pub fn new(contract: &'c CompiledContract, storage: &'c mut Storage) -> Self {
        Self {
            contract,
            storage,
            depth: 0,
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn charge(&mut self) -> Result<(), ExecError> {
        if self.steps >= self.step_limit {
            return Err(ExecError::BudgetExhausted {
                limit: self.step_limit,
            });
        }
        self.steps += 1;
        Ok(())
    }

    pub fn run(&mut self, function: &FunctionDef, args: &[Felt]) -> Result<Vec<Felt>, ExecError> {
        if function.params.len() != args.len() {
            return Err(ExecError::Arity {
                function: function.name.clone(),
                expected: function.params.len(),
                actual: args.len(),
            });
        }

        self.charge()?;
        self.depth += 1;
        if self.depth > MAX_CALL_DEPTH {
            self.depth -= 1;
            return Err(ExecError::DepthExceeded);
        }
        let result = self.execute(function, args);
        self.depth -= 1;
        result
    }

    fn execute(&mut self, function: &FunctionDef, args: &[Felt]) -> Result<Vec<Felt>, ExecError> {
        let mut locals: HashMap<&str, Felt> = function
            .params
            .iter()
            .map(String::as_str)
            .zip(args.iter().cloned())
            .collect();

        for stmt in &function.body {
            match stmt {
                Stmt::Bind { target, value, .. } => {
                    let value = self.eval(value, &locals)?;
                    locals.insert(target.name.as_str(), value);
                }
                Stmt::Unpack { targets, call, .. } => {
                    let values = self.call(call, &locals)?;
                    for (target, value) in targets.iter().zip(values) {
                        locals.insert(target.name.as_str(), value);
                    }
                }
                Stmt::Assert { lhs, rhs, span } => {
                    let lhs = self.eval(lhs, &locals)?;
                    let rhs = self.eval(rhs, &locals)?;
                    if lhs != rhs {
                        return Err(ExecError::AssertionFailed {
                            line: self.contract.line_of(*span),
                            lhs,
                            rhs,
                        });
                    }
                }
                Stmt::Call(call) => {
                    self.call(call, &locals)?;
                }
                Stmt::Return { values, .. } => {
                    return match values {
                        ReturnValues::Tuple(values) => values
                            .iter()
                            .map(|value| self.eval(&value.value, &locals))
                            .collect(),
                        ReturnValues::Call(call) => self.call(call, &locals),
                    };
                }
            }
        }
        Ok(Vec::new())
    }

    fn call(&mut self, call: &Call, locals: &HashMap<&str, Felt>) -> Result<Vec<Felt>, ExecError> {
        let mut args = call
            .args
            .iter()
            .map(|arg| self.eval(arg, locals))
            .collect::<Result<Vec<_>, _>>()?;

        match &call.target {
            CallTarget::Function(ident) => {
                let contract = self.contract;
                let function = contract
                    .function(&ident.name)
                    .ok_or_else(|| ExecError::UnknownFunction(ident.name.clone()))?;
                self.run(function, &args)
            }
            CallTarget::StorageRead(ident) => Ok(vec![self.storage.read(&ident.name, &args)]),
            CallTarget::StorageWrite(ident) => {
                let value = args.pop().unwrap_or_default();
                self.storage.write(&ident.name, args, value);
                Ok(Vec::new())
            }
        }
    }

    fn eval(&mut self, expr: &Expr, locals: &HashMap<&str, Felt>) -> Result<Felt, ExecError> {
        self.charge()?;
        match expr {
            Expr::Int(value, _) | Expr::ShortString(value, _) => Ok(value.clone()),
            Expr::Var(ident) => Ok(locals.get(ident.name.as_str()).cloned().unwrap_or_default()),
            Expr::Neg(inner, _) => Ok(-self.eval(inner, locals)?),
            Expr::Binary { op, lhs, rhs } => {
                let left = self.eval(lhs, locals)?;
                let right = self.eval(rhs, locals)?;
                match op {
                    BinaryOp::Add => Ok(left + right),
                    BinaryOp::Sub => Ok(left - right),
                    BinaryOp::Mul => Ok(left * right),
                    BinaryOp::Div => left.checked_div(&right).ok_or(ExecError::DivisionByZero {
                        line: self.contract.line_of(expr.span()),
                    }),
                }
            }
            Expr::Call(call) => Ok(self.call(call, locals)?.into_iter().next().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::cairo::compile_source;

    const COUNTER: &str = "\
@storage_var
func balance(owner: felt) -> (amount: felt):
end

@external
func deposit(owner: felt, amount: felt):
    let (current) = balance.read(owner)
    balance.write(owner, current + amount)
    return ()
end

@view
func balance_of(owner: felt) -> (amount: felt):
    let (amount) = balance.read(owner)
    return (amount=amount)
end

func half(x: felt) -> (r: felt):
    return (x / 2)
end

@view
func checked(x: felt) -> (r: felt):
    assert x = 3
    return (x)
end

func recurse(n: felt) -> (r: felt):
    return recurse(n + 1)
end

@view
func forever() -> (r: felt):
    return recurse(0)
end

@view
func divide(x: felt) -> (r: felt):
    return (half(x) / (x - x))
end

func twice(n: felt) -> (r: felt):
    let (a) = half(n)
    let (b) = half(n)
    return (a + b)
end

@view
func fan_out() -> (r: felt):
    let (a) = twice(1)
    let (b) = twice(2)
    let (c) = twice(3)
    return (a + b + c)
end
";

    fn contract() -> CompiledContract {
        compile_source(COUNTER).unwrap()
    }

    fn run(
        contract: &CompiledContract,
        storage: &mut Storage,
        name: &str,
        args: &[Felt],
    ) -> Result<Vec<Felt>, ExecError> {
        let function = contract.function(name).unwrap();
        Vm::new(contract, storage).run(function, args)
    }

    #[test]
    fn storage_reads_default_to_zero_and_persist_writes() {
        let contract = contract();
        let mut storage = Storage::default();
        let alice = Felt::from(0xa11ceu64);

        assert_eq!(
            run(&contract, &mut storage, "balance_of", &[alice.clone()]).unwrap(),
            vec![Felt::zero()]
        );
        run(&contract, &mut storage, "deposit", &[alice.clone(), Felt::from(5u64)]).unwrap();
        run(&contract, &mut storage, "deposit", &[alice.clone(), Felt::from(7u64)]).unwrap();

        assert_eq!(
            run(&contract, &mut storage, "balance_of", &[alice]).unwrap(),
            vec![Felt::from(12u64)]
        );
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn field_division_multiplies_by_inverse() {
        let contract = contract();
        let mut storage = Storage::default();
        let result = run(&contract, &mut storage, "half", &[Felt::from(1u64)]).unwrap();
        assert_eq!(result[0].clone() * Felt::from(2u64), Felt::one());
    }

    #[test]
    fn failed_assertion_reports_line() {
        let contract = contract();
        let mut storage = Storage::default();
        let err = run(&contract, &mut storage, "checked", &[Felt::from(4u64)]).unwrap_err();
        assert_eq!(
            err,
            ExecError::AssertionFailed {
                line: 24,
                lhs: Felt::from(4u64),
                rhs: Felt::from(3u64)
            }
        );
    }

    #[test]
    fn unbounded_recursion_hits_depth_limit() {
        let contract = contract();
        let mut storage = Storage::default();
        let err = run(&contract, &mut storage, "forever", &[]).unwrap_err();
        assert_eq!(err, ExecError::DepthExceeded);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let contract = contract();
        let mut storage = Storage::default();
        let err = run(&contract, &mut storage, "divide", &[Felt::from(4u64)]).unwrap_err();
        assert_eq!(err, ExecError::DivisionByZero { line: 39 });
    }

    #[test]
    fn step_limit_stops_wide_call_trees() {
        let contract = contract();
        let mut storage = Storage::default();
        let function = contract.function("fan_out").unwrap();

        let mut vm = Vm::new(&contract, &mut storage).with_step_limit(10);
        let err = vm.run(function, &[]).unwrap_err();

        assert_eq!(err, ExecError::BudgetExhausted { limit: 10 });
        assert_eq!(vm.steps(), 10);
    }

    #[test]
    fn default_step_limit_leaves_small_calls_alone() {
        let contract = contract();
        let mut storage = Storage::default();
        let function = contract.function("fan_out").unwrap();

        let mut vm = Vm::new(&contract, &mut storage);
        let result = vm.run(function, &[]).unwrap();

        assert_eq!(result[0].clone() * Felt::from(2u64), Felt::from(12u64));
        assert!(vm.steps() < 100);
    }

    #[test]
    fn arity_is_checked_at_entry() {
        let contract = contract();
        let mut storage = Storage::default();
        let err = run(&contract, &mut storage, "balance_of", &[]).unwrap_err();
        assert!(matches!(err, ExecError::Arity { expected: 1, actual: 0, .. }));
    }
}
