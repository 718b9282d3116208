//! Semantic checks that turn a parsed module into a deployable contract.

use std::collections::{HashMap, HashSet};

use super::ast::{Call, CallTarget, Expr, Function, Ident, Module, ReturnValues, Stmt, TypeRef};
use super::lexer::{SourceMap, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    View,
    External,
    Constructor,
    Internal,
}

impl FunctionKind {
    pub fn is_entry_point(&self) -> bool {
        matches!(self, FunctionKind::View | FunctionKind::External)
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub kind: FunctionKind,
    pub params: Vec<String>,
    pub returns: usize,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct CompiledContract {
    functions: HashMap<String, FunctionDef>,
    storage_vars: HashMap<String, usize>,
    constructor: Option<String>,
    source_map: SourceMap,
}

impl CompiledContract {
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn constructor(&self) -> Option<&FunctionDef> {
        self.constructor
            .as_deref()
            .and_then(|name| self.functions.get(name))
    }

    /// Number of keys the storage variable is indexed by.
    pub fn storage_keys(&self, name: &str) -> Option<usize> {
        self.storage_vars.get(name).copied()
    }

    pub fn line_of(&self, span: Span) -> usize {
        self.source_map.line(span.start)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions
            .values()
            .filter(|function| function.kind.is_entry_point())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    pub message: String,
    pub span: Span,
}

struct Signature {
    params: usize,
    returns: usize,
}

pub fn compile(module: Module, source_map: SourceMap) -> Result<CompiledContract, Vec<SemanticError>> {
    let mut checker = Checker::default();
    checker.imports = module
        .imports
        .iter()
        .map(|ident| ident.name.clone())
        .collect();

    let mut kinds = Vec::with_capacity(module.functions.len());
    for function in &module.functions {
        kinds.push(checker.declare(function));
    }
    for (function, kind) in module.functions.iter().zip(&kinds) {
        if kind.is_some() {
            checker.check_body(function);
        }
    }

    if !checker.errors.is_empty() {
        checker.errors.sort_by_key(|err| err.span.start);
        return Err(checker.errors);
    }

    let mut functions = HashMap::new();
    let mut constructor = None;
    for (function, kind) in module.functions.into_iter().zip(kinds) {
        let Some(kind) = kind else {
            continue;
        };
        let name = function.name.name;
        if kind == FunctionKind::Constructor {
            constructor = Some(name.clone());
        }
        functions.insert(
            name.clone(),
            FunctionDef {
                name,
                kind,
                params: function
                    .params
                    .into_iter()
                    .filter_map(|param| param.name.map(|ident| ident.name))
                    .collect(),
                returns: function.returns.len(),
                body: function.body,
            },
        );
    }

    Ok(CompiledContract {
        functions,
        storage_vars: checker.storage_vars,
        constructor,
        source_map,
    })
}

#[derive(Default)]
struct Checker {
    imports: HashSet<String>,
    signatures: HashMap<String, Signature>,
    storage_vars: HashMap<String, usize>,
    constructor_seen: bool,
    errors: Vec<SemanticError>,
}

impl Checker {
    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(SemanticError {
            message: message.into(),
            span,
        });
    }

    fn check_type(&mut self, ty: &TypeRef) {
        if !ty.is_felt() {
            self.error(
                format!("unsupported type '{}'; only 'felt' is supported", ty.display()),
                ty.span,
            );
        }
    }

    /// Records the function's signature. Returns `None` for storage variables,
    /// which have no body to run.
    fn declare(&mut self, function: &Function) -> Option<FunctionKind> {
        let name = &function.name;
        if self.signatures.contains_key(&name.name) || self.storage_vars.contains_key(&name.name)
        {
            self.error(format!("duplicate function '{}'", name.name), name.span);
        }

        for param in function.params.iter().chain(&function.returns) {
            self.check_type(&param.ty);
        }

        let mut kind: Option<(FunctionKind, &Ident)> = None;
        let mut storage = false;
        for decorator in &function.decorators {
            let decorated = match decorator.name.as_str() {
                "view" => FunctionKind::View,
                "external" => FunctionKind::External,
                "constructor" => FunctionKind::Constructor,
                "storage_var" => {
                    storage = true;
                    continue;
                }
                other => {
                    self.error(format!("unknown decorator '@{}'", other), decorator.span);
                    continue;
                }
            };
            if let Some((_, first)) = kind {
                self.error(
                    format!(
                        "conflicting decorators '@{}' and '@{}'",
                        first.name, decorator.name
                    ),
                    decorator.span,
                );
            } else {
                kind = Some((decorated, decorator));
            }
        }

        if storage {
            if kind.is_some() {
                self.error(
                    format!("storage variable '{}' cannot be an entry point", name.name),
                    name.span,
                );
            }
            if !function.body.is_empty() {
                self.error(
                    format!("storage variable '{}' must not have a body", name.name),
                    function.body[0].span(),
                );
            }
            if function.returns.len() != 1 {
                self.error(
                    format!(
                        "storage variable '{}' must declare exactly one return value",
                        name.name
                    ),
                    name.span,
                );
            }
            self.storage_vars
                .insert(name.name.clone(), function.params.len());
            return None;
        }

        let kind = kind.map(|(kind, _)| kind).unwrap_or(FunctionKind::Internal);
        if kind == FunctionKind::Constructor {
            if self.constructor_seen {
                self.error("only one constructor is allowed", name.span);
            }
            self.constructor_seen = true;
            if !function.returns.is_empty() {
                self.error("a constructor cannot return values", name.span);
            }
        }

        self.signatures.insert(
            name.name.clone(),
            Signature {
                params: function.params.len(),
                returns: function.returns.len(),
            },
        );
        Some(kind)
    }

    fn check_body(&mut self, function: &Function) {
        let mut scope: HashSet<String> = function
            .params
            .iter()
            .filter_map(|param| param.name.as_ref().map(|ident| ident.name.clone()))
            .collect();
        let declared = function.returns.len();
        let mut returned = false;

        for stmt in &function.body {
            if returned {
                self.error("unreachable statement after 'return'", stmt.span());
                break;
            }
            match stmt {
                Stmt::Bind { target, ty, value, .. } => {
                    if let Some(ty) = ty {
                        self.check_type(ty);
                    }
                    self.check_expr(value, &scope);
                    scope.insert(target.name.clone());
                }
                Stmt::Unpack { targets, call, .. } => {
                    let returns = self.check_call(call, &scope);
                    if returns.is_some_and(|returns| returns != targets.len()) {
                        self.error(
                            format!(
                                "'{}' returns {} value(s), but {} are unpacked",
                                call.target.ident().name,
                                returns.unwrap_or_default(),
                                targets.len()
                            ),
                            call.span,
                        );
                    }
                    scope.extend(targets.iter().map(|ident| ident.name.clone()));
                }
                Stmt::Assert { lhs, rhs, .. } => {
                    self.check_expr(lhs, &scope);
                    self.check_expr(rhs, &scope);
                }
                Stmt::Call(call) => {
                    self.check_call(call, &scope);
                }
                Stmt::Return { values, span } => {
                    returned = true;
                    match values {
                        ReturnValues::Tuple(values) => {
                            if values.len() != declared {
                                self.error(
                                    format!(
                                        "'{}' declares {} return value(s), but {} are returned",
                                        function.name.name,
                                        declared,
                                        values.len()
                                    ),
                                    *span,
                                );
                            }
                            for (index, value) in values.iter().enumerate() {
                                self.check_expr(&value.value, &scope);
                                let expected = function
                                    .returns
                                    .get(index)
                                    .and_then(|param| param.name.as_ref());
                                if let (Some(given), Some(expected)) = (&value.name, expected) {
                                    if given.name != expected.name {
                                        self.error(
                                            format!(
                                                "return value '{}' does not match declared '{}'",
                                                given.name, expected.name
                                            ),
                                            given.span,
                                        );
                                    }
                                }
                            }
                        }
                        ReturnValues::Call(call) => {
                            let returns = self.check_call(call, &scope);
                            if let Some(returns) = returns.filter(|returns| *returns != declared) {
                                self.error(
                                    format!(
                                        "'{}' declares {} return value(s), but '{}' returns {}",
                                        function.name.name,
                                        declared,
                                        call.target.ident().name,
                                        returns
                                    ),
                                    call.span,
                                );
                            }
                        }
                    }
                }
            }
        }

        if declared > 0 && !returned {
            self.error(
                format!(
                    "function '{}' must end with a 'return' statement",
                    function.name.name
                ),
                function.name.span,
            );
        }
    }

    fn check_expr(&mut self, expr: &Expr, scope: &HashSet<String>) {
        match expr {
            Expr::Int(..) | Expr::ShortString(..) => {}
            Expr::Var(ident) => {
                if !scope.contains(&ident.name) {
                    self.error(format!("undeclared identifier '{}'", ident.name), ident.span);
                }
            }
            Expr::Neg(inner, _) => self.check_expr(inner, scope),
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs, scope);
                self.check_expr(rhs, scope);
            }
            Expr::Call(call) => {
                let returns = self.check_call(call, scope);
                if let Some(returns) = returns.filter(|returns| *returns != 1) {
                    self.error(
                        format!(
                            "'{}' returns {} value(s) and cannot be used as an expression",
                            call.target.ident().name,
                            returns
                        ),
                        call.span,
                    );
                }
            }
        }
    }

    /// Checks the call and returns how many values it produces, when known.
    fn check_call(&mut self, call: &Call, scope: &HashSet<String>) -> Option<usize> {
        for arg in &call.args {
            self.check_expr(arg, scope);
        }
        let given = call.args.len();

        match &call.target {
            CallTarget::Function(ident) => {
                if self.storage_vars.contains_key(&ident.name) {
                    self.error(
                        format!(
                            "'{0}' is a storage variable; use '{0}.read' or '{0}.write'",
                            ident.name
                        ),
                        ident.span,
                    );
                    return None;
                }
                let Some(signature) = self.signatures.get(&ident.name) else {
                    let message = if self.imports.contains(&ident.name) {
                        format!("imported function '{}' is not supported", ident.name)
                    } else {
                        format!("call to unknown function '{}'", ident.name)
                    };
                    self.error(message, ident.span);
                    return None;
                };
                let (expected, returns) = (signature.params, signature.returns);
                if expected != given {
                    self.error(
                        format!(
                            "'{}' expects {} argument(s), got {}",
                            ident.name, expected, given
                        ),
                        call.span,
                    );
                }
                Some(returns)
            }
            CallTarget::StorageRead(ident) | CallTarget::StorageWrite(ident) => {
                let writing = matches!(call.target, CallTarget::StorageWrite(_));
                let Some(&keys) = self.storage_vars.get(&ident.name) else {
                    self.error(
                        format!("'{}' is not a storage variable", ident.name),
                        ident.span,
                    );
                    return None;
                };
                let (expected, method, returns) = if writing {
                    (keys + 1, "write", 0)
                } else {
                    (keys, "read", 1)
                };
                if expected != given {
                    self.error(
                        format!(
                            "'{}.{}' expects {} argument(s), got {}",
                            ident.name, method, expected, given
                        ),
                        call.span,
                    );
                }
                Some(returns)
            }
        }
    }
}
