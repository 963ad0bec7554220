//! Syntax tree and symbol table for a lowered translation unit
//!
//! The front end lowers tree-sitter's concrete syntax tree into this smaller
//! tree. Every identifier carries the declaration it resolves to, so the loop
//! analysis compares variables by identity instead of by name, and every node
//! carries a [`Span`] so edits can be expressed as byte ranges.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use serde::Serialize;

// ============================================================================
// Source locations
// ============================================================================

/// Index of a file in a [`SourceMap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub u32);

/// Half-open byte range within one source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(file: FileId, start: usize, end: usize) -> Self {
        Self { file, start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `other` lies within this span (inclusive of equal spans)
    pub fn contains(&self, other: &Span) -> bool {
        self.file == other.file && self.start <= other.start && other.end <= self.end
    }

    /// True when `other` lies within this span and is not the same span
    pub fn strictly_contains(&self, other: &Span) -> bool {
        self.contains(other) && self != other
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.file == other.file && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}:{}..{}", self.file.0, self.start, self.end)
    }
}

/// One file taking part in a translation unit
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: Arc<str>,
}

/// All files of a translation unit, addressed by [`FileId`]
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: PathBuf, text: impl Into<Arc<str>>) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            path,
            text: text.into(),
        });
        id
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn path(&self, id: FileId) -> Option<&Path> {
        self.file(id).map(|f| f.path.as_path())
    }

    /// Find a file that was already added under `path`
    pub fn find(&self, path: &Path) -> Option<FileId> {
        self.files
            .iter()
            .position(|f| f.path == path)
            .map(|i| FileId(i as u32))
    }

    /// Verbatim source text covered by `span` (empty if the span is stale)
    pub fn text(&self, span: Span) -> &str {
        self.file(span.file)
            .and_then(|f| f.text.get(span.start..span.end))
            .unwrap_or("")
    }

    /// 1-based line number of the start of `span`
    pub fn line(&self, span: Span) -> usize {
        self.file(span.file)
            .and_then(|f| f.text.get(..span.start))
            .map(|prefix| prefix.bytes().filter(|b| *b == b'\n').count() + 1)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ============================================================================
// Declarations and types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Variable,
    Parameter,
    Field,
    Function,
    Record,
    Enumerator,
    TypeAlias,
    Namespace,
    Macro,
}

/// The slice of the C++ type system the analysis needs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Integer,
    Floating,
    /// `len` is `None` when the bound is not a constant (or omitted)
    Array { element: Box<Type>, len: Option<u64> },
    Pointer(Box<Type>),
    Reference(Box<Type>),
    Record(String),
    /// A type name we could not resolve (template types, unseen typedefs)
    Named(String),
    Unknown,
}

impl Type {
    pub fn array(element: Type, len: Option<u64>) -> Self {
        Type::Array {
            element: Box::new(element),
            len,
        }
    }

    /// The referred-to type for references, `self` otherwise
    pub fn non_reference(&self) -> &Type {
        match self {
            Type::Reference(inner) => inner.non_reference(),
            other => other,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.non_reference(), Type::Integer)
    }

    /// Statically known element count of an array type
    pub fn array_len(&self) -> Option<u64> {
        match self.non_reference() {
            Type::Array { len, .. } => *len,
            _ => None,
        }
    }

    /// Element type of arrays and pointee type of pointers
    pub fn element(&self) -> Option<&Type> {
        match self.non_reference() {
            Type::Array { element, .. } => Some(element),
            Type::Pointer(pointee) => Some(pointee),
            _ => None,
        }
    }

    /// Spelled name of record and unresolved named types
    pub fn name(&self) -> Option<&str> {
        match self.non_reference() {
            Type::Record(name) | Type::Named(name) => Some(name),
            Type::Array { element, .. } | Type::Pointer(element) => element.name(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub name: String,
    pub kind: DeclKind,
    pub ty: Type,
    pub scope: ScopeId,
    pub span: Span,
    /// Declared `const` or `constexpr`
    pub is_const: bool,
    /// Declared `static`; a non-static data member is never a constant
    pub is_static: bool,
    /// Initializer, kept for constant evaluation
    pub init: Option<Expr>,
    /// Value computed while lowering (enumerators, object-like macros)
    pub value: Option<i128>,
    /// Identifiers spelled in a macro's replacement text, parameters excluded
    pub expansion_names: Vec<String>,
}

impl Decl {
    pub fn new(name: impl Into<String>, kind: DeclKind, ty: Type, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            scope: ScopeId(0),
            span,
            is_const: false,
            is_static: false,
            init: None,
            value: None,
            expansion_names: Vec::new(),
        }
    }

    pub fn with_const(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_value(mut self, value: Option<i128>) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    TranslationUnit,
    Namespace,
    Record,
    Function,
    Block,
    ForInit,
    Lambda,
    Enum,
}

/// One lexical scope: the names declared directly in it
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    names: AHashMap<String, Vec<DeclId>>,
}

impl Scope {
    pub fn declares(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }
}

/// Declarations, scopes and the record/namespace indexes built while lowering
#[derive(Debug, Clone)]
pub struct SymbolTable {
    decls: Vec<Decl>,
    scopes: Vec<Scope>,
    records: AHashMap<String, ScopeId>,
    namespaces: AHashMap<String, ScopeId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Create a table holding only the translation-unit scope
    pub fn new() -> Self {
        Self {
            decls: Vec::new(),
            scopes: vec![Scope {
                kind: ScopeKind::TranslationUnit,
                parent: None,
                names: AHashMap::new(),
            }],
            records: AHashMap::new(),
            namespaces: AHashMap::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            names: AHashMap::new(),
        });
        id
    }

    pub fn declare(&mut self, scope: ScopeId, mut decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        decl.scope = scope;
        self.scopes[scope.0 as usize]
            .names
            .entry(decl.name.clone())
            .or_default()
            .push(id);
        self.decls.push(decl);
        id
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0 as usize]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.0 as usize]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// `from` followed by each enclosing scope up to the translation unit
    pub fn ancestors(&self, from: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(from), move |id| self.scope(*id).parent)
    }

    /// Resolve `name` in `scope` alone, preferring the latest declaration
    pub fn lookup_in(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.scope(scope)
            .names
            .get(name)
            .and_then(|ids| ids.last().copied())
    }

    /// Ordinary unqualified lookup from `from` outwards
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<DeclId> {
        self.ancestors(from)
            .find_map(|scope| self.lookup_in(scope, name))
    }

    /// True when any scope in the chain starting at `from` declares `name`,
    /// wherever in that scope the declaration appears
    pub fn is_visible(&self, from: ScopeId, name: &str) -> bool {
        self.ancestors(from)
            .any(|scope| self.scope(scope).declares(name))
    }

    pub fn register_record(&mut self, name: &str, scope: ScopeId) {
        self.records.insert(name.to_string(), scope);
    }

    pub fn record_scope(&self, name: &str) -> Option<ScopeId> {
        self.records.get(name).copied()
    }

    pub fn register_namespace(&mut self, name: &str, scope: ScopeId) {
        self.namespaces.insert(name.to_string(), scope);
    }

    pub fn namespace_scope(&self, name: &str) -> Option<ScopeId> {
        self.namespaces.get(name).copied()
    }

    /// Resolve member `field` of the record named `record`
    pub fn field_of(&self, record: &str, field: &str) -> Option<DeclId> {
        self.record_scope(record)
            .and_then(|scope| self.lookup_in(scope, field))
    }

    /// Static type of an expression, as far as the model knows it
    pub fn type_of(&self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::DeclRef { decl: Some(id), .. } | ExprKind::Member { decl: Some(id), .. } => {
                self.decl(*id).ty.non_reference().clone()
            }
            ExprKind::DeclRef { decl: None, .. } | ExprKind::Member { decl: None, .. } => {
                Type::Unknown
            }
            ExprKind::IntLiteral(_) | ExprKind::CharLiteral(_) | ExprKind::BoolLiteral(_) => {
                Type::Integer
            }
            ExprKind::FloatLiteral(_) => Type::Floating,
            ExprKind::StringLiteral(_) => Type::Pointer(Box::new(Type::Integer)),
            ExprKind::This { record } => Type::Pointer(Box::new(
                record.clone().map(Type::Record).unwrap_or(Type::Unknown),
            )),
            ExprKind::Paren(inner) => self.type_of(inner),
            ExprKind::Subscript { base, .. } => self
                .type_of(base)
                .element()
                .cloned()
                .unwrap_or(Type::Unknown),
            ExprKind::Call { callee, .. } => match callee.ignore_parens().kind {
                ExprKind::DeclRef { decl: Some(id), .. }
                    if self.decl(id).kind == DeclKind::Function =>
                {
                    self.decl(id).ty.non_reference().clone()
                }
                _ => Type::Unknown,
            },
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.type_of(operand);
                match op {
                    UnaryOp::AddrOf => Type::Pointer(Box::new(operand_ty)),
                    UnaryOp::Deref => operand_ty.element().cloned().unwrap_or(Type::Unknown),
                    UnaryOp::Not => Type::Integer,
                    _ => operand_ty,
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                if op.is_comparison() || op.is_logical() {
                    return Type::Integer;
                }
                if *op == BinaryOp::Comma {
                    return self.type_of(rhs);
                }
                let (l, r) = (self.type_of(lhs), self.type_of(rhs));
                match (&l, &r) {
                    (Type::Integer, Type::Integer) => Type::Integer,
                    (Type::Floating, Type::Integer | Type::Floating)
                    | (Type::Integer, Type::Floating) => Type::Floating,
                    _ => Type::Unknown,
                }
            }
            ExprKind::Assign { target, .. } => self.type_of(target),
            ExprKind::Conditional { then, .. } => self.type_of(then),
            ExprKind::Cast { ty, .. } => ty.clone(),
            ExprKind::SizeOf(_) => Type::Integer,
            ExprKind::Block(_) | ExprKind::Other(_) => Type::Unknown,
        }
    }
}

// ============================================================================
// Expressions and statements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    AddrOf,
    Deref,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn from_token(token: &str, prefix: bool) -> Option<Self> {
        Some(match (token, prefix) {
            ("+", _) => Self::Plus,
            ("-", _) => Self::Minus,
            ("!" | "not", _) => Self::Not,
            ("~" | "compl", _) => Self::BitNot,
            ("&", _) => Self::AddrOf,
            ("*", _) => Self::Deref,
            ("++", true) => Self::PreInc,
            ("--", true) => Self::PreDec,
            ("++", false) => Self::PostInc,
            ("--", false) => Self::PostDec,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Comma,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            "&" | "bitand" => Self::BitAnd,
            "|" | "bitor" => Self::BitOr,
            "^" | "xor" => Self::BitXor,
            "&&" | "and" => Self::And,
            "||" | "or" => Self::Or,
            "==" => Self::Eq,
            "!=" | "not_eq" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "," => Self::Comma,
            _ => return None,
        })
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    DeclRef {
        name: String,
        decl: Option<DeclId>,
    },
    IntLiteral(String),
    FloatLiteral(String),
    CharLiteral(String),
    StringLiteral(String),
    BoolLiteral(bool),
    This {
        record: Option<String>,
    },
    Paren(Box<Expr>),
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        base: Box<Expr>,
        arrow: bool,
        field: String,
        decl: Option<DeclId>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Cast {
        ty: Type,
        operand: Box<Expr>,
    },
    SizeOf(Option<Box<Expr>>),
    /// Statements nested in an expression (lambda bodies, statement expressions)
    Block(Box<Stmt>),
    /// Syntax the analysis does not model; children are still visited
    Other(Vec<Expr>),
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Self { span, kind }
    }

    /// Strip any number of enclosing parentheses
    pub fn ignore_parens(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.ignore_parens(),
            _ => self,
        }
    }

    /// Declaration referenced by this expression, ignoring parentheses
    pub fn referenced_decl(&self) -> Option<DeclId> {
        match self.ignore_parens().kind {
            ExprKind::DeclRef { decl, .. } => decl,
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Compound(Vec<Stmt>),
    Expr(Expr),
    Decl(Vec<LocalDecl>),
    For(Box<ForStmt>),
    /// Any other statement; conditions and operands appear as `Expr` children
    Other(Vec<Stmt>),
}

impl Stmt {
    pub fn new(span: Span, kind: StmtKind) -> Self {
        Self { span, kind }
    }

    pub fn expr(expr: Expr) -> Self {
        Self {
            span: expr.span,
            kind: StmtKind::Expr(expr),
        }
    }
}

/// One declarator of a declaration statement
#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub decl: DeclId,
    /// Array bound expressions written in the declarator
    pub bounds: Vec<Expr>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    /// `(` through `)` of the loop header
    pub header: Span,
    /// Scope holding variables declared in the init statement
    pub scope: ScopeId,
    pub init: Option<Stmt>,
    pub condition: Option<Expr>,
    pub increment: Option<Expr>,
    pub body: Stmt,
}

// ============================================================================
// Traversal
// ============================================================================

/// Borrowed handle to either kind of tree node
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

/// Traversal control returned by a [`walk`] visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
}

impl<'a> NodeRef<'a> {
    pub fn span(&self) -> Span {
        match self {
            NodeRef::Stmt(stmt) => stmt.span,
            NodeRef::Expr(expr) => expr.span,
        }
    }

    /// Push children so that popping yields them in source order
    fn push_children(self, stack: &mut Vec<NodeRef<'a>>) {
        let first = stack.len();
        match self {
            NodeRef::Stmt(stmt) => match &stmt.kind {
                StmtKind::Compound(stmts) | StmtKind::Other(stmts) => {
                    stack.extend(stmts.iter().map(NodeRef::Stmt));
                }
                StmtKind::Expr(expr) => stack.push(NodeRef::Expr(expr)),
                StmtKind::Decl(decls) => {
                    for local in decls {
                        stack.extend(local.bounds.iter().map(NodeRef::Expr));
                        stack.extend(local.init.iter().map(NodeRef::Expr));
                    }
                }
                StmtKind::For(for_stmt) => {
                    stack.extend(for_stmt.init.iter().map(NodeRef::Stmt));
                    stack.extend(for_stmt.condition.iter().map(NodeRef::Expr));
                    stack.extend(for_stmt.increment.iter().map(NodeRef::Expr));
                    stack.push(NodeRef::Stmt(&for_stmt.body));
                }
            },
            NodeRef::Expr(expr) => match &expr.kind {
                ExprKind::DeclRef { .. }
                | ExprKind::IntLiteral(_)
                | ExprKind::FloatLiteral(_)
                | ExprKind::CharLiteral(_)
                | ExprKind::StringLiteral(_)
                | ExprKind::BoolLiteral(_)
                | ExprKind::This { .. }
                | ExprKind::SizeOf(None) => {}
                ExprKind::Paren(inner)
                | ExprKind::Member { base: inner, .. }
                | ExprKind::Unary { operand: inner, .. }
                | ExprKind::Cast { operand: inner, .. }
                | ExprKind::SizeOf(Some(inner)) => stack.push(NodeRef::Expr(inner)),
                ExprKind::Subscript { base, index } => {
                    stack.push(NodeRef::Expr(base));
                    stack.push(NodeRef::Expr(index));
                }
                ExprKind::Call { callee, args } => {
                    stack.push(NodeRef::Expr(callee));
                    stack.extend(args.iter().map(NodeRef::Expr));
                }
                ExprKind::Binary { lhs, rhs, .. } => {
                    stack.push(NodeRef::Expr(lhs));
                    stack.push(NodeRef::Expr(rhs));
                }
                ExprKind::Assign { target, value, .. } => {
                    stack.push(NodeRef::Expr(target));
                    stack.push(NodeRef::Expr(value));
                }
                ExprKind::Conditional {
                    cond,
                    then,
                    otherwise,
                } => {
                    stack.push(NodeRef::Expr(cond));
                    stack.push(NodeRef::Expr(then));
                    stack.push(NodeRef::Expr(otherwise));
                }
                ExprKind::Block(stmt) => stack.push(NodeRef::Stmt(stmt)),
                ExprKind::Other(children) => stack.extend(children.iter().map(NodeRef::Expr)),
            },
        }
        stack[first..].reverse();
    }
}

/// Pre-order traversal (iterative to avoid stack overflow on deep trees).
///
/// Returning [`Walk::SkipChildren`] from the visitor prunes the subtree below
/// the visited node; its siblings are still visited.
pub fn walk<'a, F>(root: NodeRef<'a>, mut visitor: F)
where
    F: FnMut(NodeRef<'a>) -> Walk,
{
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if visitor(node) == Walk::Continue {
            node.push_children(&mut stack);
        }
    }
}
