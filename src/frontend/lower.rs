//! Lowering of tree-sitter-cpp syntax trees into [`crate::ast`]
//!
//! Names are resolved while lowering, in source order, against a lexical
//! scope tree. Record bodies are declared in a first pass so inline method
//! bodies see members declared after them. Syntax without a dedicated
//! lowering becomes [`ExprKind::Other`] or [`StmtKind::Other`] with its
//! children still lowered, so no identifier is ever dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashSet;
use tree_sitter::{Node, Tree};

use super::types::{self, DECLARATOR_NAME_KINDS};
use super::{parse_tree, FrontendOptions, TranslationUnit};
use crate::ast::{
    BinaryOp, Decl, DeclId, DeclKind, Expr, ExprKind, FileId, ForStmt, LocalDecl, ScopeId,
    ScopeKind, SourceMap, Span, Stmt, StmtKind, SymbolTable, Type, UnaryOp,
};
use crate::consteval::{evaluate_integer, parse_int_literal};

/// Statement kinds lowered generically as a block of child statements
const GENERIC_STATEMENTS: &[&str] = &[
    "if_statement",
    "while_statement",
    "do_statement",
    "switch_statement",
    "case_statement",
    "return_statement",
    "break_statement",
    "continue_statement",
    "goto_statement",
    "labeled_statement",
    "attributed_statement",
    "try_statement",
    "throw_statement",
    "catch_clause",
    "else_clause",
    "condition_clause",
    "co_return_statement",
    "co_yield_statement",
    "preproc_if",
    "preproc_ifdef",
    "preproc_else",
    "preproc_elif",
    "preproc_elifdef",
];

/// Item kinds that may also appear at statement level
const LOCAL_ITEMS: &[&str] = &[
    "struct_specifier",
    "class_specifier",
    "union_specifier",
    "enum_specifier",
    "type_definition",
    "alias_declaration",
    "preproc_def",
    "preproc_function_def",
    "preproc_include",
];

pub(super) fn lower(
    path: &Path,
    source: &str,
    tree: &Tree,
    options: &FrontendOptions,
) -> TranslationUnit {
    let text: Arc<str> = Arc::from(source);
    let mut sources = SourceMap::new();
    let main_file = sources.add(path.to_path_buf(), Arc::clone(&text));

    let mut lowerer = Lowerer {
        options,
        sources,
        symbols: SymbolTable::new(),
        file: main_file,
        source: text,
        scope: ScopeId(0),
        record: None,
        items: Vec::new(),
        visited: AHashSet::new(),
    };
    lowerer.visited.insert(canonical(path));
    lowerer.lower_items(tree.root_node());

    TranslationUnit {
        sources: lowerer.sources,
        main_file,
        symbols: lowerer.symbols,
        items: lowerer.items,
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

fn all_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn first_named_child(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node).into_iter().next()
}

fn last_named_child(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node).pop()
}

/// Result of peeling a declarator down to the declared name
struct Declarator<'t> {
    name: Option<String>,
    ty: Type,
    /// Lowered array bound expressions
    bounds: Vec<Expr>,
    function: bool,
    parameters: Option<Node<'t>>,
    value: Option<Node<'t>>,
}

struct Lowerer<'o> {
    options: &'o FrontendOptions,
    sources: SourceMap,
    symbols: SymbolTable,
    /// File currently being lowered
    file: FileId,
    source: Arc<str>,
    scope: ScopeId,
    /// Record whose members are in scope (target of `this`)
    record: Option<String>,
    items: Vec<Stmt>,
    visited: AHashSet<PathBuf>,
}

impl Lowerer<'_> {
    fn span(&self, node: Node) -> Span {
        Span::new(self.file, node.start_byte(), node.end_byte())
    }

    fn text(&self, node: Node) -> String {
        self.source
            .get(node.byte_range())
            .unwrap_or("")
            .to_string()
    }

    fn with_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = saved;
        result
    }

    fn in_new_scope<T>(&mut self, kind: ScopeKind, f: impl FnOnce(&mut Self) -> T) -> T {
        let scope = self.symbols.push_scope(kind, self.scope);
        self.with_scope(scope, f)
    }

    fn declare(&mut self, decl: Decl) -> DeclId {
        self.symbols.declare(self.scope, decl)
    }

    /// `const`/`constexpr` written directly on a declaration
    fn is_const(&self, node: Node) -> bool {
        all_children(node)
            .into_iter()
            .any(|c| matches!(self.text(c).trim(), "const" | "constexpr"))
    }

    fn is_static(&self, node: Node) -> bool {
        named_children(node)
            .into_iter()
            .any(|c| c.kind() == "storage_class_specifier" && self.text(c).trim() == "static")
    }

    // ========================================================================
    // Top-level items
    // ========================================================================

    fn lower_items(&mut self, container: Node) {
        for child in named_children(container) {
            self.lower_item(child);
        }
    }

    fn lower_item(&mut self, node: Node) {
        match node.kind() {
            "function_definition" => self.lower_function(node),
            "declaration" => {
                let stmt = self.lower_declaration(node);
                self.items.push(stmt);
            }
            "struct_specifier" | "class_specifier" | "union_specifier" | "enum_specifier" => {
                self.declare_type(node);
            }
            "type_definition" => self.lower_type_definition(node),
            "alias_declaration" => self.lower_alias(node),
            "namespace_definition" => self.lower_namespace(node),
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        self.lower_items(body);
                    } else {
                        self.lower_item(body);
                    }
                }
            }
            "template_declaration" => self.lower_template(node),
            "preproc_include" => self.follow_include(node),
            "preproc_def" | "preproc_function_def" => self.lower_macro(node),
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif"
            | "preproc_elifdef" | "declaration_list" => self.lower_items(node),
            _ => {}
        }
    }

    fn lower_namespace(&mut self, node: Node) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            // Anonymous namespace members are visible in the enclosing scope
            self.lower_items(body);
            return;
        };

        let spelled = self.text(name_node);
        let name = types::unqualified(&spelled).to_string();
        let reopened = self
            .symbols
            .namespace_scope(&name)
            .filter(|scope| self.symbols.scope(*scope).parent == Some(self.scope));
        let scope = match reopened {
            Some(scope) => scope,
            None => {
                let span = self.span(name_node);
                self.declare(Decl::new(&name, DeclKind::Namespace, Type::Unknown, span));
                let scope = self.symbols.push_scope(ScopeKind::Namespace, self.scope);
                self.symbols.register_namespace(&name, scope);
                scope
            }
        };
        self.with_scope(scope, |this| this.lower_items(body));
    }

    fn lower_template(&mut self, node: Node) {
        self.in_new_scope(ScopeKind::Block, |this| {
            if let Some(params) = node.child_by_field_name("parameters") {
                this.declare_template_parameters(params);
            }
            for child in named_children(node) {
                if child.kind() != "template_parameter_list" {
                    this.lower_item(child);
                }
            }
        });
    }

    fn declare_template_parameters(&mut self, params: Node) {
        for param in named_children(params) {
            match param.kind() {
                "type_parameter_declaration"
                | "optional_type_parameter_declaration"
                | "variadic_type_parameter_declaration" => {
                    let name = param
                        .child_by_field_name("name")
                        .or_else(|| first_named_child(param));
                    if let Some(name) = name {
                        let spelled = self.text(name);
                        let span = self.span(name);
                        self.declare(Decl::new(
                            &spelled,
                            DeclKind::TypeAlias,
                            Type::Named(spelled.clone()),
                            span,
                        ));
                    }
                }
                "parameter_declaration" | "optional_parameter_declaration" => {
                    // Non-type parameters have no value until instantiation
                    self.declare_parameter(param, DeclKind::Parameter);
                }
                _ => {}
            }
        }
    }

    /// `#define` and function-like `#define`; the replacement text is kept
    /// only as an integer value and the identifiers it spells
    fn lower_macro(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let replacement = node
            .child_by_field_name("value")
            .map(|v| self.text(v))
            .unwrap_or_default();
        let parameters: Vec<String> = node
            .child_by_field_name("parameters")
            .map(named_children)
            .unwrap_or_default()
            .into_iter()
            .map(|p| self.text(p))
            .collect();

        let value = if node.kind() == "preproc_def" {
            let trimmed = replacement.trim().trim_start_matches('(').trim_end_matches(')');
            parse_int_literal(trimmed.trim())
        } else {
            None
        };
        let ty = if value.is_some() {
            Type::Integer
        } else {
            Type::Unknown
        };

        let mut expansion_names: Vec<String> = Vec::new();
        for word in replacement.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
            if word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
                && !parameters.iter().any(|p| p == word)
                && !expansion_names.iter().any(|n| n == word)
            {
                expansion_names.push(word.to_string());
            }
        }

        let mut decl = Decl::new(self.text(name_node), DeclKind::Macro, ty, self.span(node))
            .with_const(true)
            .with_value(value);
        decl.expansion_names = expansion_names;
        let root = self.symbols.root();
        self.symbols.declare(root, decl);
    }

    fn follow_include(&mut self, node: Node) {
        if !self.options.follow_includes {
            return;
        }
        let Some(path_node) = node.child_by_field_name("path") else {
            return;
        };
        if path_node.kind() != "string_literal" {
            tracing::debug!("[FRONTEND] Skipping system include {}", self.text(path_node));
            return;
        }

        let spelled = self.text(path_node).trim_matches('"').to_string();
        let Some(path) = self.resolve_include(&spelled) else {
            tracing::warn!("[FRONTEND] Header not found: {}", spelled);
            return;
        };
        if !self.visited.insert(canonical(&path)) {
            return;
        }

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("[FRONTEND] Failed to read {}: {}", path.display(), e);
                return;
            }
        };
        let tree = match parse_tree(&path, &text) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!("[FRONTEND] {}", e);
                return;
            }
        };

        tracing::debug!("[FRONTEND] Following include {}", path.display());
        let text: Arc<str> = Arc::from(text);
        let file = self.sources.add(path, Arc::clone(&text));
        let saved_file = std::mem::replace(&mut self.file, file);
        let saved_source = std::mem::replace(&mut self.source, text);
        self.lower_items(tree.root_node());
        self.file = saved_file;
        self.source = saved_source;
    }

    /// Look next to the including file first, then in the include dirs
    fn resolve_include(&self, spelled: &str) -> Option<PathBuf> {
        let including_dir = self
            .sources
            .path(self.file)
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        including_dir
            .into_iter()
            .chain(self.options.include_dirs.iter().cloned())
            .map(|dir| dir.join(spelled))
            .find(|candidate| candidate.is_file())
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// Declare a record or enum defined by a type specifier and return the
    /// type it names
    fn declare_type(&mut self, node: Node) -> Type {
        match node.kind() {
            "struct_specifier" | "class_specifier" | "union_specifier" => {
                self.declare_record(node)
            }
            "enum_specifier" => {
                self.declare_enum(node);
                Type::Integer
            }
            _ => self.resolve_type(node),
        }
    }

    fn resolve_type(&self, node: Node) -> Type {
        let text = self.text(node);
        match node.kind() {
            "primitive_type" => types::builtin_type(&text).unwrap_or(Type::Named(text)),
            "sized_type_specifier" => types::sized_type(&text),
            "type_identifier" | "qualified_identifier" => self.resolve_type_name(&text),
            "struct_specifier" | "class_specifier" | "union_specifier" => node
                .child_by_field_name("name")
                .map(|n| Type::Record(types::unqualified(&self.text(n)).to_string()))
                .unwrap_or(Type::Unknown),
            "enum_specifier" => Type::Integer,
            "placeholder_type_specifier" | "auto" => Type::Named("auto".to_string()),
            "template_type" => Type::Named(text),
            _ => Type::Unknown,
        }
    }

    fn resolve_type_name(&self, spelled: &str) -> Type {
        if let Some(ty) = types::builtin_type(spelled) {
            return ty;
        }
        let name = types::unqualified(spelled).to_string();
        match self.resolve_name(spelled).map(|id| self.symbols.decl(id)) {
            Some(decl) if decl.kind == DeclKind::TypeAlias => decl.ty.clone(),
            Some(decl) if decl.kind == DeclKind::Record => Type::Record(name),
            _ if self.symbols.record_scope(&name).is_some() => Type::Record(name),
            _ => Type::Named(name),
        }
    }

    /// Type written in a `type_descriptor` (casts, aliases, template args)
    fn lower_type_descriptor(&mut self, node: Node) -> Type {
        if node.kind() != "type_descriptor" {
            return self.resolve_type(node);
        }
        let base = node
            .child_by_field_name("type")
            .map(|t| self.declare_type(t))
            .unwrap_or(Type::Unknown);
        match node.child_by_field_name("declarator") {
            Some(declarator) => self.unwrap_declarator(declarator, base).ty,
            None => base,
        }
    }

    /// Resolve a possibly qualified name (`N`, `ns::N`, `Outer::kSize`)
    fn resolve_name(&self, spelled: &str) -> Option<DeclId> {
        let name = types::unqualified(spelled);
        let qualifiers = types::qualifiers(spelled);
        let Some(owner) = qualifiers.last() else {
            return if spelled.trim_start().starts_with("::") {
                self.symbols.lookup_in(self.symbols.root(), name)
            } else {
                self.symbols.lookup(self.scope, name)
            };
        };

        let owner = owner.split('<').next().unwrap_or_default().trim();
        self.symbols
            .namespace_scope(owner)
            .or_else(|| self.symbols.record_scope(owner))
            .and_then(|scope| self.symbols.lookup_in(scope, name))
    }

    /// Walk a declarator inwards, wrapping the type at each level
    fn unwrap_declarator<'t>(&mut self, node: Node<'t>, base: Type) -> Declarator<'t> {
        let mut out = Declarator {
            name: None,
            ty: base,
            bounds: Vec::new(),
            function: false,
            parameters: None,
            value: None,
        };

        let mut current = Some(node);
        while let Some(node) = current {
            current = match node.kind() {
                "init_declarator" => {
                    out.value = node.child_by_field_name("value");
                    node.child_by_field_name("declarator")
                }
                "pointer_declarator" | "abstract_pointer_declarator" => {
                    out.ty = Type::Pointer(Box::new(out.ty));
                    out.function = false;
                    node.child_by_field_name("declarator")
                }
                "reference_declarator" | "abstract_reference_declarator" => {
                    out.ty = Type::Reference(Box::new(out.ty));
                    out.function = false;
                    last_named_child(node)
                }
                "array_declarator" | "abstract_array_declarator" => {
                    let len = match node.child_by_field_name("size") {
                        Some(size) => {
                            let bound = self.lower_expr(size);
                            let len = evaluate_integer(&bound, &self.symbols)
                                .and_then(|v| u64::try_from(v).ok());
                            out.bounds.push(bound);
                            len
                        }
                        None => None,
                    };
                    out.ty = Type::array(out.ty, len);
                    node.child_by_field_name("declarator")
                }
                "parenthesized_declarator" | "attributed_declarator" => first_named_child(node),
                "function_declarator" | "abstract_function_declarator" => {
                    out.function = true;
                    if out.parameters.is_none() {
                        out.parameters = node.child_by_field_name("parameters");
                    }
                    node.child_by_field_name("declarator")
                }
                kind if DECLARATOR_NAME_KINDS.contains(&kind) => {
                    out.name = Some(self.text(node));
                    None
                }
                _ => None,
            };
        }
        out
    }

    fn declare_record(&mut self, node: Node) -> Type {
        let name = node
            .child_by_field_name("name")
            .map(|n| types::unqualified(&self.text(n)).to_string());
        let Some(body) = node.child_by_field_name("body") else {
            return name.map(Type::Record).unwrap_or(Type::Unknown);
        };

        let name = name.unwrap_or_default();
        let ty = Type::Record(name.clone());
        if !name.is_empty() {
            let span = self.span(node);
            self.declare(Decl::new(&name, DeclKind::Record, ty.clone(), span));
        }
        let scope = self.symbols.push_scope(ScopeKind::Record, self.scope);
        if !name.is_empty() {
            self.symbols.register_record(&name, scope);
        }

        let members = named_children(body);
        let saved_record = self.record.replace(name);
        self.with_scope(scope, |this| {
            for member in &members {
                this.declare_member(*member);
            }
            for member in &members {
                this.lower_member_body(*member);
            }
        });
        self.record = saved_record;
        ty
    }

    /// First pass over a record body: declare fields and methods
    fn declare_member(&mut self, member: Node) {
        match member.kind() {
            "field_declaration" => {
                let base = member
                    .child_by_field_name("type")
                    .map(|t| self.declare_type(t))
                    .unwrap_or(Type::Unknown);
                let is_const = self.is_const(member);
                let is_static = self.is_static(member);
                let default = member.child_by_field_name("default_value");
                for declarator in field_children(member, "declarator") {
                    let d = self.unwrap_declarator(declarator, base.clone());
                    let Some(spelled) = d.name else {
                        continue;
                    };
                    let kind = if d.function {
                        DeclKind::Function
                    } else {
                        DeclKind::Field
                    };
                    let init = d.value.or(default).map(|v| self.lower_expr(v));
                    let mut decl = Decl::new(
                        types::unqualified(&spelled),
                        kind,
                        d.ty,
                        self.span(declarator),
                    )
                    .with_const(is_const)
                    .with_static(is_static);
                    decl.init = init;
                    self.declare(decl);
                }
            }
            "declaration" => {
                self.lower_declaration(member);
            }
            "function_definition" => {
                let Some(declarator) = member.child_by_field_name("declarator") else {
                    return;
                };
                let d = self.unwrap_declarator(declarator, Type::Unknown);
                if let Some(spelled) = d.name {
                    let span = self.span(declarator);
                    self.declare(Decl::new(
                        types::unqualified(&spelled),
                        DeclKind::Function,
                        Type::Unknown,
                        span,
                    ));
                }
            }
            kind if LOCAL_ITEMS.contains(&kind) => self.lower_item(member),
            _ => {}
        }
    }

    /// Second pass over a record body: lower inline method bodies
    fn lower_member_body(&mut self, member: Node) {
        match member.kind() {
            "function_definition" => self.lower_function(member),
            "template_declaration" => self.lower_template(member),
            "friend_declaration" => {
                for child in named_children(member) {
                    if child.kind() == "function_definition" {
                        self.lower_function(child);
                    }
                }
            }
            _ => {}
        }
    }

    fn declare_enum(&mut self, node: Node) {
        let name = node.child_by_field_name("name").map(|n| self.text(n));
        if let Some(name) = &name {
            let span = self.span(node);
            self.declare(Decl::new(
                types::unqualified(name),
                DeclKind::TypeAlias,
                Type::Integer,
                span,
            ));
        }
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };

        let scoped = all_children(node)
            .iter()
            .any(|c| matches!(c.kind(), "class" | "struct"));
        let outer = self.scope;
        let enum_scope = self.symbols.push_scope(ScopeKind::Enum, outer);
        if let Some(name) = &name {
            self.symbols
                .register_namespace(types::unqualified(name), enum_scope);
        }

        self.with_scope(enum_scope, |this| {
            let mut next = Some(0i128);
            for enumerator in named_children(body) {
                let Some(name_node) = enumerator.child_by_field_name("name") else {
                    continue;
                };
                let value = match enumerator.child_by_field_name("value") {
                    Some(v) => {
                        let expr = this.lower_expr(v);
                        evaluate_integer(&expr, &this.symbols)
                    }
                    None => next,
                };
                next = value.and_then(|v| v.checked_add(1));

                let decl = Decl::new(
                    this.text(name_node),
                    DeclKind::Enumerator,
                    Type::Integer,
                    this.span(name_node),
                )
                .with_const(true)
                .with_value(value);
                this.symbols.declare(enum_scope, decl.clone());
                if !scoped {
                    this.symbols.declare(outer, decl);
                }
            }
        });
    }

    fn lower_type_definition(&mut self, node: Node) {
        let base = node
            .child_by_field_name("type")
            .map(|t| self.declare_type(t))
            .unwrap_or(Type::Unknown);
        for declarator in field_children(node, "declarator") {
            let d = self.unwrap_declarator(declarator, base.clone());
            if let Some(name) = d.name {
                let span = self.span(declarator);
                self.declare(Decl::new(name, DeclKind::TypeAlias, d.ty, span));
            }
        }
    }

    fn lower_alias(&mut self, node: Node) {
        let (Some(name), Some(ty)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("type"),
        ) else {
            return;
        };
        let ty = self.lower_type_descriptor(ty);
        let span = self.span(name);
        self.declare(Decl::new(self.text(name), DeclKind::TypeAlias, ty, span));
    }

    // ========================================================================
    // Functions and declarations
    // ========================================================================

    fn lower_function(&mut self, node: Node) {
        let return_ty = node
            .child_by_field_name("type")
            .map(|t| self.declare_type(t))
            .unwrap_or(Type::Unknown);
        let Some(declarator) = node.child_by_field_name("declarator") else {
            return;
        };
        let d = self.unwrap_declarator(declarator, return_ty);
        let spelled = d.name.unwrap_or_default();
        let name = types::unqualified(&spelled).to_string();

        // `Owner::method` bodies see the members of `Owner`
        let owner = types::qualifiers(&spelled)
            .last()
            .map(|q| q.split('<').next().unwrap_or_default().trim().to_string());
        let owner_scope = owner
            .as_deref()
            .and_then(|o| self.symbols.record_scope(o));

        if owner.is_none() && !name.is_empty() && self.symbols.lookup_in(self.scope, &name).is_none()
        {
            let span = self.span(declarator);
            self.declare(Decl::new(&name, DeclKind::Function, d.ty, span));
        }

        let parent = owner_scope.unwrap_or(self.scope);
        let record = match owner_scope {
            Some(_) => owner,
            None => self.record.clone(),
        };
        let saved_record = std::mem::replace(&mut self.record, record);
        let function_scope = self.symbols.push_scope(ScopeKind::Function, parent);
        let parameters = d.parameters;

        let parts = self.with_scope(function_scope, |this| {
            let mut parts = Vec::new();
            if let Some(params) = parameters {
                this.declare_parameters(params, &mut parts);
            }
            for child in named_children(node) {
                match child.kind() {
                    "field_initializer_list" => parts.push(Stmt::expr(this.lower_expr(child))),
                    "compound_statement" | "try_statement" => parts.push(this.lower_stmt(child)),
                    _ => {}
                }
            }
            parts
        });
        self.record = saved_record;

        let span = self.span(node);
        self.items.push(Stmt::new(span, StmtKind::Other(parts)));
    }

    /// Declare function parameters in the current scope; default arguments
    /// are lowered into `parts`
    fn declare_parameters(&mut self, params: Node, parts: &mut Vec<Stmt>) {
        for param in named_children(params) {
            if !matches!(
                param.kind(),
                "parameter_declaration" | "optional_parameter_declaration"
            ) {
                continue;
            }
            if let Some(default) = param.child_by_field_name("default_value") {
                parts.push(Stmt::expr(self.lower_expr(default)));
            }
            self.declare_parameter(param, DeclKind::Parameter);
        }
    }

    fn declare_parameter(&mut self, param: Node, kind: DeclKind) {
        let base = param
            .child_by_field_name("type")
            .map(|t| self.declare_type(t))
            .unwrap_or(Type::Unknown);
        let is_const = self.is_const(param);
        let Some(declarator) = param.child_by_field_name("declarator") else {
            return;
        };
        let d = self.unwrap_declarator(declarator, base);
        let Some(name) = d.name else {
            return;
        };
        // Array parameters are pointers
        let ty = match d.ty {
            Type::Array { element, .. } => Type::Pointer(element),
            other => other,
        };
        let span = self.span(declarator);
        self.declare(Decl::new(name, kind, ty, span).with_const(is_const));
    }

    fn lower_declaration(&mut self, node: Node) -> Stmt {
        let base = node
            .child_by_field_name("type")
            .map(|t| self.declare_type(t))
            .unwrap_or(Type::Unknown);
        let is_const = self.is_const(node);
        let is_static = self.is_static(node);
        let kind = if self.symbols.scope(self.scope).kind == ScopeKind::Record {
            DeclKind::Field
        } else {
            DeclKind::Variable
        };

        let mut locals = Vec::new();
        for declarator in field_children(node, "declarator") {
            let d = self.unwrap_declarator(declarator, base.clone());
            let Some(spelled) = d.name else {
                continue;
            };
            let name = types::unqualified(&spelled).to_string();
            let span = self.span(declarator);

            if d.function {
                if self.symbols.lookup_in(self.scope, &name).is_none() {
                    self.declare(Decl::new(name, DeclKind::Function, d.ty, span));
                }
                continue;
            }

            let init = d.value.map(|v| self.lower_expr(v));
            let mut ty = d.ty;
            if ty == Type::Named("auto".to_string()) {
                if let Some(init) = &init {
                    ty = self.symbols.type_of(init);
                }
            }
            if let (Type::Array { len, .. }, Some(value)) = (&mut ty, d.value) {
                if len.is_none() && value.kind() == "initializer_list" {
                    *len = Some(named_children(value).len() as u64);
                }
            }

            let mut decl = Decl::new(name, kind, ty, span)
                .with_const(is_const)
                .with_static(is_static);
            decl.init = init.clone();
            let id = self.declare(decl);
            locals.push(LocalDecl {
                decl: id,
                bounds: d.bounds,
                init,
            });
        }
        Stmt::new(self.span(node), StmtKind::Decl(locals))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn lower_stmt(&mut self, node: Node) -> Stmt {
        let span = self.span(node);
        match node.kind() {
            "compound_statement" => self.in_new_scope(ScopeKind::Block, |this| {
                let stmts = named_children(node)
                    .into_iter()
                    .map(|c| this.lower_stmt(c))
                    .collect();
                Stmt::new(span, StmtKind::Compound(stmts))
            }),
            "declaration" => self.lower_declaration(node),
            "expression_statement" => match first_named_child(node) {
                Some(expr) => {
                    let expr = self.lower_expr(expr);
                    Stmt::new(span, StmtKind::Expr(expr))
                }
                None => Stmt::new(span, StmtKind::Other(Vec::new())),
            },
            "for_statement" => self.lower_for(node),
            "for_range_loop" => self.lower_range_for(node),
            "parameter_list" => {
                let mut parts = Vec::new();
                self.declare_parameters(node, &mut parts);
                Stmt::new(span, StmtKind::Other(parts))
            }
            "statement_identifier" | "access_specifier" => {
                Stmt::new(span, StmtKind::Other(Vec::new()))
            }
            kind if LOCAL_ITEMS.contains(&kind) => {
                self.lower_item(node);
                Stmt::new(span, StmtKind::Other(Vec::new()))
            }
            kind if GENERIC_STATEMENTS.contains(&kind) => self.lower_generic_stmt(node),
            _ => Stmt::expr(self.lower_expr(node)),
        }
    }

    fn lower_generic_stmt(&mut self, node: Node) -> Stmt {
        let span = self.span(node);
        self.in_new_scope(ScopeKind::Block, |this| {
            let children = named_children(node)
                .into_iter()
                .map(|c| this.lower_stmt(c))
                .collect();
            Stmt::new(span, StmtKind::Other(children))
        })
    }

    fn lower_for(&mut self, node: Node) -> Stmt {
        let span = self.span(node);
        let children = all_children(node);
        let body_node = node.child_by_field_name("body");
        let open = children.iter().position(|c| c.kind() == "(");
        let close = children.iter().rposition(|c| {
            c.kind() == ")" && body_node.map_or(true, |b| c.end_byte() <= b.start_byte())
        });
        let (Some(open), Some(close)) = (open, close) else {
            return self.lower_generic_stmt(node);
        };
        let header = Span::new(
            self.file,
            children[open].start_byte(),
            children[close].end_byte(),
        );

        let scope = self.symbols.push_scope(ScopeKind::ForInit, self.scope);
        self.with_scope(scope, |this| {
            // Header parts are positional: init ; condition ; increment.
            // A declaration init carries its own `;`.
            let mut segment = 0;
            let (mut init, mut condition, mut increment) = (None, None, None);
            for child in &children[open + 1..close] {
                if child.kind() == ";" {
                    segment += 1;
                    continue;
                }
                if !child.is_named() || child.is_extra() {
                    continue;
                }
                match segment {
                    0 if child.kind() == "declaration" => {
                        init = Some(this.lower_declaration(*child));
                        segment = 1;
                    }
                    0 => init = Some(Stmt::expr(this.lower_expr(*child))),
                    1 => condition = Some(this.lower_expr(*child)),
                    _ => increment = Some(this.lower_expr(*child)),
                }
            }

            let body = match body_node {
                Some(body) => this.lower_stmt(body),
                None => Stmt::new(span, StmtKind::Other(Vec::new())),
            };
            Stmt::new(
                span,
                StmtKind::For(Box::new(ForStmt {
                    header,
                    scope,
                    init,
                    condition,
                    increment,
                    body,
                })),
            )
        })
    }

    fn lower_range_for(&mut self, node: Node) -> Stmt {
        let span = self.span(node);
        self.in_new_scope(ScopeKind::ForInit, |this| {
            let mut parts = Vec::new();
            if let Some(init) = node.child_by_field_name("initializer") {
                parts.push(this.lower_stmt(init));
            }
            if let Some(range) = node.child_by_field_name("right") {
                parts.push(Stmt::expr(this.lower_expr(range)));
            }
            let base = node
                .child_by_field_name("type")
                .map(|t| this.declare_type(t))
                .unwrap_or(Type::Unknown);
            if let Some(declarator) = node.child_by_field_name("declarator") {
                let d = this.unwrap_declarator(declarator, base);
                if let Some(name) = d.name {
                    let decl_span = this.span(declarator);
                    this.declare(Decl::new(name, DeclKind::Variable, d.ty, decl_span));
                }
            }
            if let Some(body) = node.child_by_field_name("body") {
                parts.push(this.lower_stmt(body));
            }
            Stmt::new(span, StmtKind::Other(parts))
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn lower_expr(&mut self, node: Node) -> Expr {
        let span = self.span(node);
        let kind = match node.kind() {
            "identifier" | "field_identifier" => {
                let name = self.text(node);
                let decl = self.symbols.lookup(self.scope, &name);
                ExprKind::DeclRef { name, decl }
            }
            "qualified_identifier" => {
                let name = self.text(node);
                let decl = self.resolve_name(&name);
                ExprKind::DeclRef { name, decl }
            }
            "template_function" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let decl = self.resolve_name(&name);
                ExprKind::DeclRef { name, decl }
            }
            "number_literal" => {
                let text = self.text(node);
                if types::is_floating_literal(&text) {
                    ExprKind::FloatLiteral(text)
                } else {
                    ExprKind::IntLiteral(text)
                }
            }
            "char_literal" => ExprKind::CharLiteral(self.text(node)),
            "string_literal" | "raw_string_literal" | "concatenated_string" => {
                ExprKind::StringLiteral(self.text(node))
            }
            "true" => ExprKind::BoolLiteral(true),
            "false" => ExprKind::BoolLiteral(false),
            "this" => ExprKind::This {
                record: self.record.clone(),
            },
            "parenthesized_expression" => match first_named_child(node) {
                Some(inner) => ExprKind::Paren(Box::new(self.lower_expr(inner))),
                None => ExprKind::Other(Vec::new()),
            },
            "subscript_expression" => self.lower_subscript(node),
            "field_expression" => self.lower_member(node),
            "call_expression" => {
                let callee = node
                    .child_by_field_name("function")
                    .map(|f| self.lower_expr(f));
                let args: Vec<Expr> = node
                    .child_by_field_name("arguments")
                    .map(named_children)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|a| self.lower_expr(a))
                    .collect();
                match callee {
                    Some(callee) => ExprKind::Call {
                        callee: Box::new(callee),
                        args,
                    },
                    None => ExprKind::Other(args),
                }
            }
            "unary_expression" | "pointer_expression" | "update_expression" => {
                self.lower_unary(node)
            }
            "binary_expression" | "comma_expression" => self.lower_binary(node),
            "assignment_expression" => {
                match (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) {
                    (Some(left), Some(right)) => {
                        let op = node
                            .child_by_field_name("operator")
                            .map(|o| self.text(o))
                            .unwrap_or_else(|| "=".to_string());
                        ExprKind::Assign {
                            op,
                            target: Box::new(self.lower_expr(left)),
                            value: Box::new(self.lower_expr(right)),
                        }
                    }
                    _ => self.lower_children(node),
                }
            }
            "conditional_expression" => match (
                node.child_by_field_name("condition"),
                node.child_by_field_name("consequence"),
                node.child_by_field_name("alternative"),
            ) {
                (Some(cond), Some(then), Some(otherwise)) => ExprKind::Conditional {
                    cond: Box::new(self.lower_expr(cond)),
                    then: Box::new(self.lower_expr(then)),
                    otherwise: Box::new(self.lower_expr(otherwise)),
                },
                _ => self.lower_children(node),
            },
            "cast_expression" => match (
                node.child_by_field_name("type"),
                node.child_by_field_name("value"),
            ) {
                (Some(ty), Some(value)) => ExprKind::Cast {
                    ty: self.lower_type_descriptor(ty),
                    operand: Box::new(self.lower_expr(value)),
                },
                _ => self.lower_children(node),
            },
            "sizeof_expression" => match node.child_by_field_name("value") {
                Some(value) => ExprKind::SizeOf(Some(Box::new(self.lower_expr(value)))),
                None => ExprKind::SizeOf(
                    node.child_by_field_name("type")
                        .and_then(|t| self.sizeof_value_from_type(t))
                        .map(Box::new),
                ),
            },
            "lambda_expression" => self.lower_lambda(node),
            "compound_statement" | "declaration" => {
                ExprKind::Block(Box::new(self.lower_stmt(node)))
            }
            kind if GENERIC_STATEMENTS.contains(&kind) => {
                ExprKind::Block(Box::new(self.lower_stmt(node)))
            }
            _ => self.lower_children(node),
        };
        Expr::new(span, kind)
    }

    fn lower_children(&mut self, node: Node) -> ExprKind {
        ExprKind::Other(
            named_children(node)
                .into_iter()
                .map(|c| self.lower_expr(c))
                .collect(),
        )
    }

    fn lower_subscript(&mut self, node: Node) -> ExprKind {
        let base = node
            .child_by_field_name("argument")
            .map(|b| self.lower_expr(b));
        // Older grammars expose `index`, newer ones an argument list
        let index = node.child_by_field_name("index").or_else(|| {
            node.child_by_field_name("indices").and_then(|list| {
                let args = named_children(list);
                match args.as_slice() {
                    [only] => Some(*only),
                    _ => None,
                }
            })
        });

        match (base, index) {
            (Some(base), Some(index)) => ExprKind::Subscript {
                base: Box::new(base),
                index: Box::new(self.lower_expr(index)),
            },
            (base, _) => {
                let mut children: Vec<Expr> = base.into_iter().collect();
                if let Some(list) = node.child_by_field_name("indices") {
                    for arg in named_children(list) {
                        children.push(self.lower_expr(arg));
                    }
                }
                ExprKind::Other(children)
            }
        }
    }

    fn lower_member(&mut self, node: Node) -> ExprKind {
        let Some(base_node) = node.child_by_field_name("argument") else {
            return self.lower_children(node);
        };
        let base = self.lower_expr(base_node);
        let arrow = node
            .child_by_field_name("operator")
            .map(|op| self.text(op) == "->")
            .unwrap_or(false);
        let field = node
            .child_by_field_name("field")
            .map(|f| self.text(f))
            .unwrap_or_default();
        let decl = self
            .symbols
            .type_of(&base)
            .name()
            .and_then(|record| self.symbols.field_of(record, types::unqualified(&field)));

        ExprKind::Member {
            base: Box::new(base),
            arrow,
            field,
            decl,
        }
    }

    fn lower_unary(&mut self, node: Node) -> ExprKind {
        let (Some(op_node), Some(arg)) = (
            node.child_by_field_name("operator"),
            node.child_by_field_name("argument"),
        ) else {
            return self.lower_children(node);
        };
        let prefix = op_node.start_byte() < arg.start_byte();
        let op = UnaryOp::from_token(&self.text(op_node), prefix);
        let operand = self.lower_expr(arg);
        match op {
            Some(op) => ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            None => ExprKind::Other(vec![operand]),
        }
    }

    fn lower_binary(&mut self, node: Node) -> ExprKind {
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return self.lower_children(node);
        };
        let op = if node.kind() == "comma_expression" {
            Some(BinaryOp::Comma)
        } else {
            node.child_by_field_name("operator")
                .and_then(|o| BinaryOp::from_token(&self.text(o)))
        };
        let lhs = self.lower_expr(left);
        let rhs = self.lower_expr(right);
        match op {
            Some(op) => ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            None => ExprKind::Other(vec![lhs, rhs]),
        }
    }

    /// `sizeof(arr)` and `sizeof(arr[0])` parse as type descriptors when
    /// `arr` could name a type; recover the expression when it names a value
    fn sizeof_value_from_type(&mut self, descriptor: Node) -> Option<Expr> {
        let ty = descriptor.child_by_field_name("type")?;
        if ty.kind() != "type_identifier" {
            return None;
        }
        let name = self.text(ty);
        let decl = self.symbols.lookup(self.scope, &name)?;
        if matches!(
            self.symbols.decl(decl).kind,
            DeclKind::TypeAlias | DeclKind::Record
        ) {
            return None;
        }
        let base = Expr::new(
            self.span(ty),
            ExprKind::DeclRef {
                name,
                decl: Some(decl),
            },
        );

        match descriptor.child_by_field_name("declarator") {
            None => Some(base),
            Some(d)
                if d.kind() == "abstract_array_declarator"
                    && d.child_by_field_name("declarator").is_none() =>
            {
                let index = self.lower_expr(d.child_by_field_name("size")?);
                Some(Expr::new(
                    self.span(descriptor),
                    ExprKind::Subscript {
                        base: Box::new(base),
                        index: Box::new(index),
                    },
                ))
            }
            Some(_) => None,
        }
    }

    fn lower_lambda(&mut self, node: Node) -> ExprKind {
        let span = self.span(node);
        let mut parts = Vec::new();
        if let Some(captures) = node.child_by_field_name("captures") {
            for capture in named_children(captures) {
                if capture.kind() != "lambda_default_capture" {
                    parts.push(Stmt::expr(self.lower_expr(capture)));
                }
            }
        }
        self.in_new_scope(ScopeKind::Lambda, |this| {
            if let Some(params) = node
                .child_by_field_name("declarator")
                .and_then(|d| d.child_by_field_name("parameters"))
            {
                this.declare_parameters(params, &mut parts);
            }
            if let Some(body) = node.child_by_field_name("body") {
                parts.push(this.lower_stmt(body));
            }
        });
        ExprKind::Block(Box::new(Stmt::new(span, StmtKind::Other(parts))))
    }
}
