//! Host-facing expression/statement tree.
//!
//! The analysis never parses source text. The host (a parser or frontend
//! adapter) builds a [`Program`]: an arena of [`Node`]s plus declaration and
//! type tables, and hands the analyzer candidate loops referring into it.
//!
//! Identity rules the rest of the crate relies on:
//!
//! 1. A [`NodeId`] names one physical occurrence in the source. Two reads of
//!    the same variable are two nodes; "this read is really the write we
//!    already recorded" is node-id equality.
//! 2. A [`DeclId`] names one canonical declaration. Every reference to a
//!    variable or function resolves to the same `DeclId` regardless of
//!    spelling.
//! 3. Type predicates (`is_integer`, `is_pointer`, ...) are the only type
//!    information the analysis consumes.

use serde::{Deserialize, Serialize};

/// Index of a node in [`Program::nodes`]. One id per physical occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Canonical declaration identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

/// Index into the type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Storage class of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Storage {
    Local,
    Global,
    Parameter,
    Member,
}

/// The type universe the analysis distinguishes. Anything the host cannot
/// express collapses into `Opaque`, which fails every predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Bool,
    Int,
    Float,
    Pointer(TypeId),
    Array { elem: TypeId, len: Option<u64> },
    Reference(TypeId),
    Record { name: String, destructor: Option<DeclId> },
    Function,
    Opaque,
}

/// Pure binary operators (assignments are [`Node::Assign`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Deref,
    AddrOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    Inc,
    Dec,
}

/// Overloaded-operator calls the analysis can see through. `Subscript` and
/// `Deref` participate in element recognition; everything else is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadedOp {
    Subscript,
    Deref,
    Other,
}

/// One statement or expression. Statements and expressions share the arena;
/// the parent's position decides which role a node plays.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // --- statements ---
    Block { stmts: Vec<NodeId> },
    DeclStmt { decl: DeclId },
    ExprStmt { expr: NodeId },
    If { cond: NodeId, then_body: NodeId, else_body: Option<NodeId> },
    /// A loop nested inside the body under analysis (or inside a callee).
    /// Its header parts are kept raw; the analyzer only guards re-entry.
    NestedLoop {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    },
    Goto,
    Break,
    Return { value: Option<NodeId> },
    Throw { value: Option<NodeId> },

    // --- expressions ---
    IntLit(i64),
    FloatLit(f64),
    VarRef(DeclId),
    Paren(NodeId),
    Cast { to: TypeId, expr: NodeId },
    Unary { op: UnaryOp, expr: NodeId },
    IncDec { op: IncDecOp, target: NodeId },
    Binary { op: BinOp, lhs: NodeId, rhs: NodeId },
    /// `lhs = rhs` when `op` is `None`, `lhs ⊕= rhs` when `op` is `Some(⊕)`.
    Assign { op: Option<BinOp>, lhs: NodeId, rhs: NodeId },
    Index { base: NodeId, index: NodeId },
    Member { base: NodeId, member: DeclId },
    This,
    Call { callee: NodeId, args: Vec<NodeId> },
    Construct { ctor: DeclId, args: Vec<NodeId> },
    OpCall { op: OverloadedOp, args: Vec<NodeId> },
    /// Allocation expression (`new T[count]`-like). `count: None` is a
    /// single-element allocation.
    Alloc { elem: TypeId, count: Option<NodeId> },
    Lambda { body: NodeId },
}

/// Function payload attached to a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub params: Vec<DeclId>,
    /// `None` when the definition is not visible to the analysis.
    pub body: Option<NodeId>,
    pub kind: FunctionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Free,
    Method,
    Constructor(TypeId),
    Destructor(TypeId),
}

/// One declaration: variable, parameter, member, or function.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclInfo {
    pub name: String,
    pub ty: TypeId,
    pub storage: Storage,
    /// Initializer expression, if the declaration has one.
    pub init: Option<NodeId>,
    /// Enclosing function declaration, when known. Used to scan for pointer
    /// reassignments outside the loop body.
    pub owner: Option<DeclId>,
    pub function: Option<FunctionInfo>,
}

/// The whole analyzable tree: node arena plus declaration and type tables.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub(crate) nodes: Vec<Node>,
    pub(crate) decls: Vec<DeclInfo>,
    pub(crate) types: Vec<Type>,
}

impl Program {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn decl(&self, id: DeclId) -> &DeclInfo {
        &self.decls[id.0 as usize]
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    /// Strip parentheses and casts, the analysis-facing view of every
    /// expression comparison.
    pub fn strip(&self, mut id: NodeId) -> NodeId {
        loop {
            match self.node(id) {
                Node::Paren(inner) => id = *inner,
                Node::Cast { expr, .. } => id = *expr,
                _ => return id,
            }
        }
    }

    pub fn is_integer(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty), Type::Int | Type::Bool)
    }

    pub fn is_pointer(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty), Type::Pointer(_))
    }

    pub fn is_array(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty), Type::Array { .. })
    }

    pub fn is_reference(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty), Type::Reference(_))
    }

    pub fn is_arithmetic(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty), Type::Int | Type::Float | Type::Bool)
    }

    /// Builtin value types. Callee parameters of these types are the only
    /// ones pre-approved as callee-local.
    pub fn is_builtin(&self, ty: TypeId) -> bool {
        matches!(self.ty(ty), Type::Int | Type::Float | Type::Bool | Type::Void)
    }

    /// Peel references when querying a declaration's underlying type.
    pub fn deref_reference(&self, ty: TypeId) -> TypeId {
        match self.ty(ty) {
            Type::Reference(inner) => *inner,
            _ => ty,
        }
    }

    pub fn record_destructor(&self, ty: TypeId) -> Option<DeclId> {
        match self.ty(ty) {
            Type::Record { destructor, .. } => *destructor,
            _ => None,
        }
    }

    /// Structural expression type, computed only for the forms the analysis
    /// queries. `None` means "not known", which every caller treats
    /// conservatively.
    pub fn expr_type(&self, id: NodeId) -> Option<TypeId> {
        match self.node(self.strip(id)) {
            Node::VarRef(d) => Some(self.deref_reference(self.decl(*d).ty)),
            Node::Member { member, .. } => Some(self.decl(*member).ty),
            Node::Index { base, .. } => match self.ty(self.expr_type(*base)?) {
                Type::Pointer(elem) => Some(*elem),
                Type::Array { elem, .. } => Some(*elem),
                _ => None,
            },
            Node::Unary { op: UnaryOp::Deref, expr } => match self.ty(self.expr_type(*expr)?) {
                Type::Pointer(elem) => Some(*elem),
                Type::Array { elem, .. } => Some(*elem),
                _ => None,
            },
            _ => None,
        }
    }

    /// Literal value of an expression after stripping, if it is one.
    pub fn int_literal(&self, id: NodeId) -> Option<i64> {
        match self.node(self.strip(id)) {
            Node::IntLit(v) => Some(*v),
            _ => None,
        }
    }

    /// Resolved function payload of a declaration, if it is a function.
    pub fn function(&self, id: DeclId) -> Option<&FunctionInfo> {
        self.decl(id).function.as_ref()
    }

    /// Direct children of a node, in source order. Declaration initializers
    /// count as children of the declaration statement so that generic walks
    /// reach them.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.node(id) {
            Node::Block { stmts } => stmts.clone(),
            Node::DeclStmt { decl } => self.decl(*decl).init.into_iter().collect(),
            Node::ExprStmt { expr } => vec![*expr],
            Node::If { cond, then_body, else_body } => {
                let mut out = vec![*cond, *then_body];
                out.extend(*else_body);
                out
            }
            Node::NestedLoop { init, cond, step, body } => {
                let mut out = Vec::new();
                out.extend(*init);
                out.extend(*cond);
                out.extend(*step);
                out.push(*body);
                out
            }
            Node::Goto | Node::Break => Vec::new(),
            Node::Return { value } | Node::Throw { value } => (*value).into_iter().collect(),
            Node::IntLit(_) | Node::FloatLit(_) | Node::VarRef(_) | Node::This => Vec::new(),
            Node::Paren(e) => vec![*e],
            Node::Cast { expr, .. } => vec![*expr],
            Node::Unary { expr, .. } => vec![*expr],
            Node::IncDec { target, .. } => vec![*target],
            Node::Binary { lhs, rhs, .. } | Node::Assign { lhs, rhs, .. } => vec![*lhs, *rhs],
            Node::Index { base, index } => vec![*base, *index],
            Node::Member { base, .. } => vec![*base],
            Node::Call { callee, args } => {
                let mut out = vec![*callee];
                out.extend(args.iter().copied());
                out
            }
            Node::Construct { args, .. } | Node::OpCall { args, .. } => args.clone(),
            Node::Alloc { count, .. } => (*count).into_iter().collect(),
            Node::Lambda { body } => vec![*body],
        }
    }

    /// Whether `what` occurs anywhere in the subtree rooted at `root`.
    pub fn subtree_contains(&self, root: NodeId, pred: &dyn Fn(&Node) -> bool) -> bool {
        if pred(self.node(root)) {
            return true;
        }
        self.children(root)
            .into_iter()
            .any(|c| self.subtree_contains(c, pred))
    }
}

/// Incremental [`Program`] constructor for hosts and tests.
///
/// Basic types are interned up front; composite types are appended on demand.
/// Node ids come out in construction order, which for a well-behaved host is
/// source order.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    decls: Vec<DeclInfo>,
    types: Vec<Type>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        // Interned in fixed slots: void, bool, int, float.
        let types = vec![Type::Void, Type::Bool, Type::Int, Type::Float];
        TreeBuilder {
            nodes: Vec::new(),
            decls: Vec::new(),
            types,
        }
    }

    pub fn void_type(&self) -> TypeId {
        TypeId(0)
    }

    pub fn bool_type(&self) -> TypeId {
        TypeId(1)
    }

    pub fn int_type(&self) -> TypeId {
        TypeId(2)
    }

    pub fn float_type(&self) -> TypeId {
        TypeId(3)
    }

    pub fn add_type(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn pointer_to(&mut self, ty: TypeId) -> TypeId {
        self.add_type(Type::Pointer(ty))
    }

    pub fn array_of(&mut self, elem: TypeId, len: Option<u64>) -> TypeId {
        self.add_type(Type::Array { elem, len })
    }

    pub fn reference_to(&mut self, ty: TypeId) -> TypeId {
        self.add_type(Type::Reference(ty))
    }

    pub fn record(&mut self, name: &str, destructor: Option<DeclId>) -> TypeId {
        self.add_type(Type::Record {
            name: name.to_string(),
            destructor,
        })
    }

    fn add_decl(&mut self, info: DeclInfo) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(info);
        id
    }

    pub fn local(&mut self, name: &str, ty: TypeId) -> DeclId {
        self.add_decl(DeclInfo {
            name: name.to_string(),
            ty,
            storage: Storage::Local,
            init: None,
            owner: None,
            function: None,
        })
    }

    pub fn global(&mut self, name: &str, ty: TypeId) -> DeclId {
        self.add_decl(DeclInfo {
            name: name.to_string(),
            ty,
            storage: Storage::Global,
            init: None,
            owner: None,
            function: None,
        })
    }

    pub fn param(&mut self, name: &str, ty: TypeId) -> DeclId {
        self.add_decl(DeclInfo {
            name: name.to_string(),
            ty,
            storage: Storage::Parameter,
            init: None,
            owner: None,
            function: None,
        })
    }

    pub fn member(&mut self, name: &str, ty: TypeId) -> DeclId {
        self.add_decl(DeclInfo {
            name: name.to_string(),
            ty,
            storage: Storage::Member,
            init: None,
            owner: None,
            function: None,
        })
    }

    /// Attach an initializer expression to a declaration.
    pub fn set_init(&mut self, decl: DeclId, init: NodeId) {
        self.decls[decl.0 as usize].init = Some(init);
    }

    /// Record the enclosing function of a declaration.
    pub fn set_owner(&mut self, decl: DeclId, owner: DeclId) {
        self.decls[decl.0 as usize].owner = Some(owner);
    }

    /// Attach (or replace) a function's body, for definitions that refer to
    /// themselves or to later declarations.
    pub fn set_function_body(&mut self, func: DeclId, body: NodeId) {
        if let Some(f) = self.decls[func.0 as usize].function.as_mut() {
            f.body = Some(body);
        }
    }

    pub fn function(&mut self, name: &str, params: Vec<DeclId>, body: Option<NodeId>) -> DeclId {
        self.function_with_kind(name, params, body, FunctionKind::Free)
    }

    pub fn function_with_kind(
        &mut self,
        name: &str,
        params: Vec<DeclId>,
        body: Option<NodeId>,
        kind: FunctionKind,
    ) -> DeclId {
        let ty = self.add_type(Type::Function);
        self.add_decl(DeclInfo {
            name: name.to_string(),
            ty,
            storage: Storage::Global,
            init: None,
            owner: None,
            function: Some(FunctionInfo { params, body, kind }),
        })
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    // Shorthand constructors for the common shapes.

    pub fn int(&mut self, v: i64) -> NodeId {
        self.push(Node::IntLit(v))
    }

    pub fn float(&mut self, v: f64) -> NodeId {
        self.push(Node::FloatLit(v))
    }

    pub fn var(&mut self, d: DeclId) -> NodeId {
        self.push(Node::VarRef(d))
    }

    pub fn paren(&mut self, e: NodeId) -> NodeId {
        self.push(Node::Paren(e))
    }

    pub fn cast(&mut self, to: TypeId, e: NodeId) -> NodeId {
        self.push(Node::Cast { to, expr: e })
    }

    pub fn unary(&mut self, op: UnaryOp, e: NodeId) -> NodeId {
        self.push(Node::Unary { op, expr: e })
    }

    pub fn deref(&mut self, e: NodeId) -> NodeId {
        self.unary(UnaryOp::Deref, e)
    }

    pub fn inc(&mut self, target: NodeId) -> NodeId {
        self.push(Node::IncDec { op: IncDecOp::Inc, target })
    }

    pub fn dec(&mut self, target: NodeId) -> NodeId {
        self.push(Node::IncDec { op: IncDecOp::Dec, target })
    }

    pub fn binary(&mut self, op: BinOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(Node::Binary { op, lhs, rhs })
    }

    pub fn assign(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(Node::Assign { op: None, lhs, rhs })
    }

    pub fn compound_assign(&mut self, op: BinOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(Node::Assign { op: Some(op), lhs, rhs })
    }

    pub fn index(&mut self, base: NodeId, index: NodeId) -> NodeId {
        self.push(Node::Index { base, index })
    }

    pub fn member_access(&mut self, base: NodeId, member: DeclId) -> NodeId {
        self.push(Node::Member { base, member })
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        self.push(Node::Call { callee, args })
    }

    pub fn construct(&mut self, ctor: DeclId, args: Vec<NodeId>) -> NodeId {
        self.push(Node::Construct { ctor, args })
    }

    pub fn alloc(&mut self, elem: TypeId, count: Option<NodeId>) -> NodeId {
        self.push(Node::Alloc { elem, count })
    }

    pub fn expr_stmt(&mut self, e: NodeId) -> NodeId {
        self.push(Node::ExprStmt { expr: e })
    }

    pub fn decl_stmt(&mut self, d: DeclId) -> NodeId {
        self.push(Node::DeclStmt { decl: d })
    }

    pub fn block(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.push(Node::Block { stmts })
    }

    pub fn finish(self) -> Program {
        Program {
            nodes: self.nodes,
            decls: self.decls,
            types: self.types,
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
